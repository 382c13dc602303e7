pub mod definition;
pub mod loader;

pub use definition::WorkflowDefinition;
pub use loader::WorkflowLoader;
