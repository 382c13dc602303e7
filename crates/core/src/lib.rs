// Core types for self-service workflows: stage configuration, the stage type
// registry, workflow definitions and the resource layer they are served over.

pub mod registry;
pub mod resource;
pub mod stage;
pub mod stages;
pub mod workflow;

pub use registry::StageTypeRegistry;
pub use stage::{ErasedStageType, StageConfig, StageError, StageType, TypedStageConfig};
pub use stages::{ResetStageConfig, UserRegistrationConfig};
pub use workflow::{WorkflowDefinition, WorkflowLoader};
