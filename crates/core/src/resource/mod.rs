// Resource layer: routed collection and singleton providers exchanging JSON

pub mod error;
pub mod memory;
pub mod patch;
pub mod provider;
pub mod query;
pub mod request;
pub mod router;

pub use error::{ResourceError, ResourceResult};
pub use memory::MemoryBackend;
pub use patch::{PatchOp, PatchOperation};
pub use provider::{CollectionResourceProvider, SingletonResourceProvider};
pub use query::QueryFilter;
pub use request::{
    ActionRequest, ActionResponse, CreateRequest, DeleteRequest, PatchRequest, QueryRequest,
    QueryResponse, ReadRequest, Request, ResourceResponse, Response, UpdateRequest,
};
pub use router::{Router, UriTemplate};

/// Server-managed id field of a stored resource
pub const ID_FIELD: &str = "_id";
/// Server-managed revision field of a stored resource
pub const REV_FIELD: &str = "_rev";
