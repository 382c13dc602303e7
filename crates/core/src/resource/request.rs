use super::patch::PatchOperation;
use super::query::QueryFilter;
use super::{ID_FIELD, REV_FIELD};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Create a resource inside a collection
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRequest {
    pub container_path: String,
    /// Client-assigned id; the provider assigns one when absent
    pub new_resource_id: Option<String>,
    pub content: Value,
}

impl CreateRequest {
    pub fn new(container_path: impl Into<String>, new_resource_id: Option<String>, content: Value) -> Self {
        Self {
            container_path: container_path.into(),
            new_resource_id,
            content,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadRequest {
    pub resource_path: String,
}

impl ReadRequest {
    pub fn new(resource_path: impl Into<String>) -> Self {
        Self {
            resource_path: resource_path.into(),
        }
    }
}

/// Replace a resource's content
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub resource_path: String,
    /// Revision the client expects the resource to be at
    pub revision: Option<String>,
    pub content: Value,
}

impl UpdateRequest {
    pub fn new(resource_path: impl Into<String>, content: Value) -> Self {
        Self {
            resource_path: resource_path.into(),
            revision: None,
            content,
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatchRequest {
    pub resource_path: String,
    pub revision: Option<String>,
    pub operations: Vec<PatchOperation>,
}

impl PatchRequest {
    pub fn new(resource_path: impl Into<String>, operations: Vec<PatchOperation>) -> Self {
        Self {
            resource_path: resource_path.into(),
            revision: None,
            operations,
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteRequest {
    pub resource_path: String,
    pub revision: Option<String>,
}

impl DeleteRequest {
    pub fn new(resource_path: impl Into<String>) -> Self {
        Self {
            resource_path: resource_path.into(),
            revision: None,
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }
}

/// Invoke a named custom action
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub resource_path: String,
    pub action: String,
    pub content: Value,
    pub params: BTreeMap<String, String>,
}

impl ActionRequest {
    pub fn new(resource_path: impl Into<String>, action: impl Into<String>, content: Value) -> Self {
        Self {
            resource_path: resource_path.into(),
            action: action.into(),
            content,
            params: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub resource_path: String,
    pub filter: QueryFilter,
}

impl QueryRequest {
    pub fn new(resource_path: impl Into<String>, filter: QueryFilter) -> Self {
        Self {
            resource_path: resource_path.into(),
            filter,
        }
    }
}

/// Any request the router can dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Create(CreateRequest),
    Read(ReadRequest),
    Update(UpdateRequest),
    Patch(PatchRequest),
    Delete(DeleteRequest),
    Action(ActionRequest),
    Query(QueryRequest),
}

impl Request {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Read(_) => "read",
            Self::Update(_) => "update",
            Self::Patch(_) => "patch",
            Self::Delete(_) => "delete",
            Self::Action(_) => "action",
            Self::Query(_) => "query",
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Create(r) => &r.container_path,
            Self::Read(r) => &r.resource_path,
            Self::Update(r) => &r.resource_path,
            Self::Patch(r) => &r.resource_path,
            Self::Delete(r) => &r.resource_path,
            Self::Action(r) => &r.resource_path,
            Self::Query(r) => &r.resource_path,
        }
    }
}

/// A resource as returned by create, read, update, patch and delete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceResponse {
    pub id: String,
    pub revision: Option<String>,
    pub content: Value,
}

impl ResourceResponse {
    /// Build a response from stored content carrying `_id` and `_rev`
    pub fn from_content(content: Value) -> Self {
        let id = content
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let revision = content
            .get(REV_FIELD)
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            id,
            revision,
            content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub content: Value,
}

impl ActionResponse {
    pub fn new(content: Value) -> Self {
        Self { content }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    pub resources: Vec<ResourceResponse>,
}

impl QueryResponse {
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Resource(ResourceResponse),
    Action(ActionResponse),
    Query(QueryResponse),
}
