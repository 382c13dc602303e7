use super::error::{ResourceError, ResourceResult};
use super::patch;
use super::provider::CollectionResourceProvider;
use super::request::{
    CreateRequest, DeleteRequest, PatchRequest, QueryRequest, QueryResponse, ReadRequest,
    ResourceResponse, UpdateRequest,
};
use super::{ID_FIELD, REV_FIELD};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

struct StoredResource {
    /// Bumped on every update or patch; becomes the next `_rev`
    version: u64,
    content: Value,
}

impl StoredResource {
    fn revision(&self) -> &str {
        self.content
            .get(REV_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

/// Version counter to continue from after a revision supplied at creation
fn initial_version(revision: &str) -> u64 {
    revision
        .parse::<f64>()
        .ok()
        .filter(|version| (0.0..u64::MAX as f64).contains(version))
        .map(|version| version.trunc() as u64)
        .unwrap_or(0)
}

/// In-memory collection of JSON resources.
///
/// Stored content always carries `_id` and `_rev`. A `_rev` supplied at
/// creation is kept; later updates assign numeric revisions greater than it.
#[derive(Default)]
pub struct MemoryBackend {
    resources: RwLock<BTreeMap<String, StoredResource>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.resources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn require_object(content: Value) -> ResourceResult<serde_json::Map<String, Value>> {
    match content {
        Value::Object(fields) => Ok(fields),
        _ => Err(ResourceError::bad_request(
            "Resource content must be a JSON object",
        )),
    }
}

fn stamp(mut fields: serde_json::Map<String, Value>, id: &str, revision: String) -> Value {
    fields.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    fields.insert(REV_FIELD.to_string(), Value::String(revision));
    Value::Object(fields)
}

fn check_revision(id: &str, expected: Option<&str>, stored: &StoredResource) -> ResourceResult<()> {
    match expected {
        Some(expected) if expected != "*" && expected != stored.revision() => {
            Err(ResourceError::precondition_failed(format!(
                "Expected revision {} of resource {} but found {}",
                expected,
                id,
                stored.revision()
            )))
        }
        _ => Ok(()),
    }
}

fn not_found(id: &str, operation: &str) -> ResourceError {
    ResourceError::not_found(format!(
        "The resource with ID '{}' could not be {} because it does not exist",
        id, operation
    ))
}

#[async_trait::async_trait]
impl CollectionResourceProvider for MemoryBackend {
    async fn create_instance(&self, request: CreateRequest) -> ResourceResult<ResourceResponse> {
        let fields = require_object(request.content)?;
        let id = request
            .new_resource_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        if id.is_empty() {
            return Err(ResourceError::bad_request("Resource id must not be empty"));
        }

        let revision = fields
            .get(REV_FIELD)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| "0".to_string());

        let mut resources = self
            .resources
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if resources.contains_key(&id) {
            return Err(ResourceError::precondition_failed(format!(
                "The resource with ID '{}' could not be created because there is already another resource with the same ID",
                id
            )));
        }

        let version = initial_version(&revision);
        let content = stamp(fields, &id, revision);
        resources.insert(
            id.clone(),
            StoredResource {
                version,
                content: content.clone(),
            },
        );

        tracing::debug!("Created resource {} in {}", id, request.container_path);

        Ok(ResourceResponse::from_content(content))
    }

    async fn read_instance(&self, id: &str, _request: ReadRequest) -> ResourceResult<ResourceResponse> {
        let resources = self
            .resources
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        resources
            .get(id)
            .map(|stored| ResourceResponse::from_content(stored.content.clone()))
            .ok_or_else(|| not_found(id, "read"))
    }

    async fn update_instance(
        &self,
        id: &str,
        request: UpdateRequest,
    ) -> ResourceResult<ResourceResponse> {
        let fields = require_object(request.content)?;

        let mut resources = self
            .resources
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let stored = resources.get_mut(id).ok_or_else(|| not_found(id, "updated"))?;
        check_revision(id, request.revision.as_deref(), stored)?;

        stored.version += 1;
        stored.content = stamp(fields, id, stored.version.to_string());

        Ok(ResourceResponse::from_content(stored.content.clone()))
    }

    async fn patch_instance(
        &self,
        id: &str,
        request: PatchRequest,
    ) -> ResourceResult<ResourceResponse> {
        let mut resources = self
            .resources
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let stored = resources.get_mut(id).ok_or_else(|| not_found(id, "patched"))?;
        check_revision(id, request.revision.as_deref(), stored)?;

        let mut content = stored.content.clone();
        patch::apply(&mut content, &request.operations)?;

        stored.version += 1;
        stored.content = stamp(require_object(content)?, id, stored.version.to_string());

        Ok(ResourceResponse::from_content(stored.content.clone()))
    }

    async fn delete_instance(
        &self,
        id: &str,
        request: DeleteRequest,
    ) -> ResourceResult<ResourceResponse> {
        let mut resources = self
            .resources
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let stored = resources.get(id).ok_or_else(|| not_found(id, "deleted"))?;
        check_revision(id, request.revision.as_deref(), stored)?;

        let removed = resources.remove(id).ok_or_else(|| not_found(id, "deleted"))?;
        tracing::debug!("Deleted resource {}", id);

        Ok(ResourceResponse::from_content(removed.content))
    }

    async fn query_collection(&self, request: QueryRequest) -> ResourceResult<QueryResponse> {
        let resources = self
            .resources
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let resources = resources
            .values()
            .filter(|stored| request.filter.matches(&stored.content))
            .map(|stored| ResourceResponse::from_content(stored.content.clone()))
            .collect();

        Ok(QueryResponse { resources })
    }
}
