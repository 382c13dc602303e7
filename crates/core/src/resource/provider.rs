use super::error::{ResourceError, ResourceResult};
use super::request::{
    ActionRequest, ActionResponse, CreateRequest, DeleteRequest, PatchRequest, QueryRequest,
    QueryResponse, ReadRequest, ResourceResponse, UpdateRequest,
};

/// Provider for a resource with exactly one instance.
///
/// Every operation defaults to "not supported"; providers override the ones
/// they implement.
#[async_trait::async_trait]
pub trait SingletonResourceProvider: Send + Sync {
    async fn action_instance(&self, request: ActionRequest) -> ResourceResult<ActionResponse> {
        Err(ResourceError::unknown_action(&request.action))
    }

    async fn read_instance(&self, _request: ReadRequest) -> ResourceResult<ResourceResponse> {
        Err(ResourceError::not_supported())
    }

    async fn patch_instance(&self, _request: PatchRequest) -> ResourceResult<ResourceResponse> {
        Err(ResourceError::not_supported())
    }

    async fn update_instance(&self, _request: UpdateRequest) -> ResourceResult<ResourceResponse> {
        Err(ResourceError::not_supported())
    }
}

/// Provider for a collection of resources addressed by id.
///
/// As with singletons, unimplemented operations report "not supported".
#[async_trait::async_trait]
pub trait CollectionResourceProvider: Send + Sync {
    async fn create_instance(&self, _request: CreateRequest) -> ResourceResult<ResourceResponse> {
        Err(ResourceError::not_supported())
    }

    async fn read_instance(&self, _id: &str, _request: ReadRequest) -> ResourceResult<ResourceResponse> {
        Err(ResourceError::not_supported())
    }

    async fn update_instance(
        &self,
        _id: &str,
        _request: UpdateRequest,
    ) -> ResourceResult<ResourceResponse> {
        Err(ResourceError::not_supported())
    }

    async fn patch_instance(
        &self,
        _id: &str,
        _request: PatchRequest,
    ) -> ResourceResult<ResourceResponse> {
        Err(ResourceError::not_supported())
    }

    async fn delete_instance(
        &self,
        _id: &str,
        _request: DeleteRequest,
    ) -> ResourceResult<ResourceResponse> {
        Err(ResourceError::not_supported())
    }

    async fn query_collection(&self, _request: QueryRequest) -> ResourceResult<QueryResponse> {
        Err(ResourceError::not_supported())
    }

    async fn action_collection(&self, request: ActionRequest) -> ResourceResult<ActionResponse> {
        Err(ResourceError::unknown_action(&request.action))
    }

    async fn action_instance(
        &self,
        _id: &str,
        request: ActionRequest,
    ) -> ResourceResult<ActionResponse> {
        Err(ResourceError::unknown_action(&request.action))
    }
}
