use super::error::{ResourceError, ResourceResult};
use super::provider::{CollectionResourceProvider, SingletonResourceProvider};
use super::request::{
    ActionRequest, ActionResponse, CreateRequest, DeleteRequest, PatchRequest, QueryRequest,
    QueryResponse, ReadRequest, Request, ResourceResponse, Response, UpdateRequest,
};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable,
}

/// Route template such as `/users` or `/realms/{realm}/users`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    template: String,
    segments: Vec<Segment>,
}

impl UriTemplate {
    pub fn parse(template: &str) -> Self {
        let segments = split_path(template)
            .into_iter()
            .map(|segment| {
                match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                    Some(_) => Segment::Variable,
                    None => Segment::Literal(segment.to_string()),
                }
            })
            .collect();

        Self {
            template: template.to_string(),
            segments,
        }
    }

    /// True when the leading segments of a path match; variables match any segment
    fn matches_prefix(&self, path: &[&str]) -> bool {
        path.len() >= self.segments.len()
            && self
                .segments
                .iter()
                .zip(path)
                .all(|(segment, part)| match segment {
                    Segment::Literal(literal) => literal == part,
                    Segment::Variable => true,
                })
    }

    fn len(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

enum Provider {
    Collection(Arc<dyn CollectionResourceProvider>),
    Singleton(Arc<dyn SingletonResourceProvider>),
}

struct Route {
    template: UriTemplate,
    provider: Provider,
}

/// What a request path resolved to
enum Target<'a> {
    Collection(&'a Arc<dyn CollectionResourceProvider>),
    Instance(&'a Arc<dyn CollectionResourceProvider>, String),
    Singleton(&'a Arc<dyn SingletonResourceProvider>),
}

/// Dispatches resource requests to providers by path.
///
/// A collection route matches its template (the collection itself) and the
/// template plus one id segment (an instance). A singleton route matches its
/// template exactly. Routes are tried in registration order.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_collection(
        &mut self,
        template: &str,
        provider: Arc<dyn CollectionResourceProvider>,
    ) -> &mut Self {
        tracing::info!("Registered collection route {}", template);
        self.routes.push(Route {
            template: UriTemplate::parse(template),
            provider: Provider::Collection(provider),
        });
        self
    }

    pub fn add_singleton(
        &mut self,
        template: &str,
        provider: Arc<dyn SingletonResourceProvider>,
    ) -> &mut Self {
        tracing::info!("Registered singleton route {}", template);
        self.routes.push(Route {
            template: UriTemplate::parse(template),
            provider: Provider::Singleton(provider),
        });
        self
    }

    /// Templates of all registered routes
    pub fn templates(&self) -> Vec<String> {
        self.routes.iter().map(|r| r.template.to_string()).collect()
    }

    fn resolve(&self, path: &str) -> ResourceResult<Target<'_>> {
        let parts = split_path(path);

        for route in &self.routes {
            if !route.template.matches_prefix(&parts) {
                continue;
            }

            let remaining = &parts[route.template.len()..];
            match (&route.provider, remaining) {
                (Provider::Collection(provider), []) => return Ok(Target::Collection(provider)),
                (Provider::Collection(provider), [id]) => {
                    return Ok(Target::Instance(provider, (*id).to_string()))
                }
                (Provider::Singleton(provider), []) => return Ok(Target::Singleton(provider)),
                _ => {}
            }
        }

        Err(ResourceError::not_found(format!(
            "Resource '{}' not found",
            path
        )))
    }

    /// Dispatch any request
    pub async fn handle(&self, request: Request) -> ResourceResult<Response> {
        tracing::debug!("Dispatching {} request for {}", request.kind(), request.path());

        match request {
            Request::Create(r) => self.create(r).await.map(Response::Resource),
            Request::Read(r) => self.read(r).await.map(Response::Resource),
            Request::Update(r) => self.update(r).await.map(Response::Resource),
            Request::Patch(r) => self.patch(r).await.map(Response::Resource),
            Request::Delete(r) => self.delete(r).await.map(Response::Resource),
            Request::Action(r) => self.action(r).await.map(Response::Action),
            Request::Query(r) => self.query(r).await.map(Response::Query),
        }
    }

    pub async fn create(&self, request: CreateRequest) -> ResourceResult<ResourceResponse> {
        match self.resolve(&request.container_path)? {
            Target::Collection(provider) => provider.create_instance(request).await,
            Target::Instance(..) => Err(ResourceError::bad_request(format!(
                "Resources cannot be created inside '{}'",
                request.container_path
            ))),
            Target::Singleton(_) => Err(ResourceError::not_supported()),
        }
    }

    pub async fn read(&self, request: ReadRequest) -> ResourceResult<ResourceResponse> {
        match self.resolve(&request.resource_path)? {
            Target::Instance(provider, id) => provider.read_instance(&id, request).await,
            Target::Singleton(provider) => provider.read_instance(request).await,
            Target::Collection(_) => Err(collection_target(&request.resource_path, "read")),
        }
    }

    pub async fn update(&self, request: UpdateRequest) -> ResourceResult<ResourceResponse> {
        match self.resolve(&request.resource_path)? {
            Target::Instance(provider, id) => provider.update_instance(&id, request).await,
            Target::Singleton(provider) => provider.update_instance(request).await,
            Target::Collection(_) => Err(collection_target(&request.resource_path, "updated")),
        }
    }

    pub async fn patch(&self, request: PatchRequest) -> ResourceResult<ResourceResponse> {
        match self.resolve(&request.resource_path)? {
            Target::Instance(provider, id) => provider.patch_instance(&id, request).await,
            Target::Singleton(provider) => provider.patch_instance(request).await,
            Target::Collection(_) => Err(collection_target(&request.resource_path, "patched")),
        }
    }

    pub async fn delete(&self, request: DeleteRequest) -> ResourceResult<ResourceResponse> {
        match self.resolve(&request.resource_path)? {
            Target::Instance(provider, id) => provider.delete_instance(&id, request).await,
            Target::Singleton(_) => Err(ResourceError::not_supported()),
            Target::Collection(_) => Err(collection_target(&request.resource_path, "deleted")),
        }
    }

    pub async fn action(&self, request: ActionRequest) -> ResourceResult<ActionResponse> {
        match self.resolve(&request.resource_path)? {
            Target::Collection(provider) => provider.action_collection(request).await,
            Target::Instance(provider, id) => provider.action_instance(&id, request).await,
            Target::Singleton(provider) => provider.action_instance(request).await,
        }
    }

    pub async fn query(&self, request: QueryRequest) -> ResourceResult<QueryResponse> {
        match self.resolve(&request.resource_path)? {
            Target::Collection(provider) => provider.query_collection(request).await,
            Target::Instance(..) => Err(ResourceError::bad_request(format!(
                "'{}' is not a collection and cannot be queried",
                request.resource_path
            ))),
            Target::Singleton(_) => Err(ResourceError::not_supported()),
        }
    }
}

fn collection_target(path: &str, operation: &str) -> ResourceError {
    ResourceError::bad_request(format!(
        "'{}' is a collection; only instances can be {}",
        path, operation
    ))
}
