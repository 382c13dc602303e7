use super::{ApiError, ApiResult};
use crate::config::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use selfservice_core::resource::{
    ActionRequest, CreateRequest, DeleteRequest, PatchOperation, PatchRequest, QueryFilter,
    QueryRequest, ReadRequest, Request, ResourceError, ResourceResponse,
    Response as ResourceReply, UpdateRequest,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

const ACTION_PARAM: &str = "_action";
const QUERY_FILTER_PARAM: &str = "_queryFilter";
const CREATE_ACTION: &str = "create";

/// List published workflows
pub async fn list_workflows(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ListWorkflowsResponse>> {
    let workflows = state
        .workflows
        .iter()
        .map(|(name, definition)| WorkflowSummary {
            name: name.clone(),
            stages: definition
                .stage_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        })
        .collect();

    Ok(Json(ListWorkflowsResponse { workflows }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListWorkflowsResponse {
    pub workflows: Vec<WorkflowSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub name: String,
    pub stages: Vec<String>,
}

/// Get the tagged stage configs of a workflow
pub async fn get_workflow(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<Value>> {
    let definition = state
        .workflows
        .get(&name)
        .ok_or_else(|| ApiError::not_found(format!("Workflow '{}' not found", name)))?;

    let stage_configs = definition.to_value(&state.registry)?;
    Ok(Json(json!({ "name": name, "stageConfigs": stage_configs })))
}

/// Map any other request onto the resource router
pub async fn dispatch(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    Query(params): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let request = build_request(&method, uri.path(), params, &headers, &body)?;
    let created = matches!(request, Request::Create(_));

    let reply = state.resources.handle(request).await?;
    Ok(render(reply, created))
}

fn build_request(
    method: &Method,
    path: &str,
    mut params: BTreeMap<String, String>,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Request, ResourceError> {
    let path = normalize_path(path);

    let request = match *method {
        Method::GET => match params.remove(QUERY_FILTER_PARAM) {
            Some(filter) => Request::Query(QueryRequest::new(path, filter.parse::<QueryFilter>()?)),
            None => Request::Read(ReadRequest::new(path)),
        },
        Method::POST => {
            let action = params.remove(ACTION_PARAM).ok_or_else(|| {
                ResourceError::bad_request(format!("Missing {} parameter", ACTION_PARAM))
            })?;

            if action == CREATE_ACTION {
                Request::Create(CreateRequest::new(path, None, parse_body(body)?))
            } else {
                let mut request = ActionRequest::new(path, action, parse_body(body)?);
                request.params = params;
                Request::Action(request)
            }
        }
        Method::PUT if header_value(headers, header::IF_NONE_MATCH).as_deref() == Some("*") => {
            let (container, id) = path.rsplit_once('/').ok_or_else(|| {
                ResourceError::bad_request(format!("'{}' does not name a resource", path))
            })?;
            Request::Create(CreateRequest::new(
                container,
                Some(id.to_string()),
                parse_body(body)?,
            ))
        }
        Method::PUT => {
            let mut request = UpdateRequest::new(path, parse_body(body)?);
            request.revision = header_value(headers, header::IF_MATCH);
            Request::Update(request)
        }
        Method::PATCH => {
            let operations: Vec<PatchOperation> = serde_json::from_slice(body)
                .map_err(|e| ResourceError::bad_request(format!("Invalid patch document: {}", e)))?;
            let mut request = PatchRequest::new(path, operations);
            request.revision = header_value(headers, header::IF_MATCH);
            Request::Patch(request)
        }
        Method::DELETE => {
            let mut request = DeleteRequest::new(path);
            request.revision = header_value(headers, header::IF_MATCH);
            Request::Delete(request)
        }
        _ => return Err(ResourceError::not_supported()),
    };

    Ok(request)
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn parse_body(body: &[u8]) -> Result<Value, ResourceError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }

    serde_json::from_slice(body)
        .map_err(|e| ResourceError::bad_request(format!("Invalid JSON content: {}", e)))
}

/// Header value with surrounding quotes removed, as sent in ETags
fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().trim_matches('"').to_string())
}

fn render(reply: ResourceReply, created: bool) -> Response {
    match reply {
        ResourceReply::Resource(resource) => render_resource(resource, created),
        ResourceReply::Action(action) => Json(action.content).into_response(),
        ResourceReply::Query(query) => {
            let count = query.len();
            let result: Vec<Value> = query
                .resources
                .into_iter()
                .map(|resource| resource.content)
                .collect();
            Json(json!({ "result": result, "resultCount": count })).into_response()
        }
    }
}

fn render_resource(resource: ResourceResponse, created: bool) -> Response {
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    let mut response = (status, Json(resource.content)).into_response();
    if let Some(etag) = resource
        .revision
        .and_then(|revision| HeaderValue::from_str(&format!("\"{}\"", revision)).ok())
    {
        response.headers_mut().insert(header::ETAG, etag);
    }

    response
}
