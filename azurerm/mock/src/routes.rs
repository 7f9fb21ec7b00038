use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Path, Request, State},
    http::{
        header::{AUTHORIZATION, LOCATION, RETRY_AFTER},
        HeaderName, Method, StatusCode, Uri,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::store::{
    is_resource_group_path, parent, path_kind, provider_namespace, resource_type, Operation,
    OperationKind, PathKind, RecordedRequest,
};
use crate::MockStateRef;

const AZURE_ASYNC_OPERATION: HeaderName = HeaderName::from_static("azure-asyncoperation");
const OPERATIONS_PATH: &str = "providers/Mock.Operations/operations";

pub fn router(state: MockStateRef) -> Router {
    let protected = Router::new()
        .route(
            &format!("/{OPERATIONS_PATH}/{{operation_id}}"),
            get(poll_operation),
        )
        .fallback(arm_request)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_bearer_token,
        ));

    Router::new()
        .route("/{tenant_id}/oauth2/v2.0/token", post(issue_token))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub(crate) fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    let body = json!({ "error": { "code": code, "message": message.into() } });
    (status, Json(body)).into_response()
}

#[derive(Debug, Deserialize)]
struct TokenRequest {
    grant_type: String,
    client_id: String,
    client_secret: String,
    #[serde(default)]
    scope: Option<String>,
}

async fn issue_token(
    State(state): State<MockStateRef>,
    Path(tenant_id): Path<String>,
    Form(request): Form<TokenRequest>,
) -> Response {
    if request.grant_type != "client_credentials" {
        return error_response(
            StatusCode::BAD_REQUEST,
            "unsupported_grant_type",
            format!("grant type {} is not supported", request.grant_type),
        );
    }

    if let Some(expected) = &state.options.client_secret {
        if *expected != request.client_secret {
            warn!(%tenant_id, client_id = %request.client_id, "rejecting client secret");
            return error_response(
                StatusCode::UNAUTHORIZED,
                "invalid_client",
                "AADSTS7000215: Invalid client secret provided.",
            );
        }
    }

    debug!(%tenant_id, client_id = %request.client_id, scope = ?request.scope, "issuing token");
    Json(json!({
        "token_type": "Bearer",
        "expires_in": "3599",
        "access_token": state.options.token,
    }))
    .into_response()
}

async fn require_bearer_token(State(state): State<MockStateRef>, request: Request, next: Next) -> Response {
    state.store().requests.push(RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        query: request.uri().query().map(str::to_string),
    });

    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match token {
        Some(token) if token == state.options.token => next.run(request).await,
        _ => {
            warn!(path = %request.uri().path(), "rejecting request without a valid bearer token");
            error_response(
                StatusCode::UNAUTHORIZED,
                "AuthenticationFailed",
                "Authentication failed. The 'Authorization' header is missing or invalid.",
            )
        }
    }
}

async fn poll_operation(State(state): State<MockStateRef>, Path(operation_id): Path<String>) -> Response {
    let mut store = state.store();
    let Some(operation) = store.operations.get_mut(&operation_id) else {
        return error_response(
            StatusCode::NOT_FOUND,
            "OperationNotFound",
            format!("operation {operation_id} does not exist"),
        );
    };

    let retry_after = [(RETRY_AFTER, "0".to_string())];

    if operation.remaining_polls > 0 {
        operation.remaining_polls -= 1;
        return match operation.kind {
            OperationKind::AsyncOperation => {
                (StatusCode::OK, retry_after, Json(json!({ "status": "InProgress" }))).into_response()
            }
            OperationKind::Location => {
                let location = state.operation_url(&operation_id);
                (
                    StatusCode::ACCEPTED,
                    [(RETRY_AFTER, "0".to_string()), (LOCATION, location)],
                )
                    .into_response()
            }
        };
    }

    match (operation.kind, &operation.failure) {
        (OperationKind::AsyncOperation, Some((code, message))) => Json(json!({
            "status": "Failed",
            "error": { "code": code, "message": message },
        }))
        .into_response(),
        (OperationKind::AsyncOperation, None) => Json(json!({ "status": "Succeeded" })).into_response(),
        (OperationKind::Location, Some((code, message))) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, code, message.clone())
        }
        (OperationKind::Location, None) => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn arm_request(State(state): State<MockStateRef>, method: Method, uri: Uri, body: Bytes) -> Response {
    let path = uri.path().to_string();
    let query: HashMap<String, String> = uri
        .query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();

    let Some(api_version) = query.get("api-version").cloned() else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "MissingApiVersionParameter",
            "The api-version query parameter (?api-version=) is required for all requests.",
        );
    };

    {
        let mut store = state.store();
        if store.throttle_remaining > 0 {
            store.throttle_remaining -= 1;
            let mut response = error_response(
                StatusCode::TOO_MANY_REQUESTS,
                "TooManyRequests",
                "The request is being throttled.",
            );
            response
                .headers_mut()
                .insert(RETRY_AFTER, axum::http::HeaderValue::from_static("0"));
            return response;
        }
    }

    if let Some((namespace, action)) = provider_namespace(&path) {
        return resource_provider(&state, method.as_str(), &namespace, action.as_deref());
    }

    match (method.as_str(), path_kind(&path)) {
        ("GET", PathKind::Collection) => list(&state, &path, &api_version, &query),
        ("GET", PathKind::Resource) => read(&state, &path),
        ("PUT", PathKind::Resource) => write(&state, &path, &body),
        ("PATCH", PathKind::Resource) => patch(&state, &path, &body),
        ("DELETE", PathKind::Resource) => delete(&state, &path),
        _ => error_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "MethodNotAllowed",
            format!("{method} is not supported on {path}"),
        ),
    }
}

fn resource_provider(state: &MockStateRef, method: &str, namespace: &str, action: Option<&str>) -> Response {
    let mut store = state.store();
    match (method, action) {
        ("GET", None) => {}
        ("POST", Some("register")) => {
            debug!(%namespace, "registering resource provider");
            store.register(namespace);
        }
        _ => {
            return error_response(
                StatusCode::METHOD_NOT_ALLOWED,
                "MethodNotAllowed",
                format!("{method} is not supported on resource provider {namespace}"),
            )
        }
    }

    let registration_state = if store.is_registered(namespace) {
        "Registered"
    } else {
        "NotRegistered"
    };
    Json(json!({
        "namespace": namespace,
        "registrationState": registration_state,
    }))
    .into_response()
}

fn not_found(path: &str) -> Response {
    let name = path.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
    if is_resource_group_path(path) {
        error_response(
            StatusCode::NOT_FOUND,
            "ResourceGroupNotFound",
            format!("Resource group '{name}' could not be found."),
        )
    } else {
        error_response(
            StatusCode::NOT_FOUND,
            "ResourceNotFound",
            format!("The Resource '{}/{name}' was not found.", resource_type(path)),
        )
    }
}

fn decode_body(body: &Bytes) -> Result<Value, Response> {
    if body.is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_slice(body).map_err(|e| {
        error_response(
            StatusCode::BAD_REQUEST,
            "InvalidRequestContent",
            format!("The request content was invalid and could not be deserialized: {e}"),
        )
    })
}

fn read(state: &MockStateRef, path: &str) -> Response {
    match state.store().get(path) {
        Some(resource) => Json(resource.clone()).into_response(),
        None => not_found(path),
    }
}

fn write(state: &MockStateRef, path: &str, body: &Bytes) -> Response {
    let body = match decode_body(body) {
        Ok(body) => body,
        Err(response) => return response,
    };

    let mut store = state.store();
    if let Some(parent) = parent(path) {
        if !store.contains(&parent) {
            return if is_resource_group_path(&parent) {
                not_found(&parent)
            } else {
                error_response(
                    StatusCode::NOT_FOUND,
                    "ParentResourceNotFound",
                    format!("Can not perform requested operation on nested resource. Parent resource '{parent}' not found."),
                )
            };
        }
    }

    let (mut resource, created) = store.put(path, body);
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    if !state.options.long_running || is_resource_group_path(path) {
        return (status, Json(resource)).into_response();
    }

    let operation_id = uuid::Uuid::new_v4().to_string();
    let failure = store.next_failure.take();
    store.operations.insert(
        operation_id.clone(),
        Operation {
            kind: OperationKind::AsyncOperation,
            remaining_polls: state.options.polls_before_done,
            failure,
        },
    );

    let in_progress = if created { "Creating" } else { "Updating" };
    if let Some(properties) = resource.get_mut("properties").and_then(Value::as_object_mut) {
        properties.insert("provisioningState".to_string(), json!(in_progress));
    }

    (
        status,
        [
            (AZURE_ASYNC_OPERATION, state.operation_url(&operation_id)),
            (RETRY_AFTER, "0".to_string()),
        ],
        Json(resource),
    )
        .into_response()
}

fn patch(state: &MockStateRef, path: &str, body: &Bytes) -> Response {
    let body = match decode_body(body) {
        Ok(body) => body,
        Err(response) => return response,
    };

    match state.store().patch(path, body) {
        Some(resource) => Json(resource).into_response(),
        None => not_found(path),
    }
}

fn delete(state: &MockStateRef, path: &str) -> Response {
    let mut store = state.store();
    if !store.delete(path) {
        return StatusCode::NO_CONTENT.into_response();
    }

    if !state.options.long_running {
        return StatusCode::OK.into_response();
    }

    let operation_id = uuid::Uuid::new_v4().to_string();
    let failure = store.next_failure.take();
    store.operations.insert(
        operation_id.clone(),
        Operation {
            kind: OperationKind::Location,
            remaining_polls: state.options.polls_before_done,
            failure,
        },
    );

    (
        StatusCode::ACCEPTED,
        [
            (LOCATION, state.operation_url(&operation_id)),
            (RETRY_AFTER, "0".to_string()),
        ],
    )
        .into_response()
}

fn list(state: &MockStateRef, path: &str, api_version: &str, query: &HashMap<String, String>) -> Response {
    let items = state.store().children(path);
    let skip = query
        .get("$skiptoken")
        .and_then(|token| token.parse::<usize>().ok())
        .unwrap_or(0);
    let page_size = state.options.page_size.max(1);
    let end = (skip + page_size).min(items.len());
    let page = items.get(skip..end).unwrap_or_default().to_vec();

    let mut body = json!({ "value": page });
    if end < items.len() {
        body["nextLink"] = json!(state.page_url(path, api_version, Some(end)));
    } else if state.options.repeat_last_next_link {
        let current = if skip == 0 { None } else { Some(skip) };
        body["nextLink"] = json!(state.page_url(path, api_version, current));
    }

    Json(body).into_response()
}
