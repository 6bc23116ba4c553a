use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{ACCEPT, ALLOW, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use common_http_errors::{ApiError, ApiResult, ERROR_CODE_HEADER};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::app::AppState;
use crate::auth_handlers::{customer_auth_routes, employee_auth_routes};
use crate::customer_handlers::customer_routes;
use crate::employee_handlers::employee_routes;
use crate::inventory_handlers::inventory_routes;
use crate::issue_handlers::issue_routes;
use crate::menu_handlers::menu_routes;
use crate::metrics::{error_metrics_mw, ServiceMetrics};
use crate::purchase_handlers::purchase_routes;

async fn health() -> &'static str {
    "ok"
}

async fn metrics_endpoint(State(metrics): State<Arc<ServiceMetrics>>) -> ApiResult<Response> {
    metrics.render().map_err(ApiError::internal)
}

async fn unknown_route(method: Method, uri: Uri) -> ApiError {
    ApiError::not_found(format!("{method} {} does not exist", uri.path()))
        .with_location(["url"])
}

/// Axum answers a wrong method with a bare 405; give it the error envelope.
async fn method_not_allowed_envelope(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let resp = next.run(req).await;
    if resp.status() != StatusCode::METHOD_NOT_ALLOWED || resp.headers().contains_key(ERROR_CODE_HEADER) {
        return resp;
    }
    let allow = resp.headers().get(ALLOW).cloned();
    let mut rewritten =
        ApiError::method_not_allowed(format!("method {method} is not allowed on this route"))
            .into_response();
    if let Some(allow) = allow {
        rewritten.headers_mut().insert(ALLOW, allow);
    }
    rewritten
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        ))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([ACCEPT, AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
}

pub fn build_router(state: AppState) -> Router {
    let metrics = state.metrics.clone();
    let cors = cors_layer(&state.config.cors_allowed_origins);

    let api = Router::new()
        .nest("/auth/employee", employee_auth_routes())
        .nest("/auth/customer", customer_auth_routes())
        .nest("/account/employee", employee_routes())
        .nest("/account/customer", customer_routes())
        .nest("/restaurant/menu", menu_routes())
        .nest("/inventory/item", inventory_routes())
        .nest("/inventory/purchase", purchase_routes())
        .nest("/inventory/issue", issue_routes());

    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(metrics_endpoint))
        .nest("/api", api)
        .fallback(unknown_route)
        .with_state(state)
        .layer(middleware::from_fn(method_not_allowed_envelope))
        .layer(middleware::from_fn_with_state(metrics, error_metrics_mw))
        .layer(cors)
}
