use axum::http::StatusCode;
use axum::response::IntoResponse;
use common_http_errors::{ApiError, ErrorBody, ErrorKind};
use http_body_util::BodyExt;

async fn body_of(resp: axum::response::Response) -> ErrorBody {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[test]
fn status_mapping_covers_every_kind() {
    let cases = [
        (ErrorKind::NotFound, StatusCode::NOT_FOUND),
        (ErrorKind::MethodNotAllowed, StatusCode::METHOD_NOT_ALLOWED),
        (ErrorKind::DuplicatedEntry, StatusCode::CONFLICT),
        (ErrorKind::Unauthorized, StatusCode::UNAUTHORIZED),
        (ErrorKind::Forbidden, StatusCode::FORBIDDEN),
        (ErrorKind::BadRequest, StatusCode::BAD_REQUEST),
        (ErrorKind::UnprocessableValue, StatusCode::UNPROCESSABLE_ENTITY),
        (ErrorKind::TooManyRequests, StatusCode::TOO_MANY_REQUESTS),
        (ErrorKind::OperationFailed, StatusCode::FAILED_DEPENDENCY),
        (ErrorKind::UnknownError, StatusCode::INTERNAL_SERVER_ERROR),
        (ErrorKind::InternalError, StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (kind, status) in cases {
        let resp = ApiError::new(kind, "x").into_response();
        assert_eq!(resp.status(), status, "{kind:?}");
        assert_eq!(resp.headers().get("X-Error-Code").unwrap(), kind.code());
    }
}

#[tokio::test]
async fn unauthorized_envelope_points_at_cookie() {
    let err = ApiError::unauthorized("you don't have the required role")
        .with_location(["cookies", "access_token"]);
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body = body_of(resp).await;
    assert!(!body.success);
    assert_eq!(body.errors.len(), 1);
    assert_eq!(body.errors[0].error_type, "unauthorized");
    assert_eq!(
        serde_json::to_value(&body.errors[0].location).unwrap(),
        serde_json::json!(["cookies", "access_token"])
    );
}

#[tokio::test]
async fn operation_failed_is_424() {
    let resp = ApiError::operation_failed("problem while updating item").into_response();
    assert_eq!(resp.status().as_u16(), 424);
    let body = body_of(resp).await;
    assert_eq!(body.errors[0].error_type, "operation failed");
    assert!(body.errors[0].location.is_empty());
}
