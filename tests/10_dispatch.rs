mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;

#[tokio::test]
async fn anonymous_route_matches_case_insensitively() -> Result<()> {
    let app = common::app()?;

    let res = common::send(&app, common::get("/orders/V2/LIST?limit=5")).await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "OK");
    assert_eq!(res.body["data"]["orders"], json!([{ "id": 1 }, { "id": 2 }]));
    assert_eq!(res.body["data"]["limit"], "5");
    Ok(())
}

#[tokio::test]
async fn protected_route_without_header_is_unauthorized() -> Result<()> {
    let app = common::app()?;

    let res = common::send(&app, common::post_json("/Users/v1/create", json!({ "name": "Grace" }), None)).await?;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["status"], "FAILED");
    assert_eq!(res.body["data"], json!({ "error": true, "message": "Unauthorized" }));
    Ok(())
}

#[tokio::test]
async fn unregistered_paths_are_not_found() -> Result<()> {
    let app = common::app()?;

    for uri in ["/", "/Orders/v1/list", "/Orders/v2/list/", "/favicon.ico"] {
        let res = common::send(&app, common::get(uri)).await?;
        assert_eq!(res.status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(res.body["status"], "FAILED");
        assert_eq!(res.body["data"]["message"], "Not Found");
    }
    Ok(())
}

#[tokio::test]
async fn verb_must_match_the_declaration() -> Result<()> {
    let app = common::app()?;

    let res = common::send(&app, common::post_json("/Orders/v2/list", json!({}), None)).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let delete = Request::builder()
        .method(Method::DELETE)
        .uri("/Orders/v2/list")
        .body(Body::empty())?;
    let res = common::send(&app, delete).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn invalid_json_body_is_a_bad_request() -> Result<()> {
    let app = common::app()?;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/Users/v1/create")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\":"))?;
    let res = common::send(&app, request).await?;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["data"], json!({ "error": true, "message": "Bad Request" }));
    Ok(())
}

#[tokio::test]
async fn handler_failure_is_reported_inside_a_200() -> Result<()> {
    let app = common::app()?;

    let res = common::send(&app, common::get("/Orders/v2/explode")).await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "FAILED");
    assert_eq!(res.body["data"], json!({ "error": true, "message": "Internal Server Error" }));
    Ok(())
}

#[tokio::test]
async fn debug_mode_reports_the_failing_endpoint() -> Result<()> {
    let app = common::app_with(common::settings(true))?;

    let res = common::send(&app, common::get("/Orders/v2/explode?token=abc")).await?;

    let message = &res.body["data"]["message"];
    assert_eq!(message["error"], "Data access failed: connection reset");
    assert_eq!(message["endpoint"]["serviceName"], "OrdersV2");
    assert_eq!(message["endpoint"]["methodName"], "explode");
    assert_eq!(message["args"]["token"], "abc");
    assert_eq!(message["args"]["context"]["response"], "[...]");
    Ok(())
}

#[tokio::test]
async fn health_status_is_public() -> Result<()> {
    let app = common::app()?;

    let res = common::send(&app, common::get("/Health/v1/status")).await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["name"], "api-host");
    assert_eq!(res.body["data"]["environment"], "Test");
    Ok(())
}

#[tokio::test]
async fn cors_preflight_is_answered() -> Result<()> {
    let app = common::app()?;

    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri("/Orders/v2/list")
        .header(header::ORIGIN, "https://shop.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())?;
    let response = tower::ServiceExt::oneshot(app.router(), preflight).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    Ok(())
}
