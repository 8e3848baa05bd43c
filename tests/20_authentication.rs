mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use chrono::{Duration, Utc};
use serde_json::{json, Map};

#[tokio::test]
async fn valid_token_reaches_the_handler_with_the_user() -> Result<()> {
    let app = common::app()?;
    let token = common::bearer("ada-1", Utc::now())?;

    let res = common::send(
        &app,
        common::post_json("/Users/v1/create", json!({ "name": "Grace" }), Some(&token)),
    )
    .await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "OK");
    assert_eq!(res.body["data"]["created"], "Grace");
    assert_eq!(res.body["data"]["authentication"]["authorized"], true);
    assert_eq!(res.body["data"]["user"], serde_json::to_value(common::ada())?);
    Ok(())
}

#[tokio::test]
async fn expired_token_is_unauthorized() -> Result<()> {
    let app = common::app()?;
    let token = common::bearer("ada-1", Utc::now() - Duration::seconds(3601))?;

    let res = common::send(
        &app,
        common::post_json("/Users/v1/create", json!({ "name": "Grace" }), Some(&token)),
    )
    .await?;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["data"]["message"], "Unauthorized");
    Ok(())
}

#[tokio::test]
async fn short_lived_tokens_follow_configured_expiry() -> Result<()> {
    let mut settings = common::settings(false);
    settings.authentication_token.expires_in_secs = 30;
    let app = common::app_with(settings)?;

    let fresh = common::bearer("ada-1", Utc::now() - Duration::seconds(5))?;
    let stale = common::bearer("ada-1", Utc::now() - Duration::seconds(31))?;

    let res = common::send(&app, common::post_json("/Users/v1/create", json!({ "name": "a" }), Some(&fresh))).await?;
    assert_eq!(res.status, StatusCode::OK);

    let res = common::send(&app, common::post_json("/Users/v1/create", json!({ "name": "a" }), Some(&stale))).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn unknown_identity_is_unauthorized() -> Result<()> {
    let app = common::app()?;
    let token = common::bearer("eve-9", Utc::now())?;

    let res = common::send(
        &app,
        common::post_json("/Users/v1/create", json!({ "name": "Grace" }), Some(&token)),
    )
    .await?;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn malformed_headers_are_unauthorized() -> Result<()> {
    let app = common::app()?;

    let mut missing_time_stamp = Map::new();
    missing_time_stamp.insert("uniqueIdentifier".to_string(), json!("ada-1"));
    let missing_time_stamp = common::bearer_with(missing_time_stamp)?;

    for authorization in [
        "Basic YWRhOnNlY3JldA==".to_string(),
        "Bearer ".to_string(),
        "Bearer definitely-not-a-token".to_string(),
        missing_time_stamp,
    ] {
        let res = common::send(
            &app,
            common::post_json("/Users/v1/create", json!({ "name": "Grace" }), Some(&authorization)),
        )
        .await?;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED, "{}", authorization);
        assert_eq!(res.body["status"], "FAILED");
    }
    Ok(())
}

#[tokio::test]
async fn anonymous_routes_ignore_bad_tokens() -> Result<()> {
    let app = common::app()?;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/Orders/v2/list")
        .header(header::AUTHORIZATION, "Bearer garbage")
        .body(Body::empty())?;
    let res = common::send(&app, request).await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "OK");
    Ok(())
}

#[tokio::test]
async fn whoami_returns_the_resolved_identity() -> Result<()> {
    let app = common::app()?;
    let token = common::bearer("ada-1", Utc::now())?;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/Health/v1/whoami")
        .header(header::AUTHORIZATION, token)
        .header(header::ORIGIN, "https://shop.example.com:8443")
        .body(Body::empty())?;
    let res = common::send(&app, request).await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["user"]["uniqueIdentifier"], "ada-1");
    assert_eq!(res.body["data"]["domain"], "shop.example.com:8443");
    Ok(())
}
