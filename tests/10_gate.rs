mod common;

use std::time::Duration;

use anyhow::Result;
use reqwest::{header, StatusCode};
use serde_json::Value;

use common::{spawn_app, spawn_app_with, test_config, ADMIN_UID, MEMBER_UID};

#[tokio::test]
async fn dashboard_renders_for_signed_in_member() -> Result<()> {
    let app = spawn_app().await?;

    let res = app
        .client
        .get(app.url("/dashboard"))
        .bearer_auth(app.token_for(MEMBER_UID))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Morgan Member");
    assert_eq!(body["data"]["balance"], 1250.0);
    Ok(())
}

#[tokio::test]
async fn session_cookie_is_accepted() -> Result<()> {
    let app = spawn_app().await?;

    let res = app
        .client
        .get(app.url("/api/me"))
        .header(header::COOKIE, format!("theme=dark; session={}", app.token_for(MEMBER_UID)))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["uid"], MEMBER_UID);
    Ok(())
}

#[tokio::test]
async fn anonymous_page_request_redirects_to_fallback() -> Result<()> {
    let app = spawn_app().await?;

    let res = app.client.get(app.url("/dashboard")).send().await?;

    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers()[header::LOCATION], "/");
    // No token means no lookup at all
    assert_eq!(app.identity.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn anonymous_api_request_is_unauthorized() -> Result<()> {
    let app = spawn_app().await?;

    let res = app.client.get(app.url("/api/me")).send().await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await?;
    assert_eq!(body["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn forged_token_is_treated_as_anonymous() -> Result<()> {
    let app = spawn_app().await?;
    let forged = copytrade_portal::auth::TokenVerifier::new("some-other-secret", 1).issue(ADMIN_UID, true)?;

    let res = app.client.get(app.url("/admin")).bearer_auth(forged).send().await?;

    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.identity.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn admin_view_requires_admin_record() -> Result<()> {
    let app = spawn_app().await?;

    let member = app
        .client
        .get(app.url("/admin"))
        .bearer_auth(app.token_for(MEMBER_UID))
        .send()
        .await?;
    assert_eq!(member.status(), StatusCode::SEE_OTHER);
    assert_eq!(member.headers()[header::LOCATION], "/");

    let admin = app
        .client
        .get(app.url("/admin"))
        .bearer_auth(app.token_for(ADMIN_UID))
        .send()
        .await?;
    assert_eq!(admin.status(), StatusCode::OK);
    let body: Value = admin.json().await?;
    assert_eq!(body["data"]["viewer"], ADMIN_UID);
    assert_eq!(body["data"]["totalUsers"], 2);
    assert_eq!(body["data"]["adminCount"], 1);
    Ok(())
}

#[tokio::test]
async fn admin_hint_in_token_does_not_grant_access() -> Result<()> {
    let app = spawn_app().await?;
    let token = app.verifier.issue(MEMBER_UID, true)?;

    let res = app.client.get(app.url("/admin")).bearer_auth(token).send().await?;

    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    Ok(())
}

#[tokio::test]
async fn unavailable_store_keeps_gate_loading() -> Result<()> {
    let app = spawn_app().await?;
    app.identity.set_unavailable(true);

    let res = app
        .client
        .get(app.url("/dashboard"))
        .bearer_auth(app.token_for(MEMBER_UID))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.headers()[header::RETRY_AFTER], "1");
    let body: Value = res.json().await?;
    assert_eq!(body["status"], "resolving");
    assert!(body.get("data").is_none());
    Ok(())
}

#[tokio::test]
async fn slow_store_times_out_to_denied() -> Result<()> {
    let mut config = test_config();
    config.session.gate_timeout_ms = 50;
    let app = spawn_app_with(config).await?;
    app.identity.set_latency(Duration::from_millis(500));

    let page = app
        .client
        .get(app.url("/dashboard"))
        .bearer_auth(app.token_for(MEMBER_UID))
        .send()
        .await?;
    assert_eq!(page.status(), StatusCode::SEE_OTHER);

    let api = app
        .client
        .get(app.url("/api/me"))
        .bearer_auth(app.token_for(MEMBER_UID))
        .send()
        .await?;
    assert_eq!(api.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn shutdown_leaves_gate_loading() -> Result<()> {
    let app = spawn_app().await?;
    app.identity.set_latency(Duration::from_millis(300));

    let request = app
        .client
        .get(app.url("/dashboard"))
        .bearer_auth(app.token_for(MEMBER_UID))
        .send();
    let cancel = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        app.shutdown.cancel();
    };

    let (res, ()) = tokio::join!(request, cancel);
    assert_eq!(res?.status(), StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

#[tokio::test]
async fn public_routes_need_no_session() -> Result<()> {
    let app = spawn_app().await?;

    let root = app.client.get(app.url("/")).send().await?;
    assert_eq!(root.status(), StatusCode::OK);

    let health = app.client.get(app.url("/health")).send().await?;
    assert_eq!(health.status(), StatusCode::OK);

    app.identity.set_unavailable(true);
    let degraded = app.client.get(app.url("/health")).send().await?;
    assert_eq!(degraded.status(), StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}
