use super::*;
use crate::{
    auth::{Claims, Role},
    store::memory::MemoryStore,
};
use anyhow::Result;
use axum::http::{header, HeaderMap, Method, StatusCode};
use jsonwebtoken::{decode, DecodingKey, Validation};
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "router-test-secret";

fn app_with(store: &MemoryStore) -> Router {
    let config = AuthConfig::new(SecretString::from(SECRET.to_string())).with_hash_cost(4);
    router(Arc::new(AuthState::new(&config, Arc::new(store.clone()))))
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Reply {
    fn json(&self) -> Result<Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    fn token(&self) -> Result<String> {
        self.json()?["accessToken"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("no accessToken in {:?}", self.json()))
    }
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<Reply> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await?
        .to_vec();
    Ok(Reply {
        status,
        headers,
        body,
    })
}

async fn post(app: &Router, uri: &str, token: Option<&str>, body: Value) -> Result<Reply> {
    call(app, Method::POST, uri, token, Some(body)).await
}

fn claims(token: &str) -> Result<Claims> {
    let mut validation = Validation::default();
    validation.validate_exp = false;
    Ok(decode::<Claims>(
        token,
        &DecodingKey::from_secret(SECRET.as_bytes()),
        &validation,
    )?
    .claims)
}

fn org_contract(email: &str) -> Value {
    json!({
        "organizationName": "Shibuya Dog Run",
        "contactEmail": email,
        "phoneNumber": "03-1234-5678",
        "address": "Shibuya, Tokyo",
        "password": "Secr3t!"
    })
}

#[tokio::test]
async fn signup_revoke_replay() -> Result<()> {
    let store = MemoryStore::new();
    let app = app_with(&store);

    let signup = post(
        &app,
        "/dogowner/signUp",
        None,
        json!({"password": "Secr3t!", "dogOwnerName": "Coco", "email": "a@x.com"}),
    )
    .await?;
    assert_eq!(signup.status, StatusCode::CREATED);
    let token = signup.token()?;
    assert_eq!(claims(&token)?.role, Role::PetOwner.code());

    let revoke = call(&app, Method::POST, "/auth/dogowner/revoke", Some(token.as_str()), None).await?;
    assert_eq!(revoke.status, StatusCode::OK);
    assert!(revoke.body.is_empty());

    let replay = call(&app, Method::GET, "/auth/session", Some(token.as_str()), None).await?;
    assert_eq!(replay.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        replay.json()?,
        json!({"code": "1-1", "message": "session revoked"})
    );

    let replay = call(&app, Method::POST, "/auth/dogowner/revoke", Some(token.as_str()), None).await?;
    assert_eq!(replay.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn session_describes_the_caller() -> Result<()> {
    let store = MemoryStore::new();
    let app = app_with(&store);
    let token = post(&app, "/org/contract", None, org_contract("org@x.com"))
        .await?
        .token()?;

    let reply = call(&app, Method::GET, "/auth/session", Some(token.as_str()), None).await?;

    assert_eq!(reply.status, StatusCode::OK);
    let body = reply.json()?;
    assert_eq!(body["role"], json!(Role::FacilityManagerAdmin.code()));
    assert_eq!(body["accountKind"], json!("facility_manager"));
    assert_eq!(body["subjectId"], json!(claims(&token)?.sub.parse::<i64>()?));
    Ok(())
}

#[tokio::test]
async fn login_rotates_the_session() -> Result<()> {
    let store = MemoryStore::new();
    let app = app_with(&store);
    let signup_token = post(
        &app,
        "/dogowner/signUp",
        None,
        json!({"password": "Secr3t!", "dogOwnerName": "Coco", "phoneNumber": "090-1234-5678"}),
    )
    .await?
    .token()?;

    let login = json!({"password": "Secr3t!", "phoneNumber": "090-1234-5678"});
    let first = post(&app, "/auth/dogowner/token", None, login.clone()).await?;
    assert_eq!(first.status, StatusCode::OK);
    let first = first.token()?;
    let second = post(&app, "/auth/dogowner/token", None, login)
        .await?
        .token()?;

    for stale in [&signup_token, &first] {
        let reply = call(&app, Method::GET, "/auth/session", Some(stale.as_str()), None).await?;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    }
    let reply = call(&app, Method::GET, "/auth/session", Some(second.as_str()), None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn bad_credentials_share_one_message() -> Result<()> {
    let store = MemoryStore::new();
    let app = app_with(&store);
    post(&app, "/org/contract", None, org_contract("org@x.com")).await?;

    let wrong_password = post(
        &app,
        "/auth/dogrunmg/token",
        None,
        json!({"email": "org@x.com", "password": "nope"}),
    )
    .await?;
    let unknown = post(
        &app,
        "/auth/dogrunmg/token",
        None,
        json!({"email": "who@x.com", "password": "Secr3t!"}),
    )
    .await?;

    for reply in [&wrong_password, &unknown] {
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            reply.json()?,
            json!({"code": "1-1", "message": "invalid credentials"})
        );
    }
    Ok(())
}

#[tokio::test]
async fn protected_route_requires_a_token() -> Result<()> {
    let app = app_with(&MemoryStore::new());
    let reply = call(&app, Method::GET, "/auth/session", None, None).await?;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.json()?["message"], json!("missing bearer token"));
    Ok(())
}

#[tokio::test]
async fn expired_token_is_rejected_without_session_lookup() -> Result<()> {
    let store = MemoryStore::new();
    let app = app_with(&store);
    let token = post(&app, "/org/contract", None, org_contract("org@x.com"))
        .await?
        .token()?;
    let mut expired = claims(&token)?;
    expired.exp = jsonwebtoken::get_current_timestamp() - 10;
    let expired = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &expired,
        &jsonwebtoken::EncodingKey::from_secret(SECRET.as_bytes()),
    )?;

    let reply = call(&app, Method::GET, "/auth/session", Some(expired.as_str()), None).await?;

    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.json()?["message"], json!("token expired"));
    assert_eq!(store.session_lookups(), 0);
    Ok(())
}

#[tokio::test]
async fn roles_outside_the_allow_list_are_forbidden() -> Result<()> {
    let store = MemoryStore::new();
    let app = app_with(&store);
    let owner = post(
        &app,
        "/dogowner/signUp",
        None,
        json!({"password": "Secr3t!", "dogOwnerName": "Coco", "email": "a@x.com"}),
    )
    .await?
    .token()?;
    let admin = post(&app, "/org/contract", None, org_contract("org@x.com"))
        .await?
        .token()?;

    let reply = call(&app, Method::POST, "/auth/dogrunmg/revoke", Some(owner.as_str()), None).await?;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.json()?["code"], json!("1-1"));

    let reply = call(&app, Method::POST, "/auth/dogowner/revoke", Some(admin.as_str()), None).await?;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let manager = json!({"password": "Secr3t!", "dogrunmgName": "Rex", "email": "rex@x.com"});
    let reply = post(&app, "/dogrunmg/signUp", Some(owner.as_str()), manager).await?;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn admin_adds_a_manager_who_cannot_add_more() -> Result<()> {
    let store = MemoryStore::new();
    let app = app_with(&store);
    let admin = post(&app, "/org/contract", None, org_contract("org@x.com"))
        .await?
        .token()?;

    let created = post(
        &app,
        "/dogrunmg/signUp",
        Some(admin.as_str()),
        json!({"password": "Secr3t!", "dogrunmgName": "Rex", "email": "rex@x.com"}),
    )
    .await?;
    assert_eq!(created.status, StatusCode::CREATED);
    let manager = created.token()?;
    assert_eq!(claims(&manager)?.role, Role::FacilityManager.code());

    let reply = post(
        &app,
        "/dogrunmg/signUp",
        Some(manager.as_str()),
        json!({"password": "Secr3t!", "dogrunmgName": "Max", "email": "max@x.com"}),
    )
    .await?;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = call(&app, Method::POST, "/auth/dogrunmg/revoke", Some(manager.as_str()), None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(store.row_counts().facility_managers, 2);
    Ok(())
}

#[tokio::test]
async fn signup_errors_carry_the_service_code() -> Result<()> {
    let store = MemoryStore::new();
    let app = app_with(&store);

    let both = post(
        &app,
        "/dogowner/signUp",
        None,
        json!({
            "password": "Secr3t!",
            "dogOwnerName": "Coco",
            "email": "a@x.com",
            "phoneNumber": "090-1234-5678"
        }),
    )
    .await?;
    assert_eq!(both.status, StatusCode::BAD_REQUEST);
    assert_eq!(both.json()?["code"], json!("3-1"));
    assert_eq!(store.row_counts().total(), 0);

    post(&app, "/org/contract", None, org_contract("org@x.com")).await?;
    let duplicate = post(&app, "/org/contract", None, org_contract("org@x.com")).await?;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.json()?["code"], json!("6-1"));
    Ok(())
}

#[tokio::test]
async fn unreadable_body_is_bad_request() -> Result<()> {
    let app = app_with(&MemoryStore::new());
    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/dogowner/token")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))?;

    let response = app.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn failed_provisioning_is_a_server_error_with_trace() -> Result<()> {
    let store = MemoryStore::new();
    store.fail_credential_insert();
    let app = app_with(&store);

    let reply = post(&app, "/org/contract", None, org_contract("org@x.com")).await?;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = reply.json()?;
    assert_eq!(body["code"], json!("6-2"));
    assert!(body["trace"].is_string());
    assert_eq!(store.row_counts().total(), 0);
    Ok(())
}

#[tokio::test]
async fn health_is_public_and_reports_the_database() -> Result<()> {
    let store = MemoryStore::new();
    let app = app_with(&store);

    let reply = call(&app, Method::GET, "/health", None, None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()?["database"], json!("ok"));
    assert!(reply.headers.contains_key("x-app"));
    assert!(reply.headers.contains_key("x-request-id"));

    store.fail_ping();
    let reply = call(&app, Method::GET, "/health", None, None).await?;
    assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(reply.json()?["database"], json!("error"));
    Ok(())
}

#[tokio::test]
async fn openapi_document_is_served_without_auth() -> Result<()> {
    let app = app_with(&MemoryStore::new());
    let reply = call(&app, Method::GET, "/api-docs/openapi.json", None, None).await?;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.json()?["paths"]["/auth/session"].is_object());
    Ok(())
}
