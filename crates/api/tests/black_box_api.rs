use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

use bizdesk_api::app::services::AppServices;
use bizdesk_auth::{Hs256JwtValidator, JwtClaims, Role};
use bizdesk_core::{CompanyId, UserId};
use bizdesk_infra::directory::Member;

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over an in-memory store, bound to an ephemeral port.
        let services = Arc::new(AppServices::in_memory());
        let jwt = Arc::new(Hs256JwtValidator::new(JWT_SECRET));
        let app = bizdesk_api::app::router_with(services.clone(), jwt);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            handle,
        }
    }

    /// Register a company member and mint a token for them.
    async fn member(&self, company_id: CompanyId, name: &str, role: Role) -> (UserId, String) {
        let user_id = UserId::new();
        self.services
            .directory()
            .register_member(
                company_id,
                &Member {
                    user_id,
                    display_name: name.to_string(),
                    role: role.clone(),
                },
            )
            .await
            .unwrap();
        (user_id, mint_jwt(user_id, company_id, name, vec![role]))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(user_id: UserId, company_id: CompanyId, name: &str, roles: Vec<Role>) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: user_id,
        company_id,
        name: name.to_string(),
        roles,
        issued_at: now - ChronoDuration::seconds(5),
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn create_laptop(
    client: &reqwest::Client,
    srv: &TestServer,
    token: &str,
    assign_to: &[UserId],
) -> serde_json::Value {
    let res = client
        .post(srv.url("/inventory/items"))
        .bearer_auth(token)
        .json(&json!({
            "name": "MacBook Pro",
            "category": "electronics",
            "attributes": { "serial_number": "C02XYZ", "brand": "Apple" },
            "purchase_price": 249900,
            "assign_to": assign_to.iter().map(|u| u.to_string()).collect::<Vec<_>>(),
            "assignment_note": "onboarding",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/inventory/items"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn actor_is_derived_from_token() {
    let srv = TestServer::spawn().await;
    let company = CompanyId::new();
    let (user_id, token) = srv.member(company, "Alex Admin", Role::ADMIN).await;

    let res = reqwest::Client::new()
        .get(srv.url("/whoami"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["user_id"].as_str().unwrap(), user_id.to_string());
    assert_eq!(body["company_id"].as_str().unwrap(), company.to_string());
    assert!(body["roles"].as_array().unwrap().iter().any(|r| r == "admin"));
}

#[tokio::test]
async fn inventory_lifecycle_create_assign_return() {
    let srv = TestServer::spawn().await;
    let company = CompanyId::new();
    let (_, admin) = srv.member(company, "Alex Admin", Role::ADMIN).await;
    let (dana_id, dana) = srv.member(company, "Dana", Role::EMPLOYEE).await;
    let client = reqwest::Client::new();

    // Create + hand out in one go
    let created = create_laptop(&client, &srv, &admin, &[dana_id]).await;
    assert_eq!(created["item"]["status"], "assigned");
    let item_id = created["item"]["id"].as_str().unwrap().to_string();
    let assignment_id = created["assignments"][0]["id"].as_str().unwrap().to_string();
    assert_eq!(created["assignments"][0]["assigned_to"]["display_name"], "Dana");

    // Dana sees it under "mine"
    let res = client
        .get(srv.url("/inventory/assignments/mine"))
        .bearer_auth(&dana)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let mine: serde_json::Value = res.json().await.unwrap();
    assert_eq!(mine["count"], 1);

    // Return
    let res = client
        .post(srv.url(&format!("/inventory/assignments/{assignment_id}/return")))
        .bearer_auth(&admin)
        .json(&json!({ "item_id": item_id, "return_note": "screen ok" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let returned: serde_json::Value = res.json().await.unwrap();
    assert_eq!(returned["assignment"]["status"], "returned");
    assert_eq!(returned["item"]["status"], "available");

    // Returning again conflicts
    let res = client
        .post(srv.url(&format!("/inventory/assignments/{assignment_id}/return")))
        .bearer_auth(&admin)
        .json(&json!({ "item_id": item_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // History keeps the returned record; "mine" hides it unless asked
    let res = client
        .get(srv.url(&format!("/inventory/items/{item_id}/assignments")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let history: serde_json::Value = res.json().await.unwrap();
    assert_eq!(history["count"], 1);

    let res = client
        .get(srv.url("/inventory/assignments/mine?include_returned=true"))
        .bearer_auth(&dana)
        .send()
        .await
        .unwrap();
    let all: serde_json::Value = res.json().await.unwrap();
    assert_eq!(all["count"], 1);
    assert_eq!(all["assignments"][0]["return_notes"], "screen ok");
}

#[tokio::test]
async fn update_and_filter_items() {
    let srv = TestServer::spawn().await;
    let company = CompanyId::new();
    let (_, manager) = srv.member(company, "Morgan", Role::MANAGER).await;
    let client = reqwest::Client::new();

    let created = create_laptop(&client, &srv, &manager, &[]).await;
    let item_id = created["item"]["id"].as_str().unwrap().to_string();

    let res = client
        .patch(srv.url(&format!("/inventory/items/{item_id}")))
        .bearer_auth(&manager)
        .json(&json!({ "status": "maintenance", "purchase_price": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: serde_json::Value = res.json().await.unwrap();
    assert_eq!(updated["status"], "maintenance");
    assert!(updated["purchase_price"].is_null());

    let res = client
        .patch(srv.url(&format!("/inventory/items/{item_id}")))
        .bearer_auth(&manager)
        .json(&json!({ "status": "assigned" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(srv.url("/inventory/items?status=maintenance&category=electronics"))
        .bearer_auth(&manager)
        .send()
        .await
        .unwrap();
    let listed: serde_json::Value = res.json().await.unwrap();
    assert_eq!(listed["count"], 1);

    let res = client
        .get(srv.url("/inventory/items?status=lost"))
        .bearer_auth(&manager)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(srv.url("/inventory/summary"))
        .bearer_auth(&manager)
        .send()
        .await
        .unwrap();
    let summary: serde_json::Value = res.json().await.unwrap();
    assert_eq!(summary["total_items"], 1);
    assert_eq!(summary["maintenance"], 1);
}

#[tokio::test]
async fn employees_cannot_write_or_assign() {
    let srv = TestServer::spawn().await;
    let company = CompanyId::new();
    let (_, admin) = srv.member(company, "Alex Admin", Role::ADMIN).await;
    let (dana_id, dana) = srv.member(company, "Dana", Role::EMPLOYEE).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/inventory/items"))
        .bearer_auth(&dana)
        .json(&json!({ "name": "Chair", "category": "furniture" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let created = create_laptop(&client, &srv, &admin, &[]).await;
    let item_id = created["item"]["id"].as_str().unwrap().to_string();

    let res = client
        .post(srv.url(&format!("/inventory/items/{item_id}/assign")))
        .bearer_auth(&dana)
        .json(&json!({ "user_id": dana_id.to_string() }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Reads are fine
    let res = client
        .get(srv.url(&format!("/inventory/items/{item_id}")))
        .bearer_auth(&dana)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url("/members"))
        .bearer_auth(&dana)
        .send()
        .await
        .unwrap();
    let members: serde_json::Value = res.json().await.unwrap();
    assert_eq!(members["count"], 2);
}

#[tokio::test]
async fn assigning_outsiders_and_bad_ids_are_rejected() {
    let srv = TestServer::spawn().await;
    let company = CompanyId::new();
    let (_, admin) = srv.member(company, "Alex Admin", Role::ADMIN).await;
    let client = reqwest::Client::new();

    let created = create_laptop(&client, &srv, &admin, &[]).await;
    let item_id = created["item"]["id"].as_str().unwrap().to_string();

    let res = client
        .post(srv.url(&format!("/inventory/items/{item_id}/assign")))
        .bearer_auth(&admin)
        .json(&json!({ "user_id": UserId::new().to_string() }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(srv.url("/inventory/items/not-a-uuid"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn company_isolation_blocks_cross_company_reads_and_writes() {
    let srv = TestServer::spawn().await;
    let (_, token1) = srv.member(CompanyId::new(), "Ann", Role::ADMIN).await;
    let (_, token2) = srv.member(CompanyId::new(), "Ben", Role::ADMIN).await;
    let client = reqwest::Client::new();

    let created = create_laptop(&client, &srv, &token1, &[]).await;
    let item_id = created["item"]["id"].as_str().unwrap().to_string();

    let res = client
        .get(srv.url(&format!("/inventory/items/{item_id}")))
        .bearer_auth(&token2)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .delete(srv.url(&format!("/inventory/items/{item_id}")))
        .bearer_auth(&token2)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(srv.url("/inventory/items"))
        .bearer_auth(&token2)
        .send()
        .await
        .unwrap();
    let listed: serde_json::Value = res.json().await.unwrap();
    assert_eq!(listed["count"], 0);
}
