mod common;

use common::MemoryRepository;
use grievance_portal::{AppConfig, models::Role, repository::RepositoryState};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct TestApp {
    pub address: String,
    pub repo: Arc<MemoryRepository>,
}

async fn spawn_app() -> TestApp {
    let repo = MemoryRepository::new();
    let state = common::create_app_state(repo.clone() as RepositoryState, AppConfig::default());
    let router = grievance_portal::create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address, repo }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");

    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "OK");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let generated = client.get(&app.address).send().await.unwrap();
    assert!(generated.headers().contains_key("x-request-id"));

    let supplied = client
        .get(&app.address)
        .header("x-request-id", "trace-me-123")
        .send()
        .await
        .unwrap();
    assert_eq!(supplied.headers()["x-request-id"], "trace-me-123");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app().await;
    let response = reqwest::get(format!("{}/api-docs/openapi.json", app.address))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let doc: Value = response.json().await.unwrap();
    assert!(doc["paths"]["/api/grievances"].is_object());
    assert!(doc["components"]["securitySchemes"]["bearer_auth"].is_object());
}

#[tokio::test]
async fn test_citizen_registers_logs_in_and_files_a_grievance() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let service = app.repo.seed_service("Roads");

    let register = client
        .post(format!("{}/api/auth/register", app.address))
        .json(&json!({
            "email": "Jane@Example.com",
            "password": "secret1",
            "first_name": "Jane",
            "last_name": "Doe"
        }))
        .send()
        .await
        .expect("register fail");
    assert_eq!(register.status(), 201);

    let login = client
        .post(format!("{}/api/auth/login", app.address))
        .json(&json!({ "email": "jane@example.com", "password": "secret1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), 200);
    let login: Value = login.json().await.unwrap();
    assert_eq!(login["user"]["role"], Role::Citizen.as_str());
    let token = login["token"].as_str().unwrap().to_string();

    let created = client
        .post(format!("{}/api/grievances", app.address))
        .bearer_auth(&token)
        .json(&json!({
            "title": "Broken streetlight",
            "description": "The streetlight on Elm St has been out for a week",
            "service_id": service.service_id
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 201);
    let grievance: Value = created.json().await.unwrap();
    assert_eq!(grievance["status"], "Submitted");
    assert_eq!(grievance["priority"], "medium");

    let listed: Value = client
        .get(format!("{}/api/grievances", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed["pagination"]["total"], 1);
    assert_eq!(listed["grievances"][0]["grievance_id"], grievance["grievance_id"]);
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = spawn_app().await;
    let response = reqwest::get(format!("{}/api/nowhere", app.address))
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Route not found");
}
