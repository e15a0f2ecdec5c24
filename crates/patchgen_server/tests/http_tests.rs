use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tempfile::{TempDir, tempdir};
use tower::ServiceExt;

use patchgen_core::serializer::deserialize;
use patchgen_core::{Catalog, PatchEngine, SelectionTables};
use patchgen_server::{AppState, FsStorage, ServerConfig, create_router, create_server_state};

const BODY_LIMIT: usize = 1 << 20;

fn test_state(dir: &TempDir, unique_filenames: bool) -> AppState {
    let catalog = Catalog::from_entries([
        ("Fundamental", vec!["VCO", "VCF", "VCA", "Delay"]),
        ("Befaco", vec!["Env"]),
    ])
    .unwrap();
    let tables = SelectionTables {
        styles: BTreeMap::from([
            (
                "acid".to_string(),
                ["VCO", "VCF", "VCA", "Delay", "Env"].map(String::from).to_vec(),
            ),
            (
                "experimental".to_string(),
                ["VCO", "Delay"].map(String::from).to_vec(),
            ),
        ]),
        ..SelectionTables::default()
    };
    AppState {
        engine: Arc::new(PatchEngine::new(Arc::new(catalog), tables)),
        storage: Arc::new(FsStorage::new(dir.path())),
        public_url: "https://patches.example.com".to_string(),
        unique_filenames,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), BODY_LIMIT).await.unwrap();
    (status, body.to_vec())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn generate_writes_patch_and_returns_url() {
    let dir = tempdir().unwrap();
    let app = create_router(test_state(&dir, false));

    let (status, body) = send(
        &app,
        post_json(
            "/generate_vcv_patch",
            json!({"style": "acid", "complexity": "simple", "seed": 3}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let response: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(response["filename"], "acid_simple.vcv");
    assert_eq!(
        response["file_url"],
        "https://patches.example.com/static/acid_simple.vcv"
    );
    assert_eq!(response["modules"], 4);

    let stored = std::fs::read(dir.path().join("acid_simple.vcv")).unwrap();
    let patch = deserialize(&stored).unwrap();
    assert!(patch.validate().is_ok());
    assert_eq!(patch.master_module_id, 3);
}

#[tokio::test]
async fn generated_file_is_served_and_listed() {
    let dir = tempdir().unwrap();
    let app = create_router(test_state(&dir, false));

    send(
        &app,
        post_json(
            "/generate_vcv_patch",
            json!({"style": "Unknown Style", "complexity": "advanced"}),
        ),
    )
    .await;

    let (status, body) = send(&app, get("/list_files")).await;
    assert_eq!(status, StatusCode::OK);
    let listing: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(listing, json!({"files": ["unknown-style_advanced.vcv"]}));

    let (status, body) = send(&app, get("/static/unknown-style_advanced.vcv")).await;
    assert_eq!(status, StatusCode::OK);
    let patch = deserialize(&body).unwrap();
    // Falls back to the two-model default pool.
    assert_eq!(patch.modules.len(), 3);
}

#[tokio::test]
async fn unique_filenames_do_not_collide() {
    let dir = tempdir().unwrap();
    let app = create_router(test_state(&dir, true));

    for _ in 0..2 {
        let (status, _) = send(
            &app,
            post_json(
                "/generate_vcv_patch",
                json!({"style": "acid", "complexity": "simple"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = send(&app, get("/list_files")).await;
    let listing: Value = serde_json::from_slice(&body).unwrap();
    let files = listing["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert!(
        files
            .iter()
            .all(|f| f.as_str().unwrap().starts_with("acid_simple-"))
    );
}

#[tokio::test]
async fn missing_file_is_404() {
    let dir = tempdir().unwrap();
    let app = create_router(test_state(&dir, false));

    let (status, body) = send(&app, get("/static/nothing_here.vcv")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert!(error["error"].as_str().unwrap().contains("nothing_here.vcv"));
}

#[tokio::test]
async fn invalid_file_name_is_400() {
    let dir = tempdir().unwrap();
    let app = create_router(test_state(&dir, false));

    let (status, _) = send(&app, get("/static/.hidden")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn selection_failure_is_500() {
    let dir = tempdir().unwrap();
    let mut state = test_state(&dir, false);
    let catalog = Catalog::from_entries([("Other", vec!["Unrelated"])]).unwrap();
    state.engine = Arc::new(PatchEngine::new(
        Arc::new(catalog),
        SelectionTables::default(),
    ));
    let app = create_router(state);

    let (status, body) = send(
        &app,
        post_json(
            "/generate_vcv_patch",
            json!({"style": "acid", "complexity": "simple"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert!(error["error"].as_str().unwrap().contains("acid"));
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn malformed_request_is_rejected() {
    let dir = tempdir().unwrap();
    let app = create_router(test_state(&dir, false));

    let (status, _) = send(
        &app,
        post_json("/generate_vcv_patch", json!({"style": "acid"})),
    )
    .await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn catalog_and_health() {
    let dir = tempdir().unwrap();
    let app = create_router(test_state(&dir, false));

    let (status, body) = send(&app, get("/catalog")).await;
    assert_eq!(status, StatusCode::OK);
    let catalog: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(catalog["Befaco"], json!(["Env"]));

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[test]
fn server_refuses_to_start_without_catalog() {
    let dir = tempdir().unwrap();
    let empty = dir.path().join("empty.json");
    std::fs::write(&empty, "{}").unwrap();

    for catalog_path in [empty, dir.path().join("missing.json")] {
        let config = ServerConfig {
            catalog_path,
            storage_dir: dir.path().to_path_buf(),
            ..ServerConfig::default()
        };
        assert!(create_server_state(&config).is_err());
    }
}
