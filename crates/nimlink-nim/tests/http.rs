//! Backends against an in-process axum server.

use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use nimlink_nim::{build_nim, ClientOptions, NimError, NimKind, PredictInput};

/// Serves `router` on an ephemeral port and returns its base URL.
async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/")
}

async fn esmfold_predict(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    match body["sequence"].as_str() {
        Some(seq) if !seq.is_empty() => (
            StatusCode::OK,
            Json(json!({ "pdbs": [format!("MODEL {}", seq.len())] })),
        ),
        _ => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": "sequence is required" })),
        ),
    }
}

fn esmfold_router(health: &'static str) -> Router {
    Router::new()
        .route("/health/ready", get(move || async move { health }))
        .route("/protein-structure/esmfold/predict", post(esmfold_predict))
}

#[tokio::test]
async fn test_esmfold_health_and_predict() {
    let base = serve(esmfold_router("true")).await;
    let nim = build_nim(NimKind::EsmFold, &base, &ClientOptions::default()).unwrap();

    assert!(nim.check_health().await.unwrap());

    let resp = nim
        .predict(PredictInput::Sequence("MKTAYIAK".to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status, 200);
    assert!(resp.is_success());
    assert_eq!(resp.body, json!({ "pdbs": ["MODEL 8"] }));
}

#[tokio::test]
async fn test_esmfold_unhealthy_body() {
    let base = serve(esmfold_router("false")).await;
    let nim = build_nim(NimKind::EsmFold, &base, &ClientOptions::default()).unwrap();
    assert!(!nim.check_health().await.unwrap());
}

#[tokio::test]
async fn test_error_body_is_still_returned() {
    let base = serve(esmfold_router("true")).await;
    let nim = build_nim(NimKind::EsmFold, &base, &ClientOptions::default()).unwrap();

    let resp = nim
        .predict(PredictInput::Sequence(String::new()))
        .await
        .unwrap();
    assert_eq!(resp.status, 422);
    assert!(!resp.is_success());
    assert_eq!(resp.body["detail"], "sequence is required");
}

#[tokio::test]
async fn test_non_json_body_is_a_decode_error() {
    let router = Router::new().route(
        "/protein-structure/esmfold/predict",
        post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
    );
    let base = serve(router).await;
    let nim = build_nim(NimKind::EsmFold, &base, &ClientOptions::default()).unwrap();

    let err = nim
        .predict(PredictInput::Sequence("MK".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, NimError::Decode { status: 502, .. }));
}

#[tokio::test]
async fn test_diffdock_health_uses_v1_path() {
    let router = Router::new().route("/v1/health/ready", get(|| async { "true" }));
    let base = serve(router).await;
    let nim = build_nim(NimKind::DiffDock, &base, &ClientOptions::default()).unwrap();
    assert!(nim.check_health().await.unwrap());

    let err = nim
        .predict(PredictInput::Docking {
            protein: "p.pdb".into(),
            ligand: "l.sdf".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, NimError::NotImplemented(_)));
}

#[tokio::test]
async fn test_alphafold_cannot_be_built() {
    let result = build_nim(NimKind::AlphaFold, "http://127.0.0.1:1", &ClientOptions::default());
    assert!(matches!(result, Err(NimError::NotImplemented(_))));
}

#[tokio::test]
async fn test_timeout_is_applied() {
    let router = Router::new().route(
        "/health/ready",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "true"
        }),
    );
    let base = serve(router).await;
    let options = ClientOptions {
        timeout: Some(Duration::from_millis(100)),
    };
    let nim = build_nim(NimKind::EsmFold, &base, &options).unwrap();
    let err = nim.check_health().await.unwrap_err();
    assert!(matches!(err, NimError::Http(_)));
}

#[tokio::test]
async fn test_esmfold_rejects_docking_input() {
    let nim = build_nim(NimKind::EsmFold, "http://127.0.0.1:1", &ClientOptions::default()).unwrap();
    let err = nim
        .predict(PredictInput::Docking {
            protein: "p.pdb".into(),
            ligand: "l.sdf".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        NimError::InvalidInput {
            backend: NimKind::EsmFold,
            ..
        }
    ));
}
