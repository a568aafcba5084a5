//! HTTP surface tests against the in-memory engine

mod common;

use axum::http::StatusCode;
use common::{fast_policy, generated_dataset, sample_dataset, RecordingEngine, TestApp, INDEX};
use medicine_search::dataset::DatasetLoader;
use medicine_search::engine::{MemoryEngine, SearchEngine};
use medicine_search::indexing::Initializer;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

async fn ready_app() -> (MemoryEngine, TestApp) {
    let engine = MemoryEngine::new();
    let app = TestApp::new(Arc::new(engine.clone()), &sample_dataset(), fast_policy(1));
    app.initializer.initialize().await.unwrap();
    (engine, app)
}

fn names(body: &Value) -> Vec<String> {
    body["hits"]
        .as_array()
        .unwrap()
        .iter()
        .map(|hit| hit["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_is_ok() {
    let (_engine, app) = ready_app().await;

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_unfiltered_search_counts_every_record() {
    let (_engine, app) = ready_app().await;

    let (status, body) = app.get("/api/search").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 20);
    // Page size stays at the default of 10 hits.
    assert_eq!(body["hits"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_empty_parameters_mean_no_constraint() {
    let (_engine, app) = ready_app().await;

    let (status, body) = app.get("/api/search?q=&category=&manufacturer=").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 20);
}

#[tokio::test]
async fn test_category_filter_is_exact() {
    let (_engine, app) = ready_app().await;

    let (status, body) = app.get("/api/search?category=Analgesic").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    for hit in body["hits"].as_array().unwrap() {
        assert_eq!(hit["category"], "Analgesic");
    }

    // Keyword filters do not normalize case.
    let (_, body) = app.get("/api/search?category=analgesic").await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_filters_combine() {
    let (_engine, app) = ready_app().await;

    let (_, body) = app
        .get("/api/search?category=Cardiovascular&manufacturer=Pfizer")
        .await;

    assert_eq!(body["total"], 2);
    let found: HashSet<String> = names(&body).into_iter().collect();
    assert_eq!(
        found,
        HashSet::from(["Atorvastatin".to_string(), "Amlodipine".to_string()])
    );
}

#[tokio::test]
async fn test_search_tolerates_typos() {
    let (_engine, app) = ready_app().await;

    let (status, body) = app.get("/api/search?q=paracetmol").await;

    assert_eq!(status, StatusCode::OK);
    assert!(names(&body).contains(&"Paracetamol".to_string()));
    assert!(body["hits"][0]["score"].as_f64().unwrap() > 0.0);
    assert!(body["hits"][0].get("name_suggest").is_none());
}

#[tokio::test]
async fn test_search_hits_carry_record_fields() {
    let (_engine, app) = ready_app().await;

    let (_, body) = app.get("/api/search?q=salbutamol").await;
    let hit = &body["hits"][0];

    assert_eq!(hit["name"], "Salbutamol");
    assert_eq!(hit["generic_name"], "Albuterol");
    assert_eq!(hit["manufacturer"], "GSK");
    assert_eq!(hit["category"], "Respiratory");
    assert_eq!(hit["price"], 13.25);
    assert_eq!(hit["dosage"], "100mcg");
}

#[tokio::test]
async fn test_autocomplete_suggests_by_prefix() {
    let (_engine, app) = ready_app().await;

    let (status, body) = app.get("/api/autocomplete?q=par").await;

    assert_eq!(status, StatusCode::OK);
    let suggestions: Vec<&str> = body["suggestions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap())
        .collect();
    assert!(suggestions.contains(&"Paracetamol"));
}

#[tokio::test]
async fn test_autocomplete_matches_generic_names() {
    let (_engine, app) = ready_app().await;

    let (_, body) = app.get("/api/autocomplete?q=albu").await;
    assert_eq!(body["suggestions"], json!(["Albuterol"]));
}

#[tokio::test]
async fn test_autocomplete_without_prefix_is_empty() {
    let (_engine, app) = ready_app().await;

    let (status, body) = app.get("/api/autocomplete").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "suggestions": [] }));

    let (_, body) = app.get("/api/autocomplete?q=").await;
    assert_eq!(body, json!({ "suggestions": [] }));
}

#[tokio::test]
async fn test_filters_are_distinct() {
    let (_engine, app) = ready_app().await;

    let (status, body) = app.get("/api/filters").await;
    assert_eq!(status, StatusCode::OK);

    let categories = body["categories"].as_array().unwrap();
    let manufacturers = body["manufacturers"].as_array().unwrap();

    let unique: HashSet<&Value> = categories.iter().collect();
    assert_eq!(unique.len(), categories.len());
    assert_eq!(categories.len(), 9);

    let unique: HashSet<&Value> = manufacturers.iter().collect();
    assert_eq!(unique.len(), manufacturers.len());
    assert_eq!(manufacturers.len(), 8);
    assert!(manufacturers.contains(&json!("Johnson & Johnson")));
}

#[tokio::test]
async fn test_first_query_initializes_missing_index() {
    let engine = MemoryEngine::new();
    let app = TestApp::new(Arc::new(engine.clone()), &sample_dataset(), fast_policy(1));

    assert!(!engine.index_exists(common::INDEX).await.unwrap());

    let (status, body) = app.get("/api/search?q=aspirin").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(engine.document_count(common::INDEX), 20);
    assert_eq!(names(&body)[0], "Aspirin");
}

#[tokio::test]
async fn test_unreachable_engine_yields_empty_payloads() {
    let (engine, app) = ready_app().await;
    engine.set_available(false);

    let (status, body) = app.get("/api/filters").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to fetch filters");
    assert_eq!(body["code"], "ENGINE_UNREACHABLE");
    assert_eq!(body["categories"], json!([]));
    assert_eq!(body["manufacturers"], json!([]));

    let (status, body) = app.get("/api/autocomplete?q=par").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Autocomplete failed");
    assert_eq!(body["suggestions"], json!([]));

    let (status, body) = app.get("/api/search?q=par").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Search failed");
    assert_eq!(body["hits"], json!([]));
    assert!(body["details"].as_str().unwrap().contains("not accessible"));
}

#[tokio::test]
async fn test_health_survives_exhausted_initialization() {
    let engine = MemoryEngine::new();
    engine.set_available(false);
    let app = TestApp::new(Arc::new(engine.clone()), &sample_dataset(), fast_policy(3));

    let err = app.initializer.initialize().await.unwrap_err();
    assert_eq!(err.error_code(), "INITIALIZATION_EXHAUSTED");

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    // Once the engine recovers, the next query rebuilds the index.
    engine.set_available(true);
    let (status, body) = app.get("/api/search").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 20);
}

#[tokio::test]
async fn test_rejected_query_reports_query_failure() {
    let engine = RecordingEngine::new();
    let app = TestApp::new(Arc::new(engine.clone()), &sample_dataset(), fast_policy(1));
    app.initializer.initialize().await.unwrap();
    engine.reject_searches(true);

    let (status, body) = app.get("/api/search?q=aspirin").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "QUERY_FAILED");
    assert_eq!(body["hits"], json!([]));
    assert!(body["details"]
        .as_str()
        .unwrap()
        .contains("search_phase_execution_exception"));
}

#[tokio::test]
async fn test_missing_dataset_fails_queries_but_not_health() {
    let engine = MemoryEngine::new();
    let app = TestApp::new(
        Arc::new(engine.clone()),
        std::path::Path::new("/nonexistent/medicines.csv"),
        fast_policy(2),
    );

    let (status, body) = app.get("/api/filters").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "INITIALIZATION_EXHAUSTED");

    // The index was created before the dataset load failed, so later
    // queries see an empty catalog instead of retrying.
    let (status, body) = app.get("/api/search").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);

    let (status, _) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_abandoned_request_does_not_cut_import_short() {
    let engine = RecordingEngine::new();
    engine.delay_bulk(Duration::from_millis(20));
    let file = generated_dataset(50);
    let initializer = Initializer::new(
        Arc::new(engine.clone()),
        INDEX,
        DatasetLoader::new(file.path()),
    )
    .with_batch_size(10)
    .with_retry_policy(fast_policy(1));
    let app = TestApp::with_initializer(Arc::new(engine.clone()), initializer);

    // The client gives up while the lazy import is still running.
    let abandoned = tokio::time::timeout(Duration::from_millis(30), app.get("/api/search")).await;
    assert!(abandoned.is_err());

    for _ in 0..200 {
        if engine.refresh_count() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(engine.batch_sizes(), vec![10; 5]);
    assert_eq!(engine.inner.document_count(INDEX), 50);

    let (status, body) = app.get("/api/search").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 50);
}
