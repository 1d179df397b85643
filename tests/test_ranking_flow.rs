//! Integration tests for the ranking flow.
//!
//! Verifies semantic ordering, table hints, argument suggestions, ranking
//! idempotence, and snapshot consistency under concurrent reconfiguration.
//! The ONNX model is replaced by a deterministic bag-of-words encoder.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::{post, put},
    Router,
};
use ndarray::Array2;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use toolrank::handlers::{
    rank_tables_handler, rank_tools_handler, set_schema_handler, set_toolset_handler,
};
use toolrank::{ranking, AppState, CatalogStore, Config, Embedder};
use tower::ServiceExt;

const STUB_DIMS: usize = 256;

/// Deterministic bag-of-words encoder: tokens index into a per-instance
/// vocabulary, so texts sharing tokens get proportionally similar vectors
/// and ranking order is stable and predictable.
struct StubEmbedder {
    vocab: Mutex<HashMap<String, usize>>,
}

impl StubEmbedder {
    fn new() -> Self {
        Self {
            vocab: Mutex::new(HashMap::new()),
        }
    }

    fn bucket(&self, token: &str) -> usize {
        let mut vocab = self.vocab.lock().unwrap();
        let next = vocab.len();
        *vocab.entry(token.to_string()).or_insert(next) % STUB_DIMS
    }
}

impl Embedder for StubEmbedder {
    fn model_id(&self) -> &str {
        "stub-encoder-test"
    }

    fn dims(&self) -> usize {
        STUB_DIMS
    }

    fn embed(&self, texts: &[String]) -> toolrank::Result<Array2<f32>> {
        let mut out = Array2::zeros((texts.len(), STUB_DIMS));
        for (i, text) in texts.iter().enumerate() {
            for token in text
                .to_lowercase()
                .split(|c: char| !c.is_alphanumeric())
                .filter(|t| !t.is_empty())
            {
                let bucket = self.bucket(token);
                out[[i, bucket]] += 1.0;
            }
        }
        Ok(out)
    }
}

/// Helper to create a test router with ranking and catalog endpoints.
fn create_test_app() -> Router {
    let config = Config::from_env().expect("Failed to load config");
    let state = Arc::new(AppState::with_embedder(config, Arc::new(StubEmbedder::new())));

    Router::new()
        .route("/rank/tools", post(rank_tools_handler))
        .route("/rank/tables", post(rank_tables_handler))
        .route("/config/toolset", put(set_toolset_handler))
        .route("/config/schema", put(set_schema_handler))
        .with_state(state)
}

/// Helper to make a JSON request to the router.
async fn json_request(app: Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(req).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(json!({}));

    (status, body)
}

fn sample_toolset() -> Value {
    json!({
        "tools": [
            {
                "name": "send_email",
                "description": "Send an email message to a recipient",
                "inputSchema": { "properties": { "to": { "type": "string" } } }
            },
            {
                "name": "list_devices",
                "description": "List all devices",
                "inputSchema": { "properties": { "limit": { "type": "integer" } } }
            },
            {
                "name": "query_table",
                "description": "Query rows from one table",
                "inputSchema": {
                    "properties": {
                        "tableName": { "type": "string" },
                        "limit": { "type": "integer" }
                    }
                }
            }
        ]
    })
}

fn sample_schema() -> Value {
    json!({
        "tables": [
            {
                "name": "users",
                "columns": [
                    { "name": "id", "type": "int" },
                    { "name": "email", "type": "text" }
                ]
            },
            {
                "name": "orders",
                "columns": [{ "name": "id", "type": "int" }],
                "fks": [{ "column": "user_id", "refTable": "users" }]
            }
        ]
    })
}

// ============================================================================
// Semantic Ordering
// ============================================================================

#[tokio::test]
async fn test_matching_tool_ranks_first() {
    let app = create_test_app();
    json_request(app.clone(), "PUT", "/config/toolset", sample_toolset()).await;

    let (status, response) = json_request(
        app,
        "POST",
        "/rank/tools",
        json!({ "prompt": "list all devices", "limit": 3 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);

    let tools = response["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 3);
    assert_eq!(
        tools[0]["name"], "list_devices",
        "device tool should rank first for a device prompt: {:?}",
        tools
    );

    let scores: Vec<f64> = tools.iter().map(|t| t["score"].as_f64().unwrap()).collect();
    for pair in scores.windows(2) {
        assert!(
            pair[0] >= pair[1],
            "Scores should be in descending order: {:?}",
            scores
        );
    }
}

#[tokio::test]
async fn test_limit_caps_result_count() {
    let app = create_test_app();
    json_request(app.clone(), "PUT", "/config/toolset", sample_toolset()).await;

    let (_, response) = json_request(
        app.clone(),
        "POST",
        "/rank/tools",
        json!({ "prompt": "query the users table", "limit": 2 }),
    )
    .await;
    assert_eq!(response["tools"].as_array().unwrap().len(), 2);

    // A limit beyond the catalog size is clamped, not an error.
    let (status, response) = json_request(
        app,
        "POST",
        "/rank/tools",
        json!({ "prompt": "query the users table", "limit": 50 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["tools"].as_array().unwrap().len(), 3);
}

// ============================================================================
// Table Hints and Argument Suggestions
// ============================================================================

#[tokio::test]
async fn test_table_hints_drive_argument_suggestions() {
    let app = create_test_app();
    json_request(app.clone(), "PUT", "/config/toolset", sample_toolset()).await;
    json_request(app.clone(), "PUT", "/config/schema", sample_schema()).await;

    let (status, response) = json_request(
        app,
        "POST",
        "/rank/tools",
        json!({ "prompt": "query the users table", "limit": 3 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);

    let hints = response["tableHints"].as_array().unwrap();
    assert!(!hints.is_empty());
    assert_eq!(
        hints[0]["name"], "users",
        "users table should be the primary hint: {:?}",
        hints
    );

    // The table-shaped tool picks up the primary hint plus the limit default.
    let query_tool = response["tools"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == "query_table")
        .expect("query_table should be ranked");
    assert_eq!(
        query_tool["argumentSuggestions"],
        json!({ "tableName": "users", "limit": 50 })
    );
}

#[tokio::test]
async fn test_table_hint_count_is_fixed_regardless_of_limit() {
    let app = create_test_app();
    json_request(app.clone(), "PUT", "/config/toolset", sample_toolset()).await;
    json_request(
        app.clone(),
        "PUT",
        "/config/schema",
        json!({
            "tables": [
                { "name": "users" },
                { "name": "orders" },
                { "name": "devices" },
                { "name": "sessions" },
                { "name": "invoices" }
            ]
        }),
    )
    .await;

    let (_, response) = json_request(
        app,
        "POST",
        "/rank/tools",
        json!({ "prompt": "anything at all", "limit": 50 }),
    )
    .await;

    // Hints stay at their fixed small size even with five tables loaded
    // and a much larger tool limit.
    assert_eq!(response["tableHints"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_rank_tables_endpoint_matches_schema() {
    let app = create_test_app();
    json_request(app.clone(), "PUT", "/config/schema", sample_schema()).await;

    let (status, response) = json_request(
        app,
        "POST",
        "/rank/tables",
        json!({ "prompt": "orders placed by users", "limit": 2 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);

    let tables = response["tables"].as_array().unwrap();
    assert_eq!(tables.len(), 2);
    for table in tables {
        assert!(table["name"].is_string());
        assert!(table["score"].is_number());
    }
}

// ============================================================================
// Idempotence
// ============================================================================

#[tokio::test]
async fn test_reloading_same_toolset_ranks_identically() {
    let app = create_test_app();
    let prompt = json!({ "prompt": "list all devices", "limit": 3 });

    json_request(app.clone(), "PUT", "/config/toolset", sample_toolset()).await;
    let (_, first) = json_request(app.clone(), "POST", "/rank/tools", prompt.clone()).await;

    json_request(app.clone(), "PUT", "/config/toolset", sample_toolset()).await;
    let (_, second) = json_request(app, "POST", "/rank/tools", prompt).await;

    let first_tools = first["tools"].as_array().unwrap();
    let second_tools = second["tools"].as_array().unwrap();
    assert_eq!(first_tools.len(), second_tools.len());

    for (a, b) in first_tools.iter().zip(second_tools.iter()) {
        assert_eq!(a["name"], b["name"]);
        let diff = (a["score"].as_f64().unwrap() - b["score"].as_f64().unwrap()).abs();
        assert!(diff < 1e-6, "scores should match across reloads: {}", diff);
    }
}

// ============================================================================
// Concurrency
// ============================================================================

/// Readers racing a reconfiguration must only ever observe a complete old
/// version or a complete new version of the catalog.
#[test]
fn test_snapshots_stay_consistent_under_concurrent_reload() {
    let store = Arc::new(CatalogStore::new());
    let embedder = Arc::new(StubEmbedder::new());

    let schemas = [
        json!({ "tables": [{ "name": "users" }] }),
        json!({ "tables": [{ "name": "users" }, { "name": "orders" }] }),
        json!({ "tables": [
            { "name": "users" }, { "name": "orders" }, { "name": "devices" }
        ] }),
    ];

    store.set_toolset(embedder.as_ref(), &sample_toolset()).unwrap();
    store.set_schema(embedder.as_ref(), &schemas[0]).unwrap();

    std::thread::scope(|scope| {
        let writer_store = Arc::clone(&store);
        let writer_embedder = Arc::clone(&embedder);
        scope.spawn(move || {
            for i in 0..60 {
                writer_store
                    .set_schema(writer_embedder.as_ref(), &schemas[i % schemas.len()])
                    .unwrap();
            }
        });

        for _ in 0..4 {
            let reader_store = Arc::clone(&store);
            let reader_embedder = Arc::clone(&embedder);
            scope.spawn(move || {
                let query_matrix = reader_embedder
                    .embed(&["orders by user".to_string()])
                    .unwrap();
                let query = query_matrix.row(0).to_owned();

                for _ in 0..200 {
                    let snapshot = reader_store.snapshot();

                    if let Some(index) = snapshot.table_index.as_deref() {
                        // items and vectors must never diverge mid-swap
                        assert_eq!(index.len(), index.vectors().nrows());

                        let ranked = ranking::rank(query.view(), Some(index), 3);
                        assert!(ranked.len() <= index.len().min(3));
                        for (idx, score) in &ranked {
                            assert!(*idx < index.len());
                            assert!(score.is_finite());
                        }
                    }

                    if let Some(index) = snapshot.tool_index.as_deref() {
                        assert_eq!(index.len(), index.vectors().nrows());
                    }
                }
            });
        }
    });

    // Writer finished: the final version is one of the three schemas.
    let final_count = store.snapshot().table_count();
    assert!((1..=3).contains(&final_count));
}

/// Full-stack variant: concurrent HTTP rankings during schema reloads all
/// succeed with self-consistent responses.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rankings_during_reload_return_200() {
    let app = create_test_app();
    json_request(app.clone(), "PUT", "/config/toolset", sample_toolset()).await;
    json_request(app.clone(), "PUT", "/config/schema", sample_schema()).await;

    let mut tasks = Vec::new();

    for _ in 0..4 {
        let app = app.clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..20 {
                let (status, response) = json_request(
                    app.clone(),
                    "POST",
                    "/rank/tools",
                    json!({ "prompt": "query the users table", "limit": 3 }),
                )
                .await;

                assert_eq!(status, StatusCode::OK);
                let tools = response["tools"].as_array().unwrap();
                assert!(tools.len() <= 3);
                assert!(response["tableHints"].as_array().unwrap().len() <= 3);
            }
        }));
    }

    let reload_app = app.clone();
    tasks.push(tokio::spawn(async move {
        for _ in 0..10 {
            let (status, _) = json_request(
                reload_app.clone(),
                "PUT",
                "/config/schema",
                sample_schema(),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }
    }));

    for task in tasks {
        task.await.unwrap();
    }
}
