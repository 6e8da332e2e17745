//! Integration tests for the app store registry and dispatch surface.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use applog::{Config, Envelope, ErrorCode, Request, StoreRegistry};
use common::clock::MockClock;
use common::storage::config::StorageConfig;
use serde_json::{Value, json};

fn test_config() -> Config {
    Config {
        storage: StorageConfig::InMemory,
        ..Default::default()
    }
}

fn test_registry() -> StoreRegistry {
    StoreRegistry::new(test_config())
}

fn data(envelope: &Envelope) -> Value {
    match envelope {
        Envelope::Success { data } => data.clone(),
        Envelope::Error { code, message, .. } => {
            panic!("expected success, got {:?}: {}", code, message)
        }
    }
}

fn error_code(envelope: &Envelope) -> ErrorCode {
    match envelope {
        Envelope::Error { code, .. } => *code,
        Envelope::Success { .. } => panic!("expected error envelope"),
    }
}

#[tokio::test]
async fn test_append_assigns_id_and_timestamp_for_every_level() {
    let registry = test_registry();
    let handle = registry.handle("levels").await.unwrap();

    for level in ["DEBUG", "INFO", "WARN", "ERROR"] {
        let envelope = handle
            .dispatch(Request::post(
                "/log",
                json!({"level": level, "message": "msg"}),
            ))
            .await;
        let entry = data(&envelope);

        assert_eq!(entry["level"], level);
        assert!(!entry["id"].as_str().unwrap().is_empty());
        assert!(entry["timestamp"].as_str().is_some());
    }

    // All four entries are visible with no filters.
    let envelope = handle.dispatch(Request::get("/logs")).await;
    assert_eq!(data(&envelope).as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_batch_append_yields_distinct_ids_in_order() {
    let registry = test_registry();
    let handle = registry.handle("batch").await.unwrap();

    let logs: Vec<Value> = (0..8)
        .map(|i| json!({"level": "INFO", "message": format!("m{}", i)}))
        .collect();
    let envelope = handle
        .dispatch(Request::post("/logs", json!({ "logs": logs })))
        .await;
    let entries = data(&envelope);
    let entries = entries.as_array().unwrap();

    // Same order as submitted, distinct ids.
    assert_eq!(entries.len(), 8);
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry["message"], format!("m{}", i));
    }
    let mut ids: Vec<&str> = entries.iter().map(|e| e["id"].as_str().unwrap()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);

    // All visible immediately after the batch.
    let envelope = handle
        .dispatch(Request::get("/logs").with_query("limit", "8"))
        .await;
    assert_eq!(data(&envelope).as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn test_batch_is_all_or_nothing() {
    let registry = test_registry();
    let handle = registry.handle("atomic").await.unwrap();

    let envelope = handle
        .dispatch(Request::post(
            "/logs",
            json!({"logs": [
                {"level": "INFO", "message": "fine"},
                {"level": "BOGUS", "message": "invalid"},
            ]}),
        ))
        .await;
    assert_eq!(error_code(&envelope), ErrorCode::ValidationError);

    let envelope = handle.dispatch(Request::get("/logs")).await;
    assert!(data(&envelope).as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_query_filters_by_level_and_request_id() {
    let registry = test_registry();
    let handle = registry.handle("filters").await.unwrap();

    for (level, request_id) in [
        ("INFO", Some("req-1")),
        ("INFO", None),
        ("WARN", Some("req-1")),
        ("ERROR", None),
    ] {
        let mut body = json!({"level": level, "message": "msg"});
        if let Some(request_id) = request_id {
            body["request_id"] = json!(request_id);
        }
        handle.dispatch(Request::post("/log", body)).await;
    }

    // Exactly the ERROR entries.
    let envelope = handle
        .dispatch(Request::get("/logs").with_query("level", "ERROR"))
        .await;
    let entries = data(&envelope);
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["level"], "ERROR");

    // Exactly the entries tagged req-1.
    let envelope = handle
        .dispatch(Request::get("/logs").with_query("request_id", "req-1"))
        .await;
    let entries = data(&envelope);
    assert_eq!(entries.as_array().unwrap().len(), 2);
    for entry in entries.as_array().unwrap() {
        assert_eq!(entry["request_id"], "req-1");
    }
}

#[tokio::test]
async fn test_prune_is_idempotent() {
    let clock = Arc::new(MockClock::with_time(
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000),
    ));
    let registry = StoreRegistry::with_clock(test_config(), clock.clone());
    let handle = registry.handle("prune").await.unwrap();

    for i in 0..3 {
        handle
            .dispatch(Request::post(
                "/log",
                json!({"level": "INFO", "message": format!("old-{}", i)}),
            ))
            .await;
    }
    clock.advance(Duration::from_secs(3600));
    let recent = data(
        &handle
            .dispatch(Request::post(
                "/log",
                json!({"level": "INFO", "message": "recent"}),
            ))
            .await,
    );
    let boundary = recent["timestamp"].as_str().unwrap().to_string();

    // First prune removes the three old entries.
    let envelope = handle
        .dispatch(Request::post("/prune", json!({ "before": boundary })))
        .await;
    assert_eq!(data(&envelope)["deleted"], 3);

    // Second prune with the same boundary removes nothing.
    let envelope = handle
        .dispatch(Request::post("/prune", json!({ "before": boundary })))
        .await;
    assert_eq!(data(&envelope)["deleted"], 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_increments_are_not_lost() {
    let registry = Arc::new(test_registry());
    let handle = registry.handle("counters").await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let handle = handle.clone();
        tasks.push(tokio::spawn(async move {
            handle
                .dispatch(Request::post("/stats", json!({"level": "INFO"})))
                .await
        }));
    }
    for task in tasks {
        assert!(task.await.unwrap().is_success());
    }

    let envelope = handle
        .dispatch(Request::get("/stats").with_query("days", "1"))
        .await;
    let stats = data(&envelope);
    assert_eq!(stats[0]["info"], 10);
}

#[tokio::test]
async fn test_stats_range_is_dense_and_most_recent_first() {
    let registry = test_registry();
    let handle = registry.handle("range").await.unwrap();

    handle
        .dispatch(Request::post("/stats", json!({"level": "WARN", "count": 2})))
        .await;

    let envelope = handle
        .dispatch(Request::get("/stats").with_query("days", "7"))
        .await;
    let stats = data(&envelope);
    let stats = stats.as_array().unwrap();

    // Exactly 7 records even though only today has data.
    assert_eq!(stats.len(), 7);
    assert_eq!(stats[0]["warn"], 2);
    for stat in &stats[1..] {
        assert_eq!(stat["warn"], 0);
        assert_eq!(stat["info"], 0);
    }
    for window in stats.windows(2) {
        let newer = window[0]["date"].as_str().unwrap();
        let older = window[1]["date"].as_str().unwrap();
        assert!(newer > older);
    }
}

#[tokio::test]
async fn test_batch_increment_applies_all_counts() {
    let registry = test_registry();
    let handle = registry.handle("batch-stats").await.unwrap();

    let envelope = handle
        .dispatch(Request::post(
            "/stats",
            json!({"counts": [
                {"level": "DEBUG", "count": 4},
                {"level": "ERROR", "count": 2},
            ]}),
        ))
        .await;
    let stat = data(&envelope);
    assert_eq!(stat["debug"], 4);
    assert_eq!(stat["error"], 2);
}

#[tokio::test]
async fn test_context_round_trips_structurally_equal() {
    let registry = test_registry();
    let handle = registry.handle("context").await.unwrap();

    let context = json!({
        "request": {"path": "/checkout", "params": {"amount": 19.99}},
        "tags": ["billing", {"nested": [1, 2, 3]}],
        "empty": {},
    });
    handle
        .dispatch(Request::post(
            "/log",
            json!({"level": "INFO", "message": "msg", "context": context}),
        ))
        .await;

    let envelope = handle.dispatch(Request::get("/logs")).await;
    let entries = data(&envelope);
    assert_eq!(entries[0]["context"], context);
}

#[tokio::test]
async fn test_end_to_end_append_query_and_daily_stat() {
    // Appends a DEBUG and a WARN entry, increments their stats, then
    // checks recent-first ordering and the day's counters.
    let clock = Arc::new(MockClock::with_time(
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
    ));
    let registry = StoreRegistry::with_clock(test_config(), clock.clone());
    let handle = registry.handle("example").await.unwrap();

    handle
        .dispatch(Request::post(
            "/log",
            json!({"level": "DEBUG", "message": "m1"}),
        ))
        .await;
    handle
        .dispatch(Request::post("/stats", json!({"level": "DEBUG"})))
        .await;
    clock.advance(Duration::from_secs(1));
    handle
        .dispatch(Request::post(
            "/log",
            json!({"level": "WARN", "message": "m2"}),
        ))
        .await;
    handle
        .dispatch(Request::post("/stats", json!({"level": "WARN"})))
        .await;

    // Most recent entry first.
    let envelope = handle.dispatch(Request::get("/logs")).await;
    let entries = data(&envelope);
    assert_eq!(entries[0]["message"], "m2");
    assert_eq!(entries[1]["message"], "m1");

    // Today's counters reflect both increments.
    let envelope = handle
        .dispatch(Request::get("/stats").with_query("days", "1"))
        .await;
    let stats = data(&envelope);
    assert_eq!(stats[0]["debug"], 1);
    assert_eq!(stats[0]["warn"], 1);
    assert_eq!(stats[0]["info"], 0);
    assert_eq!(stats[0]["error"], 0);
}

#[tokio::test]
async fn test_health_urls_and_history_round_trip() {
    let registry = test_registry();
    let handle = registry.handle("health").await.unwrap();

    // Configure URLs, replacing wholesale.
    let envelope = handle
        .dispatch(Request::post(
            "/health-urls",
            json!({"urls": ["https://a.example/health", "https://b.example/health"]}),
        ))
        .await;
    assert_eq!(data(&envelope)["urls"].as_array().unwrap().len(), 2);

    let envelope = handle.dispatch(Request::get("/health-urls")).await;
    assert_eq!(data(&envelope)["urls"][0], "https://a.example/health");

    // Record probe outcomes and read them back, most recent first.
    handle
        .dispatch(Request::post(
            "/health",
            json!({"url": "https://a.example/health", "ok": true, "status": 200}),
        ))
        .await;
    handle
        .dispatch(Request::post(
            "/health",
            json!({"url": "https://b.example/health", "ok": false}),
        ))
        .await;

    let envelope = handle.dispatch(Request::get("/health")).await;
    let results = data(&envelope);
    assert_eq!(results.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_operation_yields_not_found_envelope() {
    let registry = test_registry();
    let handle = registry.handle("unknown").await.unwrap();

    let envelope = handle
        .dispatch(Request::post("/nonsense", json!({})))
        .await;
    assert_eq!(error_code(&envelope), ErrorCode::NotFound);
    assert_eq!(envelope.http_status(), 404);
}

#[tokio::test]
async fn test_validation_errors_carry_validation_code() {
    let registry = test_registry();
    let handle = registry.handle("invalid").await.unwrap();

    // Bad level on append.
    let envelope = handle
        .dispatch(Request::post(
            "/log",
            json!({"level": "VERBOSE", "message": "msg"}),
        ))
        .await;
    assert_eq!(error_code(&envelope), ErrorCode::ValidationError);

    // Zero count on increment.
    let envelope = handle
        .dispatch(Request::post(
            "/stats",
            json!({"level": "INFO", "count": 0}),
        ))
        .await;
    assert_eq!(error_code(&envelope), ErrorCode::ValidationError);

    // Malformed body shape is a bad request.
    let envelope = handle
        .dispatch(Request::post("/log", json!({"message": "no level"})))
        .await;
    assert_eq!(error_code(&envelope), ErrorCode::BadRequest);
}

#[tokio::test]
async fn test_apps_do_not_share_state() {
    let registry = test_registry();
    let orders = registry.handle("orders").await.unwrap();
    let billing = registry.handle("billing").await.unwrap();

    orders
        .dispatch(Request::post(
            "/log",
            json!({"level": "INFO", "message": "orders"}),
        ))
        .await;
    orders
        .dispatch(Request::post("/stats", json!({"level": "INFO"})))
        .await;

    let envelope = billing.dispatch(Request::get("/logs")).await;
    assert!(data(&envelope).as_array().unwrap().is_empty());

    let envelope = billing
        .dispatch(Request::get("/stats").with_query("days", "1"))
        .await;
    assert_eq!(data(&envelope)[0]["info"], 0);
}
