use axum::http::StatusCode;
use prom_api::{AlertDiscovery, ApiResponse, RuleDiscovery};
use serde_json::json;
use std::time::Duration;
use tests_integration::{
    FakeRuleEvaluator, get_json, init_test_logging, rule_group, spawn_frontend, unused_addr,
    wait_until,
};
use url::Url;

fn group_names(body: &serde_json::Value) -> Vec<String> {
    let response: ApiResponse<RuleDiscovery> =
        serde_json::from_value(body.clone()).expect("rules envelope");
    response
        .data
        .expect("rules data")
        .groups
        .into_iter()
        .map(|g| g.name)
        .collect()
}

fn warnings(body: &serde_json::Value) -> Vec<String> {
    body["warnings"]
        .as_array()
        .map(|w| w.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_slow_backend_is_skipped_and_order_kept() {
    init_test_logging();

    let first = FakeRuleEvaluator::with_groups(&["cluster-1"]).spawn().await;
    let slow = FakeRuleEvaluator::with_groups(&["cluster-2"])
        .delayed(Duration::from_secs(5))
        .spawn()
        .await;
    let third = FakeRuleEvaluator::with_groups(&["cluster-3"]).spawn().await;

    let frontend = spawn_frontend(&[first, slow.clone(), third], Duration::from_millis(500)).await;

    let started = std::time::Instant::now();
    let (status, body) = get_json(&frontend, "/api/v1/rules").await;
    assert!(started.elapsed() < Duration::from_secs(4));

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(group_names(&body), vec!["cluster-1", "cluster-3"]);

    let warnings = warnings(&body);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with(slow.as_str()));
}

#[tokio::test]
async fn test_order_follows_configuration_not_completion() {
    let late = FakeRuleEvaluator::with_groups(&["a"])
        .delayed(Duration::from_millis(300))
        .spawn()
        .await;
    let early = FakeRuleEvaluator::with_groups(&["b1", "b2"]).spawn().await;

    let frontend = spawn_frontend(&[late, early], Duration::from_secs(5)).await;
    let (status, body) = get_json(&frontend, "/api/v1/rules").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(group_names(&body), vec!["a", "b1", "b2"]);
    assert!(warnings(&body).is_empty());
}

#[tokio::test]
async fn test_duplicate_group_names_are_kept() {
    let a = FakeRuleEvaluator::with_groups(&["shared", "only-a"]).spawn().await;
    let b = FakeRuleEvaluator::with_groups(&["shared"]).spawn().await;

    let frontend = spawn_frontend(&[a, b], Duration::from_secs(5)).await;
    let (status, body) = get_json(&frontend, "/api/v1/rules").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(group_names(&body), vec!["shared", "only-a", "shared"]);
}

#[tokio::test]
async fn test_alerts_are_concatenated() {
    let a = FakeRuleEvaluator::default()
        .alerts(&["HighLatency", "Down"])
        .spawn()
        .await;
    let b = FakeRuleEvaluator::default().alerts(&["Down"]).spawn().await;

    let frontend = spawn_frontend(&[a, b], Duration::from_secs(5)).await;
    let (status, body) = get_json(&frontend, "/api/v1/alerts").await;
    assert_eq!(status, StatusCode::OK);

    let response: ApiResponse<AlertDiscovery> = serde_json::from_value(body).unwrap();
    let names: Vec<String> = response
        .data
        .unwrap()
        .alerts
        .into_iter()
        .map(|a| a.labels["alertname"].clone())
        .collect();
    assert_eq!(names, vec!["HighLatency", "Down", "Down"]);
}

#[tokio::test]
async fn test_error_envelope_counts_as_failure() {
    let healthy = FakeRuleEvaluator::with_groups(&["ok"]).spawn().await;
    let broken = FakeRuleEvaluator::with_groups(&["hidden"])
        .failing(StatusCode::INTERNAL_SERVER_ERROR)
        .spawn()
        .await;

    let frontend = spawn_frontend(&[broken.clone(), healthy], Duration::from_secs(5)).await;
    let (status, body) = get_json(&frontend, "/api/v1/rules").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(group_names(&body), vec!["ok"]);
    assert_eq!(
        warnings(&body),
        vec![format!("{broken}: internal: rule evaluator unavailable")]
    );
}

#[tokio::test]
async fn test_all_backends_failing_is_bad_gateway() {
    let broken = FakeRuleEvaluator::default()
        .failing(StatusCode::SERVICE_UNAVAILABLE)
        .spawn()
        .await;
    let refused = Url::parse(&format!("http://{}", unused_addr().await)).unwrap();

    let frontend = spawn_frontend(&[broken, refused], Duration::from_secs(5)).await;

    for path in ["/api/v1/rules", "/api/v1/alerts"] {
        let (status, body) = get_json(&frontend, path).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["status"], "error");
        assert_eq!(body["errorType"], "unavailable");
        assert!(body.get("data").is_none());
    }
}

#[tokio::test]
async fn test_query_string_is_forwarded() {
    let a = FakeRuleEvaluator::with_groups(&["a"]);
    let b = FakeRuleEvaluator::with_groups(&["b"]);
    let backends = [a.spawn().await, b.spawn().await];

    let frontend = spawn_frontend(&backends, Duration::from_secs(5)).await;
    let (status, _) = get_json(&frontend, "/api/v1/rules?type=alert&file=rules.yaml").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get_json(&frontend, "/api/v1/rules").await;
    assert_eq!(status, StatusCode::OK);

    for backend in [&a, &b] {
        assert_eq!(
            backend.received_queries(),
            vec![Some("type=alert&file=rules.yaml".to_string()), None]
        );
    }
}

#[tokio::test]
async fn test_rules_subpath_is_not_proxied() {
    let backend = FakeRuleEvaluator::with_groups(&["a"]);
    let frontend = spawn_frontend(&[backend.spawn().await], Duration::from_secs(5)).await;

    let url = format!("{}api/v1/rules/anything", frontend);
    let response = reqwest::get(url).await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
    assert!(backend.received_queries().is_empty());
}

#[tokio::test]
async fn test_groups_pass_through_unmodified() {
    let mut group = rule_group("offset");
    group["queryOffset"] = json!(30);
    group["rules"] = json!([{
        "type": "alerting",
        "state": "inactive",
        "name": "InstanceDown",
        "query": "up == 0",
        "duration": 300,
        "labels": {"severity": "page"},
        "annotations": {},
        "alerts": null,
        "health": "ok",
        "evaluationTime": 0.0002,
        "lastEvaluation": "2024-01-01T00:00:00Z"
    }]);
    let excluded = FakeRuleEvaluator::with_raw_groups(vec![group.clone()]);
    let plain = FakeRuleEvaluator::with_groups(&["plain"]);

    let frontend = spawn_frontend(
        &[excluded.spawn().await, plain.spawn().await],
        Duration::from_secs(5),
    )
    .await;
    let (status, body) = get_json(&frontend, "/api/v1/rules?exclude_alerts=true").await;

    assert_eq!(status, StatusCode::OK);
    assert!(warnings(&body).is_empty());
    assert_eq!(body["data"]["groups"][0], group);
    assert_eq!(body["data"]["groups"][0]["queryOffset"], 30);
    assert!(body["data"]["groups"][0]["rules"][0]["alerts"].is_null());
    assert_eq!(group_names(&body), vec!["offset", "plain"]);
    assert_eq!(
        excluded.received_queries(),
        vec![Some("exclude_alerts=true".to_string())]
    );
}

#[tokio::test]
async fn test_single_backend_with_null_alerts_is_success() {
    let mut group = rule_group("only");
    group["rules"] = json!([{
        "type": "alerting",
        "state": "firing",
        "name": "Down",
        "query": "up == 0",
        "alerts": null,
        "health": "ok"
    }]);
    let backend = FakeRuleEvaluator::with_raw_groups(vec![group]);

    let frontend = spawn_frontend(&[backend.spawn().await], Duration::from_secs(5)).await;
    let (status, body) = get_json(&frontend, "/api/v1/rules?exclude_alerts=true").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(group_names(&body), vec!["only"]);
}

#[tokio::test]
async fn test_client_disconnect_cancels_backend_calls() {
    init_test_logging();

    let backend = FakeRuleEvaluator::with_groups(&["slow"]).delayed(Duration::from_secs(10));
    let frontend = spawn_frontend(&[backend.spawn().await], Duration::from_secs(30)).await;

    let url = format!("{frontend}api/v1/rules");
    let client = tokio::spawn(async move { reqwest::get(url).await });

    wait_until("the backend sees the request", || {
        !backend.received_queries().is_empty()
    })
    .await;
    client.abort();

    wait_until("the backend call is dropped", || {
        backend.cancelled_requests() == 1
    })
    .await;
    assert_eq!(backend.received_queries().len(), 1);
}
