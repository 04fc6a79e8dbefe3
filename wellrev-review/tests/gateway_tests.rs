//! HTTP client tests against an in-process fake clustering service
//!
//! The fake serves the same endpoints and payload shapes as the real service
//! on an ephemeral port, and records what it was asked.

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wellrev_review::models::ComparisonMode;
use wellrev_review::services::{
    ClusterGateway, ClusterServiceClient, FetchError, FetchOutcome, UploadError, UploadFile,
};

#[derive(Default)]
struct FakeService {
    requests: Mutex<Vec<String>>,
    uploaded: Mutex<Option<(String, String, Vec<u8>)>>,
}

type Shared = Arc<FakeService>;
type Params = Query<HashMap<String, String>>;

impl FakeService {
    fn record(&self, entry: String) {
        self.requests.lock().unwrap().push(entry);
    }
}

fn graph_id(params: &HashMap<String, String>) -> i64 {
    params
        .get("graph_id")
        .and_then(|v| v.parse().ok())
        .unwrap_or(-100)
}

async fn upload(State(fake): State<Shared>, mut multipart: Multipart) -> Response {
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.unwrap().to_vec();
        *fake.uploaded.lock().unwrap() = Some((name, file_name, bytes));
    }
    fake.record("POST /upload".to_string());

    Json(json!({
        "expected_graph": 1,
        "peaks": [3, 17],
        "peak_heights": [0.8, 0.4],
        "valleys": [9],
        "valley_heights": [0.2],
    }))
    .into_response()
}

async fn farthest(State(fake): State<Shared>, Query(params): Params) -> Response {
    let id = graph_id(&params);
    fake.record(format!("GET /getFarthestGraph graph_id={}", id));

    match id {
        9 => (StatusCode::INTERNAL_SERVER_ERROR, "model not fitted").into_response(),
        // Out of clusters: the service answers with row -1
        1 => Json(json!({
            "farthest_graph": -1,
            "peaks": [],
            "peak_heights": [],
            "valleys": [],
            "valley_heights": [],
            "euclidean_dist": "\"0.0\"",
        }))
        .into_response(),
        _ => Json(json!({
            "farthest_graph": 3,
            "peaks": [5],
            "peak_heights": [1.25],
            "valleys": [],
            "valley_heights": [],
            "euclidean_dist": "\"12.5\"",
        }))
        .into_response(),
    }
}

async fn closest(State(fake): State<Shared>, Query(params): Params) -> Response {
    fake.record(format!("GET /getClosestGraph graph_id={}", graph_id(&params)));

    Json(json!({
        "closest_graph": 4,
        "peaks": [],
        "peak_heights": [],
        "valleys": [2, 6],
        "valley_heights": [0.3, 0.1],
        "euclidean_dist": 0.25,
    }))
    .into_response()
}

async fn label_true(State(fake): State<Shared>, Query(params): Params) -> Json<serde_json::Value> {
    fake.record(format!("GET /labelTrue graph_id={}", graph_id(&params)));
    Json(json!({ "success": true }))
}

async fn label_false(State(fake): State<Shared>, Query(params): Params) -> Json<serde_json::Value> {
    fake.record(format!("GET /labelFalse graph_id={}", graph_id(&params)));
    Json(json!({ "success": true }))
}

async fn further_cluster(State(fake): State<Shared>, Query(params): Params) -> Json<serde_json::Value> {
    let cluster = params.get("cluster_no").cloned().unwrap_or_default();
    fake.record(format!("POST /furtherCluster cluster_no={}", cluster));
    Json(json!({ "success": true }))
}

async fn label_graph_id(State(fake): State<Shared>) -> Json<serde_json::Value> {
    fake.record("GET /getLabelGraphId".to_string());
    Json(json!({
        "labels": [1, 0, 1],
        "cluster_id": [0, -1, 2, 1],
    }))
}

async fn cluster_count(State(fake): State<Shared>) -> Json<serde_json::Value> {
    fake.record("GET /getNoOfClusters".to_string());
    Json(json!({ "no_of_clusters": 5 }))
}

/// Start the fake service and a client pointed at it
async fn start_fake_service() -> (Shared, ClusterServiceClient) {
    let fake: Shared = Arc::new(FakeService::default());

    let app = Router::new()
        .route("/upload", post(upload))
        .route("/getFarthestGraph", get(farthest))
        .route("/getClosestGraph", get(closest))
        .route("/labelTrue", get(label_true))
        .route("/labelFalse", get(label_false))
        .route("/furtherCluster", post(further_cluster))
        .route("/getLabelGraphId", get(label_graph_id))
        .route("/getNoOfClusters", get(cluster_count))
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Trailing slash is tolerated
    let client =
        ClusterServiceClient::new(format!("http://{}/", addr), Duration::from_secs(5)).unwrap();
    (fake, client)
}

#[tokio::test]
async fn test_upload_sends_file_part_and_returns_expected_graph() {
    let (fake, client) = start_fake_service().await;

    let file = UploadFile::new("wells.csv", b"1,2,3\n4,5,6\n".to_vec());
    let expected = client.upload(&file).await.unwrap();

    assert_eq!(expected.index, 1);
    assert_eq!(expected.annotation.peaks(), &[3, 17]);
    assert_eq!(expected.annotation.peak_heights(), &[0.8, 0.4]);
    assert_eq!(expected.annotation.valleys(), &[9]);

    let (field, file_name, bytes) = fake.uploaded.lock().unwrap().clone().unwrap();
    assert_eq!(field, "file");
    assert_eq!(file_name, "wells.csv");
    assert_eq!(bytes, b"1,2,3\n4,5,6\n".to_vec());
}

#[tokio::test]
async fn test_farthest_parses_quoted_distance() {
    let (fake, client) = start_fake_service().await;

    match client.fetch_farthest(0).await.unwrap() {
        FetchOutcome::Candidate { graph, distance } => {
            assert_eq!(graph.index, 3);
            assert_eq!(distance, 12.5);
            assert_eq!(graph.annotation.peak_points().collect::<Vec<_>>(), vec![(5, 1.25)]);
        }
        other => panic!("expected a candidate, got {:?}", other),
    }

    assert_eq!(
        fake.requests.lock().unwrap().clone(),
        vec!["GET /getFarthestGraph graph_id=0".to_string()]
    );
}

#[tokio::test]
async fn test_sentinel_becomes_exhausted() {
    let (_fake, client) = start_fake_service().await;

    assert_eq!(client.fetch_farthest(1).await.unwrap(), FetchOutcome::Exhausted);
}

#[tokio::test]
async fn test_closest_accepts_numeric_distance() {
    let (_fake, client) = start_fake_service().await;

    match client.fetch(ComparisonMode::Closest, 2).await.unwrap() {
        FetchOutcome::Candidate { graph, distance } => {
            assert_eq!(graph.index, 4);
            assert_eq!(distance, 0.25);
            assert_eq!(
                graph.annotation.valley_points().collect::<Vec<_>>(),
                vec![(2, 0.3), (6, 0.1)]
            );
        }
        other => panic!("expected a candidate, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_surfaces_status() {
    let (_fake, client) = start_fake_service().await;

    match client.fetch_farthest(9).await {
        Err(FetchError::Api(status, body)) => {
            assert_eq!(status, 500);
            assert_eq!(body, "model not fitted");
        }
        other => panic!("expected an API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_acknowledgements_hit_their_endpoints() {
    let (fake, client) = start_fake_service().await;

    client.label_true(0).await.unwrap();
    client.label_false(1).await.unwrap();
    client.request_split(2).await.unwrap();

    assert_eq!(
        fake.requests.lock().unwrap().clone(),
        vec![
            "GET /labelTrue graph_id=0".to_string(),
            "GET /labelFalse graph_id=1".to_string(),
            "POST /furtherCluster cluster_no=2".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_label_assignments_map_negative_ids_to_unassigned() {
    let (_fake, client) = start_fake_service().await;

    let assignments = client.fetch_label_assignments().await.unwrap();
    assert_eq!(assignments.cluster_labels, vec![1, 0, 1]);
    assert_eq!(
        assignments.rows.iter().map(|r| r.cluster).collect::<Vec<_>>(),
        vec![Some(0), None, Some(2), Some(1)]
    );
    assert_eq!(assignments.rows[3].row_index, 3);
}

#[tokio::test]
async fn test_cluster_count() {
    let (_fake, client) = start_fake_service().await;

    assert_eq!(client.cluster_count().await.unwrap(), 5);
}

#[tokio::test]
async fn test_unreachable_service_is_network_error() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client =
        ClusterServiceClient::new(format!("http://{}", addr), Duration::from_secs(2)).unwrap();

    assert!(matches!(
        client.fetch_closest(0).await,
        Err(FetchError::Network(_))
    ));
    assert!(matches!(
        client
            .upload(&UploadFile::new("wells.csv", b"1\n".to_vec()))
            .await,
        Err(UploadError::Network(_))
    ));
}
