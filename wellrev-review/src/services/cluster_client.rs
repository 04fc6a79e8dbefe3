//! Clustering service HTTP client
//!
//! Talks to the clustering service over its JSON endpoints:
//!
//! | Operation | Request |
//! |---|---|
//! | upload | `POST /upload` (multipart, part `file`) |
//! | request_split | `POST /furtherCluster?cluster_no=N` |
//! | fetch_farthest | `GET /getFarthestGraph?graph_id=N` |
//! | fetch_closest | `GET /getClosestGraph?graph_id=N` |
//! | label_true / label_false | `GET /labelTrue?graph_id=N`, `GET /labelFalse?graph_id=N` |
//! | fetch_label_assignments | `GET /getLabelGraphId` |
//! | cluster_count | `GET /getNoOfClusters` |
//!
//! Negative graph indices and cluster ids are the service's sentinel and are
//! converted to [`FetchOutcome::Exhausted`] / `None` here.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::time::Duration;

use crate::models::{GraphAnnotation, GraphRef};
use crate::services::cluster_gateway::{
    ClusterGateway, FetchError, FetchOutcome, LabelAssignments, RowAssignment, UploadError,
    UploadFile,
};

const USER_AGENT: &str = concat!("wellrev/", env!("CARGO_PKG_VERSION"));

/// Graph payload shared by the upload, farthest and closest endpoints
#[derive(Debug, Clone, Deserialize)]
struct GraphResponse {
    #[serde(alias = "expected_graph", alias = "farthest_graph", alias = "closest_graph")]
    graph: i64,
    #[serde(default)]
    peaks: Vec<usize>,
    #[serde(default)]
    peak_heights: Vec<f64>,
    #[serde(default)]
    valleys: Vec<usize>,
    #[serde(default)]
    valley_heights: Vec<f64>,
    #[serde(default, deserialize_with = "deserialize_distance")]
    euclidean_dist: Option<f64>,
}

/// `GET /getLabelGraphId` payload
#[derive(Debug, Clone, Deserialize)]
struct LabelGraphResponse {
    #[serde(default)]
    labels: Vec<i64>,
    cluster_id: Vec<i64>,
}

/// `GET /getNoOfClusters` payload
#[derive(Debug, Clone, Deserialize)]
struct ClusterCountResponse {
    no_of_clusters: u32,
}

/// The service serializes distances as `json.dumps(str(dist))`, i.e. a
/// string that may itself be wrapped in quotes. Plain numbers are accepted too.
fn deserialize_distance<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    parse_distance(&value).map_err(serde::de::Error::custom)
}

fn parse_distance(value: &Value) -> Result<Option<f64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| format!("distance {} is not representable as f64", n)),
        Value::String(s) => s
            .trim()
            .trim_matches('"')
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|e| format!("distance {:?} is not a number: {}", s, e)),
        other => Err(format!("unexpected distance value {}", other)),
    }
}

fn annotated_graph(index: usize, response: GraphResponse) -> Result<GraphRef, String> {
    let annotation = GraphAnnotation::new(
        response.peaks,
        response.peak_heights,
        response.valleys,
        response.valley_heights,
    )
    .map_err(|e| e.to_string())?;
    Ok(GraphRef::new(index, annotation))
}

fn candidate_from_response(response: GraphResponse) -> Result<FetchOutcome, FetchError> {
    if response.graph < 0 {
        return Ok(FetchOutcome::Exhausted);
    }

    let index = response.graph as usize;
    let distance = response.euclidean_dist.unwrap_or(0.0);
    let graph = annotated_graph(index, response).map_err(FetchError::Malformed)?;
    Ok(FetchOutcome::Candidate { graph, distance })
}

fn expected_from_response(response: GraphResponse) -> Result<GraphRef, UploadError> {
    if response.graph < 0 {
        return Err(UploadError::Malformed(format!(
            "expected_graph is the sentinel ({})",
            response.graph
        )));
    }

    let index = response.graph as usize;
    annotated_graph(index, response).map_err(UploadError::Malformed)
}

fn assignments_from_response(response: LabelGraphResponse) -> LabelAssignments {
    let rows = response
        .cluster_id
        .iter()
        .enumerate()
        .map(|(row_index, &cluster)| RowAssignment {
            row_index,
            cluster: usize::try_from(cluster).ok(),
        })
        .collect();

    LabelAssignments {
        cluster_labels: response.labels,
        rows,
    }
}

fn network_error(e: reqwest::Error) -> String {
    if e.is_timeout() {
        format!("request timed out: {}", e)
    } else {
        e.to_string()
    }
}

/// Clustering service API client
pub struct ClusterServiceClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl ClusterServiceClient {
    /// Create a client for the service at `base_url` (e.g. `http://127.0.0.1:5000`)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    /// Send a request and fail on transport errors and non-2xx statuses
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, FetchError> {
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Network(network_error(e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(FetchError::Api(status.as_u16(), error_text));
        }

        Ok(response)
    }

    async fn get_json<T>(&self, endpoint: &str, query: &[(&str, String)]) -> Result<T, FetchError>
    where
        T: serde::de::DeserializeOwned,
    {
        tracing::debug!(endpoint, ?query, "Querying clustering service");

        let response = self
            .send(self.http_client.get(self.url(endpoint)).query(query))
            .await?;

        response
            .json::<T>()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))
    }

    async fn fetch_graph(&self, endpoint: &str, cluster: usize) -> Result<FetchOutcome, FetchError> {
        let response: GraphResponse = self
            .get_json(endpoint, &[("graph_id", cluster.to_string())])
            .await?;
        let outcome = candidate_from_response(response)?;

        match &outcome {
            FetchOutcome::Candidate { graph, distance } => tracing::debug!(
                endpoint,
                cluster,
                candidate = graph.index,
                distance,
                "Candidate received"
            ),
            FetchOutcome::Exhausted => tracing::debug!(endpoint, cluster, "Sentinel received"),
        }

        Ok(outcome)
    }

    async fn acknowledge(&self, endpoint: &str, cluster: usize) -> Result<(), FetchError> {
        tracing::debug!(endpoint, cluster, "Sending acknowledgement");
        self.send(
            self.http_client
                .get(self.url(endpoint))
                .query(&[("graph_id", cluster.to_string())]),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ClusterGateway for ClusterServiceClient {
    async fn upload(&self, file: &UploadFile) -> Result<GraphRef, UploadError> {
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str("text/csv")
            .map_err(|e| UploadError::Network(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        tracing::debug!(
            file_name = %file.file_name,
            bytes = file.bytes.len(),
            "Uploading dataset to clustering service"
        );

        let response = self
            .http_client
            .post(self.url("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Network(network_error(e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(UploadError::Api(status.as_u16(), error_text));
        }

        let body: GraphResponse = response
            .json()
            .await
            .map_err(|e| UploadError::Parse(e.to_string()))?;

        let expected = expected_from_response(body)?;
        tracing::info!(expected = expected.index, "Upload accepted by clustering service");
        Ok(expected)
    }

    async fn fetch_farthest(&self, cluster: usize) -> Result<FetchOutcome, FetchError> {
        self.fetch_graph("getFarthestGraph", cluster).await
    }

    async fn fetch_closest(&self, cluster: usize) -> Result<FetchOutcome, FetchError> {
        self.fetch_graph("getClosestGraph", cluster).await
    }

    async fn label_true(&self, cluster: usize) -> Result<(), FetchError> {
        self.acknowledge("labelTrue", cluster).await
    }

    async fn label_false(&self, cluster: usize) -> Result<(), FetchError> {
        self.acknowledge("labelFalse", cluster).await
    }

    async fn request_split(&self, cluster: usize) -> Result<(), FetchError> {
        tracing::debug!(cluster, "Requesting cluster split");
        self.send(
            self.http_client
                .post(self.url("furtherCluster"))
                .query(&[("cluster_no", cluster.to_string())]),
        )
        .await?;
        Ok(())
    }

    async fn fetch_label_assignments(&self) -> Result<LabelAssignments, FetchError> {
        let response: LabelGraphResponse = self.get_json("getLabelGraphId", &[]).await?;
        Ok(assignments_from_response(response))
    }

    async fn cluster_count(&self) -> Result<u32, FetchError> {
        let response: ClusterCountResponse = self.get_json("getNoOfClusters", &[]).await?;
        Ok(response.no_of_clusters)
    }
}
