//! In-memory clustering service
//!
//! Replies from a script and records every call so tests can assert on the
//! exact traffic the workflow produced.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use wellrev_review::models::{GraphAnnotation, GraphRef};
use wellrev_review::services::{
    ClusterGateway, FetchError, FetchOutcome, LabelAssignments, UploadError, UploadFile,
};

/// One recorded gateway call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Upload(String),
    Farthest(usize),
    Closest(usize),
    LabelTrue(usize),
    LabelFalse(usize),
    Split(usize),
    LabelAssignments,
    ClusterCount,
}

/// Scripted reply to the next farthest/closest query
#[derive(Debug, Clone, Copy)]
pub enum Scripted {
    Candidate(usize, f64),
    Sentinel,
    Fail,
}

pub struct ScriptedGateway {
    expected_index: usize,
    upload_fails: bool,
    acknowledgements_fail: AtomicBool,
    fetches: Mutex<VecDeque<Scripted>>,
    assignments: Mutex<LabelAssignments>,
    calls: Mutex<Vec<Call>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedGateway {
    /// Gateway whose upload picks `expected_index` and whose fetches reply in order
    pub fn new(expected_index: usize, fetches: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            expected_index,
            upload_fails: false,
            acknowledgements_fail: AtomicBool::new(false),
            fetches: Mutex::new(fetches.into_iter().collect()),
            assignments: Mutex::new(LabelAssignments::default()),
            calls: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
        }
    }

    /// Gateway whose upload is rejected by the service
    pub fn failing_upload() -> Self {
        Self {
            upload_fails: true,
            ..Self::new(0, [])
        }
    }

    /// Make labelTrue/labelFalse/furtherCluster fail from now on
    pub fn fail_acknowledgements(&self) {
        self.acknowledgements_fail.store(true, Ordering::SeqCst);
    }

    pub fn push_fetch(&self, reply: Scripted) {
        self.fetches.lock().unwrap().push_back(reply);
    }

    pub fn set_assignments(&self, assignments: LabelAssignments) {
        *self.assignments.lock().unwrap() = assignments;
    }

    /// Hold every following fetch until the returned handle is notified
    pub fn hold_fetches(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn release_fetches(&self) {
        *self.gate.lock().unwrap() = None;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Number of recorded calls equal to `call`
    pub fn count(&self, call: &Call) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn acknowledge(&self, call: Call) -> Result<(), FetchError> {
        self.record(call);
        if self.acknowledgements_fail.load(Ordering::SeqCst) {
            return Err(FetchError::Api(503, "scripted acknowledgement failure".to_string()));
        }
        Ok(())
    }

    async fn next_fetch(&self) -> Result<FetchOutcome, FetchError> {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let reply = self.fetches.lock().unwrap().pop_front();
        match reply {
            Some(Scripted::Candidate(index, distance)) => Ok(FetchOutcome::Candidate {
                graph: GraphRef::new(index, GraphAnnotation::default()),
                distance,
            }),
            Some(Scripted::Sentinel) => Ok(FetchOutcome::Exhausted),
            Some(Scripted::Fail) => Err(FetchError::Api(500, "scripted failure".to_string())),
            None => Err(FetchError::Network("fetch script exhausted".to_string())),
        }
    }
}

#[async_trait]
impl ClusterGateway for ScriptedGateway {
    async fn upload(&self, file: &UploadFile) -> Result<GraphRef, UploadError> {
        self.record(Call::Upload(file.file_name.clone()));
        if self.upload_fails {
            return Err(UploadError::Api(500, "scripted upload failure".to_string()));
        }
        Ok(GraphRef::new(self.expected_index, GraphAnnotation::default()))
    }

    async fn fetch_farthest(&self, cluster: usize) -> Result<FetchOutcome, FetchError> {
        self.record(Call::Farthest(cluster));
        self.next_fetch().await
    }

    async fn fetch_closest(&self, cluster: usize) -> Result<FetchOutcome, FetchError> {
        self.record(Call::Closest(cluster));
        self.next_fetch().await
    }

    async fn label_true(&self, cluster: usize) -> Result<(), FetchError> {
        self.acknowledge(Call::LabelTrue(cluster))
    }

    async fn label_false(&self, cluster: usize) -> Result<(), FetchError> {
        self.acknowledge(Call::LabelFalse(cluster))
    }

    async fn request_split(&self, cluster: usize) -> Result<(), FetchError> {
        self.acknowledge(Call::Split(cluster))
    }

    async fn fetch_label_assignments(&self) -> Result<LabelAssignments, FetchError> {
        self.record(Call::LabelAssignments);
        Ok(self.assignments.lock().unwrap().clone())
    }

    async fn cluster_count(&self) -> Result<u32, FetchError> {
        self.record(Call::ClusterCount);
        Ok(4)
    }
}
