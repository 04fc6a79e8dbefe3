//! Test Helper Utilities
//!
//! Shared utilities for testing wellrev-review

#![allow(dead_code)]

pub mod scripted_gateway;

pub use scripted_gateway::{Call, Scripted, ScriptedGateway};

use std::sync::Arc;
use wellrev_common::events::EventBus;
use wellrev_review::services::UploadFile;
use wellrev_review::workflow::WorkflowController;

/// Five-row dataset used by most workflow tests
pub const FIVE_ROWS: &str = "0.1,0.2,0.3\n1.0,1.1,1.2\n2.0,2.1,2.2\n3.0,3.1,3.2\n4.0,4.1,4.2\n";

pub fn five_row_upload() -> UploadFile {
    UploadFile::new("wells.csv", FIVE_ROWS.as_bytes().to_vec())
}

/// Controller over `gateway` with the default baseline of 3 clusters
pub fn create_controller(gateway: Arc<ScriptedGateway>) -> Arc<WorkflowController> {
    Arc::new(WorkflowController::new(gateway, EventBus::new(100), 3))
}

/// Wait until the controller has an operation in flight
pub async fn wait_until_busy(controller: &WorkflowController) {
    for _ in 0..1000 {
        if controller.is_busy() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("controller never became busy");
}
