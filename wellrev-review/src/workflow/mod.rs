//! Review workflow
//!
//! - `transition`: pure decision procedure over [`SessionState`](crate::models::SessionState)
//! - `controller`: async controller that dispatches gateway calls and applies results

pub mod controller;
pub mod transition;

pub use controller::{ReviewView, WorkflowController, WorkflowError};
pub use transition::{Acknowledgement, Answer, FetchRequest, Rejection, Transition};
