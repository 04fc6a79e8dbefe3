//! # wellrev Common Library
//!
//! Shared code for the wellrev review service:
//! - Error type and `Result` alias
//! - Configuration loading (TOML, environment, compiled defaults)
//! - Review enums shared by the session model and the event stream
//! - Review event types and the broadcast EventBus
//! - Server-Sent Events helper

pub mod config;
pub mod error;
pub mod events;
pub mod review_types;
pub mod sse;

pub use error::{Error, Result};
pub use review_types::{ComparisonMode, Phase};
