//! Text-generation provider gateway
//!
//! One operation: turn a prompt into text, walking an ordered model list
//! until one succeeds. Provider quirks (quota errors, safety refusals,
//! loosely shaped replies) are normalized here so nothing unvalidated leaks
//! into the pipeline.

pub mod client;
pub mod models;

pub use client::{ProviderClient, TextGenerator};
pub use models::GenerateReply;
