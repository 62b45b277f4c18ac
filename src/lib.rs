//! Testforge library crate
//!
//! Core workflow for browsing a GitHub repository, generating test cases
//! for selected files through an AI provider, and publishing the result as
//! a pull request. Presentation is left to the embedding shell; this crate
//! owns the state machines, the gateway clients, and the publish sequence.

pub mod ai;
pub mod browser;
pub mod config;
pub mod error;
pub mod github;
pub mod history;
pub mod pipeline;
pub mod publish;
pub mod selection;
pub mod session;
pub mod util;
