//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate validation, repository calls and scoring into use-case
//!   level APIs.
//! - Keep callers (HTTP handlers, CLI) decoupled from storage details.

pub mod question_service;
pub mod test_service;
