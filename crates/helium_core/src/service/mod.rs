//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep callers (CLI, future HTTP layer) decoupled from storage details.

pub mod newsletter_service;
pub mod subscriber_service;
