//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep UI/FFI layers decoupled from storage details.
//!
//! # Invariants
//! - Services read "now" from an injected [`crate::clock::Clock`] so tests
//!   stay deterministic.

pub mod dependency_service;
pub mod project_service;
pub mod recurrence;
pub mod tag_service;
pub mod task_service;
pub mod template_service;
