//! Domain model for tasks and the records that organize them.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep lifecycle and validation rules next to the data they guard.
//!
//! # Invariants
//! - Every domain object is identified by a stable UUID.
//! - Timestamps are Unix epoch milliseconds.

pub mod category;
pub mod project;
pub mod recurrence;
pub mod task;
pub mod template;
