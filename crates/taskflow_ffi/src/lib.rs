//! Flutter bridge for the TaskFlow core.

pub mod api;
