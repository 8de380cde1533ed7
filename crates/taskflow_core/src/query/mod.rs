//! In-memory views over loaded tasks (lists, boards, calendars).

pub mod filter;
