//! Subject identity and session assignment
//!
//! Groups records by subject key, orders each subject's distinct acquisition
//! dates and numbers them as sessions `1..N`. A subject scanned on a single
//! date gets an empty session label.

mod sessions;

pub use sessions::{resolve_sessions, SessionAssignment, SessionEntry, SubjectInfo};
