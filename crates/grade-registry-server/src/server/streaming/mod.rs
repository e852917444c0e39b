//! Incremental delivery of `ListGrades` results.
//!
//! - [`coordinator`] - Emits a snapshot of a student's records into the gRPC
//!   response channel one at a time.

pub mod coordinator;
