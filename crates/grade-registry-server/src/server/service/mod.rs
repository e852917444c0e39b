//! gRPC service implementation and serving lifecycle.
//!
//! ## Structure
//!
//! - [`handler`] - gRPC service entry point (`GradeService`).
//! - [`lifecycle`] - In-flight stream tracking and graceful shutdown.

pub mod handler;
pub mod lifecycle;
