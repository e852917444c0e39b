//! Shared protocol, domain types and errors for the grade registry.
//!
//! - [`proto`] - Generated Protobuf messages, client and server bindings.
//! - [`types`] - Domain representation of grade records and record keys.
//! - [`error`] - Unified error type and its mapping onto gRPC statuses.

pub mod error;
pub mod types;

pub use error::{Error, Result};

/// gRPC service and message definitions generated from `proto/grades.proto`.
///
/// ## Service
///
/// - `GradeRegistry` - five operations over an in-memory grade registry:
///   `AddGrade`, `AmendGrade`, `QueryGrade`, `ComputeAverage` and the
///   server-streaming `ListGrades`.
///
/// Non-streaming responses carry an application-level `success` flag. A
/// `success = false` response is a normal domain outcome (for example, a
/// missing record) and is delivered with an OK call status. Non-OK statuses
/// are reserved for transport and service faults.
pub mod proto {
    tonic::include_proto!("grades");

    /// Encoded file descriptor set for gRPC reflection.
    pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("grades_descriptor");
}
