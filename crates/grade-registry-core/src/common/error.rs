//! Error types for the grade registry service.
//!
//! This module defines the central `Error` enum, which captures every
//! recoverable outcome of a registry call. Two families exist:
//!
//! ## Domain misses
//! Expected outcomes that the handler renders as `success = false` plus a
//! human-readable message. They never become a non-OK call status.
//! - `StudentNotFound`: no sequence exists for the student.
//! - `DisciplineNotFound`: the student has no record in the discipline.
//! - `RecordNotFound`: no record matches the `(discipline, year, term)` key.
//! - `NoGrades`: the student has no records to average.
//! - `DuplicateRecord`: the key already exists and duplicates are rejected.
//!
//! ## Faults
//! Reported to the caller as a non-OK `tonic::Status`.
//! - `InvalidRequest`: the request failed shape validation.
//! - `ChannelError`: an internal communication failure between tasks.
//! - `ServiceShutdown`: a call arrived while the service was shutting down.

use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the grade registry service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("No grades registered for student {student_id}")]
    StudentNotFound { student_id: String },

    #[error("Grade not found for student {student_id} in discipline {discipline_code}")]
    DisciplineNotFound {
        student_id: String,
        discipline_code: String,
    },

    #[error("Grade not found for student {student_id} at {key}; add it before amending")]
    RecordNotFound { student_id: String, key: String },

    #[error("No grades found to average for student {student_id}")]
    NoGrades { student_id: String },

    #[error("Grade already exists for student {student_id} at {key}; use AmendGrade")]
    DuplicateRecord { student_id: String, key: String },

    /// The client request was malformed.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// Internal channel send/receive failure (e.g., closed channel).
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl Error {
    /// Whether this is an expected domain outcome rather than a fault.
    pub const fn is_domain_miss(&self) -> bool {
        matches!(
            self,
            Self::StudentNotFound { .. }
                | Self::DisciplineNotFound { .. }
                | Self::RecordNotFound { .. }
                | Self::NoGrades { .. }
                | Self::DuplicateRecord { .. }
        )
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::StudentNotFound { .. }
            | Error::DisciplineNotFound { .. }
            | Error::RecordNotFound { .. }
            | Error::NoGrades { .. } => Status::not_found(err.to_string()),
            Error::DuplicateRecord { .. } => Status::already_exists(err.to_string()),
            Error::InvalidRequest { reason } => Status::invalid_argument(reason),
            Error::ChannelError { context } => {
                Status::internal(format!("Channel error: {}", context))
            }
            Error::ServiceShutdown => Status::unavailable("Service is shutting down"),
        }
    }
}
