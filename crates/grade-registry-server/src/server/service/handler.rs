//! gRPC service implementation for the grade registry.
//!
//! This module defines [`GradeService`], the concrete implementation of the
//! [`GradeRegistry`] gRPC service defined in `grades.proto`.
//!
//! ## Responsibilities
//!
//! - Validate request shape (non-empty identifiers) before the registry is
//!   touched.
//! - Dispatch each call to the shared [`StudentRegistry`].
//! - Render domain misses as `success = false` responses and faults as non-OK
//!   statuses.
//! - Stream `ListGrades` results from a snapshot via [`feed_grades`].

use crate::server::{
    config::ServerConfig,
    registry::StudentRegistry,
    service::lifecycle::Lifecycle,
    streaming::coordinator::feed_grades,
    telemetry::{
        increment_domain_misses, increment_grades_streamed, increment_requests,
        increment_stream_errors, record_stream_duration,
    },
};
use core::{pin::Pin, time::Duration};
use grade_registry_core::{
    Error,
    proto::{
        AverageResponse, Grade, GradeRequest, QueryGradeResponse, StatusResponse,
        StudentDisciplineRequest, StudentRequest, grade_registry_server::GradeRegistry,
    },
    types::{GradeRecord, RecordKey},
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::{Stream, wrappers::ReceiverStream};
use tonic::{Request, Response, Status};

const ADD_GRADE: &str = "add_grade";
const AMEND_GRADE: &str = "amend_grade";
const QUERY_GRADE: &str = "query_grade";
const COMPUTE_AVERAGE: &str = "compute_average";
const LIST_GRADES: &str = "list_grades";

/// gRPC front end of the grade registry.
///
/// Cloning is cheap: every clone shares the same registry and lifecycle.
#[derive(Clone, Debug)]
pub struct GradeService {
    config: ServerConfig,
    registry: Arc<StudentRegistry>,
    lifecycle: Arc<Lifecycle>,
}

impl GradeService {
    /// Creates a service over a fresh, empty registry.
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(StudentRegistry::new(config.duplicate_policy));
        Self::with_registry(config, registry)
    }

    pub fn with_registry(config: ServerConfig, registry: Arc<StudentRegistry>) -> Self {
        let lifecycle = Arc::new(Lifecycle::new(Duration::from_secs(
            config.shutdown_timeout,
        )));
        Self {
            config,
            registry,
            lifecycle,
        }
    }

    pub fn registry(&self) -> &Arc<StudentRegistry> {
        &self.registry
    }

    #[cfg(test)]
    pub fn streams_inflight(&self) -> usize {
        self.lifecycle.streams_inflight()
    }

    /// Refuses new calls, drains in-flight streams and cancels the rest.
    pub async fn shutdown(&self) {
        self.lifecycle.shutdown().await;
    }
}

fn require_non_empty(field: &str, value: &str) -> grade_registry_core::Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidRequest {
            reason: format!("{field} must not be empty"),
        });
    }
    Ok(())
}

/// Renders a mutation result as a `StatusResponse`.
fn status_response(
    operation: &'static str,
    result: grade_registry_core::Result<()>,
    success_message: &str,
) -> Result<Response<StatusResponse>, Status> {
    match result {
        Ok(()) => Ok(Response::new(StatusResponse {
            success: true,
            message: success_message.to_string(),
        })),
        Err(e) if e.is_domain_miss() => {
            increment_domain_misses(operation);
            #[cfg(feature = "tracing")]
            tracing::debug!("{operation} miss: {e}");
            Ok(Response::new(StatusResponse {
                success: false,
                message: e.to_string(),
            }))
        }
        Err(e) => Err(e.into()),
    }
}

#[tonic::async_trait]
impl GradeRegistry for GradeService {
    type ListGradesStream = Pin<Box<dyn Stream<Item = Result<Grade, Status>> + Send>>;

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(student_id = %req.get_ref().student_id, discipline_code = %req.get_ref().discipline_code)))]
    async fn add_grade(
        &self,
        req: Request<GradeRequest>,
    ) -> Result<Response<StatusResponse>, Status> {
        self.lifecycle.ensure_serving()?;
        let req = req.into_inner();
        require_non_empty("student_id", &req.student_id)?;
        require_non_empty("discipline_code", &req.discipline_code)?;
        increment_requests(ADD_GRADE);

        let result = self.registry.add(GradeRecord::from(req));
        status_response(ADD_GRADE, result, "Grade added successfully")
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(student_id = %req.get_ref().student_id, discipline_code = %req.get_ref().discipline_code)))]
    async fn amend_grade(
        &self,
        req: Request<GradeRequest>,
    ) -> Result<Response<StatusResponse>, Status> {
        self.lifecycle.ensure_serving()?;
        let req = req.into_inner();
        require_non_empty("student_id", &req.student_id)?;
        require_non_empty("discipline_code", &req.discipline_code)?;
        increment_requests(AMEND_GRADE);

        let key = RecordKey {
            discipline_code: &req.discipline_code,
            year: req.year,
            term: req.term,
        };
        let result = self
            .registry
            .amend(&req.student_id, key, req.score)
            .map(|_| ());
        status_response(AMEND_GRADE, result, "Grade amended successfully")
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(student_id = %req.get_ref().student_id, discipline_code = %req.get_ref().discipline_code)))]
    async fn query_grade(
        &self,
        req: Request<StudentDisciplineRequest>,
    ) -> Result<Response<QueryGradeResponse>, Status> {
        self.lifecycle.ensure_serving()?;
        let req = req.into_inner();
        require_non_empty("student_id", &req.student_id)?;
        require_non_empty("discipline_code", &req.discipline_code)?;
        increment_requests(QUERY_GRADE);

        let resp = match self.registry.query(&req.student_id, &req.discipline_code) {
            Ok(record) => QueryGradeResponse {
                success: true,
                grade: Some(record.into()),
                error_message: String::new(),
            },
            Err(e) if e.is_domain_miss() => {
                increment_domain_misses(QUERY_GRADE);
                QueryGradeResponse {
                    success: false,
                    grade: None,
                    error_message: e.to_string(),
                }
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Response::new(resp))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(student_id = %req.get_ref().student_id)))]
    async fn compute_average(
        &self,
        req: Request<StudentRequest>,
    ) -> Result<Response<AverageResponse>, Status> {
        self.lifecycle.ensure_serving()?;
        let req = req.into_inner();
        require_non_empty("student_id", &req.student_id)?;
        increment_requests(COMPUTE_AVERAGE);

        let resp = match self.registry.average(&req.student_id) {
            Ok(average) => AverageResponse {
                success: true,
                average,
                error_message: String::new(),
            },
            Err(e) if e.is_domain_miss() => {
                increment_domain_misses(COMPUTE_AVERAGE);
                AverageResponse {
                    success: false,
                    average: 0.0,
                    error_message: e.to_string(),
                }
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Response::new(resp))
    }

    /// Streams every record of the student in insertion order.
    ///
    /// The student's sequence is copied under one short read lock, then a
    /// spawned producer emits the copy through a bounded channel. An unknown
    /// student yields an empty stream that completes with an OK status.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(student_id = %req.get_ref().student_id)))]
    async fn list_grades(
        &self,
        req: Request<StudentRequest>,
    ) -> Result<Response<Self::ListGradesStream>, Status> {
        let start = std::time::Instant::now();
        self.lifecycle.ensure_serving()?;
        let StudentRequest { student_id } = req.into_inner();
        require_non_empty("student_id", &student_id)?;
        increment_requests(LIST_GRADES);

        let grades = self.registry.snapshot(&student_id);
        let guard = self.lifecycle.track_stream();
        let shutdown = self.lifecycle.shutdown_token();
        let (resp_tx, resp_rx) =
            mpsc::channel::<Result<Grade, Status>>(self.config.stream_buffer_size);

        let fut = async move {
            let _guard = guard;
            match feed_grades(grades, resp_tx, shutdown).await {
                Ok(outcome) => {
                    increment_grades_streamed(outcome.sent() as u64);
                    record_stream_duration(start.elapsed().as_millis() as f64);
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Stream finished: {:?}", outcome);
                }
                Err(_e) => {
                    increment_stream_errors();
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Stream aborted: {}", _e);
                }
            }
        };
        #[cfg(feature = "tracing")]
        let fut = {
            use tracing::Instrument;
            fut.instrument(tracing::info_span!("streaming"))
        };

        tokio::spawn(fut);

        Ok(Response::new(Box::pin(ReceiverStream::new(resp_rx))))
    }
}
