use grade_registry_core::{Error, proto::Grade, types::GradeRecord};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tonic::Status;

/// How a `ListGrades` stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Every record was handed to the transport.
    Completed { sent: usize },
    /// The client stopped listening. This is a normal early stop.
    ClientDisconnected { sent: usize },
}

impl StreamOutcome {
    pub const fn sent(self) -> usize {
        match self {
            Self::Completed { sent } | Self::ClientDisconnected { sent } => sent,
        }
    }
}

/// Emits a snapshot of a student's records to the response stream.
///
/// The snapshot is owned, so the registry lock is not held while records are
/// in flight. Records are sent one at a time; between sends the producer
/// checks for client disconnect (the receiver was dropped) and for service
/// shutdown.
///
/// # Arguments
///
/// - `grades`: The student's records, in insertion order.
/// - `resp_tx`: Channel feeding the gRPC response stream.
/// - `shutdown`: Cancelled when the service gives up draining streams.
///
/// # Errors
///
/// Returns [`Error::ServiceShutdown`] if the service shut down mid-stream. A
/// best-effort `UNAVAILABLE` status is pushed to the client first.
pub async fn feed_grades(
    grades: Vec<GradeRecord>,
    resp_tx: mpsc::Sender<Result<Grade, Status>>,
    shutdown: CancellationToken,
) -> grade_registry_core::Result<StreamOutcome> {
    let mut sent = 0;

    for record in grades {
        tokio::select! {
            biased;

            () = shutdown.cancelled() => {
                // The buffer may be full; never wait on a client that is not
                // reading while the server is going down.
                if let Err(_e) = resp_tx.try_send(Err(Error::ServiceShutdown.into())) {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Failed to forward shutdown status: {}", _e);
                }
                return Err(Error::ServiceShutdown);
            }
            res = resp_tx.send(Ok(record.into())) => {
                if res.is_err() {
                    // typically "channel closed" (client disconnect)
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Client stopped listening after {} grades", sent);
                    return Ok(StreamOutcome::ClientDisconnected { sent });
                }
                sent += 1;
            }
        }
    }

    Ok(StreamOutcome::Completed { sent })
}
