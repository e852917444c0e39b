use anyhow::bail;
use clap::{Parser, ValueEnum};

/// How `AddGrade` treats a record whose `(discipline, year, term)` key the
/// student already holds.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Append the record anyway. Amend and query then resolve to the first
    /// inserted match.
    #[default]
    Append,
    /// Refuse the record with `success = false` and leave the registry as is.
    Reject,
}

/// Runtime configuration for the `grade-registry-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file is loaded first), with defaults suitable for a single local
/// deployment.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "grade-registry-server",
    version,
    about = "A gRPC service for registering and querying student grades"
)]
pub struct CliArgs {
    /// Address to listen on (TCP or Unix socket path; use --uds for Unix socket).
    ///
    /// Example: "0.0.0.0:50052" or "/tmp/grade-registry.sock"
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:50052"))]
    pub server_addr: String,

    /// Listen on a Unix socket instead of TCP. If set, `SERVER_ADDR` must be a file path.
    #[arg(short, long, default_value_t = false)]
    pub uds: bool,

    /// Capacity of the buffer between the `ListGrades` producer and the gRPC
    /// stream.
    ///
    /// Bounds how many records are queued ahead of a slow client.
    ///
    /// Environment variable: `STREAM_BUFFER_SIZE`
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 8)]
    pub stream_buffer_size: usize,

    /// Seconds to wait for in-flight `ListGrades` streams to finish during
    /// shutdown before cancelling them.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,

    /// Behavior of `AddGrade` when the key already exists for the student.
    ///
    /// Environment variable: `DUPLICATE_POLICY`
    #[arg(long, env = "DUPLICATE_POLICY", value_enum, default_value_t = DuplicatePolicy::Append)]
    pub duplicate_policy: DuplicatePolicy,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub uds: bool,
    pub stream_buffer_size: usize,
    pub shutdown_timeout: u64,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_addr: String::from("0.0.0.0:50052"),
            uds: false,
            stream_buffer_size: 8,
            shutdown_timeout: 3,
            duplicate_policy: DuplicatePolicy::Append,
        }
    }
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.stream_buffer_size == 0 {
            bail!("STREAM_BUFFER_SIZE must be greater than 0");
        }

        if args.server_addr.trim().is_empty() {
            bail!("SERVER_ADDR must not be empty");
        }

        Ok(Self {
            server_addr: args.server_addr,
            uds: args.uds,
            stream_buffer_size: args.stream_buffer_size,
            shutdown_timeout: args.shutdown_timeout,
            duplicate_policy: args.duplicate_policy,
        })
    }
}
