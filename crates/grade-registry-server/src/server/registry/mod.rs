//! Authoritative grade storage.
//!
//! - [`store`] - [`StudentRegistry`], the lock-guarded map of student
//!   sequences owned by the service.

pub mod store;

pub use store::StudentRegistry;
