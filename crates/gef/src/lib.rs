//! GEF execution-cluster client library.
//!
//! Provides the typed wire messages, the REST client that submits jobs and
//! resolves/fetches their output, the [`ExecutionBackend`](backend::ExecutionBackend)
//! seam the dispatch pipeline drives, and the polling policy used while a
//! job is still running.

pub mod api;
pub mod backend;
pub mod messages;
pub mod poll;
