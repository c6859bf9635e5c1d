//! Worker pool and awaitable job handles
//!
//! Blocking browser work runs on dedicated OS threads; the async side only
//! ever awaits a [`JobHandle`].

pub mod async_wrappers;
pub mod worker_pool;

pub use async_wrappers::{JobHandle, WorkerError};
pub use worker_pool::WorkerPool;
