//! Concurrent load generator for a TCP inference server.
//!
//! Every client opens its own connection, sends a single inference request
//! and records the inference time the server reports back.

mod buffer;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod results;
pub mod worker;

pub use config::{DEFAULT_RECV_TIMEOUT, RunConfig};
pub use coordinator::{RunContext, Summary, run};
pub use error::{ConfigError, WorkerErr};
pub use results::Results;
pub use worker::Worker;
