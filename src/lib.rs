//! vllm-client - Async client for the vLLM text generation API
//!
//! Two calls against a single `POST {base}/generate` endpoint:
//!
//! - [`VllmClient::generate`] waits for the full JSON response and returns
//!   one completion per requested slot
//! - [`VllmClient::stream`] reads NUL-delimited JSON frames off a live
//!   connection, each frame carrying the cumulative text of every slot
//!
//! ```no_run
//! use futures_util::StreamExt;
//! use vllm_client::{SamplingParams, VllmClient};
//!
//! # async fn run() -> vllm_client::Result<()> {
//! let client = VllmClient::new("http://127.0.0.1:8000")?;
//! let params = SamplingParams::new().n(1).max_tokens(64);
//!
//! let completions = client.generate("Hello", &params).await?;
//! println!("{}", &completions[0]["Hello".len()..]);
//!
//! let mut stream = client.stream("Hello", &params).await?;
//! while let Some(frame) = stream.next().await {
//!     println!("{}", frame?[0]);
//! }
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod streaming;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use errors::{ClientError, Result};
pub use streaming::{CallOptions, GenerationStream, VllmClient, VllmClientBuilder};
pub use telemetry::{RequestLogger, TelemetryCollector, TracingLogger};
pub use types::{EarlyStopping, SamplingParams};

// Command-line front end
pub mod cli;
pub mod config;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
