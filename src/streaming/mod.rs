//! Streaming client module
//!
//! Provides the vLLM API client and the NUL-delimited frame decoder.

pub mod client;
pub mod parser;
pub mod stream;

// Re-export commonly used types
pub use client::{
    CallOptions, GenerationStream, VllmClient, VllmClientBuilder, DEFAULT_VLLM_URL, GENERATE_PATH,
};
pub use parser::{FrameDecoder, FRAME_DELIMITER, MAX_FRAME_SIZE};
pub use stream::FrameStream;
