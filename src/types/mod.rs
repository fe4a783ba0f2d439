//! Type definitions module
//!
//! Sampling configuration and request/response body handling.

pub mod params;
pub mod payload;

// Re-export commonly used types
pub use params::{EarlyStopping, SamplingParams};
pub use payload::{build_payload, decode_text, decode_text_bytes};
