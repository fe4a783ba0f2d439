//! CLI module for vllm-client
//!
//! Handles command-line argument parsing.

pub mod args;

pub use args::{Args, Commands, SamplingArgs, Verbosity};
