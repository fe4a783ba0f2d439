//! Command-line argument parsing for vllm-client
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use crate::types::SamplingParams;
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;

/// vllm-client - Generate text with a running vLLM API server
#[derive(Parser, Debug)]
#[command(name = "vllm-client")]
#[command(version)]
#[command(about = "Generate text with a running vLLM API server", long_about = None)]
pub struct Args {
    /// Server base URL, without the /generate suffix
    #[arg(long)]
    pub url: Option<String>,

    /// Request timeout in seconds (fractions allowed)
    #[arg(long)]
    pub timeout: Option<f64>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress everything except generated text)
    #[arg(short, long)]
    pub quiet: bool,

    /// Print request statistics when done
    #[arg(long)]
    pub stats: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate completions and print them when all are done
    Generate {
        /// Prompt text
        prompt: String,

        #[command(flatten)]
        sampling: SamplingArgs,
    },

    /// Stream the first completion as it is generated
    Stream {
        /// Prompt text
        prompt: String,

        #[command(flatten)]
        sampling: SamplingArgs,
    },

    /// Generate for several prompts concurrently
    Parallel {
        /// Prompt texts
        #[arg(required = true, num_args = 1..)]
        prompts: Vec<String>,

        #[command(flatten)]
        sampling: SamplingArgs,
    },
}

/// Sampling flags shared by every subcommand
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct SamplingArgs {
    /// Number of completions
    #[arg(short, long)]
    pub n: Option<u32>,

    /// Sampling temperature
    #[arg(short, long)]
    pub temperature: Option<f64>,

    /// Maximum generated tokens per completion
    #[arg(short, long)]
    pub max_tokens: Option<u32>,

    /// Extra request field as KEY=VALUE; VALUE is parsed as JSON when possible
    #[arg(short, long = "extra", value_name = "KEY=VALUE")]
    pub extra: Vec<String>,
}

impl SamplingArgs {
    /// Layer the flags over parameters loaded from the config file
    pub fn apply(&self, mut params: SamplingParams) -> SamplingParams {
        if let Some(n) = self.n {
            params = params.n(n);
        }
        if let Some(temperature) = self.temperature {
            params = params.temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            params = params.max_tokens(max_tokens);
        }
        params
    }

    /// Parse the `--extra` flags into an override map
    pub fn extra_map(&self) -> Result<Option<Map<String, Value>>, String> {
        if self.extra.is_empty() {
            return Ok(None);
        }

        let mut map = Map::new();
        for item in &self.extra {
            let (key, raw) = item
                .split_once('=')
                .ok_or_else(|| format!("Expected KEY=VALUE, got '{}'", item))?;
            if key.is_empty() {
                return Err(format!("Empty key in '{}'", item));
            }
            let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
            map.insert(key.to_string(), value);
        }
        Ok(Some(map))
    }
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Timeout flag as a duration
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(Duration::from_secs_f64)
    }

    /// Sampling flags of the active subcommand
    pub fn sampling(&self) -> &SamplingArgs {
        match &self.command {
            Commands::Generate { sampling, .. }
            | Commands::Stream { sampling, .. }
            | Commands::Parallel { sampling, .. } => sampling,
        }
    }
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Default `tracing` filter directive for this level
    pub fn filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "warn,vllm_client=debug",
            Verbosity::VeryVerbose => "info,vllm_client=trace",
        }
    }

    /// Check if should show section headers
    pub fn show_headers(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if request traces should be logged
    pub fn show_events(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}
