//! vllm-client - Main CLI Entry Point

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use colored::Colorize;
use futures_util::future::join_all;
use futures_util::StreamExt;
use std::io::Write;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vllm_client::cli::{Args, Commands, Verbosity};
use vllm_client::config::Config;
use vllm_client::{CallOptions, SamplingParams, TelemetryCollector, VllmClient};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let verbosity = args.verbosity();
    init_tracing(verbosity);

    let config = Config::load(args.config.as_deref())?;
    let base_url = args.url.clone().unwrap_or_else(|| config.server.base_url.clone());

    let collector = TelemetryCollector::new();
    let mut builder = VllmClient::builder(&base_url);
    if let Some(timeout) = args.timeout().or_else(|| config.timeout()) {
        builder = builder.default_timeout(timeout);
    }
    if args.stats {
        builder = builder.logger(Arc::new(collector.clone()));
    } else if verbosity.show_events() {
        builder = builder.tracing();
    }
    let client = builder.build().context("Failed to create vLLM client")?;

    let params = args.sampling().apply(config.sampling_params());
    let options = CallOptions {
        extra: args.sampling().extra_map().map_err(|e| anyhow!(e))?,
        timeout: None,
    };

    match &args.command {
        Commands::Generate { prompt, .. } => {
            run_generate(&client, prompt, &params, &options, verbosity).await?
        }
        Commands::Stream { prompt, .. } => {
            run_stream(&client, prompt, &params, &options, verbosity).await?
        }
        Commands::Parallel { prompts, .. } => {
            run_parallel(&client, prompts, &params, &options, verbosity).await?
        }
    }

    if args.stats {
        display_summary(&collector);
    }

    Ok(())
}

fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Strip the prompt prefix from a cumulative completion
fn continuation<'a>(prompt: &str, completion: &'a str) -> &'a str {
    completion.strip_prefix(prompt).unwrap_or(completion)
}

async fn run_generate(
    client: &VllmClient,
    prompt: &str,
    params: &SamplingParams,
    options: &CallOptions,
    verbosity: Verbosity,
) -> Result<()> {
    if verbosity.show_headers() {
        println!("{}", "=== Single generation ===".bold());
        println!();
    }

    let completions = client
        .generate_with(prompt, params, options)
        .await
        .context("Generation failed")?;

    for (i, output) in completions.iter().enumerate() {
        if verbosity.show_headers() {
            println!("{}", format!("Output #{}:", i + 1).cyan());
        }
        println!("{}", continuation(prompt, output));
        println!();
    }

    Ok(())
}

async fn run_stream(
    client: &VllmClient,
    prompt: &str,
    params: &SamplingParams,
    options: &CallOptions,
    verbosity: Verbosity,
) -> Result<()> {
    if verbosity.show_headers() {
        println!("{}", "=== Streaming generation ===".bold());
        println!();
    }

    let mut stream = client
        .stream_with(prompt, params, options)
        .await
        .context("Failed to open stream")?;

    // Print only the first slot; each frame repeats everything so far
    let mut received = prompt.to_string();
    let mut stdout = std::io::stdout();
    while let Some(frame) = stream.next().await {
        let frame = frame.context("Stream aborted")?;
        let Some(output) = frame.first() else {
            continue;
        };
        print!("{}", continuation(&received, output));
        stdout.flush().context("Failed to flush stdout")?;
        received = output.clone();
    }
    println!();

    Ok(())
}

async fn run_parallel(
    client: &VllmClient,
    prompts: &[String],
    params: &SamplingParams,
    options: &CallOptions,
    verbosity: Verbosity,
) -> Result<()> {
    if verbosity.show_headers() {
        println!("{}", "=== Parallel generation ===".bold());
        println!();
    }

    let tasks = prompts
        .iter()
        .map(|prompt| client.generate_with(prompt, params, options));
    let responses = join_all(tasks).await;

    for (i, (prompt, response)) in prompts.iter().zip(responses).enumerate() {
        let completions = response.with_context(|| format!("Prompt #{} failed", i + 1))?;
        for (j, output) in completions.iter().enumerate() {
            if verbosity.show_headers() {
                println!("{}", format!("Prompt #{} / Output #{}:", i + 1, j + 1).cyan());
            }
            println!("{}", continuation(prompt, output));
            println!();
        }
    }

    Ok(())
}

fn display_summary(collector: &TelemetryCollector) {
    let stats = collector.get_stats();

    eprintln!();
    eprintln!("{}", "Request Summary".bold());
    eprintln!("─────────────────────────────────────");
    eprintln!("Duration:          {:?}", collector.elapsed());
    eprintln!("Requests:          {}", stats.requests);
    eprintln!("Responses:         {}", stats.responses);
    eprintln!("Completions:       {}", stats.completions);
    eprintln!("Stream frames:     {}", stats.frames);
    eprintln!("Streams finished:  {}", stats.streams_finished);
}
