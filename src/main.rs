//! Zentinel Replay Modifier CLI entry point.
//!
//! Applies filter and rewrite rules to captured HTTP requests before replay.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use zentinel_replay_modifier::{Modifier, ReplayConfig, RuleSpecs};

#[derive(Parser, Debug)]
#[command(name = "zentinel-replay-modifier")]
#[command(
    author,
    version,
    about = "Filter and rewrite captured HTTP requests before replay"
)]
struct Args {
    /// Captured request files, one raw request per file. Reads stdin if empty.
    inputs: Vec<PathBuf>,

    /// Configuration file path (YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for forwarded requests. Defaults to stdout.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Only replay requests with this method. Repeatable.
    #[arg(long = "http-allow-method", value_name = "METHOD")]
    allow_methods: Vec<String>,

    /// Only replay requests whose header matches: `Host:^www\.example\.com$`
    #[arg(long = "http-allow-header", value_name = "HEADER:REGEX")]
    allow_headers: Vec<String>,

    /// Drop requests whose header matches: `User-Agent:bot`
    #[arg(long = "http-disallow-header", value_name = "HEADER:REGEX")]
    disallow_headers: Vec<String>,

    /// Replay a fraction of requests by header value: `X-Session-Id:1/4`
    #[arg(long = "http-header-limiter", value_name = "HEADER:NUM/DEN")]
    header_limiters: Vec<String>,

    /// Replay a fraction of requests by query parameter: `user_id:1/2`
    #[arg(long = "http-param-limiter", value_name = "PARAM:NUM/DEN")]
    param_limiters: Vec<String>,

    /// Only replay requests whose URL matches
    #[arg(long = "http-allow-url", value_name = "REGEX")]
    allow_urls: Vec<String>,

    /// Drop requests whose URL matches
    #[arg(long = "http-disallow-url", value_name = "REGEX")]
    disallow_urls: Vec<String>,

    /// Rewrite URLs: `^/v1/(.*)$:/v2/$1` (write literal colons as `\:`)
    #[arg(long = "http-rewrite-url", value_name = "REGEX:TEMPLATE")]
    rewrite_urls: Vec<String>,

    /// Set a header on replayed requests: `X-Replayed:true`
    #[arg(long = "http-set-header", value_name = "NAME:VALUE")]
    set_headers: Vec<String>,

    /// Set a query parameter on replayed requests: `debug=0`
    #[arg(long = "http-set-param", value_name = "NAME=VALUE")]
    set_params: Vec<String>,

    /// Maximum requests processed concurrently (overrides the config file)
    #[arg(long, env = "REPLAY_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print example configuration and exit.
    #[arg(long)]
    example_config: bool,

    /// Validate configuration and exit.
    #[arg(long)]
    validate: bool,
}

impl Args {
    fn rule_specs(&self) -> RuleSpecs {
        RuleSpecs {
            allow_methods: self.allow_methods.clone(),
            allow_headers: self.allow_headers.clone(),
            disallow_headers: self.disallow_headers.clone(),
            header_limiters: self.header_limiters.clone(),
            param_limiters: self.param_limiters.clone(),
            allow_urls: self.allow_urls.clone(),
            disallow_urls: self.disallow_urls.clone(),
            rewrite_urls: self.rewrite_urls.clone(),
            set_headers: self.set_headers.clone(),
            set_params: self.set_params.clone(),
        }
    }
}

fn print_example_config() {
    let example = r#"# Replay Modifier Configuration Example
version: "1"

settings:
  # Maximum requests processed concurrently
  concurrency: 8

rules:
  # Only replay reads
  allow_methods: ["GET", "HEAD"]

  # Header must match the regex (missing headers match as "")
  allow_headers:
    - "Host:^www\\.example\\.com$"

  # Drop crawler traffic
  disallow_headers:
    - "User-Agent:(?i)bot"

  # Keep 1 in 4 sessions, 1 in 2 users
  header_limiters:
    - "X-Session-Id:1/4"
  param_limiters:
    - "user_id:1/2"

  # URL allow and deny lists
  allow_urls:
    - "^/api/"
  disallow_urls:
    - "^/api/admin"

  # First matching rewrite wins; write literal colons as \:
  rewrite_urls:
    - "^/api/v1/(.*)$:/api/v2/$1"

  # Applied to every replayed request
  set_headers:
    - "X-Replayed:true"
  set_params:
    - "replay=1"
"#;
    println!("{}", example);
}

/// Outcome of one captured request.
enum Outcome {
    Forwarded(Vec<u8>),
    Dropped,
}

fn apply(modifier: Option<&Modifier>, payload: Vec<u8>) -> Outcome {
    match modifier {
        None => Outcome::Forwarded(payload),
        Some(modifier) => {
            let out = modifier.rewrite(&payload);
            if out.is_empty() {
                Outcome::Dropped
            } else {
                Outcome::Forwarded(out)
            }
        }
    }
}

/// Output file name of every input; two inputs may not share one.
fn output_names(inputs: &[PathBuf]) -> Result<Vec<&OsStr>> {
    let mut seen: HashMap<&OsStr, &Path> = HashMap::with_capacity(inputs.len());
    let mut names = Vec::with_capacity(inputs.len());

    for input in inputs {
        let name = input
            .file_name()
            .with_context(|| format!("Input has no file name: {}", input.display()))?;
        if let Some(previous) = seen.insert(name, input) {
            bail!(
                "Inputs {} and {} would both be written to {}",
                previous.display(),
                input.display(),
                Path::new(name).display()
            );
        }
        names.push(name);
    }

    Ok(names)
}

async fn write_output(output_dir: &Path, name: &OsStr, payload: &[u8]) -> Result<()> {
    let target = output_dir.join(name);
    tokio::fs::write(&target, payload)
        .await
        .with_context(|| format!("Failed to write {}", target.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    // Print example config if requested
    if args.example_config {
        print_example_config();
        return Ok(());
    }

    // Load configuration, command-line rules after file rules
    let mut config = match &args.config {
        Some(path) => ReplayConfig::load(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => ReplayConfig::default(),
    };
    config.rules.merge(args.rule_specs());
    if let Some(concurrency) = args.concurrency {
        config.settings.concurrency = concurrency;
    }

    let modifier_config = config
        .rules
        .build()
        .context("Invalid modification rules")?;
    let modifier = Modifier::new(modifier_config);

    // Validate only if requested
    if args.validate {
        info!(
            rules_configured = modifier.is_some(),
            "Configuration is valid"
        );
        return Ok(());
    }

    let names = match &args.output_dir {
        Some(_) => output_names(&args.inputs)?,
        None => Vec::new(),
    };

    if let Some(dir) = &args.output_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create output dir: {}", dir.display()))?;
    }

    if args.inputs.is_empty() {
        let mut payload = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut payload)
            .await
            .context("Failed to read request from stdin")?;

        match apply(modifier.as_ref(), payload) {
            Outcome::Forwarded(out) => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(&out).await?;
                stdout.flush().await?;
                info!(forwarded = 1, dropped = 0, "Processed request from stdin");
            }
            Outcome::Dropped => info!(forwarded = 0, dropped = 1, "Processed request from stdin"),
        }
        return Ok(());
    }

    let concurrency = config.settings.concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks = JoinSet::new();

    info!(
        inputs = args.inputs.len(),
        concurrency,
        "Processing captured requests"
    );

    for (index, input) in args.inputs.iter().cloned().enumerate() {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .context("Worker pool closed")?;
        let modifier = modifier.clone();

        tasks.spawn(async move {
            let _permit = permit;
            let payload = tokio::fs::read(&input)
                .await
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let outcome = apply(modifier.as_ref(), payload);
            Ok::<_, anyhow::Error>((index, input, outcome))
        });
    }

    let mut results = Vec::with_capacity(args.inputs.len());
    while let Some(joined) = tasks.join_next().await {
        match joined.context("Worker task panicked")? {
            Ok(result) => results.push(result),
            Err(e) => warn!(error = %e, "Skipping unreadable input"),
        }
    }
    results.sort_by_key(|(index, _, _)| *index);

    let mut forwarded = 0usize;
    let mut dropped = 0usize;
    let mut stdout = tokio::io::stdout();

    for (index, input, outcome) in &results {
        match outcome {
            Outcome::Forwarded(out) => {
                forwarded += 1;
                match &args.output_dir {
                    Some(dir) => write_output(dir, names[*index], out).await?,
                    None => stdout.write_all(out).await?,
                }
            }
            Outcome::Dropped => {
                dropped += 1;
                debug!(input = %input.display(), "Request dropped");
            }
        }
    }
    stdout.flush().await?;

    info!(
        processed = results.len(),
        forwarded,
        dropped,
        "Finished processing captured requests"
    );

    Ok(())
}
