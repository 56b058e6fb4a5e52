//! keytempo CLI
//!
//! Reads keystrokes from stdin and streams live typing metrics.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use keytempo::{
    collector::ReaderCollector,
    config::{Config, DictionaryFailurePolicy, InputFormat},
    core::{MetricsEngine, SharedEngine},
    dictionary::{Dictionary, Unavailable, WordList},
    intake::Intake,
    server,
    stats::create_shared_stats,
    MetricsBroadcaster, VERSION,
};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "keytempo")]
#[command(version = VERSION)]
#[command(about = "Live typing metrics streamed to remote displays", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read keystrokes from stdin and stream metrics
    Start(StartArgs),

    /// Show configuration
    Config {
        /// Persist the resolved configuration to the config file
        #[arg(long)]
        write: bool,
    },
}

#[derive(Args, Debug, Default)]
struct StartArgs {
    /// Seconds between keystrokes before time counts as idle
    #[arg(long)]
    idle_threshold: Option<f64>,

    /// Seconds between metric pushes
    #[arg(long)]
    update_interval: Option<f64>,

    /// Seconds of completed words considered for WPM
    #[arg(long)]
    sliding_window: Option<f64>,

    /// Maximum number of word timestamps kept
    #[arg(long)]
    max_word_events: Option<usize>,

    /// Seconds after the last word before WPM is held at its last value
    #[arg(long)]
    freeze: Option<f64>,

    /// Port for the metrics stream
    #[arg(long)]
    port: Option<u16>,

    /// Address to bind the metrics stream to
    #[arg(long)]
    bind: Option<String>,

    /// Newline-separated word list used for accuracy
    #[arg(long, conflicts_with = "no_dictionary")]
    dictionary: Option<PathBuf>,

    /// Run without a word list
    #[arg(long)]
    no_dictionary: bool,

    /// Drop words whose dictionary lookup fails instead of counting them as incorrect
    #[arg(long)]
    skip_unknown_on_failure: bool,

    /// Keystroke feed format on stdin: "keys" (raw text) or "records" (JSON lines with timestamps)
    #[arg(long)]
    input: Option<InputFormat>,

    /// Browser origin allowed to read the stream (repeatable; default allows any)
    #[arg(long = "cors-origin")]
    cors_origins: Vec<String>,
}

impl StartArgs {
    fn apply(&self, config: &mut Config) -> anyhow::Result<()> {
        if let Some(secs) = self.idle_threshold {
            config.metrics.idle_threshold = seconds("--idle-threshold", secs)?;
        }
        if let Some(secs) = self.update_interval {
            config.metrics.update_interval = seconds("--update-interval", secs)?;
        }
        if let Some(secs) = self.sliding_window {
            config.metrics.sliding_window = seconds("--sliding-window", secs)?;
        }
        if let Some(n) = self.max_word_events {
            config.metrics.max_word_events = n;
        }
        if let Some(secs) = self.freeze {
            config.metrics.inactive_wpm_freeze = seconds("--freeze", secs)?;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ref bind) = self.bind {
            config.server.bind = bind.clone();
        }
        if let Some(ref path) = self.dictionary {
            config.dictionary_path = Some(path.clone());
        }
        if self.no_dictionary {
            config.dictionary_path = None;
        }
        if self.skip_unknown_on_failure {
            config.dictionary_failure = DictionaryFailurePolicy::SkipWord;
        }
        if let Some(input) = self.input {
            config.input = input;
        }
        if !self.cors_origins.is_empty() {
            config.server.cors_origins = Some(self.cors_origins.clone());
        }
        config.metrics.validate()?;
        Ok(())
    }
}

/// Puts the terminal in raw mode until dropped, so keys arrive one at a
/// time with backspace intact.
struct RawTerminal;

impl RawTerminal {
    fn enable() -> anyhow::Result<Self> {
        enable_raw_mode().context("Failed to switch the terminal to raw mode")?;
        Ok(Self)
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

fn seconds(flag: &str, secs: f64) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(secs).with_context(|| format!("invalid value for {flag}: {secs}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start(args) => cmd_start(args).await,
        Commands::Config { write } => cmd_config(write),
    }
}

async fn cmd_start(args: StartArgs) -> anyhow::Result<()> {
    println!("keytempo v{VERSION}");
    println!();

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config ({e}), using defaults");
        Config::default()
    });
    args.apply(&mut config)?;

    let metrics = &config.metrics;
    println!("Starting metrics stream...");
    println!("  Idle threshold: {:.1}s", metrics.idle_threshold.as_secs_f64());
    println!("  Update interval: {:.1}s", metrics.update_interval.as_secs_f64());
    println!("  Sliding window: {:.1}s", metrics.sliding_window.as_secs_f64());
    println!("  WPM freeze after: {:.1}s", metrics.inactive_wpm_freeze.as_secs_f64());
    println!("  Max word events: {}", metrics.max_word_events);

    let dictionary = load_dictionary(config.dictionary_path.as_ref());
    let stats = create_shared_stats();
    let engine = SharedEngine::new(MetricsEngine::new(
        config.metrics.clone(),
        dictionary,
        config.dictionary_failure,
    ));

    let stdin = std::io::stdin();
    let interactive = stdin.is_terminal();
    if config.input == InputFormat::Keys && !interactive {
        tracing::warn!(
            "stdin is not a terminal; raw keys are timed on arrival, so buffered input inflates WPM. Use --input records for piped feeds"
        );
    }

    let mut collector = ReaderCollector::with_format(stdin, config.input);
    collector.start()?;
    let intake = Intake::spawn(collector.receiver().clone(), engine.clone(), stats.clone());

    let broadcaster = Arc::new(MetricsBroadcaster::new(
        engine.clone(),
        config.metrics.update_interval,
        config.server.subscriber_buffer,
        stats.clone(),
    ));

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    {
        let shutdown_tx = shutdown_tx.clone();
        ctrlc::set_handler(move || {
            let _ = shutdown_tx.send(true);
        })
        .context("Error setting Ctrl+C handler")?;
    }

    let broadcast_task = {
        let broadcaster = broadcaster.clone();
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move { broadcaster.run(shutdown).await })
    };

    let (addr, server_shutdown) = server::run(&config.server, broadcaster.clone()).await?;

    println!();
    println!("Streaming on ws://{addr}/ws (one-shot reads: http://{addr}/metrics)");
    println!("Press Ctrl+C to stop");
    println!();

    let raw_terminal = if config.input == InputFormat::Keys && interactive {
        Some(RawTerminal::enable()?)
    } else {
        None
    };

    tokio::select! {
        _ = shutdown_rx.wait_for(|stop| *stop) => {}
        _ = source_finished(&collector) => {
            tracing::info!("Keystroke source ended");
        }
    }
    drop(raw_terminal);
    let _ = shutdown_tx.send(true);

    println!();
    println!("Stopping...");
    let _ = server_shutdown.send(());
    let _ = broadcast_task.await;
    collector.stop();
    tokio::task::spawn_blocking(move || intake.shutdown()).await?;

    let summary = engine.with(|e| e.peek_snapshot(Instant::now()));
    println!();
    println!("Session:");
    println!(
        "  Words: {} ({} correct, {:.1}% accuracy)",
        summary.total_words, summary.correct_words, summary.accuracy
    );
    println!("  Active time: {:.1}s", summary.active_time);
    println!("  Last WPM: {:.1} (burst peak {:.1})", summary.wpm, summary.peak_wpm);
    println!();
    println!("{}", stats.summary());

    Ok(())
}

/// Resolves once the collector stops on its own (EOF, or Ctrl+C/Ctrl+D from
/// a raw terminal).
async fn source_finished<R: std::io::Read + Send + 'static>(collector: &ReaderCollector<R>) {
    let mut poll = tokio::time::interval(Duration::from_millis(200));
    while collector.is_running() {
        poll.tick().await;
    }
}

fn load_dictionary(path: Option<&PathBuf>) -> Box<dyn Dictionary> {
    let Some(path) = path else {
        tracing::warn!("No dictionary configured; every lookup follows the failure policy");
        return Box::new(Unavailable::new("no dictionary configured"));
    };

    match WordList::from_path(path) {
        Ok(words) => {
            tracing::info!("Loaded {} dictionary words from {:?}", words.len(), path);
            Box::new(words)
        }
        Err(e) => {
            tracing::warn!("Could not load dictionary {:?}: {}", path, e);
            Box::new(Unavailable::new(format!("{}: {e}", path.display())))
        }
    }
}

fn cmd_config(write: bool) -> anyhow::Result<()> {
    let config = Config::load()?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);

    if write {
        config.save()?;
        println!();
        println!("Saved to {:?}", Config::config_path());
    }
    Ok(())
}
