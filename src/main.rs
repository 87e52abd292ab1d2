//! sigcond - signal-conditioning replay tool
//!
//! Replays recorded sample files through an STA/LTA detector or through a
//! complete filter network described in a TOML/JSON network file.

use anyhow::Context;
use clap::{Parser, Subcommand};
use sigcond_rs::analysis::{DetectorParams, StaLtaDetector, Transition};
use sigcond_rs::config::NetworkConfig;
use sigcond_rs::replay::{self, format_timestamp};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "sigcond")]
#[command(version)]
#[command(
    about = "Replay sample files through filter networks and event detectors",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run an STA/LTA detector over an "epoch_seconds value" file
    Detect {
        /// Sample file
        file: PathBuf,

        /// STA window, in samples
        #[arg(long)]
        sta: usize,

        /// LTA window, in samples
        #[arg(long)]
        lta: usize,

        /// STA/LTA ratio that triggers
        #[arg(long)]
        trigger: f64,

        /// STA/LTA ratio that de-triggers
        #[arg(long)]
        detrigger: f64,

        /// Consecutive triggered samples before a forced de-trigger
        #[arg(long = "max-triggered")]
        max_triggered: usize,

        /// Name reported with each transition
        #[arg(long, default_value = "signal")]
        name: String,
    },

    /// Feed a "terminal value [epoch_seconds]" file into a network
    Filter {
        /// Network file (.toml or .json)
        config: PathBuf,

        /// Sample file
        file: PathBuf,
    },

    /// Build a network file and print its plan statistics
    Check {
        /// Network file (.toml or .json)
        config: PathBuf,
    },

    /// Write an example network file
    Init {
        /// Destination (.toml or .json)
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sigcond_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Detect {
            file,
            sta,
            lta,
            trigger,
            detrigger,
            max_triggered,
            name,
        } => {
            let params = DetectorParams::new(sta, lta, trigger, detrigger, max_triggered)?;
            run_detect(file, name, params)
        }
        Command::Filter { config, file } => run_filter(config, file),
        Command::Check { config } => run_check(config),
        Command::Init { path } => {
            NetworkConfig::sample().save(&path)?;
            println!("Wrote example network to {}", path.display());
            Ok(())
        }
    }
}

fn run_detect(file: PathBuf, name: String, params: DetectorParams) -> anyhow::Result<()> {
    let mut detector = StaLtaDetector::new(name, params)?;
    let reader = replay::open(&file)?;

    let mut skipped = 0usize;
    for record in replay::samples(reader) {
        let (_, sample) = match record {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("{}: {}", file.display(), e);
                skipped += 1;
                continue;
            }
        };
        if let Some(transition) = detector.add_sample(sample.value, sample.timestamp_ms) {
            print_transition(detector.parameter_name(), transition, &detector);
        }
    }

    println!("{detector}");
    if skipped > 0 {
        println!("{skipped} malformed line(s) skipped");
    }
    Ok(())
}

fn run_filter(config: PathBuf, file: PathBuf) -> anyhow::Result<()> {
    let mut network = NetworkConfig::load(&config)?
        .build()
        .with_context(|| format!("building {}", config.display()))?;
    let reader = replay::open(&file)?;

    let mut skipped = 0usize;
    let mut last_timestamp_ms = 0i64;
    for record in replay::terminal_samples(reader) {
        let (line, sample) = match record {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("{}: {}", file.display(), e);
                skipped += 1;
                continue;
            }
        };
        let Some(terminal) = network.terminal(&sample.terminal) else {
            tracing::warn!(
                "{}: line {}: unknown terminal '{}'",
                file.display(),
                line,
                sample.terminal
            );
            skipped += 1;
            continue;
        };

        let timestamp_ms = sample.timestamp_ms.unwrap_or(last_timestamp_ms);
        last_timestamp_ms = timestamp_ms;

        for (name, transition) in network.process(terminal, sample.value, timestamp_ms)? {
            if let Some(detector) = network.detector(&name) {
                print_transition(&name, transition, detector);
            }
        }
    }

    println!("Network '{}'", network.name);
    for (name, value) in network.outputs() {
        println!("  {name:<20} {value:.6}");
    }
    for binding in network.detectors() {
        println!("  {}", binding.detector);
    }
    if skipped > 0 {
        println!("{skipped} line(s) skipped");
    }
    Ok(())
}

fn run_check(config: PathBuf) -> anyhow::Result<()> {
    let mut network = NetworkConfig::load(&config)?
        .build()
        .with_context(|| format!("building {}", config.display()))?;
    let detector_count = network.detectors().len();
    let plan = network.graph.plan()?;
    let stats = &plan.stats;

    println!("Network '{}' is valid", network.name);
    println!("  terminals:       {}", stats.total_terminals);
    println!("  filters:         {}", stats.total_nodes);
    println!("  entry filters:   {}", stats.entry_nodes);
    println!("  sink filters:    {}", stats.sink_nodes);
    println!("  idle filters:    {}", stats.idle_nodes);
    println!("  max depth:       {}", stats.max_depth);
    println!("  entry terminals: {}", plan.entry_terminals.len());
    println!("  detectors:       {}", detector_count);
    Ok(())
}

fn print_transition(name: &str, transition: Transition, detector: &StaLtaDetector) {
    let label = match transition {
        Transition::Triggered => "TRIGGERED",
        Transition::Detriggered => "DETRIGGERED",
    };
    println!(
        "{} {} {} sta={:.4} lta={:.4}",
        format_timestamp(detector.transition_time()),
        name,
        label,
        detector.sta(),
        detector.lta()
    );
}
