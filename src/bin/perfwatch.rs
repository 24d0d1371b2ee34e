//! perfwatch: resource usage of one process over its lifetime
//!
//! Launches a program (or attaches to a pid), samples CPU, RAM, GPU share and
//! VRAM until it exits, writes the persisted series to a CSV file and prints
//! the averages.
//!
//! Run: `perfwatch python train.py` or `perfwatch --pid 1234`

#![cfg_attr(test, allow(clippy::unwrap_used))]

use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser};
use perfwatch::config::{Config, GpuConfig};
use perfwatch::prelude::*;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// perfwatch: resource usage of one process over its lifetime
#[derive(Parser, Debug)]
#[command(name = "perfwatch")]
#[command(version)]
#[command(about = "Record CPU, RAM, GPU and VRAM usage of a process until it exits", long_about = None)]
struct Cli {
    /// Executable plus arguments, or a single PID
    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true,
        required_unless_present = "pid"
    )]
    command: Vec<String>,

    /// Attach to an existing process
    #[arg(short, long, conflicts_with = "command")]
    pid: Option<u32>,

    /// Durable record path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Poll period in milliseconds
    #[arg(long, value_name = "MS")]
    poll_ms: Option<u64>,

    /// Samples that feed the averages (persisted, every_poll)
    #[arg(long, value_name = "POLICY")]
    aggregate: Option<AggregationPolicy>,

    /// Show the live table
    #[arg(long)]
    live: bool,

    /// Disable GPU accounting
    #[arg(long)]
    no_gpu: bool,

    /// Raise log level (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e:#}");
        if needs_usage(&e) {
            eprintln!("\n{}", Cli::command().render_usage());
        }
        std::process::exit(1);
    }
}

/// Startup failures caused by the invocation itself get a usage line.
fn needs_usage(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<MonitorError>())
        .any(MonitorError::is_fatal_startup)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = resolve_config(cli)?;
    let spec = launch_spec(cli)?;

    let stop = StopSignal::install()?;
    let sampler = build_sampler(&config.gpu)?;

    // Sinks are opened before launching so a sink failure never leaves an
    // unmonitored child behind. The previous record is only replaced on save.
    let mut sinks = SinkSet::new();
    sinks.push(
        CsvSink::create(&config.output)
            .with_context(|| format!("cannot write record to {}", config.output.display()))?,
    );
    add_live_table(&mut sinks, &config, &spec)?;

    let handle = ProcessHandle::resolve(&spec)?;

    let mut monitor = Monitor::new(handle, SystemClock::start(), sampler, sinks)
        .with_policy(config.aggregate)
        .with_poll_interval(config.poll_interval())
        .with_stop_signal(stop);

    let result = monitor.run();
    monitor.target_mut().reap();
    let report = result?;

    println!("{report}");
    println!("Saved {}", config.output.display());
    Ok(())
}

/// Applies CLI overrides on top of the config file.
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::discover(cli.config.as_deref())?;

    if let Some(output) = &cli.output {
        config.output.clone_from(output);
    }
    if let Some(poll_ms) = cli.poll_ms {
        config.poll_ms = poll_ms;
    }
    if let Some(policy) = cli.aggregate {
        config.aggregate = policy;
    }
    if cli.live {
        config.live.enabled = true;
    }
    if cli.no_gpu {
        config.gpu.enabled = false;
    }

    config.validate()?;
    Ok(config)
}

fn launch_spec(cli: &Cli) -> Result<LaunchSpec> {
    match cli.pid {
        Some(pid) => Ok(LaunchSpec::Attach { pid }),
        None => Ok(LaunchSpec::from_args(cli.command.as_slice())?),
    }
}

fn build_sampler(gpu: &GpuConfig) -> Result<Sampler> {
    let mut sampler = Sampler::empty();
    sampler.push(ProcessAccountingSource::new());
    if gpu.enabled {
        add_gpu_source(&mut sampler, gpu)?;
    }
    Ok(sampler)
}

#[cfg(feature = "nvidia")]
fn add_gpu_source(sampler: &mut Sampler, gpu: &GpuConfig) -> Result<()> {
    let source = if gpu.required {
        NvidiaGpuSource::open(gpu.device_index)?
    } else {
        NvidiaGpuSource::new(gpu.device_index)
    };
    sampler.push(source);
    Ok(())
}

#[cfg(not(feature = "nvidia"))]
fn add_gpu_source(_sampler: &mut Sampler, gpu: &GpuConfig) -> Result<()> {
    if gpu.required {
        return Err(MonitorError::CollectorUnavailable("nvidia_gpu").into());
    }
    tracing::warn!("built without the `nvidia` feature, GPU fields will read 0");
    Ok(())
}

#[cfg(feature = "live")]
fn add_live_table(sinks: &mut SinkSet, config: &Config, spec: &LaunchSpec) -> Result<()> {
    if config.live.enabled {
        let table = LiveTable::new(LiveTable::title_for(&spec.describe()), config.live.history_rows);
        sinks.push(LiveTableSink::open(table)?);
    }
    Ok(())
}

#[cfg(not(feature = "live"))]
fn add_live_table(_sinks: &mut SinkSet, config: &Config, _spec: &LaunchSpec) -> Result<()> {
    if config.live.enabled {
        tracing::warn!("built without the `live` feature, live table disabled");
    }
    Ok(())
}
