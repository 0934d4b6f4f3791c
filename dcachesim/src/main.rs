use std::fs::{self, File};
use std::io::BufReader;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Instant;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use dcachelib::config::{CacheConfig, HierarchyConfig, ReplacementPolicyConfig};
use dcachelib::io::load_trace;
use dcachelib::simulator::Simulator;
use dcachelib::trace;

#[cfg(debug_assertions)]
const DEBUG_DEFAULT: bool = true;

#[cfg(not(debug_assertions))]
const DEBUG_DEFAULT: bool = false;

#[derive(Parser, Debug)]
#[command(version, about = "Data cache hierarchy simulator, replays a recorded memory access trace")]
struct Args {
    /// Trace of 40 byte records: `<ip> <address> <R|W|P> <size>`
    trace: PathBuf,

    /// JSON hierarchy configuration, replaces the cache knobs below
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// L1 cache size in kilobytes
    #[arg(long, default_value_t = 32.0)]
    l1c: f32,

    /// L1 cache block size in bytes
    #[arg(long, default_value_t = 32)]
    l1b: u64,

    /// L1 cache associativity (1 for direct mapped)
    #[arg(long, default_value_t = 4)]
    l1a: u32,

    /// Simulate a second level
    #[arg(long)]
    l2: bool,

    /// L2 cache size in kilobytes
    #[arg(long, default_value_t = 32.0)]
    l2c: f32,

    /// L2 cache block size in bytes
    #[arg(long, default_value_t = 32)]
    l2b: u64,

    /// L2 cache associativity (1 for direct mapped)
    #[arg(long, default_value_t = 4)]
    l2a: u32,

    /// Replacement policy for both levels
    #[arg(long, value_enum, default_value_t = Policy::Rr)]
    policy: Policy,

    /// Only simulate accesses made by instructions in this inclusive hex range, e.g. 4767b7:476911
    #[arg(long, value_parser = parse_ip_range)]
    ip_range: Option<RangeInclusive<u64>>,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    #[arg(short, long)]
    performance: bool,

    #[arg(short, long, default_value_t = DEBUG_DEFAULT)]
    debug: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Policy {
    Rr,
    Lru,
}

impl From<Policy> for ReplacementPolicyConfig {
    fn from(value: Policy) -> Self {
        match value {
            Policy::Rr => ReplacementPolicyConfig::RoundRobin,
            Policy::Lru => ReplacementPolicyConfig::LeastRecentlyUsed,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn parse_ip_range(input: &str) -> Result<RangeInclusive<u64>, String> {
    let parse = |s: &str| u64::from_str_radix(s.trim().trim_start_matches("0x"), 16).map_err(|e| format!("{s}: {e}"));
    let (start, end) = input.split_once(':').ok_or_else(|| String::from("expected START:END"))?;
    let (start, end) = (parse(start)?, parse(end)?);
    if start > end {
        return Err(format!("{start:#x} is above {end:#x}"));
    }
    Ok(start..=end)
}

fn hierarchy_config(args: &Args) -> Result<HierarchyConfig> {
    if let Some(path) = &args.config {
        let file = File::open(path).with_context(|| format!("Couldn't open the config file at path {}", path.display()))?;
        return serde_json::from_reader(BufReader::new(file)).context("Couldn't parse the config file");
    }
    let policy = ReplacementPolicyConfig::from(args.policy);
    let l1 = CacheConfig::new("L1 Data Cache", args.l1c, args.l1b, args.l1a).with_policy(policy);
    let l2 = args.l2.then(|| CacheConfig::new("L2 Data Cache", args.l2c, args.l2b, args.l2a).with_policy(policy));
    Ok(HierarchyConfig::new(l1, l2))
}

fn main() -> Result<()> {
    env_logger::init();
    let start = Instant::now();
    let args = Args::parse();
    let config = hierarchy_config(&args)?;
    let mut simulator = Simulator::new(&config).context("Invalid cache configuration")?;
    info!("simulating {} with {} level(s)", args.trace.display(), 1 + config.l2.is_some() as usize);

    let trace_file = File::open(&args.trace).with_context(|| format!("Couldn't open the trace file at path {}", args.trace.display()))?;
    let bytes = load_trace(trace_file).context("Couldn't load the trace file")?;
    let records = trace::records(&bytes)?;
    let replayed = match &args.ip_range {
        Some(range) => simulator.replay(records.filter(|item| item.as_ref().map_or(true, |(_, event)| range.contains(&event.ip)))),
        None => simulator.replay(records),
    }?;
    if replayed == 0 {
        warn!("no accesses were simulated, check the trace and the instruction range");
    }
    info!("replayed {replayed} accesses");

    let simulation_time = *simulator.get_execution_time();
    let empty_lines = simulator.get_empty_line_counts();
    let report = simulator.finalize();
    let rendered = match args.format {
        Format::Text => report.to_string(),
        Format::Json => serde_json::to_string_pretty(&report).context("Couldn't serialise the output")?,
    };
    match &args.output {
        Some(path) => fs::write(path, rendered).with_context(|| format!("Couldn't write the report to {}", path.display()))?,
        None => println!("{rendered}"),
    }

    if args.performance {
        let total_time = start.elapsed();
        println!("Simulation time: {}s", simulation_time.as_nanos() as f64 / 1e9);
        println!("Total execution time (includes initial parsing, configuration, and output): {}s", total_time.as_nanos() as f64 / 1e9)
    }
    if args.debug {
        #[cfg(debug_assertions)]
        println!("Running the debug binary, debug mode is enabled by default. If benchmarking, do not use this binary, re-compile with the --release argument when using cargo run");
        println!("Parsed input configuration: {config:?}");
        let names = std::iter::once(&config.l1).chain(config.l2.as_ref()).map(|c| c.name.as_str());
        let formatted = names
            .zip(empty_lines.iter())
            .map(|(name, count)| format!("{name}: {count}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!("Never filled cache lines by level: ({formatted})");
        println!("Total never filled cache lines: {}", empty_lines.iter().sum::<usize>());
    }
    Ok(())
}
