use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{filter, prelude::*};

use heat3d_rust::config::SimulationParams;
use heat3d_rust::harness::{BenchmarkHarness, GridPolicy, Statistics};
use heat3d_rust::schedulers::parallel::available_workers;
use heat3d_rust::schedulers::ParallelBackend;
use heat3d_rust::slice::MidPlane;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    Barrier,
    Rayon,
}

impl From<Backend> for ParallelBackend {
    fn from(value: Backend) -> Self {
        match value {
            Backend::Barrier => ParallelBackend::Barrier,
            Backend::Rayon => ParallelBackend::Rayon,
        }
    }
}

/// 3D heat diffusion: sequential vs. parallel timing
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON file with request parameters; flags given on the command line win
    #[arg(long)]
    params: Option<PathBuf>,

    #[arg(long = "size-x")]
    size_x: Option<i64>,
    #[arg(long = "size-y")]
    size_y: Option<i64>,
    #[arg(long = "size-z")]
    size_z: Option<i64>,
    #[arg(long)]
    alpha: Option<f64>,
    #[arg(long)]
    dx: Option<f64>,
    #[arg(long)]
    dy: Option<f64>,
    #[arg(long)]
    dz: Option<f64>,
    #[arg(long)]
    dt: Option<f64>,
    #[arg(long)]
    steps: Option<i64>,

    /// Worker threads for the parallel run (default: available cores)
    #[arg(short, long)]
    threads: Option<usize>,

    #[arg(long, value_enum, default_value_t = Backend::Barrier)]
    backend: Backend,

    /// Start the parallel run from the sequential run's final state
    #[arg(long)]
    reuse_grid: bool,

    /// Measured rounds; above 1 prints min/median/mean/max instead of JSON
    #[arg(long, default_value_t = 1)]
    iterations: usize,

    #[arg(long, default_value_t = 0)]
    warmup: usize,

    /// Write the z mid-plane of the final grid as a binary PPM
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn simulation_params(&self) -> Result<SimulationParams> {
        let mut params = match &self.params {
            Some(path) => SimulationParams::from_json_file(path)
                .with_context(|| format!("reading parameters from {}", path.display()))?,
            None => SimulationParams::default(),
        };
        let overrides = [
            (self.size_x, &mut params.size_x),
            (self.size_y, &mut params.size_y),
            (self.size_z, &mut params.size_z),
            (self.steps, &mut params.steps),
        ];
        for (value, slot) in overrides {
            if let Some(value) = value {
                *slot = value;
            }
        }
        let overrides = [
            (self.alpha, &mut params.alpha),
            (self.dx, &mut params.dx),
            (self.dy, &mut params.dy),
            (self.dz, &mut params.dz),
            (self.dt, &mut params.dt),
        ];
        for (value, slot) in overrides {
            if let Some(value) = value {
                *slot = value;
            }
        }
        Ok(params)
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        filter::LevelFilter::DEBUG
    } else {
        filter::LevelFilter::WARN
    };
    let stderr_log = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true);
    tracing_subscriber::registry()
        .with(stderr_log.with_filter(level))
        .init();
}

fn write_snapshot(path: &Path, plane: &MidPlane) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    plane
        .write_ppm(&mut out)
        .with_context(|| format!("writing {}", path.display()))?;
    out.flush()?;
    Ok(())
}

fn print_statistics(name: &str, stats: &Statistics) {
    println!("{}:", name);
    println!("  min:    {:?}", stats.min);
    println!("  median: {:?}", stats.median);
    println!("  mean:   {:?}", stats.mean);
    println!("  max:    {:?}", stats.max);
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let params = args.simulation_params()?;
    let policy = if args.reuse_grid {
        GridPolicy::Shared
    } else {
        GridPolicy::Fresh
    };
    let harness = BenchmarkHarness::new(params)
        .with_workers(args.threads.unwrap_or_else(available_workers))
        .with_backend(args.backend.into())
        .with_policy(policy);
    info!(params = ?harness.params(), workers = harness.workers(), "configured");

    if args.iterations > 1 {
        let measurement = harness.measure(args.warmup, args.iterations)?;
        println!(
            "{} rounds, {} warmup, {} workers",
            measurement.iterations,
            args.warmup,
            harness.workers()
        );
        print_statistics("Sequential", &measurement.sequential);
        print_statistics("Parallel", &measurement.parallel);
        let speedup = measurement.sequential.median.as_secs_f64()
            / measurement.parallel.median.max(Duration::from_nanos(1)).as_secs_f64();
        println!("Median speedup: {:.2}x", speedup);
        return Ok(());
    }

    for _ in 0..args.warmup {
        harness.run()?;
    }
    let run = harness.run()?;
    println!("{}", serde_json::to_string(&run.report)?);
    if let Some(speedup) = run.report.speedup() {
        info!(speedup = %format!("{:.2}x", speedup), "parallel vs. sequential");
    }

    if let Some(path) = &args.snapshot {
        let plane = MidPlane::z(&run.grid)?;
        write_snapshot(path, &plane)?;
        info!(path = %path.display(), "snapshot written");
    }
    Ok(())
}
