use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::SimulationParams;
use crate::error::HeatError;
use crate::grid::GridState;
use crate::schedulers::parallel::available_workers;
use crate::schedulers::{ParallelBackend, ParallelScheduler, Scheduler, SequentialScheduler};

/// What the parallel run starts from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridPolicy {
    /// Reinitialise the grid before the parallel run, so both runs solve the
    /// same problem.
    #[default]
    Fresh,
    /// Continue from the state the sequential run left behind.
    Shared,
}

/// Result payload of one comparison. Times are whole milliseconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BenchmarkReport {
    pub sequential_time: u64,
    pub parallel_time: u64,
    pub workers: usize,
}

impl BenchmarkReport {
    /// `None` when the parallel run was too fast to measure in milliseconds.
    pub fn speedup(&self) -> Option<f64> {
        (self.parallel_time > 0).then(|| self.sequential_time as f64 / self.parallel_time as f64)
    }
}

/// A finished comparison together with the final grid.
#[derive(Debug)]
pub struct BenchmarkRun {
    pub report: BenchmarkReport,
    pub sequential: Duration,
    pub parallel: Duration,
    pub grid: GridState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Statistics {
    pub min: Duration,
    pub median: Duration,
    pub mean: Duration,
    pub max: Duration,
}

impl Statistics {
    /// All zero for an empty sample set.
    pub fn from_samples(mut samples: Vec<Duration>) -> Self {
        if samples.is_empty() {
            return Statistics {
                min: Duration::ZERO,
                median: Duration::ZERO,
                mean: Duration::ZERO,
                max: Duration::ZERO,
            };
        }
        samples.sort();
        let count = samples.len();
        Statistics {
            min: samples[0],
            median: samples[count / 2],
            mean: samples.iter().sum::<Duration>() / count as u32,
            max: samples[count - 1],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Measurement {
    pub iterations: usize,
    pub sequential: Statistics,
    pub parallel: Statistics,
}

/// Times a sequential and a parallel run of the same request.
#[derive(Clone, Debug)]
pub struct BenchmarkHarness {
    params: SimulationParams,
    workers: usize,
    backend: ParallelBackend,
    policy: GridPolicy,
}

fn timed(scheduler: &mut dyn Scheduler, grid: &mut GridState) -> Result<Duration, HeatError> {
    let start = Instant::now();
    scheduler.run(grid)?;
    Ok(start.elapsed())
}

impl BenchmarkHarness {
    pub fn new(params: SimulationParams) -> Self {
        BenchmarkHarness {
            params,
            workers: available_workers(),
            backend: ParallelBackend::default(),
            policy: GridPolicy::default(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_backend(mut self, backend: ParallelBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_policy(mut self, policy: GridPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// One grid, one sequential run, one parallel run.
    #[instrument(skip_all, fields(policy = ?self.policy, backend = ?self.backend))]
    pub fn run(&self) -> Result<BenchmarkRun, HeatError> {
        let mut grid = GridState::new(&self.params)?;
        if !grid.is_stable() {
            warn!(
                stability_number = grid.stability_number(),
                "alpha*dt*(1/dx²+1/dy²+1/dz²) exceeds 1/6, values will diverge"
            );
        }

        let mut sequential = SequentialScheduler::new();
        let sequential_time = timed(&mut sequential, &mut grid)?;

        if self.policy == GridPolicy::Fresh {
            grid.reset();
        }

        let mut parallel = ParallelScheduler::new(self.workers, self.backend);
        let parallel_time = timed(&mut parallel, &mut grid)?;

        let report = BenchmarkReport {
            sequential_time: sequential_time.as_millis() as u64,
            parallel_time: parallel_time.as_millis() as u64,
            workers: self.workers,
        };
        info!(
            sequential_ms = report.sequential_time,
            parallel_ms = report.parallel_time,
            workers = self.workers,
            "benchmark finished"
        );
        Ok(BenchmarkRun {
            report,
            sequential: sequential_time,
            parallel: parallel_time,
            grid,
        })
    }

    /// Repeats [`run`](Self::run): `warmup` discarded rounds, then
    /// `iterations` measured ones.
    pub fn measure(&self, warmup: usize, iterations: usize) -> Result<Measurement, HeatError> {
        for _ in 0..warmup {
            self.run()?;
        }

        let mut sequential = Vec::with_capacity(iterations);
        let mut parallel = Vec::with_capacity(iterations);
        for _ in 0..iterations {
            let run = self.run()?;
            sequential.push(run.sequential);
            parallel.push(run.parallel);
        }

        Ok(Measurement {
            iterations,
            sequential: Statistics::from_samples(sequential),
            parallel: Statistics::from_samples(parallel),
        })
    }
}
