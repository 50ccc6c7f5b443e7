use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{Scheduler, SchedulerState};
use crate::error::HeatError;
use crate::grid::GridState;
use crate::partition::SlabPartition;

/// How the slabs are executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParallelBackend {
    /// One scoped OS thread per slab for the whole run, phases separated by
    /// `std::sync::Barrier`, halo planes exchanged under a `Mutex`.
    #[default]
    Barrier,
    /// A rayon pool of `workers` threads; each phase is a parallel
    /// iteration over the slabs and its join is the barrier.
    Rayon,
}

/// Slab-parallel scheduler. The interior `x` planes are split across
/// `workers` by [`SlabPartition`]; `y` and `z` are never split.
pub struct ParallelScheduler {
    workers: usize,
    backend: ParallelBackend,
    pool: Option<rayon::ThreadPool>,
    state: SchedulerState,
}

/// Hardware parallelism, or 1 if it cannot be queried.
pub fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

impl ParallelScheduler {
    pub fn new(workers: usize, backend: ParallelBackend) -> Self {
        ParallelScheduler {
            workers: workers.max(1),
            backend,
            pool: None,
            state: SchedulerState::Idle,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn backend(&self) -> ParallelBackend {
        self.backend
    }

    /// Built on first use and kept for later runs.
    fn pool(&mut self) -> Result<&rayon::ThreadPool, HeatError> {
        let pool = match self.pool.take() {
            Some(pool) => pool,
            None => rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .thread_name(|i| format!("heat3d-worker-{}", i))
                .build()?,
        };
        Ok(self.pool.insert(pool))
    }

    fn execute(&mut self, grid: &mut GridState) -> Result<(), HeatError> {
        let partition = SlabPartition::new(grid.dims().interior_x(), self.workers);
        debug!(
            backend = ?self.backend,
            workers = self.workers,
            active = partition.active_count(),
            steps = grid.steps(),
            "starting parallel run"
        );
        if partition.active_count() == 0 || grid.steps() == 0 {
            return Ok(());
        }
        match self.backend {
            ParallelBackend::Barrier => super::barrier::run(grid, &partition),
            ParallelBackend::Rayon => {
                let pool = self.pool()?;
                super::rayon::run(pool, grid, &partition)
            }
        }
    }
}

impl Scheduler for ParallelScheduler {
    fn name(&self) -> &'static str {
        match self.backend {
            ParallelBackend::Barrier => "parallel-barrier",
            ParallelBackend::Rayon => "parallel-rayon",
        }
    }

    fn state(&self) -> SchedulerState {
        self.state
    }

    #[instrument(skip_all, name = "parallel_run", fields(backend = ?self.backend, workers = self.workers))]
    fn run(&mut self, grid: &mut GridState) -> Result<(), HeatError> {
        self.state = SchedulerState::Running;
        let result = self.execute(grid);
        // a failed run is finished as well; the caller gets the error
        self.state = SchedulerState::Done;
        result
    }
}

impl std::fmt::Debug for ParallelScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelScheduler")
            .field("workers", &self.workers)
            .field("backend", &self.backend)
            .field("state", &self.state)
            .finish()
    }
}
