use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Barrier, Mutex, MutexGuard, PoisonError};
use std::thread;

use tracing::{debug, warn};

use crate::error::{panic_message, HeatError};
use crate::grid::{Dims, GridState};
use crate::partition::SlabPartition;
use crate::stencil::{commit_plane, StencilKernel};

/*
  Barrier backend

  1. Every active slab gets one scoped thread for the whole run
  2. A worker owns copies of its planes plus one ghost plane on each side
  3. Its first and last planes are published through Mutex edge buffers
  4. Two barriers per step:
     - after the stencil phase (nobody commits before everybody computed)
     - after commit + publish (nobody reads a ghost before it is published)

  Ghosts are refreshed right after the second barrier. A neighbour only
  overwrites its edge buffers after the next step's first barrier, which
  this worker cannot pass before it finished its refresh.
*/

/// First and last owned plane of one worker, as of the last commit.
struct Edges {
    low: Mutex<Vec<f64>>,
    high: Mutex<Vec<f64>>,
}

// plane data stays valid even if a holder panicked
fn lock(edge: &Mutex<Vec<f64>>) -> MutexGuard<'_, Vec<f64>> {
    edge.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Local state of one slab worker. Plane `0` and plane `len + 1` are
/// ghosts, planes `1..=len` are owned.
struct SlabWorker {
    index: usize,
    len: usize,
    plane: usize,
    dims: Dims,
    kernel: StencilKernel,
    current: Vec<f64>,
    next: Vec<f64>,
}

impl SlabWorker {
    fn new(
        index: usize,
        slab: &Range<usize>,
        dims: Dims,
        kernel: StencilKernel,
        current: &[f64],
        next: &[f64],
    ) -> Self {
        let plane = dims.plane();
        let window = (slab.start - 1) * plane..(slab.end + 1) * plane;
        SlabWorker {
            index,
            len: slab.len(),
            plane,
            dims,
            kernel,
            current: current[window.clone()].to_vec(),
            next: next[window].to_vec(),
        }
    }

    fn planes(&self, local: usize) -> Range<usize> {
        local * self.plane..(local + 1) * self.plane
    }

    fn compute(&mut self) {
        for local in 1..=self.len {
            self.kernel.update_plane(
                &self.current[(local - 1) * self.plane..local * self.plane],
                &self.current[local * self.plane..(local + 1) * self.plane],
                &self.current[(local + 1) * self.plane..(local + 2) * self.plane],
                &mut self.next[local * self.plane..(local + 1) * self.plane],
                self.dims.y,
                self.dims.z,
            );
        }
    }

    fn commit_and_publish(&mut self, edges: &Edges) {
        for local in 1..=self.len {
            let range = self.planes(local);
            commit_plane(&self.next[range.clone()], &mut self.current[range], self.dims.y, self.dims.z);
        }
        lock(&edges.low).copy_from_slice(&self.current[self.planes(1)]);
        lock(&edges.high).copy_from_slice(&self.current[self.planes(self.len)]);
    }

    /// Pulls the neighbours' freshly committed edge planes into the ghosts.
    /// Outermost workers keep the fixed `x == 0` / `x == size_x - 1` faces.
    fn refresh_ghosts(&mut self, edges: &[Edges]) {
        if self.index > 0 {
            let left = lock(&edges[self.index - 1].high);
            self.current[..self.plane].copy_from_slice(&left);
        }
        if self.index + 1 < edges.len() {
            let range = self.planes(self.len + 1);
            let right = lock(&edges[self.index + 1].low);
            self.current[range].copy_from_slice(&right);
        }
    }

    /// Owned planes of `current` and `next`.
    fn into_owned(self) -> (Vec<f64>, Vec<f64>) {
        let owned = self.plane..(self.len + 1) * self.plane;
        (self.current[owned.clone()].to_vec(), self.next[owned].to_vec())
    }
}

/// Runs `f` unless the run is already aborted; a panic aborts the run and is
/// remembered as this worker's failure.
fn guarded(aborted: &AtomicBool, failure: &mut Option<String>, f: impl FnOnce()) {
    if aborted.load(Ordering::Acquire) {
        return;
    }
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        *failure = Some(panic_message(&*payload));
        aborted.store(true, Ordering::Release);
    }
}

type SlabResult = Option<Result<(Vec<f64>, Vec<f64>), String>>;

pub(crate) fn run(grid: &mut GridState, partition: &SlabPartition) -> Result<(), HeatError> {
    let dims = grid.dims();
    let plane = dims.plane();
    let steps = grid.steps();
    let kernel = StencilKernel::new(grid.physics());

    let active = partition.active_count();
    let barrier = Barrier::new(active);
    let aborted = AtomicBool::new(false);
    #[cfg(test)]
    let fault = grid.fault;

    let (current, next) = grid.buffers_mut();
    let edges: Vec<Edges> = partition
        .active()
        .map(|slab| Edges {
            low: Mutex::new(current[slab.start * plane..(slab.start + 1) * plane].to_vec()),
            high: Mutex::new(current[(slab.end - 1) * plane..slab.end * plane].to_vec()),
        })
        .collect();

    let current_view: &[f64] = &*current;
    let next_view: &[f64] = &*next;
    let results: Vec<SlabResult> = thread::scope(|scope| {
        let handles: Vec<_> = partition
            .slabs()
            .iter()
            .enumerate()
            .map(|(index, slab)| {
                let (barrier, aborted, edges) = (&barrier, &aborted, &edges);
                scope.spawn(move || -> SlabResult {
                    // excess workers have nothing to do
                    if slab.is_empty() {
                        return None;
                    }
                    let mut worker =
                        SlabWorker::new(index, slab, dims, kernel, current_view, next_view);
                    let mut failure = None;

                    for _step in 0..steps {
                        guarded(aborted, &mut failure, || {
                            #[cfg(test)]
                            super::Fault::trigger(fault, _step, slab);
                            worker.compute()
                        });
                        barrier.wait();

                        guarded(aborted, &mut failure, || worker.commit_and_publish(&edges[index]));
                        barrier.wait();

                        guarded(aborted, &mut failure, || worker.refresh_ghosts(edges));
                    }

                    Some(match failure {
                        Some(message) => Err(message),
                        None => Ok(worker.into_owned()),
                    })
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|payload| Some(Err(panic_message(&*payload))))
            })
            .collect()
    });

    let failures: Vec<String> = results
        .iter()
        .enumerate()
        .filter_map(|(index, result)| match result {
            Some(Err(message)) => Some(format!("worker {}: {}", index, message)),
            _ => None,
        })
        .collect();
    if !failures.is_empty() || aborted.load(Ordering::Acquire) {
        warn!(failed = failures.len(), "parallel run aborted, discarding partial results");
        return Err(HeatError::WorkerFailed(failures.join("; ")));
    }

    for (slab, result) in partition.slabs().iter().zip(results) {
        if let Some(Ok((owned_current, owned_next))) = result {
            let range = slab.start * plane..slab.end * plane;
            current[range.clone()].copy_from_slice(&owned_current);
            next[range].copy_from_slice(&owned_next);
        }
    }
    debug!(workers = partition.workers(), active, "barrier run finished");
    Ok(())
}
