use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{panic_message, HeatError};
use crate::grid::GridState;
use crate::partition::{split_slabs_mut, SlabPartition};
use crate::stencil::{commit_plane, StencilKernel};

/*
  Rayon backend

  Both phases hand one disjoint `x` slab of the written buffer to each task
  (split_slabs_mut), so no locking is needed. `for_each` returns only after
  every slab is done, which is the barrier between the phases and between
  consecutive steps.

  A panicking task is resumed on the caller by `install`. Commits of the
  steps before it are already in `current`, so `current` is copied up front
  and written back when that happens. `next` holds no state between steps
  and is not restored.
*/

pub(crate) fn run(
    pool: &rayon::ThreadPool,
    grid: &mut GridState,
    partition: &SlabPartition,
) -> Result<(), HeatError> {
    let backup = grid.current().to_vec();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| advance(pool, grid, partition)));
    if let Err(payload) = outcome {
        warn!("parallel run aborted, restoring the grid");
        let (current, _) = grid.buffers_mut();
        current.copy_from_slice(&backup);
        return Err(HeatError::WorkerFailed(panic_message(&*payload)));
    }
    debug!(workers = partition.workers(), steps = grid.steps(), "rayon run finished");
    Ok(())
}

fn advance(pool: &rayon::ThreadPool, grid: &mut GridState, partition: &SlabPartition) {
    let dims = grid.dims();
    let plane = dims.plane();
    let steps = grid.steps();
    let kernel = StencilKernel::new(grid.physics());
    let slabs = partition.slabs();
    #[cfg(test)]
    let fault = grid.fault;

    let (current, next) = grid.buffers_mut();
    pool.install(|| {
        for _step in 0..steps {
            // stencil: read all of `current`, write own slab of `next`
            let src: &[f64] = current;
            split_slabs_mut(next, slabs, plane)
                .into_par_iter()
                .zip(slabs.par_iter())
                .for_each(|(dst, slab)| {
                    #[cfg(test)]
                    super::Fault::trigger(fault, _step, slab);
                    for (local, x) in slab.clone().enumerate() {
                        kernel.update_plane(
                            &src[(x - 1) * plane..x * plane],
                            &src[x * plane..(x + 1) * plane],
                            &src[(x + 1) * plane..(x + 2) * plane],
                            &mut dst[local * plane..(local + 1) * plane],
                            dims.y,
                            dims.z,
                        );
                    }
                });

            // commit: own slab of `next` into own slab of `current`
            split_slabs_mut(current, slabs, plane)
                .into_par_iter()
                .zip(split_slabs_mut(next, slabs, plane).into_par_iter())
                .for_each(|(dst, src)| {
                    for (dst_plane, src_plane) in dst.chunks_mut(plane).zip(src.chunks(plane)) {
                        commit_plane(src_plane, dst_plane, dims.y, dims.z);
                    }
                });
        }
    });
}
