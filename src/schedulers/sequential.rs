use tracing::{debug, instrument};

use super::{Scheduler, SchedulerState};
use crate::error::HeatError;
use crate::grid::GridState;
use crate::stencil::{commit_plane, StencilKernel};

/// Single threaded reference implementation.
#[derive(Clone, Debug, Default)]
pub struct SequentialScheduler {
    state: SchedulerState,
}

impl SequentialScheduler {
    pub fn new() -> Self {
        SequentialScheduler::default()
    }
}

impl Scheduler for SequentialScheduler {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn state(&self) -> SchedulerState {
        self.state
    }

    #[instrument(skip_all, name = "sequential_run")]
    fn run(&mut self, grid: &mut GridState) -> Result<(), HeatError> {
        self.state = SchedulerState::Running;

        let dims = grid.dims();
        let steps = grid.steps();
        let kernel = StencilKernel::new(grid.physics());
        let plane = dims.plane();
        let interior = dims.interior_x();
        debug!(?dims, steps, "starting sequential run");

        let (current, next) = grid.buffers_mut();
        for _ in 0..steps {
            for x in interior.clone() {
                kernel.update_plane(
                    &current[(x - 1) * plane..x * plane],
                    &current[x * plane..(x + 1) * plane],
                    &current[(x + 1) * plane..(x + 2) * plane],
                    &mut next[x * plane..(x + 1) * plane],
                    dims.y,
                    dims.z,
                );
            }

            for x in interior.clone() {
                let range = x * plane..(x + 1) * plane;
                commit_plane(&next[range.clone()], &mut current[range], dims.y, dims.z);
            }
        }

        self.state = SchedulerState::Done;
        Ok(())
    }
}
