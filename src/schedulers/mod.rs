pub mod barrier;
pub mod parallel;
pub mod rayon;
pub mod sequential;

pub use parallel::{ParallelBackend, ParallelScheduler};
pub use sequential::SequentialScheduler;

use crate::error::HeatError;
use crate::grid::GridState;

/// Lifecycle of a scheduler. A `Done` scheduler may be run again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SchedulerState {
    #[default]
    Idle,
    Running,
    Done,
}

/// Drives `grid.steps()` FTCS steps over a grid.
///
/// Each step is two phases: the stencil reads `current` and writes the
/// interior of `next`, then the interior of `next` is committed into
/// `current`. Boundary cells are never touched.
pub trait Scheduler {
    fn name(&self) -> &'static str;

    fn state(&self) -> SchedulerState;

    /// Blocks until all steps are done.
    fn run(&mut self, grid: &mut GridState) -> Result<(), HeatError>;
}

/// Makes the parallel backends panic in the slab that owns plane `x` while
/// step `step` is computed.
#[cfg(test)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Fault {
    pub step: usize,
    pub x: usize,
}

#[cfg(test)]
impl Fault {
    pub(crate) fn trigger(fault: Option<Fault>, step: usize, slab: &std::ops::Range<usize>) {
        if let Some(fault) = fault {
            if fault.step == step && slab.contains(&fault.x) {
                panic!("injected fault at step {} in plane {}", step, fault.x);
            }
        }
    }
}
