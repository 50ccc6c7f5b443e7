//! Explicit (FTCS) heat diffusion on a 3D grid, run single threaded and
//! slab-parallel so the two can be timed against each other.
//!
//! ```no_run
//! use heat3d_rust::config::SimulationParams;
//! use heat3d_rust::harness::BenchmarkHarness;
//!
//! let run = BenchmarkHarness::new(SimulationParams::cube(64, 200)).run().unwrap();
//! println!("{:?}", run.report);
//! ```

pub mod config;
pub mod error;
pub mod grid;
pub mod harness;
pub mod partition;
pub mod schedulers;
pub mod slice;
pub mod stencil;

pub use config::SimulationParams;
pub use error::HeatError;
pub use grid::GridState;
pub use harness::{BenchmarkHarness, BenchmarkReport, GridPolicy};
pub use schedulers::{ParallelBackend, ParallelScheduler, Scheduler, SequentialScheduler};
