use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};

use heat3d_rust::config::SimulationParams;
use heat3d_rust::grid::GridState;
use heat3d_rust::schedulers::parallel::available_workers;
use heat3d_rust::schedulers::{ParallelBackend, ParallelScheduler, Scheduler, SequentialScheduler};

// Runs every scheduler on its own grid, prints a few sample values and dumps
// each final `current` buffer as little endian f64 for external diffing.

fn save_to_file(grid: &GridState, filename: &str) -> Result<()> {
    let file = File::create(filename).with_context(|| format!("creating {}", filename))?;
    let mut out = BufWriter::new(file);
    for value in grid.current() {
        out.write_all(&value.to_le_bytes())?;
    }
    out.flush()?;
    Ok(())
}

fn run(scheduler: &mut dyn Scheduler, params: &SimulationParams) -> Result<GridState> {
    let mut grid = GridState::new(params)?;
    scheduler.run(&mut grid)?;
    Ok(grid)
}

fn main() -> Result<()> {
    let params = SimulationParams::cube(40, 100);
    let workers = available_workers();

    println!("=== scheduler output dump ===");
    println!("grid: {0}x{0}x{0}, steps: {1}, workers: {2}", params.size_x, params.steps, workers);
    println!();

    let mut schedulers: Vec<Box<dyn Scheduler>> = vec![
        Box::new(SequentialScheduler::new()),
        Box::new(ParallelScheduler::new(workers, ParallelBackend::Barrier)),
        Box::new(ParallelScheduler::new(workers, ParallelBackend::Rayon)),
    ];

    for scheduler in schedulers.iter_mut() {
        let grid = run(scheduler.as_mut(), &params)?;
        let filename = format!("heat3d_{}.bin", scheduler.name());
        save_to_file(&grid, &filename)?;
        println!("✓ {} -> {}", scheduler.name(), filename);

        let dims = grid.dims();
        let (cx, cy, cz) = (dims.x / 2, dims.y / 2, dims.z / 2);
        println!("  center [{}][{}][{}] = {:.6}", cx, cy, cz, grid.read(cx, cy, cz)?);
        println!("  next to inlet [1][{}][{}] = {:.6}", cy, cz, grid.read(1, cy, cz)?);
        println!("  next to far face [{}][{}][{}] = {:.6}", dims.x - 2, cy, cz, grid.read(dims.x - 2, cy, cz)?);
        println!();
    }

    println!("all dumps written.");
    Ok(())
}
