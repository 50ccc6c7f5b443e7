use approx::assert_abs_diff_eq;

use heat3d_rust::config::SimulationParams;
use heat3d_rust::error::{Axis, HeatError};
use heat3d_rust::grid::{GridState, BOUNDARY_TEMPERATURE};
use heat3d_rust::harness::{BenchmarkHarness, BenchmarkReport, GridPolicy, Statistics};
use heat3d_rust::partition::SlabPartition;
use heat3d_rust::schedulers::{
    ParallelBackend, ParallelScheduler, Scheduler, SchedulerState, SequentialScheduler,
};
use heat3d_rust::slice::MidPlane;
use std::time::Duration;

const TEST_STEPS: i64 = 10;

fn all_schedulers() -> Vec<Box<dyn Scheduler>> {
    vec![
        Box::new(SequentialScheduler::new()),
        Box::new(ParallelScheduler::new(3, ParallelBackend::Barrier)),
        Box::new(ParallelScheduler::new(3, ParallelBackend::Rayon)),
    ]
}

#[test]
fn test_boundary_conditions() {
    let params = SimulationParams::cube(0, TEST_STEPS).with_size(9, 6, 7);
    let initial = GridState::new(&params).unwrap();

    for mut scheduler in all_schedulers() {
        let mut grid = GridState::new(&params).unwrap();
        scheduler.run(&mut grid).unwrap();

        let dims = grid.dims();
        for x in 0..dims.x {
            for y in 0..dims.y {
                for z in 0..dims.z {
                    // the x == 0 inlet face is fixed as well
                    if dims.is_boundary(x, y, z) || x == 0 {
                        assert_eq!(
                            grid.read(x, y, z).unwrap(),
                            initial.read(x, y, z).unwrap(),
                            "{}: boundary at ({}, {}, {}) changed",
                            scheduler.name(),
                            x,
                            y,
                            z
                        );
                    }
                }
            }
        }
    }

    println!("✓ Boundary conditions: All boundaries keep their values!");
}

#[test]
fn test_single_step_closed_form() {
    let params = SimulationParams::cube(5, 1);
    let mut grid = GridState::new(&params).unwrap();
    assert_eq!(grid.read(4, 2, 2).unwrap(), 300.0);
    assert_eq!(grid.read(1, 2, 2).unwrap(), 0.0);

    SequentialScheduler::new().run(&mut grid).unwrap();

    // dTx = 100, dTy = dTz = 0: 0 + 0.5 * 0.1 * 100
    assert_eq!(grid.read(1, 2, 2).unwrap(), 5.0);
    assert_eq!(grid.read(4, 2, 2).unwrap(), 300.0);
    // (2, 2, 2) only sees 0-valued neighbours
    assert_eq!(grid.read(2, 2, 2).unwrap(), 0.0);
    // (3, 2, 2) touches the far face: dTx = 300
    assert_abs_diff_eq!(grid.read(3, 2, 2).unwrap(), 15.0, epsilon = 1e-12);
}

#[test]
fn test_partition_covers_interior_exactly() {
    for extent_end in 1..40 {
        for workers in 1..12 {
            let extent = 1..extent_end;
            let partition = SlabPartition::new(extent.clone(), workers);
            assert_eq!(partition.workers(), workers);

            let mut expected = extent.start;
            for slab in partition.slabs() {
                assert_eq!(slab.start, expected, "gap or overlap before {:?}", slab);
                assert!(slab.end >= slab.start);
                expected = slab.end;
            }
            assert_eq!(expected, extent.end.max(extent.start));

            let lens: Vec<usize> = partition.slabs().iter().map(|s| s.len()).collect();
            let (min, max) = (lens.iter().min().unwrap(), lens.iter().max().unwrap());
            assert!(max - min <= 1, "uneven split {:?}", lens);
        }
    }
}

#[test]
fn test_degenerate_grids() {
    let shapes = [(1, 5, 5), (5, 1, 5), (5, 5, 1), (2, 6, 6), (6, 2, 6), (6, 6, 2), (2, 2, 2), (1, 1, 1)];
    for (sx, sy, sz) in shapes {
        let params = SimulationParams::cube(0, TEST_STEPS).with_size(sx, sy, sz);
        let initial = GridState::new(&params).unwrap();
        assert!(!initial.has_interior());

        for mut scheduler in all_schedulers() {
            let mut grid = GridState::new(&params).unwrap();
            scheduler.run(&mut grid).unwrap();
            assert_eq!(
                grid.current(),
                initial.current(),
                "{} changed a {}x{}x{} grid",
                scheduler.name(),
                sx,
                sy,
                sz
            );
            assert_eq!(scheduler.state(), SchedulerState::Done);
        }
    }
}

#[test]
fn test_max_change_does_not_grow() {
    // one step per run so the grid can be inspected in between
    let params = SimulationParams::cube(8, 1);
    assert!(params.is_stable());
    let mut grid = GridState::new(&params).unwrap();
    let mut scheduler = SequentialScheduler::new();

    let mut deltas = Vec::new();
    for _ in 0..200 {
        let before = grid.current().to_vec();
        scheduler.run(&mut grid).unwrap();
        let delta = before
            .iter()
            .zip(grid.current())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        deltas.push(delta);
    }

    for pair in deltas.windows(2) {
        assert!(pair[1] <= pair[0] + 1e-9, "max change grew: {} -> {}", pair[0], pair[1]);
    }
    assert!(deltas[199] < deltas[0] * 0.1);
}

#[test]
fn test_unstable_parameters_are_not_rejected() {
    // stability number 0.5 * 1.0 * 3 = 1.5; the engine computes anyway
    let params = SimulationParams::cube(6, 50).with_dt(1.0);
    let mut grid = GridState::new(&params).unwrap();
    assert!(!grid.is_stable());
    SequentialScheduler::new().run(&mut grid).unwrap();
    let max = grid.current().iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    assert!(max > BOUNDARY_TEMPERATURE || max.is_nan());
}

#[test]
fn test_invalid_requests() {
    let zero = SimulationParams::default().with_size(0, 4, 4);
    assert_eq!(
        GridState::new(&zero).unwrap_err(),
        HeatError::InvalidDimension { axis: Axis::X, value: 0 }
    );

    let negative = SimulationParams::default().with_size(4, 4, -3);
    assert_eq!(
        GridState::new(&negative).unwrap_err(),
        HeatError::InvalidDimension { axis: Axis::Z, value: -3 }
    );

    let steps = SimulationParams::cube(4, -1);
    assert_eq!(GridState::new(&steps).unwrap_err(), HeatError::InvalidStepCount(-1));

    let harness = BenchmarkHarness::new(SimulationParams::cube(4, -5));
    assert!(matches!(harness.run(), Err(HeatError::InvalidStepCount(-5))));
}

#[test]
fn test_oversized_grid_is_rejected() {
    // every axis is valid on its own; the cell count overflows usize
    let overflow = SimulationParams::cube(1, 0).with_size(1 << 22, 1 << 22, 1 << 22);
    assert_eq!(
        GridState::new(&overflow).unwrap_err(),
        HeatError::GridTooLarge {
            dims: (1 << 22, 1 << 22, 1 << 22)
        }
    );

    // the cell count fits, the byte count does not
    let bytes = SimulationParams::cube(1 << 20, 0);
    assert!(matches!(GridState::new(&bytes), Err(HeatError::GridTooLarge { .. })));

    let harness = BenchmarkHarness::new(overflow).with_workers(2);
    assert!(matches!(harness.run(), Err(HeatError::GridTooLarge { .. })));
}

#[test]
fn test_snapshot_file() {
    let run = BenchmarkHarness::new(SimulationParams::cube(6, 4).with_size(7, 5, 6))
        .with_workers(2)
        .run()
        .unwrap();
    let plane = MidPlane::z(&run.grid).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slice.ppm");
    plane.write_ppm(std::fs::File::create(&path).unwrap()).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let header = b"P6\n7 5\n255\n";
    assert!(bytes.starts_with(header));
    assert_eq!(bytes.len(), header.len() + 7 * 5 * 3);
    assert_eq!(&bytes[header.len()..], &plane.to_rgb()[..]);
}

#[test]
fn test_read_out_of_range() {
    let grid = GridState::new(&SimulationParams::cube(0, 0).with_size(3, 4, 5)).unwrap();
    assert!(grid.read(2, 3, 4).is_ok());
    for (x, y, z) in [(3, 0, 0), (0, 4, 0), (0, 0, 5), (usize::MAX, 0, 0)] {
        match grid.read(x, y, z) {
            Err(HeatError::OutOfRange { dims, .. }) => assert_eq!(dims, (3, 4, 5)),
            other => panic!("expected OutOfRange for ({}, {}, {}), got {:?}", x, y, z, other),
        }
    }
}

#[test]
fn test_scheduler_states() {
    let mut grid = GridState::new(&SimulationParams::cube(4, 2)).unwrap();
    let mut scheduler = ParallelScheduler::new(2, ParallelBackend::Barrier);
    assert_eq!((scheduler.workers(), scheduler.backend()), (2, ParallelBackend::Barrier));
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    scheduler.run(&mut grid).unwrap();
    assert_eq!(scheduler.state(), SchedulerState::Done);
}

#[test]
fn test_harness_fresh_policy() {
    let params = SimulationParams::cube(7, 6);
    let run = BenchmarkHarness::new(params.clone())
        .with_workers(2)
        .with_policy(GridPolicy::Fresh)
        .run()
        .unwrap();

    let mut expected = GridState::new(&params).unwrap();
    SequentialScheduler::new().run(&mut expected).unwrap();
    assert_eq!(run.grid.current(), expected.current());
    assert_eq!(run.report.workers, 2);
}

#[test]
fn test_harness_shared_policy() {
    // the parallel run continues where the sequential one stopped
    let params = SimulationParams::cube(7, 6);
    let run = BenchmarkHarness::new(params.clone())
        .with_workers(3)
        .with_backend(ParallelBackend::Rayon)
        .with_policy(GridPolicy::Shared)
        .run()
        .unwrap();

    let mut expected = GridState::new(&params.clone().with_steps(12)).unwrap();
    SequentialScheduler::new().run(&mut expected).unwrap();
    assert_eq!(run.grid.current(), expected.current());
}

#[test]
fn test_report_payload() {
    let run = BenchmarkHarness::new(SimulationParams::cube(6, 3))
        .with_workers(2)
        .run()
        .unwrap();
    let json = serde_json::to_value(&run.report).unwrap();
    assert!(json.get("SequentialTime").is_some());
    assert!(json.get("ParallelTime").is_some());
    assert_eq!(json["Workers"], 2);
    assert_eq!(json["SequentialTime"], run.sequential.as_millis() as u64);
}

#[test]
fn test_measure_statistics() {
    let measurement = BenchmarkHarness::new(SimulationParams::cube(6, 3))
        .with_workers(2)
        .measure(1, 3)
        .unwrap();
    assert_eq!(measurement.iterations, 3);
    for stats in [measurement.sequential, measurement.parallel] {
        assert!(stats.min <= stats.median);
        assert!(stats.median <= stats.max);
        assert!(stats.min <= stats.mean && stats.mean <= stats.max);
    }

    let report = BenchmarkReport {
        sequential_time: 90,
        parallel_time: 30,
        workers: 4,
    };
    assert_abs_diff_eq!(report.speedup().unwrap(), 3.0);
    assert_eq!(BenchmarkReport { parallel_time: 0, ..report }.speedup(), None);

    let stats = Statistics::from_samples(vec![
        Duration::from_millis(5),
        Duration::from_millis(1),
        Duration::from_millis(3),
    ]);
    assert_eq!(stats.min, Duration::from_millis(1));
    assert_eq!(stats.median, Duration::from_millis(3));
    assert_eq!(stats.mean, Duration::from_millis(3));
    assert_eq!(stats.max, Duration::from_millis(5));
}
