//! End-to-end runs through the driver: frame schedule, decomposition
//! equivalence, determinism and the [0,1] bound invariant.

use gray_scott_stream::prelude::*;
use serial_test::serial;

fn run_ranks<T, F>(size: usize, body: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(usize, RayonComm) -> T + Send + Sync + Clone + 'static,
{
    let workers: Vec<_> = (0..size)
        .map(|rank| {
            let body = body.clone();
            std::thread::spawn(move || body(rank, RayonComm::new(rank, size)))
        })
        .collect();
    workers.into_iter().map(|w| w.join().unwrap()).collect()
}

fn config(grid: GridConfig, total_steps: u64, output_interval: u64) -> RunConfig {
    RunConfig {
        grid,
        total_steps,
        output_interval,
        ..RunConfig::default()
    }
}

/// Run the full simulation on `size` in-process ranks and return each
/// rank's recorded frames.
fn run_distributed(cfg: RunConfig, size: usize) -> Vec<Vec<Frame>> {
    run_ranks(size, move |_rank, comm| {
        let mut driver = SimulationDriver::new(cfg, &comm).unwrap();
        let mut sink = MemorySink::new();
        driver.run(&comm, &mut sink).unwrap();
        sink.frames().to_vec()
    })
}

/// Stitch one variable of one frame back into a global (z, y, x) array
/// from every rank's block put.
fn assemble(per_rank: &[Vec<Frame>], frame: usize, name: &str, grid: &GridConfig) -> Vec<f64> {
    let mut global = vec![f64::NAN; grid.cell_count()];
    let plane = grid.ny * grid.nx;
    for frames in per_rank {
        for put in &frames[frame].puts {
            if put.name == name {
                let start = put.offset[0] * plane;
                global[start..start + put.data.len()].copy_from_slice(&put.data);
            }
        }
    }
    assert!(global.iter().all(|v| !v.is_nan()), "gap in assembled field");
    global
}

#[test]
#[serial]
fn two_rank_run_matches_single_rank_bitwise() {
    let grid = GridConfig::cube(8);
    let cfg = config(grid, 10, 5);

    let comm = NoComm;
    let mut driver = SimulationDriver::new(cfg, &comm).unwrap();
    let mut sink = MemorySink::new();
    driver.run(&comm, &mut sink).unwrap();
    let serial_frames = vec![sink.frames().to_vec()];

    let distributed = run_distributed(cfg, 2);

    for frame in 0..3 {
        for name in ["U", "V"] {
            let want = assemble(&serial_frames, frame, name, &grid);
            let got = assemble(&distributed, frame, name, &grid);
            assert_eq!(want, got, "frame {frame}, variable {name}");
        }
    }
}

#[test]
#[serial]
fn repeated_runs_are_bit_identical() {
    let grid = GridConfig::cube(8);
    let cfg = config(grid, 10, 5);

    let first = run_distributed(cfg, 2);
    let second = run_distributed(cfg, 2);

    for frame in 0..3 {
        for name in ["U", "V"] {
            assert_eq!(
                assemble(&first, frame, name, &grid),
                assemble(&second, frame, name, &grid)
            );
        }
    }
}

#[test]
#[serial]
fn frame_schedule_and_step_scalar_across_ranks() {
    // interval 5 over 12 steps: frames at 0, 5, 10; step 12 not emitted.
    let cfg = config(GridConfig::cube(8), 12, 5);
    let distributed = run_distributed(cfg, 2);

    for (rank, frames) in distributed.iter().enumerate() {
        assert_eq!(frames.len(), 3, "rank {rank}");
        let steps: Vec<_> = frames.iter().map(|f| f.step).collect();
        if rank == 0 {
            assert_eq!(steps, vec![Some(0), Some(5), Some(10)]);
        } else {
            // Only the designated rank writes the scalar.
            assert_eq!(steps, vec![None, None, None]);
        }
    }
}

#[test]
#[serial]
fn zero_extent_ranks_complete_the_run() {
    // 4 ranks on a 2-slice axis: the empty suffix must still frame its
    // zero-extent contributions and join the metrics reduction.
    let grid = GridConfig {
        nz: 2,
        ny: 4,
        nx: 4,
    };
    let cfg = config(grid, 4, 2);
    let distributed = run_distributed(cfg, 4);

    for frames in &distributed {
        assert_eq!(frames.len(), 3);
    }
    assert!(distributed[2].iter().all(|f| f.puts[0].extent == [0, 4, 4]));
    // The populated ranks still tile the axis.
    let u = assemble(&distributed, 2, "U", &grid);
    assert_eq!(u.len(), 32);
}

#[test]
fn fields_stay_within_unit_bounds() {
    let grid = GridConfig::cube(12);
    let cfg = config(grid, 100, 20);

    let comm = NoComm;
    let mut driver = SimulationDriver::new(cfg, &comm).unwrap();
    let mut sink = MemorySink::new();
    let summary = driver.run(&comm, &mut sink).unwrap();
    assert_eq!(summary.frames_emitted, 6);

    for frame in sink.frames() {
        for put in &frame.puts {
            assert!(
                put.data.iter().all(|&v| (0.0..=1.0).contains(&v)),
                "out-of-bounds value in {}",
                put.name
            );
        }
    }
}

#[test]
fn seeded_pattern_actually_evolves() {
    // Sanity against a silently dead simulation: with the centered seed
    // and default constants, V must spread beyond the seed cube.
    let grid = GridConfig::cube(12);
    let cfg = config(grid, 50, 50);

    let comm = NoComm;
    let mut driver = SimulationDriver::new(cfg, &comm).unwrap();
    let mut sink = MemorySink::new();
    driver.run(&comm, &mut sink).unwrap();

    let first = &sink.frames()[0].puts[1];
    let last = &sink.frames()[1].puts[1];
    assert_eq!(first.name, "V");
    let nonzero_before = first.data.iter().filter(|&&v| v > 0.0).count();
    let nonzero_after = last.data.iter().filter(|&&v| v > 0.0).count();
    assert!(nonzero_after > nonzero_before);
}
