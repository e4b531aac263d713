//! Timing harnesses for the force evaluators and the whole step.
//!
//! Output is plain println so it can be piped into a spreadsheet. Particle
//! clouds are deterministic (no RNG) so repeated runs are comparable.

use std::time::Instant;

use crate::simulation::backend::ComputeBackend;
use crate::simulation::engine::PhysicsEngine;
use crate::simulation::forces::{compute_accelerations_barnes_hut, compute_accelerations_direct};
use crate::simulation::params::SimParams;
use crate::simulation::states::{ParticleSystem, Vec3, TYPE_STAR};

/// Deterministic cloud of `n` unit-mass particles spread over a ~10-unit box.
fn make_system(n: usize) -> ParticleSystem {
    let mut sys = ParticleSystem::new();
    for i in 0..n {
        let i_f = i as f32;
        sys.push(
            Vec3::new(
                (i_f * 0.37).sin() * 5.0,
                (i_f * 0.13).cos() * 5.0,
                (i_f * 0.07).sin() * 5.0,
            ),
            Vec3::zeros(),
            1.0,
            TYPE_STAR,
        );
    }
    sys
}

fn bench_params() -> SimParams {
    SimParams {
        g: 0.1,
        softening: 0.01,
        theta: 0.7,
        collisions_enabled: false,
    }
}

/// Compare one direct-sum evaluation against one tree-code evaluation for a
/// range of N.
pub fn bench_gravity() {
    let ns = [200, 400, 800, 1600, 3200, 6400];
    let params = bench_params();

    println!("N,direct_ms,tree_ms");
    for n in ns {
        let mut sys = make_system(n);

        // Warm up
        compute_accelerations_direct(&mut sys, &params);
        compute_accelerations_barnes_hut(&mut sys, &params);

        let t0 = Instant::now();
        compute_accelerations_direct(&mut sys, &params);
        let direct_ms = t0.elapsed().as_secs_f64() * 1000.0;

        let t1 = Instant::now();
        compute_accelerations_barnes_hut(&mut sys, &params);
        let tree_ms = t1.elapsed().as_secs_f64() * 1000.0;

        println!("{n},{direct_ms:.6},{tree_ms:.6}");
    }
}

/// Whole-step timing through the engine, single-thread vs threaded backend.
pub fn bench_step() {
    let ns = [200, 400, 800, 1600, 3200, 6400, 12800];
    let steps = 3;
    let dt = 0.001;

    println!("N,single_ms,openmp_ms");
    for n in ns {
        let mut row = Vec::with_capacity(2);

        for backend in [ComputeBackend::CpuSingleThread, ComputeBackend::CpuParallel] {
            let sys = make_system(n);
            let mut engine = PhysicsEngine::new();
            engine.initialize(0, backend);
            engine.set_theta(0.7);
            engine.set_gravitational_constant(0.1);
            for i in 0..n {
                let p = sys.positions[i];
                engine
                    .add_particle(&[p.x, p.y, p.z], &[0.0, 0.0, 0.0], 1.0, TYPE_STAR)
                    .expect("slices are 3 elements");
            }

            // Warm up, then average a few steps
            engine.step(dt);
            let t0 = Instant::now();
            for _ in 0..steps {
                engine.step(dt);
            }
            row.push(t0.elapsed().as_secs_f64() * 1000.0 / steps as f64);
        }

        println!("{n},{:.6},{:.6}", row[0], row[1]);
    }
}
