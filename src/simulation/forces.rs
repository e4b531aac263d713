//! Acceleration evaluation for the whole system.
//!
//! Three evaluators, all overwriting the acceleration array in full:
//! - `compute_accelerations_barnes_hut`: tree-code, calling thread only
//! - `compute_accelerations_barnes_hut_parallel`: tree-code with the
//!   per-particle loop scattered across rayon workers
//! - `compute_accelerations_direct`: exact pairwise O(N^2) sum, used as the
//!   accuracy reference in tests and benchmarks
//!
//! The tree is rebuilt from the current positions on every call and dropped
//! on return; workers share it read-only and write disjoint indices of the
//! acceleration array, so no locking is involved.

use rayon::prelude::*;

use crate::simulation::octree::Octree;
use crate::simulation::params::SimParams;
use crate::simulation::states::{ParticleSystem, Vec3};

/// Tree-code accelerations on the calling thread.
pub fn compute_accelerations_barnes_hut(sys: &mut ParticleSystem, params: &SimParams) {
    let tree = match Octree::build(sys, params.softening) {
        Some(tree) => tree,
        None => return,
    };
    let eps2 = params.softening2();

    let positions = &sys.positions;
    let masses = &sys.masses;
    for (i, acc) in sys.accelerations.iter_mut().enumerate() {
        *acc = tree.acceleration_on(i, positions, masses, params.g, eps2, params.theta);
    }
}

/// Tree-code accelerations with per-particle data parallelism.
/// Identical arithmetic per particle as the serial path; only the scheduling
/// of the outer loop differs.
pub fn compute_accelerations_barnes_hut_parallel(sys: &mut ParticleSystem, params: &SimParams) {
    let tree = match Octree::build(sys, params.softening) {
        Some(tree) => tree,
        None => return,
    };
    let eps2 = params.softening2();

    let positions = &sys.positions;
    let masses = &sys.masses;
    sys.accelerations
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, acc)| {
            *acc = tree.acceleration_on(i, positions, masses, params.g, eps2, params.theta);
        });
}

/// Exact Newtonian gravity over unordered pairs (i, j), i < j, with the same
/// Plummer softening as the tree evaluators. Accumulates equal and opposite
/// terms, so momentum is conserved to rounding.
pub fn compute_accelerations_direct(sys: &mut ParticleSystem, params: &SimParams) {
    let n = sys.len();
    sys.zero_accelerations();
    if n == 0 {
        return;
    }

    let g = params.g;
    let eps2 = params.softening2();

    for i in 0..n {
        let xi = sys.positions[i];
        let mi = sys.masses[i];

        for j in (i + 1)..n {
            let r: Vec3 = sys.positions[j] - xi;
            let r2 = r.norm_squared() + eps2;
            let inv_r = r2.sqrt().recip();
            let inv_r3 = inv_r * inv_r * inv_r;
            let coef = g * inv_r3;

            sys.accelerations[i] += coef * sys.masses[j] * r;
            sys.accelerations[j] -= coef * mi * r;
        }
    }
}
