//! Fixed-step position-Verlet integration.
//!
//! One force evaluation per step feeds the kick-drift pair
//!
//! ```text
//! x += v*dt + 0.5*a*dt^2
//! v += a*dt
//! ```
//!
//! applied in-place. Per-particle updates are independent, so the parallel
//! variant is a straight scatter over rayon workers.

use rayon::prelude::*;

use crate::simulation::states::ParticleSystem;

/// Advance positions and velocities by `dt` on the calling thread.
pub fn integrate_verlet(sys: &mut ParticleSystem, dt: f32) {
    let half_dt2 = 0.5 * dt * dt;

    for ((x, v), a) in sys
        .positions
        .iter_mut()
        .zip(sys.velocities.iter_mut())
        .zip(sys.accelerations.iter())
    {
        *x += *v * dt + *a * half_dt2;
        *v += *a * dt;
    }
}

/// Advance positions and velocities by `dt` across worker threads.
pub fn integrate_verlet_parallel(sys: &mut ParticleSystem, dt: f32) {
    let half_dt2 = 0.5 * dt * dt;

    sys.positions
        .par_iter_mut()
        .zip(sys.velocities.par_iter_mut())
        .zip(sys.accelerations.par_iter())
        .for_each(|((x, v), a)| {
            *x += *v * dt + *a * half_dt2;
            *v += *a * dt;
        });
}
