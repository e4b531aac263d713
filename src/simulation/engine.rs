//! The physics engine: host-facing boundary plus backend dispatch.
//!
//! `PhysicsEngine` owns the particle store, the physics parameters, and the
//! selected compute backend. A host drives it through bulk array setters and
//! getters (shape-checked, copied both ways), scalar add/remove, parameter
//! setters, and `step(dt)`.
//!
//! One step runs build tree -> aggregate mass -> evaluate accelerations ->
//! integrate -> merge collisions (when enabled), on whichever backend is
//! selected, and records its wall-clock duration. Backends that are not
//! built in log a warning and run the threaded CPU path; results never
//! depend on the fallback.

use std::time::Instant;

use thiserror::Error;

use crate::simulation::backend::{ComputeBackend, UnknownBackendError};
use crate::simulation::collisions;
use crate::simulation::forces;
use crate::simulation::integrator;
use crate::simulation::params::{SimParams, THETA_MAX};
use crate::simulation::states::{ParticleSystem, Vec3};

/// Errors reported synchronously at the host boundary. Boundary operations
/// validate fully before touching state, so a returned error implies the
/// engine is unchanged.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("shape mismatch: expected {expected} values, got {got}")]
    ShapeMismatch { expected: usize, got: usize },
    #[error(transparent)]
    UnknownBackend(#[from] UnknownBackendError),
}

#[derive(Debug, Default)]
pub struct PhysicsEngine {
    particles: ParticleSystem,
    backend: ComputeBackend,
    params: SimParams,
    last_step_time_ms: f64,
}

impl PhysicsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size the store to `particle_count` (new slots zeroed), zero all
    /// accelerations, and select `backend`.
    pub fn initialize(&mut self, particle_count: usize, backend: ComputeBackend) {
        self.particles.resize(particle_count);
        self.particles.zero_accelerations();
        self.backend = backend;
        log::info!(
            "engine initialized with {particle_count} particles on backend {}",
            self.backend
        );
    }

    // ---- bulk array ingress ------------------------------------------------

    /// Replace positions from a flat `count * 3` buffer (row-major x, y, z).
    /// Resizes the whole store to `count`.
    pub fn set_positions(&mut self, data: &[f32], count: usize) -> Result<(), EngineError> {
        check_shape(data.len(), count * 3)?;
        self.resize_if_needed(count);
        for (p, chunk) in self.particles.positions.iter_mut().zip(data.chunks_exact(3)) {
            *p = Vec3::new(chunk[0], chunk[1], chunk[2]);
        }
        Ok(())
    }

    /// Replace velocities from a flat `count * 3` buffer.
    pub fn set_velocities(&mut self, data: &[f32], count: usize) -> Result<(), EngineError> {
        check_shape(data.len(), count * 3)?;
        self.resize_if_needed(count);
        for (v, chunk) in self.particles.velocities.iter_mut().zip(data.chunks_exact(3)) {
            *v = Vec3::new(chunk[0], chunk[1], chunk[2]);
        }
        Ok(())
    }

    /// Replace masses from a `count`-element buffer.
    pub fn set_masses(&mut self, data: &[f32], count: usize) -> Result<(), EngineError> {
        check_shape(data.len(), count)?;
        self.resize_if_needed(count);
        self.particles.masses.copy_from_slice(data);
        Ok(())
    }

    /// Replace type tags from a `count`-element buffer.
    pub fn set_types(&mut self, data: &[i32], count: usize) -> Result<(), EngineError> {
        check_shape(data.len(), count)?;
        self.resize_if_needed(count);
        self.particles.types.copy_from_slice(data);
        Ok(())
    }

    // ---- bulk array egress -------------------------------------------------

    /// Current positions as a freshly allocated flat `N * 3` buffer.
    pub fn positions(&self) -> Vec<f32> {
        flatten(&self.particles.positions)
    }

    /// Current velocities as a freshly allocated flat `N * 3` buffer.
    pub fn velocities(&self) -> Vec<f32> {
        flatten(&self.particles.velocities)
    }

    /// Current masses as a freshly allocated `N` buffer.
    pub fn masses(&self) -> Vec<f32> {
        self.particles.masses.clone()
    }

    /// Current type tags as a freshly allocated `N` buffer.
    pub fn types(&self) -> Vec<i32> {
        self.particles.types.clone()
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    // ---- scalar particle management ---------------------------------------

    /// Append one particle. `position` and `velocity` must be 3-element
    /// slices.
    pub fn add_particle(
        &mut self,
        position: &[f32],
        velocity: &[f32],
        mass: f32,
        particle_type: i32,
    ) -> Result<(), EngineError> {
        check_shape(position.len(), 3)?;
        check_shape(velocity.len(), 3)?;
        self.particles.push(
            Vec3::new(position[0], position[1], position[2]),
            Vec3::new(velocity[0], velocity[1], velocity[2]),
            mass,
            particle_type,
        );
        Ok(())
    }

    /// Remove the particle at `index`; out-of-range indices are ignored.
    pub fn remove_particle(&mut self, index: usize) {
        self.particles.remove(index);
    }

    // ---- simulation --------------------------------------------------------

    /// Advance the system by `dt` on the selected backend and record the
    /// wall-clock time of the call. Never fails; numerical blow-up shows up
    /// as non-finite particle state, which the host is expected to detect.
    pub fn step(&mut self, dt: f32) {
        let start = Instant::now();

        match self.backend {
            ComputeBackend::CpuSingleThread => self.step_cpu_single(dt),
            ComputeBackend::CpuParallel => self.step_cpu_parallel(dt),
            ComputeBackend::Cuda => {
                log::warn!("cuda backend requested but not built in, using threaded cpu");
                self.step_cpu_parallel(dt);
            }
            ComputeBackend::OpenGlCompute => {
                log::warn!("opengl compute backend requested but not built in, using threaded cpu");
                self.step_cpu_parallel(dt);
            }
        }

        self.last_step_time_ms = start.elapsed().as_secs_f64() * 1000.0;
    }

    /// Zero all accelerations.
    pub fn reset(&mut self) {
        self.particles.zero_accelerations();
    }

    fn step_cpu_single(&mut self, dt: f32) {
        forces::compute_accelerations_barnes_hut(&mut self.particles, &self.params);
        integrator::integrate_verlet(&mut self.particles, dt);
        self.merge_if_enabled();
    }

    fn step_cpu_parallel(&mut self, dt: f32) {
        forces::compute_accelerations_barnes_hut_parallel(&mut self.particles, &self.params);
        integrator::integrate_verlet_parallel(&mut self.particles, dt);
        self.merge_if_enabled();
    }

    fn merge_if_enabled(&mut self) {
        if self.params.collisions_enabled {
            let merged = collisions::resolve_collisions(&mut self.particles, self.params.softening);
            if merged > 0 {
                log::debug!("collision pass merged {merged} particles");
            }
        }
    }

    // ---- parameters --------------------------------------------------------

    pub fn set_gravitational_constant(&mut self, g: f32) {
        self.params.g = g;
    }

    pub fn set_softening_length(&mut self, epsilon: f32) {
        self.params.softening = epsilon;
    }

    /// Set the opening parameter, clamped to `[0, THETA_MAX]`.
    pub fn set_theta(&mut self, theta: f32) {
        self.params.theta = theta.clamp(0.0, THETA_MAX);
    }

    pub fn enable_collisions(&mut self, enable: bool) {
        self.params.collisions_enabled = enable;
    }

    pub fn set_backend(&mut self, backend: ComputeBackend) {
        self.backend = backend;
    }

    /// Select a backend by its host tag (`single`, `openmp`, `cuda`,
    /// `opengl`).
    pub fn set_backend_tag(&mut self, tag: &str) -> Result<(), EngineError> {
        self.backend = tag.parse::<ComputeBackend>()?;
        Ok(())
    }

    pub fn backend(&self) -> ComputeBackend {
        self.backend
    }

    /// Wall-clock duration of the most recent `step`, in milliseconds.
    pub fn last_step_time_ms(&self) -> f64 {
        self.last_step_time_ms
    }

    fn resize_if_needed(&mut self, count: usize) {
        if self.particles.len() != count {
            self.particles.resize(count);
        }
    }
}

fn check_shape(got: usize, expected: usize) -> Result<(), EngineError> {
    if got != expected {
        return Err(EngineError::ShapeMismatch { expected, got });
    }
    Ok(())
}

fn flatten(vectors: &[Vec3]) -> Vec<f32> {
    let mut out = Vec::with_capacity(vectors.len() * 3);
    for v in vectors {
        out.extend_from_slice(&[v.x, v.y, v.z]);
    }
    out
}
