pub mod benchmark;
pub mod configuration;
pub mod simulation;

pub use simulation::backend::{ComputeBackend, UnknownBackendError};
pub use simulation::collisions::resolve_collisions;
pub use simulation::distributions::{generate_cloud, Cloud, CloudDistribution};
pub use simulation::engine::{EngineError, PhysicsEngine};
pub use simulation::forces::{
    compute_accelerations_barnes_hut, compute_accelerations_barnes_hut_parallel,
    compute_accelerations_direct,
};
pub use simulation::integrator::{integrate_verlet, integrate_verlet_parallel};
pub use simulation::octree::Octree;
pub use simulation::params::SimParams;
pub use simulation::scenario::Scenario;
pub use simulation::states::{ParticleSystem, Vec3};

pub use configuration::config::ScenarioConfig;

pub use benchmark::benchmark::{bench_gravity, bench_step};
