//! Build a runnable simulation from a scenario configuration.
//!
//! Maps the YAML-facing `ScenarioConfig` onto a fully populated
//! [`PhysicsEngine`] plus the run parameters (`dt`, `t_end`). Backend tags
//! and body shapes are validated here, so a built `Scenario` is ready to
//! step.

use crate::configuration::config::{DistributionConfig, ScenarioConfig};
use crate::simulation::distributions::{generate_cloud, CloudDistribution};
use crate::simulation::engine::{EngineError, PhysicsEngine};

pub struct Scenario {
    pub engine: PhysicsEngine,
    pub dt: f32,
    pub t_end: f32,
}

impl Scenario {
    pub fn build(cfg: ScenarioConfig) -> Result<Self, EngineError> {
        let backend = cfg.engine.backend.parse()?;

        let mut engine = PhysicsEngine::new();
        engine.initialize(0, backend);
        engine.set_gravitational_constant(cfg.parameters.g);
        engine.set_softening_length(cfg.parameters.softening);
        engine.set_theta(cfg.parameters.theta);
        engine.enable_collisions(cfg.engine.collisions);

        if let Some(cloud_cfg) = &cfg.cloud {
            let distribution = match cloud_cfg.distribution {
                DistributionConfig::Sphere => CloudDistribution::Sphere,
                DistributionConfig::Disk => CloudDistribution::Disk,
                DistributionConfig::Galaxy => CloudDistribution::Galaxy,
            };
            let cloud = generate_cloud(distribution, cloud_cfg.count, cloud_cfg.scale, cloud_cfg.seed);
            for k in 0..cloud.len() {
                let p = cloud.positions[k];
                let v = cloud.velocities[k];
                engine.add_particle(
                    &[p.x, p.y, p.z],
                    &[v.x, v.y, v.z],
                    cloud.masses[k],
                    cloud.types[k],
                )?;
            }
        }

        for body in &cfg.bodies {
            engine.add_particle(&body.x, &body.v, body.m, body.particle_type)?;
        }

        Ok(Self {
            engine,
            dt: cfg.parameters.dt,
            t_end: cfg.parameters.t_end,
        })
    }
}
