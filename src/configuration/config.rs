//! Configuration types for loading simulation scenarios from YAML.
//!
//! A scenario names a backend, the physics parameters, and the initial
//! particles, either as a generated cloud, an explicit body list, or both:
//!
//! ```yaml
//! engine:
//!   backend: "openmp"       # single | openmp | cuda | opengl
//!   collisions: false
//!
//! parameters:
//!   g: 1.0                  # gravitational constant
//!   softening: 0.01         # Plummer softening length
//!   theta: 0.5              # Barnes-Hut opening parameter
//!   dt: 0.001               # fixed step size
//!   t_end: 1.0              # total simulation time
//!
//! cloud:
//!   distribution: "galaxy"  # sphere | disk | galaxy
//!   count: 2000
//!   scale: 10.0
//!   seed: 42
//!
//! bodies:
//!   - x: [0.0, 0.0, 0.0]
//!     v: [0.0, 0.0, 0.0]
//!     m: 1000.0
//!     type: 2
//! ```
//!
//! These types stay serde-facing; `simulation::scenario` maps them onto the
//! runtime engine.

use serde::Deserialize;

/// Spatial distribution of a generated particle cloud.
#[derive(Deserialize, Debug, Clone, Copy)]
pub enum DistributionConfig {
    #[serde(rename = "sphere")]
    Sphere,
    #[serde(rename = "disk")]
    Disk,
    #[serde(rename = "galaxy")]
    Galaxy,
}

/// Engine-level options.
#[derive(Deserialize, Debug)]
pub struct EngineConfig {
    pub backend: String, // backend tag, validated when the scenario is built
    #[serde(default)]
    pub collisions: bool,
}

/// Numerical parameters and physical constants.
#[derive(Deserialize, Debug, Clone)]
pub struct ParametersConfig {
    pub g: f32,
    pub softening: f32,
    pub theta: f32,
    pub dt: f32,
    pub t_end: f32,
}

/// A generated particle cloud.
#[derive(Deserialize, Debug)]
pub struct CloudConfig {
    pub distribution: DistributionConfig,
    pub count: usize,
    pub scale: f32,
    pub seed: u64,
}

/// One explicitly placed body.
#[derive(Deserialize, Debug)]
pub struct BodyConfig {
    pub x: Vec<f32>, // position, 3 elements
    pub v: Vec<f32>, // velocity, 3 elements
    pub m: f32,
    #[serde(rename = "type", default)]
    pub particle_type: i32,
}

/// Top-level scenario loaded from YAML.
#[derive(Deserialize, Debug)]
pub struct ScenarioConfig {
    pub engine: EngineConfig,
    pub parameters: ParametersConfig,
    #[serde(default)]
    pub cloud: Option<CloudConfig>,
    #[serde(default)]
    pub bodies: Vec<BodyConfig>,
}
