//! Seeded initial-condition generators.
//!
//! Builds particle clouds a host (or a scenario file) can feed straight into
//! the engine: uniform ball, exponential disk, or a two-component spiral
//! galaxy, with Keplerian tangential velocities and weighted type tags.
//! The same seed always produces the same cloud.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp, Normal};

use crate::simulation::states::{Vec3, TYPE_BLACK_HOLE, TYPE_PLANET, TYPE_STAR};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudDistribution {
    /// Uniform ball of radius `scale` (rejection-sampled).
    Sphere,
    /// Exponential radial profile in the XY plane with Gaussian thickness.
    Disk,
    /// 30% spherical bulge plus spiral arms whose phase winds with radius.
    Galaxy,
}

/// A generated cloud, one entry per particle, ready for bulk loading.
pub struct Cloud {
    pub positions: Vec<Vec3>,
    pub velocities: Vec<Vec3>,
    pub masses: Vec<f32>,
    pub types: Vec<i32>,
}

impl Cloud {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Generate `count` particles with the given spatial distribution and
/// characteristic radius `scale`, deterministically from `seed`.
pub fn generate_cloud(
    distribution: CloudDistribution,
    count: usize,
    scale: f32,
    seed: u64,
) -> Cloud {
    let scale = scale.max(1.0e-3);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let positions = match distribution {
        CloudDistribution::Sphere => sphere_positions(&mut rng, count, scale),
        CloudDistribution::Disk => disk_positions(&mut rng, count, scale),
        CloudDistribution::Galaxy => galaxy_positions(&mut rng, count, scale),
    };
    let velocities = orbital_velocities(&mut rng, &positions);

    let mut masses = Vec::with_capacity(count);
    let mut types = Vec::with_capacity(count);
    for _ in 0..count {
        masses.push(rng.gen_range(0.1..2.0));
        types.push(pick_type(&mut rng));
    }

    Cloud {
        positions,
        velocities,
        masses,
        types,
    }
}

fn sphere_positions(rng: &mut ChaCha8Rng, count: usize, scale: f32) -> Vec<Vec3> {
    let mut positions = Vec::with_capacity(count);
    while positions.len() < count {
        let p = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        if p.norm_squared() <= 1.0 {
            positions.push(p * scale);
        }
    }
    positions
}

fn disk_positions(rng: &mut ChaCha8Rng, count: usize, scale: f32) -> Vec<Vec3> {
    let radial = Exp::new(1.0 / (scale * 0.3)).unwrap();
    let vertical = Normal::new(0.0, scale * 0.05).unwrap();

    (0..count)
        .map(|_| {
            let r: f32 = radial.sample(rng);
            let theta = rng.gen_range(0.0..std::f32::consts::TAU);
            Vec3::new(r * theta.cos(), r * theta.sin(), vertical.sample(rng))
        })
        .collect()
}

fn galaxy_positions(rng: &mut ChaCha8Rng, count: usize, scale: f32) -> Vec<Vec3> {
    let bulge_count = (count as f32 * 0.3) as usize;
    let mut positions = sphere_positions(rng, bulge_count, scale * 0.3);

    let radial = Exp::new(1.0 / (scale * 0.4)).unwrap();
    let vertical = Normal::new(0.0, scale * 0.03).unwrap();

    for _ in bulge_count..count {
        let r: f32 = radial.sample(rng);
        // Winding the angle with radius produces the spiral arms.
        let theta = rng.gen_range(0.0..2.0 * std::f32::consts::TAU)
            + r / (scale * 0.2) * std::f32::consts::PI;
        positions.push(Vec3::new(
            r * theta.cos(),
            r * theta.sin(),
            vertical.sample(rng),
        ));
    }
    positions
}

/// Tangential XY velocities with Keplerian falloff (v ~ 1/sqrt(r)) around
/// the origin, plus small Gaussian vertical jitter.
fn orbital_velocities(rng: &mut ChaCha8Rng, positions: &[Vec3]) -> Vec<Vec3> {
    let jitter = Normal::new(0.0, 0.1).unwrap();

    positions
        .iter()
        .map(|p| {
            let r = (p.x * p.x + p.y * p.y).sqrt().max(0.1);
            let v = 2.0 / r.sqrt();
            Vec3::new(-p.y / r * v, p.x / r * v, jitter.sample(rng))
        })
        .collect()
}

/// 85% stars, 14% planets, 1% black holes.
fn pick_type(rng: &mut ChaCha8Rng) -> i32 {
    let u: f32 = rng.gen();
    if u < 0.85 {
        TYPE_STAR
    } else if u < 0.99 {
        TYPE_PLANET
    } else {
        TYPE_BLACK_HOLE
    }
}
