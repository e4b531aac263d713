use stellarforge::simulation::backend::ComputeBackend;
use stellarforge::simulation::distributions::{generate_cloud, CloudDistribution};
use stellarforge::simulation::engine::{EngineError, PhysicsEngine};
use stellarforge::simulation::forces::{
    compute_accelerations_barnes_hut, compute_accelerations_barnes_hut_parallel,
    compute_accelerations_direct,
};
use stellarforge::simulation::integrator::integrate_verlet;
use stellarforge::simulation::octree::Octree;
use stellarforge::simulation::params::SimParams;
use stellarforge::simulation::scenario::Scenario;
use stellarforge::simulation::states::{ParticleSystem, Vec3};

/// Seeded ball of particles as a bare `ParticleSystem` for physics tests.
fn cloud_system(n: usize, seed: u64) -> ParticleSystem {
    let cloud = generate_cloud(CloudDistribution::Sphere, n, 5.0, seed);
    let mut sys = ParticleSystem::new();
    for k in 0..cloud.len() {
        sys.push(cloud.positions[k], cloud.velocities[k], cloud.masses[k], cloud.types[k]);
    }
    sys
}

fn test_params() -> SimParams {
    SimParams {
        g: 1.0,
        softening: 0.01,
        theta: 0.5,
        collisions_enabled: false,
    }
}

// ==================================================================================
// Host boundary tests
// ==================================================================================

#[test]
fn positions_round_trip_bitwise() {
    let mut engine = PhysicsEngine::new();
    let data: Vec<f32> = vec![
        0.1, -2.5, 3.75, 1.0e-7, 42.0, -0.0, 7.25, -13.5, 0.5, 2.0, 3.0, 4.0,
    ];
    engine.set_positions(&data, 4).unwrap();

    assert_eq!(engine.particle_count(), 4);
    assert_eq!(engine.positions(), data);
}

#[test]
fn all_arrays_round_trip() {
    let mut engine = PhysicsEngine::new();
    let pos: Vec<f32> = (0..9).map(|i| i as f32 * 0.5).collect();
    let vel: Vec<f32> = (0..9).map(|i| -(i as f32) * 0.25).collect();
    let mass = vec![1.0f32, 2.5, 0.0];
    let types = vec![0i32, 1, 2];

    engine.set_positions(&pos, 3).unwrap();
    engine.set_velocities(&vel, 3).unwrap();
    engine.set_masses(&mass, 3).unwrap();
    engine.set_types(&types, 3).unwrap();

    assert_eq!(engine.positions(), pos);
    assert_eq!(engine.velocities(), vel);
    assert_eq!(engine.masses(), mass);
    assert_eq!(engine.types(), types);
}

#[test]
fn shape_mismatch_rejected_without_mutation() {
    let mut engine = PhysicsEngine::new();
    engine.set_positions(&[1.0; 6], 2).unwrap();

    let err = engine.set_positions(&[1.0; 10], 4).unwrap_err();
    assert!(matches!(err, EngineError::ShapeMismatch { expected: 12, got: 10 }));
    assert_eq!(engine.particle_count(), 2, "failed setter must not resize");

    let err = engine.set_masses(&[1.0; 3], 2).unwrap_err();
    assert!(matches!(err, EngineError::ShapeMismatch { expected: 2, got: 3 }));
}

#[test]
fn backend_tags_round_trip() {
    for tag in ["single", "openmp", "cuda", "opengl"] {
        let backend: ComputeBackend = tag.parse().unwrap();
        assert_eq!(backend.tag(), tag);
    }

    let mut engine = PhysicsEngine::new();
    assert!(engine.set_backend_tag("openmp").is_ok());
    assert_eq!(engine.backend(), ComputeBackend::CpuParallel);

    let err = engine.set_backend_tag("metal").unwrap_err();
    assert!(matches!(err, EngineError::UnknownBackend(_)));
    assert_eq!(engine.backend(), ComputeBackend::CpuParallel);
}

#[test]
fn add_particle_validates_arity() {
    let mut engine = PhysicsEngine::new();
    assert!(engine.add_particle(&[1.0, 2.0], &[0.0, 0.0, 0.0], 1.0, 0).is_err());
    assert!(engine.add_particle(&[1.0, 2.0, 3.0], &[0.0], 1.0, 0).is_err());
    assert_eq!(engine.particle_count(), 0);

    engine.add_particle(&[1.0, 2.0, 3.0], &[0.0, 0.0, 0.0], 1.0, 1).unwrap();
    assert_eq!(engine.particle_count(), 1);
    assert_eq!(engine.types(), vec![1]);
}

#[test]
fn remove_preserves_lower_indices() {
    let mut engine = PhysicsEngine::new();
    for i in 0..5 {
        engine
            .add_particle(&[i as f32, 0.0, 0.0], &[0.0, 0.0, 0.0], (i + 1) as f32, 0)
            .unwrap();
    }

    engine.remove_particle(2);
    assert_eq!(engine.particle_count(), 4);

    let masses = engine.masses();
    assert_eq!(masses[0], 1.0);
    assert_eq!(masses[1], 2.0);

    // Out of range: silent no-op.
    engine.remove_particle(100);
    assert_eq!(engine.particle_count(), 4);
}

#[test]
fn step_timer_non_negative() {
    let mut engine = PhysicsEngine::new();
    engine.add_particle(&[0.0, 0.0, 0.0], &[0.0, 0.0, 0.0], 1.0, 0).unwrap();
    engine.add_particle(&[1.0, 0.0, 0.0], &[0.0, 0.0, 0.0], 1.0, 0).unwrap();

    engine.step(0.001);
    assert!(engine.last_step_time_ms() >= 0.0);
}

// ==================================================================================
// Octree tests
// ==================================================================================

#[test]
fn octree_empty_system_has_no_tree() {
    let sys = ParticleSystem::new();
    assert!(Octree::build(&sys, 0.01).is_none());
}

#[test]
fn octree_holds_every_particle_once() {
    let sys = cloud_system(50, 3);
    let tree = Octree::build(&sys, 0.01).unwrap();

    let mut held = vec![0usize; sys.len()];
    for node in &tree.nodes {
        if let Some(p) = node.particle {
            held[p] += 1;
            assert!(
                node.children.iter().all(|c| c.is_none()),
                "a leaf must not have children"
            );
        }
        for &p in &node.overflow {
            held[p] += 1;
        }
    }
    assert!(held.iter().all(|&c| c == 1), "each particle in exactly one leaf");
    assert!(
        tree.nodes.iter().all(|n| !n.is_empty()),
        "insertion never leaves a node empty"
    );
}

#[test]
fn octree_mass_aggregation_matches_totals() {
    let sys = cloud_system(40, 9);
    let tree = Octree::build(&sys, 0.01).unwrap();
    let root = &tree.nodes[tree.root];

    let expected_mass: f32 = sys.masses.iter().sum();
    let expected_com = sys
        .positions
        .iter()
        .zip(sys.masses.iter())
        .map(|(p, m)| p * *m)
        .sum::<Vec3>()
        / expected_mass;

    assert!((root.total_mass - expected_mass).abs() < 1e-3 * expected_mass);
    assert!((root.com - expected_com).norm() < 1e-3);
}

#[test]
fn octree_coincident_particles_terminate() {
    let mut sys = ParticleSystem::new();
    for _ in 0..3 {
        sys.push(Vec3::new(1.0, 1.0, 1.0), Vec3::zeros(), 1.0, 0);
    }
    sys.push(Vec3::new(-1.0, 0.0, 0.0), Vec3::zeros(), 1.0, 0);

    let tree = Octree::build(&sys, 0.01).unwrap();

    let residents: usize = tree
        .nodes
        .iter()
        .map(|n| usize::from(n.particle.is_some()) + n.overflow.len())
        .sum();
    assert_eq!(residents, 4);

    // Softening keeps the co-located accelerations finite.
    let a = tree.acceleration_on(0, &sys.positions, &sys.masses, 1.0, 1e-4, 0.5);
    assert!(a.x.is_finite() && a.y.is_finite() && a.z.is_finite());
}

// ==================================================================================
// Gravity tests
// ==================================================================================

#[test]
fn single_particle_feels_no_force() {
    let mut engine = PhysicsEngine::new();
    engine.set_backend(ComputeBackend::CpuSingleThread);
    engine.add_particle(&[1.0, 2.0, 3.0], &[0.5, -0.25, 1.0], 5.0, 0).unwrap();

    let dt = 0.01f32;
    engine.step(dt);

    // No interaction partner: drift is exactly v*dt.
    let expected = [
        1.0f32 + 0.5 * dt,
        2.0 + -0.25 * dt,
        3.0 + 1.0 * dt,
    ];
    assert_eq!(engine.positions(), expected.to_vec());
    assert_eq!(engine.velocities(), vec![0.5, -0.25, 1.0]);
}

#[test]
fn tree_matches_direct_sum_with_full_opening() {
    let mut params = test_params();
    params.theta = 0.0; // every node opens down to the leaves

    let mut sys_tree = cloud_system(64, 11);
    let mut sys_direct = sys_tree.clone();

    compute_accelerations_barnes_hut(&mut sys_tree, &params);
    compute_accelerations_direct(&mut sys_direct, &params);

    for (a_tree, a_direct) in sys_tree.accelerations.iter().zip(sys_direct.accelerations.iter()) {
        let diff = (a_tree - a_direct).norm();
        assert!(
            diff <= 1e-5 * a_direct.norm() + 1e-4,
            "tree {a_tree:?} vs direct {a_direct:?}"
        );
    }
}

#[test]
fn direct_sum_obeys_newtons_third_law() {
    let mut sys = cloud_system(30, 5);
    let params = test_params();

    compute_accelerations_direct(&mut sys, &params);

    let net: Vec3 = sys
        .accelerations
        .iter()
        .zip(sys.masses.iter())
        .map(|(a, m)| a * *m)
        .sum();
    assert!(net.norm() < 1e-4, "net force not zero: {net:?}");
}

#[test]
fn momentum_conserved_over_step() {
    let mut engine = PhysicsEngine::new();
    engine.set_backend(ComputeBackend::CpuSingleThread);
    engine.set_theta(0.0); // exact summation makes force pairs symmetric
    engine.set_softening_length(0.05);

    let sys = cloud_system(50, 21);
    for i in 0..sys.len() {
        let p = sys.positions[i];
        let v = sys.velocities[i];
        engine
            .add_particle(&[p.x, p.y, p.z], &[v.x, v.y, v.z], sys.masses[i], sys.types[i])
            .unwrap();
    }

    let before = momentum_of(&engine);
    engine.step(0.001);
    let after = momentum_of(&engine);

    assert!(
        (after - before).norm() < 1e-2,
        "momentum drifted from {before:?} to {after:?}"
    );
}

fn momentum_of(engine: &PhysicsEngine) -> Vec3 {
    let vel = engine.velocities();
    let masses = engine.masses();
    let mut p = Vec3::zeros();
    for (chunk, m) in vel.chunks_exact(3).zip(masses.iter()) {
        p += Vec3::new(chunk[0], chunk[1], chunk[2]) * *m;
    }
    p
}

#[test]
fn two_body_circular_orbit_stays_bounded() {
    let mut engine = PhysicsEngine::new();
    engine.set_backend(ComputeBackend::CpuSingleThread);
    engine.set_gravitational_constant(1.0);
    engine.set_softening_length(1e-4);
    engine.set_theta(0.5);

    engine.add_particle(&[0.0, 0.0, 0.0], &[0.0, 0.0, 0.0], 1.0, 0).unwrap();
    engine.add_particle(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0], 1e-6, 1).unwrap();

    for _ in 0..1000 {
        engine.step(1e-3);
    }

    let pos = engine.positions();
    let r = (pos[3] * pos[3] + pos[4] * pos[4] + pos[5] * pos[5]).sqrt();
    assert!((0.99..=1.01).contains(&r), "orbit radius drifted to {r}");
}

#[test]
fn softening_prevents_blowup_at_contact() {
    let mut sys = ParticleSystem::new();
    sys.push(Vec3::zeros(), Vec3::zeros(), 1.0, 0);
    sys.push(Vec3::new(1e-9, 0.0, 0.0), Vec3::zeros(), 1.0, 0);

    let mut params = test_params();
    params.softening = 0.1;

    compute_accelerations_barnes_hut(&mut sys, &params);
    for a in &sys.accelerations {
        assert!(a.norm() < 1e3, "softening failed: {a:?}");
    }
}

#[test]
fn zero_mass_particle_feels_but_exerts_nothing() {
    let mut sys = ParticleSystem::new();
    sys.push(Vec3::zeros(), Vec3::zeros(), 1.0, 0);
    sys.push(Vec3::new(1.0, 0.0, 0.0), Vec3::zeros(), 0.0, 1);

    let params = test_params();
    compute_accelerations_barnes_hut(&mut sys, &params);

    assert_eq!(sys.accelerations[0], Vec3::zeros(), "massless neighbor exerts no force");
    assert!(sys.accelerations[1].x < 0.0, "massless particle still attracted");
}

// ==================================================================================
// Backend tests
// ==================================================================================

#[test]
fn serial_and_parallel_accelerations_agree() {
    let params = test_params();
    let mut sys_serial = cloud_system(60, 17);
    let mut sys_parallel = sys_serial.clone();

    compute_accelerations_barnes_hut(&mut sys_serial, &params);
    compute_accelerations_barnes_hut_parallel(&mut sys_parallel, &params);

    for (a, b) in sys_serial.accelerations.iter().zip(sys_parallel.accelerations.iter()) {
        assert!((a - b).norm() <= 1e-5 * a.norm().max(1.0));
    }
}

#[test]
fn gpu_backends_fall_back_to_threaded_results() {
    let seed = 13;
    let mut reference = PhysicsEngine::new();
    reference.set_backend(ComputeBackend::CpuParallel);
    let mut fallback = PhysicsEngine::new();
    fallback.set_backend(ComputeBackend::Cuda);

    for engine in [&mut reference, &mut fallback] {
        let sys = cloud_system(20, seed);
        for i in 0..sys.len() {
            let p = sys.positions[i];
            let v = sys.velocities[i];
            engine
                .add_particle(&[p.x, p.y, p.z], &[v.x, v.y, v.z], sys.masses[i], sys.types[i])
                .unwrap();
        }
        engine.step(0.001);
    }

    assert_eq!(reference.positions(), fallback.positions());
    assert_eq!(reference.velocities(), fallback.velocities());
}

// ==================================================================================
// Integrator tests
// ==================================================================================

#[test]
fn verlet_applies_kick_drift_update() {
    let mut sys = ParticleSystem::new();
    sys.push(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0), 1.0, 0);
    sys.accelerations[0] = Vec3::new(2.0, 0.0, 0.0);

    integrate_verlet(&mut sys, 0.5);

    // x = v*dt + 0.5*a*dt^2 = 0.5 + 0.25; v = 1 + 2*0.5
    assert_eq!(sys.positions[0], Vec3::new(0.75, 0.0, 0.0));
    assert_eq!(sys.velocities[0], Vec3::new(2.0, 0.0, 0.0));
}

// ==================================================================================
// Collision tests
// ==================================================================================

#[test]
fn close_pair_merges_with_momentum_conserved() {
    let mut engine = PhysicsEngine::new();
    engine.set_backend(ComputeBackend::CpuSingleThread);
    engine.set_softening_length(0.01); // merge radius 0.02
    engine.enable_collisions(true);

    engine.add_particle(&[0.0, 0.0, 0.0], &[1.0, 0.0, 0.0], 1.0, 0).unwrap();
    engine.add_particle(&[0.015, 0.0, 0.0], &[-1.0, 0.0, 0.0], 2.0, 0).unwrap();

    engine.step(1e-4);

    assert_eq!(engine.particle_count(), 1);
    assert_eq!(engine.masses(), vec![3.0]);

    let vel = engine.velocities();
    assert!((vel[0] - (-1.0 / 3.0)).abs() < 1e-4, "vx = {}", vel[0]);
    assert!(vel[1].abs() < 1e-5 && vel[2].abs() < 1e-5);

    // Survivor keeps (roughly) the lower index's position.
    let pos = engine.positions();
    assert!(pos[0].abs() < 1e-3);
}

#[test]
fn merge_scan_deletes_in_descending_order() {
    let mut engine = PhysicsEngine::new();
    engine.set_backend(ComputeBackend::CpuSingleThread);
    engine.set_gravitational_constant(0.0); // isolate the merge pass
    engine.set_softening_length(0.01);
    engine.enable_collisions(true);

    // 0 and 1 are within the merge radius; 2 sits exactly on it (excluded).
    engine.add_particle(&[0.0, 0.0, 0.0], &[0.0, 0.0, 0.0], 1.0, 0).unwrap();
    engine.add_particle(&[0.01, 0.0, 0.0], &[0.0, 0.0, 0.0], 1.0, 0).unwrap();
    engine.add_particle(&[0.03, 0.0, 0.0], &[0.0, 0.0, 0.0], 1.0, 0).unwrap();

    engine.step(1e-3);

    assert_eq!(engine.particle_count(), 2);
    assert_eq!(engine.masses(), vec![2.0, 1.0]);
    // The untouched particle shifted down to index 1.
    let pos = engine.positions();
    assert!((pos[3] - 0.03).abs() < 1e-6);
}

#[test]
fn collisions_off_means_no_merging() {
    let mut engine = PhysicsEngine::new();
    engine.set_backend(ComputeBackend::CpuSingleThread);
    engine.set_softening_length(0.01);

    engine.add_particle(&[0.0, 0.0, 0.0], &[0.0, 0.0, 0.0], 1.0, 0).unwrap();
    engine.add_particle(&[0.005, 0.0, 0.0], &[0.0, 0.0, 0.0], 1.0, 0).unwrap();

    engine.step(1e-4);
    assert_eq!(engine.particle_count(), 2);
}

// ==================================================================================
// Distribution tests
// ==================================================================================

#[test]
fn clouds_are_seed_deterministic() {
    let a = generate_cloud(CloudDistribution::Galaxy, 100, 10.0, 7);
    let b = generate_cloud(CloudDistribution::Galaxy, 100, 10.0, 7);

    assert_eq!(a.positions, b.positions);
    assert_eq!(a.velocities, b.velocities);
    assert_eq!(a.masses, b.masses);
    assert_eq!(a.types, b.types);

    let c = generate_cloud(CloudDistribution::Galaxy, 100, 10.0, 8);
    assert_ne!(a.positions, c.positions);
}

#[test]
fn sphere_cloud_stays_inside_radius() {
    let scale = 5.0;
    let cloud = generate_cloud(CloudDistribution::Sphere, 200, scale, 1);

    assert_eq!(cloud.len(), 200);
    for p in &cloud.positions {
        assert!(p.norm() <= scale * 1.0001);
    }
    for (m, t) in cloud.masses.iter().zip(cloud.types.iter()) {
        assert!((0.1..2.0).contains(m));
        assert!((0..=2).contains(t));
    }
}

// ==================================================================================
// Scenario tests
// ==================================================================================

#[test]
fn scenario_builds_from_yaml() {
    let yaml = r#"
engine:
  backend: "single"
  collisions: true

parameters:
  g: 2.0
  softening: 0.02
  theta: 0.6
  dt: 0.01
  t_end: 0.1

cloud:
  distribution: "sphere"
  count: 10
  scale: 3.0
  seed: 4

bodies:
  - x: [0.0, 0.0, 0.0]
    v: [0.0, 0.0, 0.0]
    m: 100.0
    type: 2
"#;
    let cfg = serde_yaml::from_str(yaml).unwrap();
    let scenario = Scenario::build(cfg).unwrap();

    assert_eq!(scenario.engine.particle_count(), 11);
    assert_eq!(scenario.engine.backend(), ComputeBackend::CpuSingleThread);
    assert_eq!(scenario.dt, 0.01);
    assert_eq!(scenario.t_end, 0.1);
}

#[test]
fn scenario_rejects_unknown_backend() {
    let yaml = r#"
engine:
  backend: "quantum"

parameters:
  g: 1.0
  softening: 0.01
  theta: 0.5
  dt: 0.01
  t_end: 0.1
"#;
    let cfg = serde_yaml::from_str(yaml).unwrap();
    assert!(matches!(
        Scenario::build(cfg),
        Err(EngineError::UnknownBackend(_))
    ));
}
