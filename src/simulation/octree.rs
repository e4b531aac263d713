//! Barnes-Hut octree over the particle system.
//!
//! The tree approximates gravity by treating distant groups of particles as
//! a single point mass at their center of mass. Space is subdivided into
//! cubic octants; each leaf holds one particle, each internal node stores the
//! aggregate mass and mass-weighted centroid of its subtree.
//!
//! Nodes live in a single arena (`Vec<OctreeNode>`) and reference their
//! children by index, so the whole tree is one allocation block that is built
//! at the start of a step and dropped at its end.
//!
//! Coincident (or nearly coincident) particles cannot be separated by
//! subdivision, so insertion depth is capped at the level where a cell would
//! shrink below the softening length; particles that still share a cell at
//! that depth accumulate in the leaf's overflow list and are resolved
//! pairwise during traversal.

use crate::simulation::states::{ParticleSystem, Vec3};

/// Root cube padding over the bounding box, so no particle sits exactly on a
/// face of the outermost cell.
pub const ROOT_PADDING: f32 = 1.1;

/// Hard bound on subdivision depth regardless of softening.
const MAX_DEPTH: usize = 64;

/// Floor for the smallest meaningful cell when softening is tiny or zero.
const MIN_CELL: f32 = 1.0e-6;

/// One cubic cell of the octree.
///
/// A node is *empty* when it holds no particle and has no children, a *leaf*
/// when it holds a particle slot, and *internal* once it has children.
/// `total_mass` and `com` are valid only after the mass aggregation pass that
/// [`Octree::build`] runs last.
pub struct OctreeNode {
    pub center: Vec3,
    pub size: f32,
    pub total_mass: f32,
    pub com: Vec3,
    pub children: [Option<usize>; 8],
    pub particle: Option<usize>,
    /// Extra residents of a depth-capped leaf. Empty for almost every node.
    pub overflow: Vec<usize>,
}

impl OctreeNode {
    fn new(center: Vec3, size: f32) -> Self {
        Self {
            center,
            size,
            total_mass: 0.0,
            com: Vec3::zeros(),
            children: [None; 8],
            particle: None,
            overflow: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.particle.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.particle.is_none() && self.children.iter().all(|c| c.is_none())
    }
}

pub struct Octree {
    pub nodes: Vec<OctreeNode>,
    pub root: usize,
}

impl Octree {
    /// Build the tree over the current particle positions.
    ///
    /// 1. Scan positions for the axis-aligned bounding box.
    /// 2. Root cube: box midpoint, largest axis extent padded by 10%.
    /// 3. Insert every particle index in order.
    /// 4. Aggregate mass and center of mass bottom-up.
    ///
    /// Returns `None` when the system holds no particles.
    pub fn build(sys: &ParticleSystem, softening: f32) -> Option<Self> {
        if sys.is_empty() {
            return None;
        }

        let mut min = Vec3::repeat(f32::INFINITY);
        let mut max = Vec3::repeat(f32::NEG_INFINITY);
        for p in &sys.positions {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        let center = (min + max) * 0.5;
        let extent = max - min;
        let mut size = extent.x.max(extent.y).max(extent.z) * ROOT_PADDING;
        if size <= 0.0 {
            // Degenerate cloud (single particle, or all coincident): any
            // positive cube encloses it.
            size = 1.0;
        }

        let cap = depth_cap(size, softening);

        let mut tree = Octree {
            nodes: vec![OctreeNode::new(center, size)],
            root: 0,
        };
        for i in 0..sys.len() {
            tree.insert(i, &sys.positions, cap);
        }
        tree.aggregate_mass(0, sys);

        Some(tree)
    }

    /// Walk the tree downward and place `particle` in a leaf.
    ///
    /// Splitting a leaf moves its resident into the resident's octant child
    /// first, then the walk continues so the new particle finds its own cell.
    /// At `cap` levels the walk stops and the particle joins the leaf's
    /// overflow list instead.
    fn insert(&mut self, particle: usize, positions: &[Vec3], cap: usize) {
        let pos = positions[particle];
        let mut node_idx = self.root;
        let mut depth = 0;

        loop {
            if self.nodes[node_idx].children.iter().any(|c| c.is_some()) {
                node_idx = self.child_for(node_idx, &pos);
                depth += 1;
                continue;
            }

            if self.nodes[node_idx].particle.is_none() {
                self.nodes[node_idx].particle = Some(particle);
                return;
            }

            if depth >= cap {
                self.nodes[node_idx].overflow.push(particle);
                return;
            }

            // Leaf with a resident: push the resident down one level, then
            // loop again so the new particle descends as well.
            if let Some(old) = self.nodes[node_idx].particle.take() {
                let old_child = self.child_for(node_idx, &positions[old]);
                self.nodes[old_child].particle = Some(old);
            }
        }
    }

    /// Child node index for `pos`, creating the child if it does not exist.
    /// Child cubes have half the edge length, offset by a quarter per axis.
    fn child_for(&mut self, node_idx: usize, pos: &Vec3) -> usize {
        let center = self.nodes[node_idx].center;
        let size = self.nodes[node_idx].size;
        let oct = octant_of(pos, &center);

        if let Some(idx) = self.nodes[node_idx].children[oct] {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes
            .push(OctreeNode::new(octant_center(&center, size, oct), size * 0.5));
        self.nodes[node_idx].children[oct] = Some(idx);
        idx
    }

    /// Post-order mass pass: each node's `total_mass` becomes the sum over
    /// its subtree and `com` the mass-weighted centroid. Massless subtrees
    /// keep `com` at the origin and are skipped by the traversal.
    fn aggregate_mass(&mut self, node_idx: usize, sys: &ParticleSystem) {
        let mut mass = 0.0f32;
        let mut weighted = Vec3::zeros();

        if let Some(p) = self.nodes[node_idx].particle {
            mass += sys.masses[p];
            weighted += sys.positions[p] * sys.masses[p];
        }
        for k in 0..self.nodes[node_idx].overflow.len() {
            let p = self.nodes[node_idx].overflow[k];
            mass += sys.masses[p];
            weighted += sys.positions[p] * sys.masses[p];
        }

        let children = self.nodes[node_idx].children;
        for &child in children.iter().flatten() {
            self.aggregate_mass(child, sys);
            let c = &self.nodes[child];
            if c.total_mass > 0.0 {
                mass += c.total_mass;
                weighted += c.com * c.total_mass;
            }
        }

        let node = &mut self.nodes[node_idx];
        node.total_mass = mass;
        node.com = if mass > 0.0 { weighted / mass } else { Vec3::zeros() };
    }

    /// Net gravitational acceleration on particle `i` from the whole tree,
    /// using the opening criterion `size / r < theta` with Plummer-softened
    /// distances. Children are visited in octant order, so the summation
    /// order is fixed for a given particle ordering.
    pub fn acceleration_on(
        &self,
        i: usize,
        positions: &[Vec3],
        masses: &[f32],
        g: f32,
        softening2: f32,
        theta: f32,
    ) -> Vec3 {
        let mut acc = Vec3::zeros();
        self.accumulate(self.root, i, &positions[i], positions, masses, g, softening2, theta, &mut acc);
        acc
    }

    fn accumulate(
        &self,
        node_idx: usize,
        i: usize,
        pos_i: &Vec3,
        positions: &[Vec3],
        masses: &[f32],
        g: f32,
        eps2: f32,
        theta: f32,
        acc: &mut Vec3,
    ) {
        let node = &self.nodes[node_idx];

        // Empty nodes and massless subtrees contribute nothing.
        if node.total_mass == 0.0 {
            return;
        }

        // Depth-capped leaf: the residents are too close together for the
        // COM approximation to mean anything, resolve them one by one.
        if !node.overflow.is_empty() {
            for p in node.particle.iter().copied().chain(node.overflow.iter().copied()) {
                if p != i {
                    *acc += point_mass_accel(pos_i, &positions[p], masses[p], g, eps2);
                }
            }
            return;
        }

        if node.is_leaf() && node.particle == Some(i) {
            return; // no self-interaction
        }

        let r = node.com - pos_i;
        let r2 = r.norm_squared() + eps2;
        let dist = r2.sqrt();

        if node.is_leaf() || node.size / dist < theta {
            // Far enough (or a single particle): one point-mass term.
            *acc += g * node.total_mass / (r2 * dist) * r;
        } else {
            for &child in node.children.iter().flatten() {
                self.accumulate(child, i, pos_i, positions, masses, g, eps2, theta, acc);
            }
        }
    }
}

/// Softened point-mass acceleration at `pos_i` due to mass `m_j` at `pos_j`.
fn point_mass_accel(pos_i: &Vec3, pos_j: &Vec3, m_j: f32, g: f32, eps2: f32) -> Vec3 {
    let r = pos_j - pos_i;
    let r2 = r.norm_squared() + eps2;
    let dist = r2.sqrt();
    g * m_j / (r2 * dist) * r
}

/// Octant code of `p` relative to `center`: bit 2 = x, bit 1 = y, bit 0 = z,
/// set when the coordinate is >= the center's.
fn octant_of(p: &Vec3, center: &Vec3) -> usize {
    let mut oct = 0;
    if p.x >= center.x {
        oct |= 4;
    }
    if p.y >= center.y {
        oct |= 2;
    }
    if p.z >= center.z {
        oct |= 1;
    }
    oct
}

/// Center of the child cube for `oct` inside a parent of edge `size`.
fn octant_center(center: &Vec3, size: f32, oct: usize) -> Vec3 {
    let q = size * 0.25;
    Vec3::new(
        center.x + if oct & 4 != 0 { q } else { -q },
        center.y + if oct & 2 != 0 { q } else { -q },
        center.z + if oct & 1 != 0 { q } else { -q },
    )
}

/// Deepest level at which a cell edge stays above the softening scale.
fn depth_cap(root_size: f32, softening: f32) -> usize {
    let min_cell = softening.max(MIN_CELL);
    if root_size <= min_cell {
        return 1;
    }
    ((root_size / min_cell).log2().ceil() as usize).clamp(1, MAX_DEPTH)
}
