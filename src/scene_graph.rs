use bevy::math::{Affine3A, Vec3A};
use bevy::prelude::*;
use bevy::render::primitives::Aabb;

/// Every mesh-carrying entity at or below `root`, in pre-order.
///
/// Bevy's glTF loader puts each primitive on its own entity, so these are the
/// leaves of the renderable hierarchy.
pub fn leaf_meshes(
    root: Entity,
    children: &Query<&Children>,
    is_mesh: impl Fn(Entity) -> bool,
) -> Vec<Entity> {
    let mut found = Vec::new();
    let mut stack = vec![root];
    while let Some(entity) = stack.pop() {
        if is_mesh(entity) {
            found.push(entity);
        }
        if let Ok(kids) = children.get(entity) {
            stack.extend(kids.iter().rev());
        }
    }
    found
}

/// Transform an AABB by an affine map and return the AABB of the result.
/// Works for any combination of rotation + non-uniform scale + translation.
pub fn transform_aabb(local: &Aabb, affine: &Affine3A) -> Aabb {
    // Affine3A = [ R*S | t ]
    let m = affine.matrix3;
    let t = affine.translation;

    let center = m * local.center + t;

    // abs(R*S) * he, column-wise
    let he = local.half_extents;
    let (x, y, z) = (m.x_axis, m.y_axis, m.z_axis);
    let half_extents = Vec3A::new(
        x.x.abs() * he.x + y.x.abs() * he.y + z.x.abs() * he.z,
        x.y.abs() * he.x + y.y.abs() * he.y + z.y.abs() * he.z,
        x.z.abs() * he.x + y.z.abs() * he.y + z.z.abs() * he.z,
    );

    Aabb {
        center,
        half_extents,
    }
}

/// Running min/max accumulator for a set of boxes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn from_aabb(aabb: &Aabb) -> Self {
        Self {
            min: (aabb.center - aabb.half_extents).into(),
            max: (aabb.center + aabb.half_extents).into(),
        }
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}
