use bevy::prelude::*;
use bevy::render::mesh::MeshAabb;
use bevy::scene::SceneInstanceReady;

use crate::camera::MainCamera;
use crate::config::DemoConfig;
use crate::error::DemoError;
use crate::pointer::{PointerRay, RayTarget, mesh_collider};
use crate::scene_graph::{Bounds, leaf_meshes, transform_aabb};

/// Where the book goes when there is no camera to put it in front of.
const FALLBACK_POSITION: Vec3 = Vec3::new(0.0, 0.0, -2.0);

/// Tag on the book's `SceneRoot`.
#[derive(Component)]
pub struct BookEntity;

/// The book's scene is ready; fit it once transforms have propagated.
#[derive(Component)]
pub struct PendingFit;

/// Recenter offset and uniform scale that make the book `target` units big.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BookFit {
    pub center: Vec3,
    pub size: Vec3,
    pub factor: f32,
}

impl BookFit {
    pub fn from_bounds(bounds: Bounds, target: f32) -> Self {
        let size = bounds.size();
        // A flat axis still counts as 1 so the factor stays finite.
        let dim = |v: f32| if v == 0.0 { 1.0 } else { v };
        let largest = dim(size.x).max(dim(size.y)).max(dim(size.z));
        Self {
            center: bounds.center(),
            size,
            factor: target / largest,
        }
    }
}

pub fn on_book_ready(trigger: Trigger<SceneInstanceReady>, mut commands: Commands) {
    commands.entity(trigger.target()).insert(PendingFit);
}

/// Bounds of every mesh under `root`, expressed in `root`'s local space.
fn book_bounds(
    root: Entity,
    children: &Query<&Children>,
    q_mesh: &Query<(&Mesh3d, &GlobalTransform)>,
    q_global: &Query<&GlobalTransform>,
    meshes: &Assets<Mesh>,
) -> Result<(Vec<Entity>, Bounds), DemoError> {
    let root_inv = q_global
        .get(root)
        .map_err(|_| DemoError::MissingElement(format!("book root {root}")))?
        .affine()
        .inverse();

    let leaves = leaf_meshes(root, children, |e| q_mesh.contains(e));
    let mut bounds: Option<Bounds> = None;
    for &leaf in &leaves {
        let Ok((mesh, global)) = q_mesh.get(leaf) else {
            continue;
        };
        let aabb = meshes
            .get(&mesh.0)
            .and_then(Mesh::compute_aabb)
            .ok_or_else(|| DemoError::InvalidGeometry(format!("mesh on {leaf} has no positions")))?;
        let local = Bounds::from_aabb(&transform_aabb(&aabb, &(root_inv * global.affine())));
        bounds = Some(bounds.map_or(local, |b| b.union(local)));
    }
    let bounds = bounds.ok_or_else(|| DemoError::InvalidGeometry("book has no meshes".into()))?;
    Ok((leaves, bounds))
}

/// One-shot layout: recenter, scale to unit size, put in front of the camera.
#[allow(clippy::too_many_arguments)]
pub fn fit_book(
    mut commands: Commands,
    q_pending: Query<Entity, (With<BookEntity>, With<PendingFit>)>,
    children: Query<&Children>,
    q_mesh: Query<(&Mesh3d, &GlobalTransform)>,
    q_global: Query<&GlobalTransform>,
    q_camera: Query<&GlobalTransform, With<MainCamera>>,
    mut q_tf: Query<&mut Transform>,
    meshes: Res<Assets<Mesh>>,
    config: Res<DemoConfig>,
    mut ray: ResMut<PointerRay>,
) {
    for book in &q_pending {
        commands.entity(book).remove::<PendingFit>();

        let (leaves, bounds) = match book_bounds(book, &children, &q_mesh, &q_global, &meshes) {
            Ok(found) => found,
            Err(err) => {
                error!("[book] post-load handling error: {err}");
                continue;
            }
        };
        let fit = BookFit::from_bounds(bounds, config.book.target_size);
        info!(
            "[book] size {:?}, scale factor {:.3}",
            fit.size.to_array(),
            fit.factor
        );

        if let Ok(top) = children.get(book) {
            for node in top.iter() {
                if let Ok(mut tf) = q_tf.get_mut(node) {
                    tf.translation -= fit.center;
                }
            }
        }

        let position = match q_camera.single() {
            Ok(cam) => cam.translation() + cam.forward() * config.book.distance,
            Err(_) => FALLBACK_POSITION,
        };
        if let Ok(mut tf) = q_tf.get_mut(book) {
            tf.translation = position;
            tf.scale = Vec3::splat(fit.factor);
        }
        commands.entity(book).insert(Visibility::Visible);

        for leaf in leaves {
            let Some(collider) = q_mesh
                .get(leaf)
                .ok()
                .and_then(|(mesh, _)| meshes.get(&mesh.0))
                .and_then(mesh_collider)
            else {
                continue;
            };
            commands.entity(leaf).insert((collider, RayTarget));
        }
        ray.request_refresh();
        info!("[book] placed at {position}");
    }
}
