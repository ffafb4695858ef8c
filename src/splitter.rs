use bevy::prelude::*;
use bevy::scene::SceneInstanceReady;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::config::DemoConfig;
use crate::flow::RevealFlow;
use crate::ghost::spawn_ghost;
use crate::hover::HoverHighlight;
use crate::pointer::{PartClicked, PointerRay, RayTarget, mesh_collider};
use crate::scene::DemoAssets;
use crate::scene_graph::leaf_meshes;

/// Tag on the composite room model (the `SceneRoot`).
#[derive(Component)]
pub struct RoomEntity;

/// The room's scene is ready; split once transforms have propagated.
#[derive(Component)]
pub struct PendingSplit;

/// One piece of the split room.
#[derive(Component, Debug, Clone)]
pub struct Part {
    pub name: String,
    pub is_wall: bool,
}

/// Non-wall parts: hover-highlighted and eligible to be the fake.
#[derive(Component)]
pub struct Selectable;

/// The one part that hides the ghost. `handled` flips on the first click.
#[derive(Component, Default, Debug)]
pub struct FakePart {
    pub handled: bool,
}

/// Decomposed world transform; rotation is Euler degrees in YXZ order.
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct PartPose {
    pub position: Vec3,
    pub rotation_deg: Vec3,
    pub scale: Vec3,
}

impl PartPose {
    pub fn from_global(global: &GlobalTransform) -> Self {
        let (scale, rotation, position) = global.to_scale_rotation_translation();
        let (y, x, z) = rotation.to_euler(EulerRot::YXZ);
        Self {
            position,
            rotation_deg: Vec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees()),
            scale,
        }
    }

    pub fn to_transform(&self) -> Transform {
        let r = self.rotation_deg;
        Transform {
            translation: self.position,
            rotation: Quat::from_euler(
                EulerRot::YXZ,
                r.y.to_radians(),
                r.x.to_radians(),
                r.z.to_radians(),
            ),
            scale: self.scale,
        }
    }
}

/// Draws the fake part. Seeded from config when a seed is given.
#[derive(Resource)]
pub struct FakePicker(ChaCha8Rng);

impl FakePicker {
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self(ChaCha8Rng::seed_from_u64(seed)),
            None => Self(ChaCha8Rng::from_entropy()),
        }
    }

    /// Uniform choice from `pool`.
    pub fn pick(&mut self, pool: &[Entity]) -> Option<Entity> {
        pool.choose(&mut self.0).copied()
    }
}

pub fn is_wall_name(name: &str, keyword: &str) -> bool {
    !keyword.is_empty() && name.to_lowercase().contains(&keyword.to_lowercase())
}

/// Node name (walls are matched on this alone) and a display name that adds
/// the primitive's own name when it says something more. glTF primitives
/// always sit directly under their node.
fn part_names(leaf: Entity, parent: Option<&ChildOf>, q_names: &Query<&Name>) -> (String, String) {
    let own = q_names.get(leaf).ok().map(|n| n.as_str().to_string());
    let node = parent
        .and_then(|p| q_names.get(p.parent()).ok())
        .map(|n| n.as_str().to_string());
    match (node, own) {
        (Some(node), Some(own)) if own.contains(&node) => (node, own),
        (Some(node), Some(own)) => {
            let display = format!("{node}/{own}");
            (node, display)
        }
        (Some(node), None) => (node.clone(), node),
        (None, Some(own)) => (own.clone(), own),
        (None, None) => (String::new(), String::new()),
    }
}

pub fn on_room_ready(
    trigger: Trigger<SceneInstanceReady>,
    mut commands: Commands,
    mut flow: ResMut<RevealFlow>,
) {
    let room = trigger.target();
    match flow.model_loaded() {
        Ok(()) => {
            info!("[split] room model loaded");
            commands.entity(room).insert(PendingSplit);
        }
        Err(_) => info!("[split] already split, skipping"),
    }
}

/// One part entity per leaf mesh, carrying the leaf's world transform.
#[allow(clippy::too_many_arguments)]
pub fn split_room(
    mut commands: Commands,
    q_pending: Query<Entity, (With<RoomEntity>, With<PendingSplit>)>,
    children: Query<&Children>,
    q_leaf: Query<(
        &Mesh3d,
        Option<&MeshMaterial3d<StandardMaterial>>,
        &GlobalTransform,
        Option<&ChildOf>,
    )>,
    q_names: Query<&Name>,
    meshes: Res<Assets<Mesh>>,
    config: Res<DemoConfig>,
    mut flow: ResMut<RevealFlow>,
    mut ray: ResMut<PointerRay>,
    mut picker: ResMut<FakePicker>,
) {
    for room in &q_pending {
        commands.entity(room).remove::<PendingSplit>();
        if flow.is_split() {
            info!("[split] already split, skipping");
            continue;
        }

        let leaves = leaf_meshes(room, &children, |e| q_leaf.contains(e));
        info!("[split] found {} meshes", leaves.len());
        if leaves.is_empty() {
            warn!("[split] no meshes found in model; leaving original visible");
            continue;
        }
        if leaves.len() == 1 {
            info!("[split] single mesh found; the exporter may have merged objects");
        }

        let mut created = 0;
        let mut selectable = Vec::new();
        for leaf in leaves {
            let Ok((mesh, material, global, parent)) = q_leaf.get(leaf) else {
                continue;
            };
            let (node_name, name) = part_names(leaf, parent, &q_names);
            let is_wall = is_wall_name(&node_name, &config.wall_keyword);
            let pose = PartPose::from_global(global);

            // Same geometry and material handles; the transform lives on the part.
            let mut part = commands.spawn((
                Part {
                    name: name.clone(),
                    is_wall,
                },
                pose,
                pose.to_transform(),
                Mesh3d(mesh.0.clone()),
                Visibility::Visible,
                Name::new(format!("Part {name}")),
            ));
            if let Some(material) = material {
                part.insert(MeshMaterial3d(material.0.clone()));
            }
            match meshes.get(&mesh.0).and_then(mesh_collider) {
                Some(collider) => {
                    part.insert((collider, RayTarget));
                }
                None => warn!("[split] no collider for {name:?}; it will not be pickable"),
            }
            if !is_wall {
                part.insert((HoverHighlight::from_config(&config.hover), Selectable));
                selectable.push(part.id());
            }
            created += 1;
        }

        info!("[split] created {created} entities");
        commands.entity(room).insert(Visibility::Hidden);
        if let Err(err) = flow.room_split() {
            warn!("[split] {err}");
        }
        ray.request_refresh();

        match picker.pick(&selectable) {
            Some(fake) => {
                commands
                    .entity(fake)
                    .insert(FakePart::default())
                    .observe(on_fake_click);
                debug!("[split] fake part is {fake}");
            }
            None => warn!("[split] no non-wall parts, nothing can hide the ghost"),
        }
    }
}

/// One-shot: hide the fake part and let the ghost out where it stood.
pub fn on_fake_click(
    mut trigger: Trigger<PartClicked>,
    mut commands: Commands,
    mut q_fake: Query<(&Part, &mut FakePart, &GlobalTransform, &mut Visibility)>,
    mut flow: ResMut<RevealFlow>,
    config: Res<DemoConfig>,
    assets: Res<DemoAssets>,
    time: Res<Time>,
) {
    trigger.event_mut().consumed = true;
    let fake = trigger.target();
    commands.entity(trigger.observer()).despawn();

    let Ok((part, mut fake_part, global, mut visibility)) = q_fake.get_mut(fake) else {
        return;
    };
    if fake_part.handled {
        return;
    }
    fake_part.handled = true;
    info!("[ghost] fake part {:?} clicked", part.name);

    let position = global.translation();
    *visibility = Visibility::Hidden;
    if let Err(err) = flow.fake_revealed() {
        warn!("[ghost] {err}");
    }

    spawn_ghost(
        &mut commands,
        position,
        &config.ghost,
        assets.ghost.clone(),
        time.elapsed(),
    );
    if let Err(err) = flow.ghost_spawned() {
        warn!("[ghost] {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::RevealStage;
    use crate::ghost::Ghost;
    use crate::pointer::{CanvasClicked, route_click};
    use bevy::ecs::system::RunSystemOnce;

    fn world(seed: u64) -> World {
        let mut world = World::new();
        world.init_resource::<Assets<Mesh>>();
        world.init_resource::<Assets<StandardMaterial>>();
        world.init_resource::<PointerRay>();
        world.init_resource::<DemoAssets>();
        world.init_resource::<Time>();
        world.init_resource::<Events<CanvasClicked>>();
        world.insert_resource(DemoConfig {
            fake_seed: Some(seed),
            ..default()
        });
        world.insert_resource(FakePicker::new(Some(seed)));
        let mut flow = RevealFlow::default();
        flow.model_loaded().unwrap();
        world.insert_resource(flow);
        world
    }

    /// Room with glTF-style node → primitive children.
    fn room(world: &mut World, names: &[&str]) -> Entity {
        let mesh = world
            .resource_mut::<Assets<Mesh>>()
            .add(Mesh::from(Cuboid::new(1.0, 1.0, 1.0)));
        let mat = world
            .resource_mut::<Assets<StandardMaterial>>()
            .add(StandardMaterial::default());
        let room = world
            .spawn((RoomEntity, PendingSplit, Transform::default(), Visibility::Visible))
            .id();
        for (i, name) in names.iter().enumerate() {
            let at = Transform::from_xyz(i as f32, 0.5, -2.0);
            let node = world
                .spawn((Name::new(name.to_string()), at, GlobalTransform::from(at)))
                .id();
            world.entity_mut(room).add_child(node);
            let prim = world
                .spawn((
                    Mesh3d(mesh.clone()),
                    MeshMaterial3d(mat.clone()),
                    GlobalTransform::from(at),
                ))
                .id();
            world.entity_mut(node).add_child(prim);
        }
        room
    }

    fn parts(world: &mut World) -> Vec<(Entity, Part, bool)> {
        let mut q = world.query::<(Entity, &Part, Has<FakePart>)>();
        q.iter(world).map(|(e, p, f)| (e, p.clone(), f)).collect()
    }

    #[test]
    fn one_part_per_leaf_and_exactly_one_fake_non_wall() {
        for seed in 0..8 {
            let mut world = world(seed);
            let room = room(&mut world, &["Wall_North", "Chair", "Table", "wall.east", "Lamp"]);
            world.run_system_once(split_room).unwrap();

            let parts = parts(&mut world);
            assert_eq!(parts.len(), 5);
            assert_eq!(parts.iter().filter(|(_, p, _)| p.is_wall).count(), 2);
            let fakes: Vec<_> = parts.iter().filter(|(_, _, fake)| *fake).collect();
            assert_eq!(fakes.len(), 1);
            assert!(!fakes[0].1.is_wall);

            assert_eq!(world.get::<Visibility>(room), Some(&Visibility::Hidden));
            assert_eq!(world.resource::<RevealFlow>().stage(), RevealStage::Split);
        }
    }

    #[test]
    fn walls_get_no_hover_and_others_do() {
        let mut world = world(3);
        room(&mut world, &["WALL", "Bookshelf"]);
        world.run_system_once(split_room).unwrap();
        for (e, part, _) in parts(&mut world) {
            assert_eq!(world.get::<HoverHighlight>(e).is_some(), !part.is_wall);
            assert!(world.get::<RayTarget>(e).is_some());
        }
    }

    #[test]
    fn part_keeps_the_world_pose_of_its_leaf() {
        let mut world = world(1);
        room(&mut world, &["Chair"]);
        world.run_system_once(split_room).unwrap();
        let (e, _, _) = parts(&mut world)[0].clone();
        let tf = world.get::<Transform>(e).unwrap();
        assert_eq!(tf.translation, Vec3::new(0.0, 0.5, -2.0));
        assert_eq!(tf.scale, Vec3::ONE);
    }

    #[test]
    fn splitting_twice_is_a_no_op() {
        let mut world = world(2);
        let room = room(&mut world, &["Chair", "Table"]);
        world.run_system_once(split_room).unwrap();
        world.entity_mut(room).insert(PendingSplit);
        world.run_system_once(split_room).unwrap();
        assert_eq!(parts(&mut world).len(), 2);
    }

    #[test]
    fn empty_room_is_left_alone() {
        let mut world = world(2);
        let room = room(&mut world, &[]);
        world.run_system_once(split_room).unwrap();
        assert!(parts(&mut world).is_empty());
        assert_eq!(world.get::<Visibility>(room), Some(&Visibility::Visible));
        assert_eq!(world.resource::<RevealFlow>().stage(), RevealStage::Loaded);
    }

    #[test]
    fn all_walls_means_no_fake() {
        let mut world = world(5);
        room(&mut world, &["wall_a", "Wall_b"]);
        world.run_system_once(split_room).unwrap();
        let parts = parts(&mut world);
        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(|(_, _, fake)| !fake));
    }

    #[test]
    fn fake_click_spawns_one_ghost_and_hides_the_part() {
        let mut world = world(4);
        room(&mut world, &["Chair", "Table", "Wall"]);
        world.run_system_once(split_room).unwrap();
        let (fake, _, _) = parts(&mut world)
            .into_iter()
            .find(|(_, _, fake)| *fake)
            .unwrap();
        let at = Vec3::new(1.0, 0.5, -2.0);
        world
            .entity_mut(fake)
            .insert(GlobalTransform::from_translation(at));

        route_click(&mut world, Some(fake), Some(fake));
        route_click(&mut world, Some(fake), Some(fake));

        let ghosts: Vec<Vec3> = world
            .query_filtered::<&Transform, With<Ghost>>()
            .iter(&world)
            .map(|tf| tf.translation)
            .collect();
        assert_eq!(ghosts, vec![at]);
        assert_eq!(world.get::<Visibility>(fake), Some(&Visibility::Hidden));
        assert!(world.get::<FakePart>(fake).unwrap().handled);
        assert_eq!(
            world.resource::<RevealFlow>().stage(),
            RevealStage::GhostActive
        );
        // Only the second click, with the one-shot observer gone, reaches the canvas.
        let canvas = world.resource::<Events<CanvasClicked>>();
        assert_eq!(canvas.len(), 1);
    }

    #[test]
    fn walls_are_matched_on_the_node_name_not_the_mesh_name() {
        let mut world = world(6);
        room(&mut world, &["Chair", "Wall_South"]);
        // Mesh names point the other way from the node names.
        let prims: Vec<(Entity, String)> = world
            .query_filtered::<(Entity, &ChildOf), With<Mesh3d>>()
            .iter(&world)
            .map(|(e, c)| (e, world.get::<Name>(c.parent()).unwrap().as_str().to_string()))
            .collect();
        for (prim, node) in prims {
            let mesh_name = if node == "Chair" { "wallpaper.0" } else { "Plane.0" };
            world.entity_mut(prim).insert(Name::new(mesh_name));
        }

        world.run_system_once(split_room).unwrap();
        let parts = parts(&mut world);
        let (_, chair, _) = parts.iter().find(|(_, p, _)| p.name.starts_with("Chair")).unwrap();
        assert_eq!(chair.name, "Chair/wallpaper.0");
        assert!(!chair.is_wall);
        let (_, wall, _) = parts.iter().find(|(_, p, _)| p.name.starts_with("Wall_South")).unwrap();
        assert!(wall.is_wall);
    }

    #[test]
    fn wall_matching_ignores_case() {
        assert!(is_wall_name("Room_WALL_01", "wall"));
        assert!(is_wall_name("drywall", "Wall"));
        assert!(!is_wall_name("Window", "wall"));
        assert!(!is_wall_name("anything", ""));
    }

    #[test]
    fn pose_reports_yxz_degrees() {
        let global = GlobalTransform::from(
            Transform::from_xyz(1.0, 2.0, 3.0)
                .with_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2))
                .with_scale(Vec3::splat(2.0)),
        );
        let pose = PartPose::from_global(&global);
        assert!((pose.position - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-5);
        assert!((pose.rotation_deg - Vec3::new(0.0, 90.0, 0.0)).length() < 1e-3);
        assert!((pose.scale - Vec3::splat(2.0)).length() < 1e-5);
    }
}
