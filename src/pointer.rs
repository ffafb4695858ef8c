use bevy::prelude::*;
use bevy_egui::EguiContexts;
use bevy_rapier3d::prelude::*;
use bevy_rapier3d::rapier::parry::shape::TriMeshFlags;
use std::collections::HashSet;

use crate::camera::{LookControls, MainCamera};

/// Rays longer than this are not worth resolving inside a room.
const MAX_RAY_DISTANCE: f32 = 100.0;

/// Tag any entity the pointer ray should be able to hit. It also needs a
/// collider; the cached target list is rebuilt from this tag on refresh.
#[derive(Component)]
pub struct RayTarget;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub entity: Entity,
    pub distance: f32,
    /// Whether the hit entity renders a mesh with a standard material.
    pub is_mesh: bool,
}

/// The camera's pointer ray: cached targets plus this frame's hits,
/// nearest first.
#[derive(Resource, Default)]
pub struct PointerRay {
    targets: HashSet<Entity>,
    refresh_requested: bool,
    intersections: Vec<RayHit>,
    hovered: Option<Entity>,
}

impl PointerRay {
    /// Ask for the target cache to be rebuilt before the next cast.
    pub fn request_refresh(&mut self) {
        self.refresh_requested = true;
    }

    pub fn refresh_objects(&mut self, targets: impl IntoIterator<Item = Entity>) {
        self.targets = targets.into_iter().collect();
        self.refresh_requested = false;
    }

    pub fn is_target(&self, entity: Entity) -> bool {
        self.targets.contains(&entity)
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    pub fn set_intersections(&mut self, mut hits: Vec<RayHit>) {
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        self.intersections = hits;
    }

    pub fn intersections(&self) -> &[RayHit] {
        &self.intersections
    }

    pub fn first_hit(&self) -> Option<RayHit> {
        self.intersections.first().copied()
    }

    pub fn first_mesh_hit(&self) -> Option<RayHit> {
        self.intersections.iter().find(|hit| hit.is_mesh).copied()
    }
}

/// Exact triangle collider for ray picking; `None` if the mesh has no
/// usable positions or indices.
pub fn mesh_collider(mesh: &Mesh) -> Option<Collider> {
    Collider::from_bevy_mesh(
        mesh,
        &ComputedColliderShape::TriMesh(TriMeshFlags::MERGE_DUPLICATE_VERTICES),
    )
}

/// Pointer started resting on an entity.
#[derive(Event, Clone, Copy, Debug)]
pub struct HoverStart;

/// Pointer left an entity (or it stopped being hittable).
#[derive(Event, Clone, Copy, Debug)]
pub struct HoverEnd;

/// Click on a specific entity. An observer sets `consumed` to keep the click
/// from reaching the selection handler.
#[derive(Event, Clone, Copy, Debug, Default)]
pub struct PartClicked {
    pub consumed: bool,
}

/// Click on the 3D view that no entity observer consumed.
#[derive(Event, Clone, Copy, Debug, PartialEq)]
pub struct CanvasClicked {
    pub mesh_hit: Option<Entity>,
}

pub fn refresh_ray_targets(mut ray: ResMut<PointerRay>, q_targets: Query<Entity, With<RayTarget>>) {
    if !ray.refresh_requested {
        return;
    }
    ray.refresh_objects(q_targets.iter());
    debug!("[pointer] {} ray targets", ray.target_count());
}

/// Cast from the active camera through the cursor and record every hit
/// against the cached targets.
pub fn cast_pointer_ray(
    windows: Query<&Window>,
    cameras: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    rapier: ReadRapierContext,
    q_visible: Query<&InheritedVisibility>,
    q_mesh: Query<(), (With<Mesh3d>, With<MeshMaterial3d<StandardMaterial>>)>,
    mut ray: ResMut<PointerRay>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let Some(cursor_pos) = window.cursor_position() else {
        ray.set_intersections(Vec::new());
        return;
    };
    let Ok((camera, cam_xform)) = cameras.single() else {
        return;
    };
    let Ok(world_ray) = camera.viewport_to_world(cam_xform, cursor_pos) else {
        return;
    };
    let Ok(context) = rapier.single() else {
        return;
    };

    let mut hits = Vec::new();
    {
        let targets = &ray.targets;
        let hittable = |e: Entity| {
            targets.contains(&e) && q_visible.get(e).map_or(true, |v| v.get())
        };
        context.intersect_ray(
            world_ray.origin,
            *world_ray.direction,
            MAX_RAY_DISTANCE,
            true,
            QueryFilter::default().predicate(&hittable),
            |entity, intersection| {
                hits.push(RayHit {
                    entity,
                    distance: intersection.time_of_impact,
                    is_mesh: q_mesh.contains(entity),
                });
                true
            },
        );
    }
    ray.set_intersections(hits);
}

/// Cursor semantics: only the nearest hit counts as hovered.
pub fn dispatch_hover(mut commands: Commands, mut ray: ResMut<PointerRay>) {
    let current = ray.first_hit().map(|hit| hit.entity);
    if current == ray.hovered {
        return;
    }
    if let Some(prev) = ray.hovered {
        commands.trigger_targets(HoverEnd, prev);
    }
    if let Some(next) = current {
        commands.trigger_targets(HoverStart, next);
    }
    ray.hovered = current;
}

/// A left press and release that did not turn into a camera drag is a click.
pub fn dispatch_clicks(
    mut commands: Commands,
    mouse: Res<ButtonInput<MouseButton>>,
    look: Res<LookControls>,
    ray: Res<PointerRay>,
    mut egui_ctxs: EguiContexts,
) {
    if !mouse.just_released(MouseButton::Left) || look.is_drag() {
        return;
    }
    // If egui wants the pointer, don't pick (prevents UI clicks selecting scene).
    if let Ok(ctx) = egui_ctxs.ctx_mut() {
        if ctx.wants_pointer_input() {
            return;
        }
    }
    let target = ray.first_hit().map(|hit| hit.entity);
    let mesh_hit = ray.first_mesh_hit().map(|hit| hit.entity);
    commands.queue(move |world: &mut World| route_click(world, target, mesh_hit));
}

/// Deliver a click: first to the entity under the pointer, then, unless an
/// observer consumed it, to the canvas.
pub fn route_click(world: &mut World, target: Option<Entity>, mesh_hit: Option<Entity>) {
    let mut click = PartClicked::default();
    if let Some(entity) = target {
        world.trigger_targets_ref(&mut click, entity);
        world.flush();
    }
    if !click.consumed {
        world.send_event(CanvasClicked { mesh_hit });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;

    fn hit(world: &mut World, distance: f32, is_mesh: bool) -> RayHit {
        RayHit {
            entity: world.spawn_empty().id(),
            distance,
            is_mesh,
        }
    }

    #[test]
    fn intersections_are_sorted_and_first_mesh_skips_non_meshes() {
        let mut world = World::new();
        let far = hit(&mut world, 5.0, true);
        let near = hit(&mut world, 1.0, false);
        let mid = hit(&mut world, 2.5, true);

        let mut ray = PointerRay::default();
        ray.set_intersections(vec![far, near, mid]);
        assert_eq!(ray.first_hit(), Some(near));
        assert_eq!(ray.first_mesh_hit(), Some(mid));
    }

    #[test]
    fn refresh_replaces_cached_targets() {
        let mut world = World::new();
        let stale = world.spawn(RayTarget).id();
        let mut ray = PointerRay::default();
        ray.refresh_objects([stale]);
        world.despawn(stale);
        let fresh = world.spawn(RayTarget).id();

        ray.request_refresh();
        world.insert_resource(ray);
        world
            .run_system_once(refresh_ray_targets)
            .expect("refresh runs");
        let ray = world.resource::<PointerRay>();
        assert!(ray.is_target(fresh));
        assert!(!ray.is_target(stale));
        assert_eq!(ray.target_count(), 1);
    }

    #[derive(Resource, Default)]
    struct HoverLog(Vec<(&'static str, Entity)>);

    fn hover_world() -> World {
        let mut world = World::new();
        world.init_resource::<PointerRay>();
        world.init_resource::<HoverLog>();
        world.add_observer(|trigger: Trigger<HoverStart>, mut log: ResMut<HoverLog>| {
            log.0.push(("start", trigger.target()));
        });
        world.add_observer(|trigger: Trigger<HoverEnd>, mut log: ResMut<HoverLog>| {
            log.0.push(("end", trigger.target()));
        });
        world
    }

    /// Set this frame's hits, run the dispatcher, return what it fired.
    fn hover_frame(world: &mut World, hits: Vec<RayHit>) -> Vec<(&'static str, Entity)> {
        world.resource_mut::<PointerRay>().set_intersections(hits);
        world.run_system_once(dispatch_hover).unwrap();
        std::mem::take(&mut world.resource_mut::<HoverLog>().0)
    }

    #[test]
    fn hover_follows_the_nearest_hit() {
        let mut world = hover_world();
        let a = hit(&mut world, 1.0, true);
        let b = hit(&mut world, 2.0, true);
        let a_behind = RayHit { distance: 3.0, ..a };

        assert_eq!(hover_frame(&mut world, vec![b, a]), vec![("start", a.entity)]);
        // Same nearest hit: nothing fires, whatever else is behind it.
        assert!(hover_frame(&mut world, vec![a]).is_empty());
        assert_eq!(
            hover_frame(&mut world, vec![a_behind, b]),
            vec![("end", a.entity), ("start", b.entity)]
        );
        // Nothing under the pointer any more (e.g. the part was hidden).
        assert_eq!(hover_frame(&mut world, Vec::new()), vec![("end", b.entity)]);
        assert!(hover_frame(&mut world, Vec::new()).is_empty());
    }

    #[test]
    fn unconsumed_click_reaches_the_canvas() {
        let mut world = World::new();
        world.init_resource::<Events<CanvasClicked>>();
        let part = world.spawn_empty().id();
        route_click(&mut world, Some(part), Some(part));
        let events = world.resource::<Events<CanvasClicked>>();
        let sent: Vec<_> = events.iter_current_update_events().copied().collect();
        assert_eq!(sent, vec![CanvasClicked { mesh_hit: Some(part) }]);
    }

    #[test]
    fn consumed_click_stops_at_the_entity() {
        let mut world = World::new();
        world.init_resource::<Events<CanvasClicked>>();
        let part = world.spawn_empty().id();
        world
            .entity_mut(part)
            .observe(|mut trigger: Trigger<PartClicked>| trigger.event_mut().consumed = true);
        route_click(&mut world, Some(part), Some(part));
        assert!(world.resource::<Events<CanvasClicked>>().is_empty());
    }
}
