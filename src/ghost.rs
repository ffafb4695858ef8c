use bevy::prelude::*;
use std::time::Duration;

use crate::config::GhostConfig;
use crate::flow::RevealFlow;
use crate::splitter::PartPose;

// Fixed forward-facing pose, whatever the fake part's orientation was.
const GHOST_ROTATION_DEG: Vec3 = Vec3::new(0.0, 90.0, 0.0);

#[derive(Component)]
pub struct Ghost;

/// Linear move from `from` to `to`, starting at `started` (elapsed time).
#[derive(Component, Clone, Copy, Debug)]
pub struct RiseAnimation {
    from: Vec3,
    to: Vec3,
    started: Duration,
    duration: Duration,
}

impl RiseAnimation {
    pub fn position_at(&self, now: Duration) -> Vec3 {
        let t = if self.duration.is_zero() {
            1.0
        } else {
            (now.saturating_sub(self.started).as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
        };
        self.from.lerp(self.to, t)
    }
}

/// Removal deadline, independent of the animation.
#[derive(Component, Clone, Copy, Debug)]
pub struct GhostLifetime {
    spawned_at: Duration,
    lifetime: Duration,
}

impl GhostLifetime {
    pub fn expired(&self, now: Duration) -> bool {
        now.saturating_sub(self.spawned_at) >= self.lifetime
    }
}

pub fn ghost_bundle(
    position: Vec3,
    config: &GhostConfig,
    scene: Handle<Scene>,
    now: Duration,
) -> impl Bundle {
    let pose = PartPose {
        position,
        rotation_deg: GHOST_ROTATION_DEG,
        scale: Vec3::splat(config.scale),
    };
    (
        Ghost,
        SceneRoot(scene),
        pose.to_transform(),
        RiseAnimation {
            from: position,
            to: position + Vec3::Y * config.rise_height,
            started: now,
            duration: Duration::from_millis(config.rise_ms),
        },
        GhostLifetime {
            spawned_at: now,
            lifetime: Duration::from_millis(config.lifetime_ms),
        },
        Name::new("Ghost"),
    )
}

pub fn spawn_ghost(
    commands: &mut Commands,
    position: Vec3,
    config: &GhostConfig,
    scene: Handle<Scene>,
    now: Duration,
) -> Entity {
    let ghost = commands.spawn(ghost_bundle(position, config, scene, now)).id();
    info!("[ghost] spawned at {position}");
    ghost
}

pub fn animate_ghosts(
    time: Res<Time>,
    mut q_ghosts: Query<(&RiseAnimation, &mut Transform), With<Ghost>>,
) {
    let now = time.elapsed();
    for (rise, mut tf) in &mut q_ghosts {
        tf.translation = rise.position_at(now);
    }
}

pub fn remove_expired_ghosts(
    mut commands: Commands,
    time: Res<Time>,
    q_ghosts: Query<(Entity, &GhostLifetime), With<Ghost>>,
    mut flow: ResMut<RevealFlow>,
) {
    let now = time.elapsed();
    for (ghost, lifetime) in &q_ghosts {
        if !lifetime.expired(now) {
            continue;
        }
        commands.entity(ghost).despawn();
        info!("[ghost] removed");
        if let Err(err) = flow.ghost_removed() {
            warn!("[ghost] {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::time::TimeUpdateStrategy;

    const FRAME: Duration = Duration::from_millis(100);

    fn app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(TimeUpdateStrategy::ManualDuration(FRAME))
            .init_resource::<RevealFlow>()
            .add_systems(Update, (animate_ghosts, remove_expired_ghosts).chain());
        {
            let mut flow = app.world_mut().resource_mut::<RevealFlow>();
            flow.model_loaded().unwrap();
            flow.room_split().unwrap();
            flow.fake_revealed().unwrap();
            flow.ghost_spawned().unwrap();
        }
        // Let the clock start ticking before anything is spawned.
        app.update();
        app.update();
        app
    }

    fn now(app: &App) -> Duration {
        app.world().resource::<Time>().elapsed()
    }

    #[test]
    fn ghost_is_removed_right_after_its_lifetime() {
        let mut app = app();
        let spawned_at = now(&app);
        let ghost = app
            .world_mut()
            .spawn(ghost_bundle(
                Vec3::ZERO,
                &GhostConfig::default(),
                Handle::default(),
                spawned_at,
            ))
            .id();

        let mut removed_at = None;
        for _ in 0..100 {
            app.update();
            if !app.world().entities().contains(ghost) {
                removed_at = Some(now(&app));
                break;
            }
        }
        let removed_at = removed_at.expect("ghost despawned");
        let alive_for = removed_at - spawned_at;
        assert!(alive_for >= Duration::from_millis(3000));
        assert!(alive_for <= Duration::from_millis(3000) + FRAME);
        assert_eq!(
            app.world().resource::<RevealFlow>().stage(),
            crate::flow::RevealStage::GhostRemoved
        );
    }

    #[test]
    fn removal_does_not_wait_for_the_animation() {
        let mut app = app();
        let spawned_at = now(&app);
        let slow = GhostConfig {
            rise_ms: 60_000,
            ..default()
        };
        let ghost = app
            .world_mut()
            .spawn(ghost_bundle(Vec3::ZERO, &slow, Handle::default(), spawned_at))
            .id();
        for _ in 0..40 {
            app.update();
        }
        assert!(!app.world().entities().contains(ghost));
    }

    #[test]
    fn rise_is_linear_and_stops_at_the_top() {
        let rise = RiseAnimation {
            from: Vec3::new(1.0, 0.5, -2.0),
            to: Vec3::new(1.0, 2.5, -2.0),
            started: Duration::from_secs(10),
            duration: Duration::from_secs(3),
        };
        let mid = rise.position_at(Duration::from_millis(11_500));
        assert!((mid.y - 1.5).abs() < 1e-5);
        assert_eq!(rise.position_at(Duration::from_secs(20)), rise.to);
        assert_eq!(rise.position_at(Duration::from_secs(5)), rise.from);
    }

    #[test]
    fn ghost_faces_forward_at_configured_scale() {
        let mut world = World::new();
        let ghost = world
            .spawn(ghost_bundle(
                Vec3::new(2.0, 0.0, 1.0),
                &GhostConfig::default(),
                Handle::default(),
                Duration::ZERO,
            ))
            .id();
        let tf = world.get::<Transform>(ghost).unwrap();
        assert_eq!(tf.scale, Vec3::splat(3.0));
        let facing = tf.rotation * Vec3::Z;
        assert!((facing - Vec3::X).length() < 1e-5);
    }
}
