use bevy::{
    core_pipeline::{bloom::Bloom, tonemapping::Tonemapping},
    input::mouse::MouseMotion,
    prelude::*,
};

use crate::config::DemoConfig;

const EYE_HEIGHT: f32 = 1.6;
// Just short of straight up/down so the basis never degenerates.
const PITCH_LIMIT_DEG: f32 = 89.0;
// Pointer travel (px) while held before a press counts as a drag, not a click.
const DRAG_THRESHOLD_PX: f32 = 4.0;

/// Tag the camera that looks around the room and casts the pointer ray.
#[derive(Component)]
pub struct MainCamera;

/// Yaw/pitch accumulated from drags (radians).
#[derive(Component, Default)]
pub struct FirstPersonLook {
    yaw: f32,
    pitch: f32,
}

/// How far the pointer moved during the current (or last) left press.
#[derive(Resource, Default)]
pub struct LookControls {
    travelled: f32,
}

impl LookControls {
    pub fn is_drag(&self) -> bool {
        self.travelled > DRAG_THRESHOLD_PX
    }
}

/// Eye-height camera with filmic tonemapping; bloom makes the emissive
/// highlights glow a little.
pub fn spawn_camera(mut commands: Commands) {
    commands.spawn((
        Camera3d::default(),
        Camera {
            hdr: true,
            ..default()
        },
        Transform::from_xyz(0.0, EYE_HEIGHT, 0.0).looking_to(-Vec3::Z, Vec3::Y),
        Tonemapping::AcesFitted,
        Bloom::NATURAL,
        MainCamera,
        FirstPersonLook::default(),
        Name::new("MainCamera"),
    ));
}

/// Left-drag rotates the view: horizontal motion yaws, vertical pitches.
pub fn look_drag(
    mouse: Res<ButtonInput<MouseButton>>,
    mut motion: EventReader<MouseMotion>,
    config: Res<DemoConfig>,
    mut look: ResMut<LookControls>,
    mut q_cam: Query<(&mut Transform, &mut FirstPersonLook), With<MainCamera>>,
) {
    if mouse.just_pressed(MouseButton::Left) {
        look.travelled = 0.0;
    }
    let delta: Vec2 = motion.read().map(|m| m.delta).sum();
    if !mouse.pressed(MouseButton::Left) || delta == Vec2::ZERO {
        return;
    }
    look.travelled += delta.length();
    if !look.is_drag() {
        return;
    }

    let sensitivity = config.camera.look_sensitivity;
    let limit = PITCH_LIMIT_DEG.to_radians();
    for (mut tf, mut fp) in &mut q_cam {
        fp.yaw -= delta.x * sensitivity;
        fp.pitch = (fp.pitch - delta.y * sensitivity).clamp(-limit, limit);
        tf.rotation = Quat::from_euler(EulerRot::YXZ, fp.yaw, fp.pitch, 0.0);
    }
}

/// Screen-space input (x = right, y = forward) to a world direction on the
/// ground plane, relative to where the camera is facing.
fn ground_direction(rotation: Quat, input: Vec2) -> Vec3 {
    if input == Vec2::ZERO {
        return Vec3::ZERO;
    }
    // Normalize so diagonals aren't faster
    let input = input.normalize();
    let right = rotation * Vec3::X;
    let forward = rotation * -Vec3::Z;
    let right_xz = Vec3::new(right.x, 0.0, right.z).normalize_or_zero();
    let forward_xz = Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero();
    (right_xz * input.x + forward_xz * input.y).normalize_or_zero()
}

/// WASD / arrows walk along the floor; height stays fixed.
pub fn move_camera(
    keys: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    config: Res<DemoConfig>,
    mut q_cam: Query<&mut Transform, With<MainCamera>>,
) {
    let mut input = Vec2::ZERO;
    if keys.pressed(KeyCode::ArrowUp) || keys.pressed(KeyCode::KeyW) {
        input.y += 1.0;
    }
    if keys.pressed(KeyCode::ArrowDown) || keys.pressed(KeyCode::KeyS) {
        input.y -= 1.0;
    }
    if keys.pressed(KeyCode::ArrowLeft) || keys.pressed(KeyCode::KeyA) {
        input.x -= 1.0;
    }
    if keys.pressed(KeyCode::ArrowRight) || keys.pressed(KeyCode::KeyD) {
        input.x += 1.0;
    }
    if input == Vec2::ZERO {
        return;
    }

    let step = config.camera.move_speed * time.delta_secs();
    for mut tf in &mut q_cam {
        let dir = ground_direction(tf.rotation, input);
        tf.translation += dir * step;
    }
}
