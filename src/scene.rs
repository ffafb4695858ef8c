use bevy::asset::LoadState;
use bevy::prelude::*;
use bevy_rapier3d::prelude::Collider;
use std::collections::HashSet;

use crate::book::{BookEntity, on_book_ready};
use crate::config::DemoConfig;
use crate::error::DemoError;
use crate::highlight::MaterialOverrides;
use crate::pointer::{PartClicked, PointerRay, RayTarget};
use crate::splitter::{RoomEntity, on_room_ready};

/// Scene handles for the three models, requested at startup.
#[derive(Resource, Default)]
pub struct DemoAssets {
    pub room: Handle<Scene>,
    pub ghost: Handle<Scene>,
    pub book: Handle<Scene>,
}

/// The plain clickable box in the middle of the room.
#[derive(Component)]
pub struct InteractiveBox;

pub fn load_assets(mut commands: Commands, asset_server: Res<AssetServer>, config: Res<DemoConfig>) {
    let scene = |path: &str| -> Handle<Scene> {
        asset_server.load(GltfAssetLabel::Scene(0).from_asset(path.to_string()))
    };
    commands.insert_resource(DemoAssets {
        room: scene(&config.room_model),
        ghost: scene(&config.ghost_model),
        book: scene(&config.book_model),
    });
}

/// Soft fill plus one shadow-casting key light from above.
pub fn spawn_light(mut commands: Commands) {
    commands.insert_resource(AmbientLight {
        color: Color::srgb(0.92, 0.95, 1.0),
        brightness: 350.0,
        ..default()
    });

    commands.spawn((
        PointLight {
            intensity: 600_000.0,
            range: 30.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(0.0, 3.5, 0.0),
        Name::new("CeilingLight"),
    ));
    commands.spawn((
        DirectionalLight {
            illuminance: 2_500.0,
            shadows_enabled: true,
            shadow_depth_bias: 0.02,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(
            EulerRot::XYZ,
            (-50.0_f32).to_radians(),
            30.0_f32.to_radians(),
            0.0,
        )),
        Name::new("Key"),
    ));
}

/// Room, book (hidden until fitted) and the interactive box.
pub fn setup_scene(
    mut commands: Commands,
    assets: Res<DemoAssets>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut ray: ResMut<PointerRay>,
) {
    commands
        .spawn((
            SceneRoot(assets.room.clone()),
            RoomEntity,
            Name::new("Room"),
        ))
        .observe(on_room_ready);

    commands
        .spawn((
            SceneRoot(assets.book.clone()),
            BookEntity,
            Visibility::Hidden,
            Name::new("Book"),
        ))
        .observe(on_book_ready);

    // Own material, so recoloring it touches nothing else.
    let box_mat = materials.add(StandardMaterial {
        base_color: Color::srgb_u8(0x4C, 0xC3, 0xD9),
        perceptual_roughness: 0.6,
        ..default()
    });
    commands
        .spawn((
            Mesh3d(meshes.add(Cuboid::new(1.0, 1.0, 1.0))),
            MeshMaterial3d(box_mat),
            Transform::from_xyz(-1.0, 0.5, -3.0).with_rotation(Quat::from_rotation_y(0.785)),
            Collider::cuboid(0.5, 0.5, 0.5),
            RayTarget,
            InteractiveBox,
            Name::new("InteractiveBox"),
        ))
        .observe(on_box_click);
    // The box is pickable even if neither model ever loads.
    ray.request_refresh();
}

/// Recolor the box. The click carries on to the selection handler.
pub fn on_box_click(
    trigger: Trigger<PartClicked>,
    q_box: Query<&MeshMaterial3d<StandardMaterial>, With<InteractiveBox>>,
    overrides: Res<MaterialOverrides>,
    config: Res<DemoConfig>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    info!("Box clicked");
    let entity = trigger.target();
    let Ok(shown) = q_box.get(entity) else {
        return;
    };
    let color = config.box_clicked_color();
    let original = overrides.original(entity).cloned();
    for handle in original.iter().chain([&shown.0]) {
        if let Some(mat) = materials.get_mut(handle) {
            mat.base_color = color;
        }
    }
}

/// Log each model that fails to load, once. The entity waiting on it stays
/// hidden or unsplit.
pub fn report_load_failures(
    asset_server: Res<AssetServer>,
    assets: Res<DemoAssets>,
    config: Res<DemoConfig>,
    mut reported: Local<HashSet<AssetId<Scene>>>,
) {
    let models = [
        (&assets.room, &config.room_model),
        (&assets.ghost, &config.ghost_model),
        (&assets.book, &config.book_model),
    ];
    for (handle, path) in models {
        if reported.contains(&handle.id()) {
            continue;
        }
        if let Some(LoadState::Failed(err)) = asset_server.get_load_state(handle.id()) {
            reported.insert(handle.id());
            let err = DemoError::ModelLoad {
                path: path.clone(),
                reason: err.to_string(),
            };
            error!("{err}");
        }
    }
}
