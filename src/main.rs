use bevy::prelude::*;
use bevy::transform::TransformSystem;
use bevy_egui::{EguiPlugin, EguiPrimaryContextPass};
use bevy_rapier3d::prelude::*;
use std::path::PathBuf;

mod book;
mod camera;
mod config;
mod error;
mod flow;
mod ghost;
mod highlight;
mod hover;
mod pointer;
mod scene;
mod scene_graph;
mod selection;
mod splitter;
mod ui;

use config::{CONFIG_PATH, load_or_default};

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Haunted Room".into(),
                ..default()
            }),
            ..default()
        }))
        // UI plugin (egui)
        .add_plugins(EguiPlugin::default())
        // Colliders only; used for pointer-ray queries, nothing is simulated.
        .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
        .add_plugins(HauntedRoomPlugin {
            config_path: CONFIG_PATH.into(),
        })
        .run();
}

/// Everything that makes the room interactive, on top of the engine plugins.
/// Add it after `DefaultPlugins` so config loading is logged.
pub struct HauntedRoomPlugin {
    pub config_path: PathBuf,
}

impl Plugin for HauntedRoomPlugin {
    fn build(&self, app: &mut App) {
        let config = load_or_default(&self.config_path);
        app.insert_resource(splitter::FakePicker::new(config.fake_seed))
            .insert_resource(config)
            .init_resource::<flow::RevealFlow>()
            .init_resource::<pointer::PointerRay>()
            .init_resource::<highlight::MaterialOverrides>()
            .init_resource::<selection::SelectionManager>()
            .init_resource::<camera::LookControls>()
            .add_event::<pointer::CanvasClicked>()
            .add_observer(hover::on_hover_start)
            .add_observer(hover::on_hover_end)
            .add_observer(hover::on_hover_removed)
            .add_systems(
                Startup,
                (
                    scene::load_assets,
                    (camera::spawn_camera, scene::spawn_light, scene::setup_scene),
                )
                    .chain(),
            )
            .add_systems(
                Update,
                (
                    camera::look_drag,
                    camera::move_camera,
                    pointer::refresh_ray_targets,
                    pointer::cast_pointer_ray,
                    pointer::dispatch_hover,
                    pointer::dispatch_clicks,
                    selection::handle_canvas_clicks,
                )
                    .chain(),
            )
            .add_systems(
                Update,
                (
                    (ghost::animate_ghosts, ghost::remove_expired_ghosts).chain(),
                    scene::report_load_failures,
                ),
            )
            // World transforms of freshly spawned scenes are only valid after propagation.
            .add_systems(
                PostUpdate,
                (splitter::split_room, book::fit_book).after(TransformSystem::TransformPropagate),
            )
            .add_systems(EguiPrimaryContextPass, ui::debug_panel);
    }
}
