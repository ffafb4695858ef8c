use bevy::prelude::*;

use crate::config::{HoverConfig, color_or};
use crate::highlight::{MaterialOverrides, OverrideLayer, glow_or_lighten};
use crate::pointer::{HoverEnd, HoverStart};
use crate::scene_graph::leaf_meshes;

/// Brighten every mesh under this entity while the pointer rests on it.
#[derive(Component, Clone, Debug, PartialEq)]
pub struct HoverHighlight {
    pub color: Color,
    pub emissive_intensity: f32,
    pub lighten_amount: f32,
}

impl Default for HoverHighlight {
    fn default() -> Self {
        Self::from_config(&HoverConfig::default())
    }
}

impl HoverHighlight {
    pub fn from_config(config: &HoverConfig) -> Self {
        Self {
            color: color_or(&config.color, Color::srgb_u8(0xff, 0xff, 0xaa)),
            emissive_intensity: config.emissive_intensity,
            lighten_amount: config.lighten_amount,
        }
    }
}

pub fn on_hover_start(
    trigger: Trigger<HoverStart>,
    q_hover: Query<&HoverHighlight>,
    children: Query<&Children>,
    mut q_mat: Query<&mut MeshMaterial3d<StandardMaterial>>,
    mut overrides: ResMut<MaterialOverrides>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let entity = trigger.target();
    let Ok(settings) = q_hover.get(entity) else {
        return;
    };
    let meshes = leaf_meshes(entity, &children, |e| q_mat.contains(e));
    for mesh in meshes {
        let Ok(mut slot) = q_mat.get_mut(mesh) else {
            continue;
        };
        overrides.apply(
            mesh,
            OverrideLayer::Hover,
            &mut slot,
            &mut materials,
            |m| {
                glow_or_lighten(
                    m,
                    settings.color,
                    settings.emissive_intensity,
                    settings.lighten_amount,
                )
            },
        );
    }
}

pub fn on_hover_end(
    trigger: Trigger<HoverEnd>,
    q_hover: Query<(), With<HoverHighlight>>,
    children: Query<&Children>,
    mut q_mat: Query<&mut MeshMaterial3d<StandardMaterial>>,
    mut overrides: ResMut<MaterialOverrides>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let entity = trigger.target();
    if !q_hover.contains(entity) {
        return;
    }
    let meshes = leaf_meshes(entity, &children, |e| q_mat.contains(e));
    for mesh in meshes {
        if let Ok(mut slot) = q_mat.get_mut(mesh) {
            overrides.clear(mesh, OverrideLayer::Hover, &mut slot, &mut materials);
        }
    }
}

/// Removing the behaviour also drops any highlight it left on screen.
pub fn on_hover_removed(
    trigger: Trigger<OnRemove, HoverHighlight>,
    children: Query<&Children>,
    mut q_mat: Query<&mut MeshMaterial3d<StandardMaterial>>,
    mut overrides: ResMut<MaterialOverrides>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let entity = trigger.target();
    let meshes = leaf_meshes(entity, &children, |e| q_mat.contains(e));
    for mesh in meshes {
        if let Ok(mut slot) = q_mat.get_mut(mesh) {
            overrides.clear(mesh, OverrideLayer::Hover, &mut slot, &mut materials);
        }
    }
}
