use bevy::prelude::*;

use crate::config::DemoConfig;
use crate::highlight::{MaterialOverrides, OverrideLayer, paint};
use crate::pointer::CanvasClicked;

/// Owns the single selection slot.
#[derive(Resource, Default, Debug)]
pub struct SelectionManager {
    selected: Option<Entity>,
}

impl SelectionManager {
    pub fn selected(&self) -> Option<Entity> {
        self.selected
    }

    /// Restore the selected mesh's material and empty the slot.
    pub fn clear(
        &mut self,
        overrides: &mut MaterialOverrides,
        q_mat: &mut Query<&mut MeshMaterial3d<StandardMaterial>>,
        materials: &mut Assets<StandardMaterial>,
    ) {
        let Some(prev) = self.selected.take() else {
            return;
        };
        if let Ok(mut slot) = q_mat.get_mut(prev) {
            overrides.clear(prev, OverrideLayer::Selection, &mut slot, materials);
        }
    }

    /// Select `mesh`, clearing whatever was selected before. Selecting the
    /// current selection again changes nothing.
    pub fn select(
        &mut self,
        mesh: Entity,
        color: Color,
        overrides: &mut MaterialOverrides,
        q_mat: &mut Query<&mut MeshMaterial3d<StandardMaterial>>,
        materials: &mut Assets<StandardMaterial>,
    ) {
        if self.selected == Some(mesh) {
            return;
        }
        self.clear(overrides, q_mat, materials);
        let Ok(mut slot) = q_mat.get_mut(mesh) else {
            return;
        };
        if overrides.apply(
            mesh,
            OverrideLayer::Selection,
            &mut slot,
            materials,
            |m| paint(m, color),
        ) {
            self.selected = Some(mesh);
        }
    }
}

/// Select the first mesh under the pointer, or clear when nothing was hit.
pub fn handle_canvas_clicks(
    mut clicks: EventReader<CanvasClicked>,
    config: Res<DemoConfig>,
    mut selection: ResMut<SelectionManager>,
    mut overrides: ResMut<MaterialOverrides>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut q_mat: Query<&mut MeshMaterial3d<StandardMaterial>>,
) {
    for click in clicks.read() {
        match click.mesh_hit {
            Some(mesh) => selection.select(
                mesh,
                config.selection_color(),
                &mut overrides,
                &mut q_mat,
                &mut materials,
            ),
            None => selection.clear(&mut overrides, &mut q_mat, &mut materials),
        }
    }
}
