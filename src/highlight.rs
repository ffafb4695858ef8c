use bevy::prelude::*;
use std::collections::HashMap;

/// Which interaction put a material override on a mesh. Selection wins over
/// hover when both are active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OverrideLayer {
    Hover,
    Selection,
}

struct OverrideEntry {
    original: Handle<StandardMaterial>,
    hover: Option<Handle<StandardMaterial>>,
    selection: Option<Handle<StandardMaterial>>,
}

impl OverrideEntry {
    fn slot(&mut self, layer: OverrideLayer) -> &mut Option<Handle<StandardMaterial>> {
        match layer {
            OverrideLayer::Hover => &mut self.hover,
            OverrideLayer::Selection => &mut self.selection,
        }
    }

    fn effective(&self) -> &Handle<StandardMaterial> {
        self.selection
            .as_ref()
            .or(self.hover.as_ref())
            .unwrap_or(&self.original)
    }

    fn is_empty(&self) -> bool {
        self.hover.is_none() && self.selection.is_none()
    }
}

/// Side-table of temporarily swapped materials, keyed by mesh entity.
///
/// A mesh has an entry only while some override is active, and the entry
/// keeps the one true original handle no matter how many layers stack on top.
#[derive(Resource, Default)]
pub struct MaterialOverrides {
    entries: HashMap<Entity, OverrideEntry>,
}

impl MaterialOverrides {
    pub fn is_active(&self, mesh: Entity, layer: OverrideLayer) -> bool {
        self.entries.get(&mesh).is_some_and(|e| match layer {
            OverrideLayer::Hover => e.hover.is_some(),
            OverrideLayer::Selection => e.selection.is_some(),
        })
    }

    /// The material the mesh had before any override, if one is active.
    pub fn original(&self, mesh: Entity) -> Option<&Handle<StandardMaterial>> {
        self.entries.get(&mesh).map(|e| &e.original)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Clone the mesh's original material, let `tint` adjust the clone, and
    /// show it. No-op (returns `false`) if this layer is already applied or
    /// the original material asset is gone.
    pub fn apply(
        &mut self,
        mesh: Entity,
        layer: OverrideLayer,
        slot: &mut MeshMaterial3d<StandardMaterial>,
        materials: &mut Assets<StandardMaterial>,
        tint: impl FnOnce(&mut StandardMaterial),
    ) -> bool {
        if self.is_active(mesh, layer) {
            return false;
        }
        let original = self
            .original(mesh)
            .cloned()
            .unwrap_or_else(|| slot.0.clone());
        let Some(mut clone) = materials.get(&original).cloned() else {
            return false;
        };
        tint(&mut clone);
        let handle = materials.add(clone);

        let entry = self.entries.entry(mesh).or_insert_with(|| OverrideEntry {
            original,
            hover: None,
            selection: None,
        });
        *entry.slot(layer) = Some(handle);
        slot.0 = entry.effective().clone();
        true
    }

    /// Drop this layer's clone. When no layer is left the original handle is
    /// put back and the entry disappears.
    pub fn clear(
        &mut self,
        mesh: Entity,
        layer: OverrideLayer,
        slot: &mut MeshMaterial3d<StandardMaterial>,
        materials: &mut Assets<StandardMaterial>,
    ) -> bool {
        let Some(entry) = self.entries.get_mut(&mesh) else {
            return false;
        };
        let Some(clone) = entry.slot(layer).take() else {
            return false;
        };
        slot.0 = entry.effective().clone();
        materials.remove(&clone);
        if entry.is_empty() {
            self.entries.remove(&mesh);
        }
        true
    }
}

/// Emissive glow for lit materials; unlit ones ignore emissive, so lighten
/// their base color in HSL instead.
pub fn glow_or_lighten(mat: &mut StandardMaterial, color: Color, intensity: f32, lighten: f32) {
    if mat.unlit {
        let mut hsla = Hsla::from(mat.base_color);
        hsla.lightness = (hsla.lightness + lighten).clamp(0.0, 1.0);
        mat.base_color = hsla.into();
    } else {
        mat.emissive = LinearRgba::from(color) * intensity;
    }
}

/// Solid highlight: emissive for lit materials, base color for unlit ones.
pub fn paint(mat: &mut StandardMaterial, color: Color) {
    if mat.unlit {
        mat.base_color = color;
    } else {
        mat.emissive = LinearRgba::from(color);
    }
}
