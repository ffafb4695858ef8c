use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};
use std::path::Path;

use crate::config::{CONFIG_PATH, DemoConfig, HoverConfig, color_or};
use crate::flow::RevealFlow;
use crate::highlight::MaterialOverrides;
use crate::hover::HoverHighlight;
use crate::pointer::PointerRay;
use crate::selection::SelectionManager;
use crate::splitter::Part;

/// Hex string <-> egui color button, keeping the string form in the config.
fn hex_color_edit(ui: &mut egui::Ui, hex: &mut String, fallback: Color) -> bool {
    let srgba = color_or(hex, fallback).to_srgba();
    let mut rgb = [
        (srgba.red * 255.0).round() as u8,
        (srgba.green * 255.0).round() as u8,
        (srgba.blue * 255.0).round() as u8,
    ];
    if ui.color_edit_button_srgb(&mut rgb).changed() {
        *hex = Srgba::rgb_u8(rgb[0], rgb[1], rgb[2]).to_hex();
        return true;
    }
    false
}

/// egui panel: tune highlights live, watch the reveal, save the config.
#[allow(clippy::too_many_arguments)]
pub fn debug_panel(
    mut ctxs: EguiContexts,
    mut config: ResMut<DemoConfig>,
    flow: Res<RevealFlow>,
    ray: Res<PointerRay>,
    selection_slot: Res<SelectionManager>,
    overrides: Res<MaterialOverrides>,
    q_parts: Query<&Part>,
    mut q_hover: Query<&mut HoverHighlight>,
) {
    let Ok(ctx) = ctxs.ctx_mut() else {
        return;
    };

    // Local copy so the sliders edit smoothly; written back only on change.
    let mut hover = config.hover.clone();
    let mut selection = config.selection_color.clone();
    let mut save = false;

    egui::Window::new("Haunted room")
        .default_width(280.0)
        .show(ctx, |ui| {
            ui.heading("Hover");
            ui.horizontal(|ui| {
                ui.label("Glow color");
                hex_color_edit(ui, &mut hover.color, Color::srgb_u8(0xff, 0xff, 0xaa));
            });
            ui.add(egui::Slider::new(&mut hover.emissive_intensity, 0.0..=2.0).text("Emissive"));
            ui.add(egui::Slider::new(&mut hover.lighten_amount, 0.0..=0.5).text("Lighten (unlit)"));
            if ui.button("Reset hover").clicked() {
                hover = HoverConfig::default();
            }

            ui.separator();
            ui.heading("Selection");
            ui.horizontal(|ui| {
                ui.label("Color");
                hex_color_edit(ui, &mut selection, Color::srgb(1.0, 1.0, 0.0));
            });

            ui.separator();
            ui.label(format!("Stage: {}", flow.stage().label()));
            let parts = q_parts.iter().count();
            let walls = q_parts.iter().filter(|p| p.is_wall).count();
            ui.label(format!("Parts: {parts} ({walls} walls)"));
            ui.label(format!(
                "Ray targets: {} ({} under pointer)",
                ray.target_count(),
                ray.intersections().len()
            ));
            let selected = selection_slot.selected().map(|e| e.to_string());
            ui.label(format!(
                "Selected: {}",
                selected.as_deref().unwrap_or("nothing")
            ));
            ui.label(format!("Swapped materials: {}", overrides.len()));

            ui.separator();
            save = ui.button("Save config").clicked();
        });

    if hover != config.hover {
        // Affects the next hover; a highlight already on screen keeps its tint.
        let settings = HoverHighlight::from_config(&hover);
        for mut h in &mut q_hover {
            *h = settings.clone();
        }
        config.hover = hover;
    }
    if selection != config.selection_color {
        config.selection_color = selection;
    }

    if save {
        match config.save_to(Path::new(CONFIG_PATH)) {
            Ok(()) => info!("[config] saved {CONFIG_PATH}"),
            Err(err) => warn!("[config] {err}"),
        }
    }
}
