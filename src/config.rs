use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{read_to_string, write};
use std::path::Path;

use crate::error::DemoError;

/// Default location of the tunables file (relative to the working directory).
pub const CONFIG_PATH: &str = "demo.json";

/// All tunables of the demo. Every field has a default, so a partial JSON
/// document only overrides what it names.
#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub room_model: String,
    pub ghost_model: String,
    pub book_model: String,
    /// Case-insensitive name fragment that classifies a part as a wall.
    pub wall_keyword: String,
    pub hover: HoverConfig,
    pub selection_color: String,
    pub box_clicked_color: String,
    pub ghost: GhostConfig,
    pub book: BookConfig,
    pub camera: CameraConfig,
    /// Fixed seed for the fake-part draw; `None` draws from entropy.
    pub fake_seed: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoverConfig {
    pub color: String,
    pub emissive_intensity: f32,
    pub lighten_amount: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GhostConfig {
    pub scale: f32,
    pub rise_height: f32,
    pub rise_ms: u64,
    pub lifetime_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookConfig {
    pub target_size: f32,
    pub distance: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub move_speed: f32,
    pub look_sensitivity: f32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            room_model: "models/room.glb".into(),
            ghost_model: "models/ghost.glb".into(),
            book_model: "models/book.glb".into(),
            wall_keyword: "wall".into(),
            hover: HoverConfig::default(),
            selection_color: "#ffff00".into(),
            box_clicked_color: "#FF6B6B".into(),
            ghost: GhostConfig::default(),
            book: BookConfig::default(),
            camera: CameraConfig::default(),
            fake_seed: None,
        }
    }
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            color: "#ffffaa".into(),
            emissive_intensity: 0.45,
            lighten_amount: 0.18,
        }
    }
}

impl Default for GhostConfig {
    fn default() -> Self {
        Self {
            scale: 3.0,
            rise_height: 2.0,
            rise_ms: 3000,
            lifetime_ms: 3000,
        }
    }
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            target_size: 1.0,
            distance: 2.0,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            move_speed: 3.0,
            look_sensitivity: 0.003,
        }
    }
}

/// Parse `#rrggbb` / `rrggbb` (and the short and alpha forms Bevy accepts).
pub fn parse_color(hex: &str) -> Result<Color, DemoError> {
    Srgba::hex(hex.trim())
        .map(Color::from)
        .map_err(|_| DemoError::InvalidColor(hex.to_string()))
}

/// Like [`parse_color`], but logs and falls back to `fallback` on bad input.
pub fn color_or(hex: &str, fallback: Color) -> Color {
    parse_color(hex).unwrap_or_else(|err| {
        warn!("[config] {err}; using fallback");
        fallback
    })
}

impl DemoConfig {
    pub fn load_from(path: &Path) -> Result<Self, DemoError> {
        let text = read_to_string(path).map_err(|source| DemoError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| DemoError::ConfigParse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), DemoError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| DemoError::ConfigParse {
            path: path.display().to_string(),
            source,
        })?;
        write(path, json).map_err(|source| DemoError::ConfigIo {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn selection_color(&self) -> Color {
        color_or(&self.selection_color, Color::srgb(1.0, 1.0, 0.0))
    }

    pub fn box_clicked_color(&self) -> Color {
        color_or(&self.box_clicked_color, Color::srgb_u8(0xFF, 0x6B, 0x6B))
    }
}

/// Startup config: the file if present and valid, defaults otherwise.
pub fn load_or_default(path: &Path) -> DemoConfig {
    match DemoConfig::load_from(path) {
        Ok(config) => {
            info!("[config] loaded {}", path.display());
            config
        }
        Err(DemoError::ConfigIo { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            info!("[config] {} not found, using defaults", path.display());
            DemoConfig::default()
        }
        Err(err) => {
            warn!("[config] {err}; using defaults");
            DemoConfig::default()
        }
    }
}
