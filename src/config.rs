//! Scene configuration.
//!
//! [`SceneConfig::default`] is the stock forest. A TOML file may override any
//! subset of it; fields it does not name keep their defaults.
//!
//! ```toml
//! model = "models/tree.obj"
//! pick = "nearest"
//! capacity = { fixed = 20 }
//!
//! [camera]
//! position = [0.0, 2.0, 12.0]
//!
//! [[trees]]
//! position = [3.0, 0.0, -4.0]
//! scale = 0.8
//! ```

use std::path::Path;

use cgmath::Point3;
use serde::Deserialize;
use thiserror::Error;

use crate::{data_structures::registry::Capacity, fps::DEFAULT_TARGET_FPS, pick::PickStrategy};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read scene file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scene file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "fell-ngin - first person forest".to_string(),
            width: 800,
            height: 450,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub fovy_degrees: f32,
    /// Walking speed in world units per second.
    pub speed: f32,
    /// Radians turned per mouse count.
    pub sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 2.0, 4.0],
            target: [0.0, 2.0, 0.0],
            fovy_degrees: 60.0,
            speed: 5.0,
            sensitivity: 0.003,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TreePlacement {
    pub position: [f32; 3],
    #[serde(default = "unit_scale")]
    pub scale: f32,
}

fn unit_scale() -> f32 {
    1.0
}

impl TreePlacement {
    pub fn new(position: [f32; 3], scale: f32) -> Self {
        Self { position, scale }
    }

    pub fn point(&self) -> Point3<f32> {
        Point3::from(self.position)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub target_fps: u32,
    pub show_fps: bool,
    pub capacity: Capacity,
    pub pick: PickStrategy,
    /// Model drawn for every tree. Relative paths resolve under `./assets`.
    pub model: String,
    pub trees: Vec<TreePlacement>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            camera: CameraConfig::default(),
            target_fps: DEFAULT_TARGET_FPS,
            show_fps: true,
            capacity: Capacity::default(),
            pick: PickStrategy::default(),
            model: "models/tree.obj".to_string(),
            trees: vec![
                TreePlacement::new([0.0, 0.0, 0.0], 1.0),
                TreePlacement::new([10.0, 0.0, 2.0], 1.5),
                TreePlacement::new([-10.0, 0.0, -2.0], 1.2),
            ],
        }
    }
}

impl SceneConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        log::info!("Loaded scene {} with {} trees", path.display(), config.trees.len());
        Ok(config)
    }
}
