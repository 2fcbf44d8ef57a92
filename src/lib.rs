//! fell-ngin
//!
//! A small first-person demo on top of `wgpu` and `winit`: walk around a walled
//! patch of ground and fell trees by clicking them. Clicks are resolved on the
//! CPU by casting a ray from the camera through the pointer and testing it
//! against every tree's axis-aligned bounding box.
//!
//! High-level modules
//! - `camera`: camera types, controller, uniforms and the picking ray
//! - `config`: the scene description, optionally read from TOML
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: trees and their registry, boxes, meshes, textures, shapes
//! - `flow`: the `GraphicsFlow` trait and the winit event loop
//! - `fps`: frame rate counter and frame pacing
//! - `pick`: ray picking against the tree registry
//! - `pipelines`: the model, shape and overlay render pipelines
//! - `render`: render composition for efficient pipeline reuse
//! - `resources`: helpers to load textures/models and create GPU resources
//! - `scene`: the forest flow

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod fps;
pub mod pick;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::{Deg, Point3, Vector3};
pub use winit::dpi::PhysicalPosition;
pub use winit::event::DeviceEvent;
pub use winit::event::WindowEvent;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Browser entry point: the stock forest on the page's `canvas` element.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), JsValue> {
    let config = config::SceneConfig::default();
    let window = config.window.clone();
    flow::run(window, vec![scene::Forest::constructor(config)])
        .map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
