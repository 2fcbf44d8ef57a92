//! Scene data: trees and their registry, collision boxes, models, textures
//! and flat-coloured shapes.
//!
//! - `registry` owns the trees and keeps their indices consistent
//! - `tree` is a single tree and the GPU loader for its model
//! - `bounds` holds the axis-aligned boxes used for picking
//! - `model` contains mesh and material definitions, GPU resources for 3D models
//! - `texture` contains GPU texture wrapper and creation utilities
//! - `instance` holds per-instance transformation data
//! - `shape` builds the ground, walls, outlines and the screen overlay

pub mod bounds;
pub mod instance;
pub mod model;
pub mod registry;
pub mod shape;
pub mod texture;
pub mod tree;
