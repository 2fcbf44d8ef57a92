//! Render pipelines. One per kind of [`crate::render::Render`] leaf.

pub mod basic;
pub mod light;
pub mod shape;

#[derive(Debug)]
pub struct Pipelines {
    /// Textured, lit, instanced models (the trees).
    pub model: wgpu::RenderPipeline,
    /// Flat-coloured triangles (ground, walls).
    pub solid: wgpu::RenderPipeline,
    /// Flat-coloured lines in world space (box outlines).
    pub wire: wgpu::RenderPipeline,
    /// Flat-coloured lines in clip space (FPS counter, crosshair).
    pub overlay: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
        light_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        Self {
            model: basic::mk_model_pipeline(
                device,
                config,
                camera_bind_group_layout,
                light_bind_group_layout,
            ),
            solid: shape::mk_solid_pipeline(device, config, camera_bind_group_layout),
            wire: shape::mk_wire_pipeline(device, config, camera_bind_group_layout),
            overlay: shape::mk_overlay_pipeline(device, config),
        }
    }
}
