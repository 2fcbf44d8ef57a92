//! Pipelines for flat-coloured [`ColorVertex`] geometry.

use crate::{
    data_structures::{
        model::Vertex,
        shape::ColorVertex,
        texture::Texture,
    },
    pipelines::basic::{mk_render_pipeline, scene_depth},
};

fn shape_layout(
    device: &wgpu::Device,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Shape Pipeline Layout"),
        bind_group_layouts: &[camera_bind_group_layout],
        push_constant_ranges: &[],
    })
}

fn shape_shader() -> wgpu::ShaderModuleDescriptor<'static> {
    wgpu::ShaderModuleDescriptor {
        label: Some("Shape Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shape.wgsl").into()),
    }
}

/// Ground and walls. Both faces are drawn so the winding of a quad
/// does not matter.
pub fn mk_solid_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    mk_render_pipeline(
        device,
        &shape_layout(device, camera_bind_group_layout),
        "Solid Shape Pipeline",
        config.format,
        Some(wgpu::BlendState::ALPHA_BLENDING),
        wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        Some(scene_depth()),
        &[ColorVertex::desc()],
        shape_shader(),
    )
}

/// Box outlines as a line list.
pub fn mk_wire_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    mk_render_pipeline(
        device,
        &shape_layout(device, camera_bind_group_layout),
        "Wire Shape Pipeline",
        config.format,
        Some(wgpu::BlendState::ALPHA_BLENDING),
        wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::LineList,
            cull_mode: None,
            ..Default::default()
        },
        Some(scene_depth()),
        &[ColorVertex::desc()],
        shape_shader(),
    )
}

/// Screen-space lines given directly in clip coordinates. Drawn on top of
/// everything without touching the depth buffer.
pub fn mk_overlay_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Overlay Pipeline Layout"),
        bind_group_layouts: &[],
        push_constant_ranges: &[],
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Overlay Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("overlay.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        &layout,
        "Overlay Pipeline",
        config.format,
        Some(wgpu::BlendState::ALPHA_BLENDING),
        wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::LineList,
            cull_mode: None,
            ..Default::default()
        },
        Some(wgpu::DepthStencilState {
            format: Texture::DEPTH_FORMAT,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Always,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        &[ColorVertex::desc()],
        shader,
    )
}
