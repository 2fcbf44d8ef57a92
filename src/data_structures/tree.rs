//! A destructible tree and its GPU representation.

use cgmath::Point3;
use wgpu::util::DeviceExt;

use crate::{
    context::InitContext,
    data_structures::{
        bounds::BoundingBox,
        instance::Instance,
        model::Model,
        registry::{ModelLoader, Placement},
        shape::{self, ShapeBuffer},
    },
    render::{Instanced, Render, Shape},
    resources,
};

/// One tree in the scene. Position, scale and box are fixed at creation;
/// only the registry index changes, and only through the registry.
#[derive(Debug)]
pub struct Tree<M> {
    model: M,
    position: Point3<f32>,
    scale: f32,
    bounding_box: BoundingBox,
    index: usize,
}

impl<M> Tree<M> {
    pub(super) fn new(model: M, placement: Placement, index: usize) -> Self {
        Self {
            model,
            position: placement.position,
            scale: placement.scale,
            bounding_box: placement.bounding_box,
            index,
        }
    }

    pub(super) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    /// Current offset in the owning registry.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Everything the GPU needs to draw one tree: its model, a single-instance
/// buffer holding the placement and the red outline of its collision box.
#[derive(Debug)]
pub struct TreeModel {
    pub model: Model,
    pub instance_buffer: wgpu::Buffer,
    pub outline: ShapeBuffer,
}

impl Tree<TreeModel> {
    /// The mesh at the tree's placement followed by its box as a wireframe.
    pub fn draw(&self) -> Render<'_> {
        Render::Composed(vec![
            Render::Default(Instanced {
                instance: &self.model.instance_buffer,
                model: &self.model.model,
                amount: 1,
            }),
            Render::Wire(Shape {
                vertex: &self.model.outline.buffer,
                amount: self.model.outline.amount,
            }),
        ])
    }
}

impl<'a> From<&'a Tree<TreeModel>> for Render<'a> {
    fn from(tree: &'a Tree<TreeModel>) -> Self {
        tree.draw()
    }
}

/// Loads tree models onto the GPU.
pub struct GpuTreeLoader {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl GpuTreeLoader {
    pub fn new(ctx: &InitContext) -> Self {
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
        }
    }
}

impl ModelLoader for GpuTreeLoader {
    type Model = TreeModel;

    async fn load(&self, path: &str, placement: &Placement) -> anyhow::Result<TreeModel> {
        let model = resources::load_model(path, &self.device, &self.queue).await?;

        let instance = Instance::placed(placement.position, placement.scale).to_raw();
        let instance_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Tree Instance Buffer"),
                contents: bytemuck::cast_slice(&[instance]),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let outline = ShapeBuffer::new(
            &self.device,
            "Tree Outline",
            &shape::wire_box(&placement.bounding_box, shape::palette::red()),
        );

        Ok(TreeModel {
            model,
            instance_buffer,
            outline,
        })
    }
}
