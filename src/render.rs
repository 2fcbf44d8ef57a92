//! Render composition and pipeline batching.
//!
//! Scene objects describe themselves as a [`Render`] each frame. The event
//! loop flattens those descriptions into one batch per pipeline and draws the
//! batches in a fixed order: solid shapes, textured models, wireframes and
//! finally the screen overlay.
//!
//! # Key types
//!
//! - [`Render<'a>`] is the enum describing render operations
//! - [`Instanced<'a>`] contains data for instanced rendering (model + instance buffer)
//! - [`Shape<'a>`] is a plain buffer of [`crate::data_structures::shape::ColorVertex`]

use crate::data_structures::model::Model;

/// Data for instanced object rendering: a model and its instance buffer.
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub model: &'a Model,
    pub amount: usize,
}

/// Non-indexed coloured vertices.
pub struct Shape<'a> {
    pub vertex: &'a wgpu::Buffer,
    pub amount: usize,
}

/// Specifies how a scene object should be rendered.
///
/// # Variants
///
/// - `None` renders nothing
/// - `Default(Instanced)` renders a single textured instanced object
/// - `Solid(Shape)` renders flat-coloured triangles in world space
/// - `Wire(Shape)` renders flat-coloured lines in world space
/// - `Overlay(Shape)` renders lines in clip space on top of the scene
/// - `Composed(Vec<Render>)` recursively renders composition of multiple renders
pub enum Render<'a> {
    None,
    Default(Instanced<'a>),
    Solid(Shape<'a>),
    Wire(Shape<'a>),
    Overlay(Shape<'a>),
    Composed(Vec<Render<'a>>),
}

/// Per-pipeline draw lists for one frame.
#[derive(Default)]
pub struct Batches<'a> {
    pub models: Vec<Instanced<'a>>,
    pub solids: Vec<Shape<'a>>,
    pub wires: Vec<Shape<'a>>,
    pub overlays: Vec<Shape<'a>>,
}

impl<'a> Render<'a> {
    /// Sort `self` into the batch of the pipeline that draws it.
    pub(crate) fn set_pipelines(self, batches: &mut Batches<'a>) {
        match self {
            Render::Default(instanced) => batches.models.push(instanced),
            Render::Solid(shape) => batches.solids.push(shape),
            Render::Wire(shape) => batches.wires.push(shape),
            Render::Overlay(shape) => batches.overlays.push(shape),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.set_pipelines(batches)),
            Render::None => (),
        }
    }
}

impl<'a, T> From<Vec<T>> for Render<'a>
where
    T: Into<Render<'a>>,
{
    fn from(renders: Vec<T>) -> Self {
        Render::Composed(renders.into_iter().map(Into::into).collect())
    }
}

impl<'a> From<&'a crate::data_structures::shape::ShapeBuffer> for Render<'a> {
    fn from(shape: &'a crate::data_structures::shape::ShapeBuffer) -> Self {
        Render::Solid(Shape {
            vertex: &shape.buffer,
            amount: shape.amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_nothing_fills_no_batch() {
        let mut batches = Batches::default();
        Render::Composed(vec![Render::None, vec![Render::None, Render::None].into()])
            .set_pipelines(&mut batches);

        assert!(batches.models.is_empty());
        assert!(batches.solids.is_empty());
        assert!(batches.wires.is_empty());
        assert!(batches.overlays.is_empty());
    }
}
