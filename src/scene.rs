//! The forest: a walled ground plane with trees that fall when clicked.

use cgmath::{Deg, Point3};
use instant::Duration;
use winit::event::{DeviceEvent, WindowEvent};

use crate::{
    camera::{Camera, CameraController, Ray},
    config::SceneConfig,
    context::{Context, InitContext},
    data_structures::{
        registry::{RegistryError, TreeRegistry},
        shape::{self, ShapeBuffer, palette},
        tree::{GpuTreeLoader, TreeModel},
    },
    flow::{FlowConstructor, GraphicsFlow, Out},
    pick::{self, PickStrategy},
    render::Render,
};

/// Side length of the square ground plane.
pub const GROUND_SIZE: f32 = 32.0;
pub const WALL_HEIGHT: f32 = 5.0;

/// Ground and the three walls as one triangle list:
/// blue at x = -16, lime at x = +16 and gold at z = +16.
pub fn world_geometry() -> Vec<shape::ColorVertex> {
    let half = GROUND_SIZE / 2.0;
    let wall_y = WALL_HEIGHT / 2.0;
    let mut vertices = shape::plane(
        Point3::new(0.0, 0.0, 0.0),
        [GROUND_SIZE, GROUND_SIZE],
        palette::light_gray(),
    );
    vertices.extend(shape::cuboid(
        Point3::new(-half, wall_y, 0.0),
        [1.0, WALL_HEIGHT, GROUND_SIZE],
        palette::blue(),
    ));
    vertices.extend(shape::cuboid(
        Point3::new(half, wall_y, 0.0),
        [1.0, WALL_HEIGHT, GROUND_SIZE],
        palette::lime(),
    ));
    vertices.extend(shape::cuboid(
        Point3::new(0.0, wall_y, half),
        [GROUND_SIZE, WALL_HEIGHT, 1.0],
        palette::gold(),
    ));
    vertices
}

pub struct Forest {
    config: SceneConfig,
    trees: TreeRegistry<TreeModel>,
    world: ShapeBuffer,
}

impl Forest {
    /// Plant every configured tree. Any failure is fatal for the scene.
    pub async fn new(ctx: InitContext, config: SceneConfig) -> Result<Self, RegistryError> {
        let loader = GpuTreeLoader::new(&ctx);
        let mut trees = TreeRegistry::new(config.capacity);
        for placement in &config.trees {
            trees
                .create(&loader, &config.model, placement.point(), placement.scale)
                .await?;
        }
        log::info!("Planted {} trees from {}", trees.len(), config.model);

        let world = ShapeBuffer::new(&ctx.device, "World Geometry", &world_geometry());
        Ok(Self {
            config,
            trees,
            world,
        })
    }

    /// A [`FlowConstructor`] for [`run`](crate::flow::run).
    pub fn constructor(config: SceneConfig) -> FlowConstructor {
        Box::new(move |ctx| {
            Box::pin(async move {
                let forest = Forest::new(ctx, config).await?;
                Ok(Box::new(forest) as Box<dyn GraphicsFlow>)
            })
        })
    }

    pub fn trees(&self) -> &TreeRegistry<TreeModel> {
        &self.trees
    }

    pub fn pick_strategy(&self) -> PickStrategy {
        self.config.pick
    }
}

impl GraphicsFlow for Forest {
    fn on_init(&mut self, ctx: &mut Context) -> Out {
        let camera = &self.config.camera;
        ctx.camera.camera = Camera::looking_at(camera.position, camera.target);
        ctx.camera.controller = CameraController::new(camera.speed, camera.sensitivity);
        ctx.projection = crate::camera::Projection::new(
            ctx.config.width,
            ctx.config.height,
            Deg(camera.fovy_degrees),
            0.1,
            500.0,
        );
        ctx.clear_colour = shape::to_wgpu_color(palette::ray_white());
        ctx.target_fps = self.config.target_fps;
        ctx.show_fps = self.config.show_fps;
        // First person: the mouse turns the head right away.
        ctx.set_cursor_grab(true);
        Out::Empty
    }

    fn on_click(&mut self, _ctx: &Context, ray: &Ray) -> Out {
        if pick::pick_and_remove(&mut self.trees, ray, self.config.pick).is_none() {
            log::debug!("Click hit no tree");
        }
        Out::Empty
    }

    fn on_update(&mut self, _ctx: &Context, _dt: Duration) -> Out {
        Out::Empty
    }

    fn on_device_events(&mut self, _ctx: &Context, _event: &DeviceEvent) -> Out {
        Out::Empty
    }

    fn on_window_events(&mut self, _ctx: &Context, event: &WindowEvent) -> Out {
        if let WindowEvent::CloseRequested = event {
            self.trees.remove_all();
        }
        Out::Empty
    }

    fn on_render(&self) -> Render<'_> {
        Render::Composed(vec![
            (&self.world).into(),
            self.trees.iter().map(|tree| tree.draw()).collect::<Vec<_>>().into(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_is_a_plane_and_three_walls() {
        let vertices = world_geometry();
        assert_eq!(vertices.len(), 6 + 3 * 36);
        let blue = palette::blue();
        let blue_wall: Vec<_> = vertices.iter().filter(|v| v.color == blue).collect();
        assert_eq!(blue_wall.len(), 36);
        assert!(blue_wall.iter().all(|v| (v.position[0] + 16.0).abs() <= 0.5));
        assert!(blue_wall.iter().all(|v| v.position[1] >= 0.0 && v.position[1] <= 5.0));
    }
}
