use std::{cell::RefCell, rc::Rc};

use anyhow::bail;
use fell_ngin::{
    Point3, Vector3,
    camera::Ray,
    data_structures::registry::{ModelLoader, Placement, TreeRegistry},
};
#[cfg(feature = "integration-tests")]
use fell_ngin::{
    DeviceEvent, WindowEvent,
    config::SceneConfig,
    context::Context,
    flow::{FlowConstructor, GraphicsFlow, Out},
    render::Render,
    scene::Forest,
};

/// Records which models were released, in order.
#[derive(Clone, Default)]
pub(crate) struct ReleaseLog(Rc<RefCell<Vec<usize>>>);

impl ReleaseLog {
    pub fn released(&self) -> Vec<usize> {
        self.0.borrow().clone()
    }

    pub fn times_released(&self, id: usize) -> usize {
        self.0.borrow().iter().filter(|&&r| r == id).count()
    }
}

/// Stands in for a GPU model. Dropping it counts as releasing it.
#[derive(Debug)]
pub(crate) struct FakeModel {
    pub id: usize,
    pub path: String,
    log: Rc<RefCell<Vec<usize>>>,
}

impl Drop for FakeModel {
    fn drop(&mut self) {
        self.log.borrow_mut().push(self.id);
    }
}

/// Hands out numbered [`FakeModel`]s. Paths containing "missing" fail to load.
#[derive(Default)]
pub(crate) struct FakeLoader {
    pub log: ReleaseLog,
    loaded: RefCell<Vec<Placement>>,
}

impl FakeLoader {
    pub fn loads(&self) -> usize {
        self.loaded.borrow().len()
    }

    pub fn placements(&self) -> Vec<Placement> {
        self.loaded.borrow().clone()
    }
}

impl ModelLoader for FakeLoader {
    type Model = FakeModel;

    async fn load(&self, path: &str, placement: &Placement) -> anyhow::Result<FakeModel> {
        if path.contains("missing") {
            bail!("no such file: {path}");
        }
        let mut loaded = self.loaded.borrow_mut();
        loaded.push(*placement);
        Ok(FakeModel {
            id: loaded.len() - 1,
            path: path.to_string(),
            log: self.log.0.clone(),
        })
    }
}

pub(crate) const TREE: &str = "models/tree.obj";

/// Plant a unit-scale tree at every position, in order.
pub(crate) fn plant(
    registry: &mut TreeRegistry<FakeModel>,
    loader: &FakeLoader,
    trees: &[([f32; 3], f32)],
) {
    for (position, scale) in trees {
        futures::executor::block_on(registry.create(
            loader,
            TREE,
            Point3::from(*position),
            *scale,
        ))
        .expect("planting a tree");
    }
}

/// X coordinates of the live trees, in registry order.
pub(crate) fn xs(registry: &TreeRegistry<FakeModel>) -> Vec<f32> {
    registry.iter().map(|tree| tree.position().x).collect()
}

pub(crate) fn assert_indices_match_offsets(registry: &TreeRegistry<FakeModel>) {
    for (offset, tree) in registry.iter().enumerate() {
        assert_eq!(tree.index(), offset, "tree at offset {offset} has a stale index");
    }
}

/// The ray a player standing at the default spawn point shoots straight ahead.
pub(crate) fn ray_ahead_from_spawn() -> Ray {
    Ray::new(Point3::new(0.0, 2.0, 4.0), Vector3::new(0.0, 0.0, -1.0))
}

/// Runs a [`Forest`] for a number of frames, then closes it like the window's
/// close button would and stops the event loop.
///
/// `counts` receives the number of live trees before the close, after it and
/// after a second close.
#[cfg(feature = "integration-tests")]
pub(crate) struct ClosingForest {
    forest: Forest,
    frames: u32,
    limit: u32,
    counts: Rc<RefCell<Vec<usize>>>,
}

#[cfg(feature = "integration-tests")]
impl ClosingForest {
    pub(crate) fn constructor(
        config: SceneConfig,
        limit: u32,
        counts: Rc<RefCell<Vec<usize>>>,
    ) -> FlowConstructor {
        Box::new(move |ctx| {
            Box::pin(async move {
                let forest = Forest::new(ctx, config).await?;
                Ok(Box::new(ClosingForest {
                    forest,
                    frames: 0,
                    limit,
                    counts,
                }) as Box<dyn GraphicsFlow>)
            })
        })
    }
}

#[cfg(feature = "integration-tests")]
impl GraphicsFlow for ClosingForest {
    fn on_init(&mut self, ctx: &mut Context) -> Out {
        let out = self.forest.on_init(ctx);
        // Run unthrottled so the test is quick.
        ctx.target_fps = 0;
        out
    }

    fn on_click(&mut self, ctx: &Context, ray: &Ray) -> Out {
        self.forest.on_click(ctx, ray)
    }

    fn on_update(&mut self, ctx: &Context, dt: std::time::Duration) -> Out {
        self.frames += 1;
        if self.frames < self.limit {
            return self.forest.on_update(ctx, dt);
        }
        let mut counts = self.counts.borrow_mut();
        counts.push(self.forest.trees().len());
        self.forest.on_window_events(ctx, &WindowEvent::CloseRequested);
        counts.push(self.forest.trees().len());
        self.forest.on_window_events(ctx, &WindowEvent::CloseRequested);
        counts.push(self.forest.trees().len());
        Out::Exit
    }

    fn on_device_events(&mut self, ctx: &Context, event: &DeviceEvent) -> Out {
        self.forest.on_device_events(ctx, event)
    }

    fn on_window_events(&mut self, ctx: &Context, event: &WindowEvent) -> Out {
        self.forest.on_window_events(ctx, event)
    }

    fn on_render(&self) -> Render<'_> {
        self.forest.on_render()
    }
}
