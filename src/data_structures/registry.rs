//! The tree registry: an ordered, capacity-bounded list of destructible trees.
//!
//! Every tree remembers its offset in the list (`Tree::index`). Removal
//! compacts the list and rewrites the index of every tree that moved, so the
//! recorded index and the real offset never disagree.
//!
//! Trees own their model. Dropping a tree (through [`TreeRegistry::remove`],
//! [`TreeRegistry::remove_all`] or dropping the registry) releases the model
//! exactly once.

use std::future::Future;

use cgmath::Point3;
use serde::Deserialize;
use thiserror::Error;

use crate::data_structures::{bounds::BoundingBox, tree::Tree};

/// Size of the scene's tree array before growth was made configurable.
pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to load tree model {path}")]
    ResourceLoad {
        path: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("tree registry is full ({capacity} trees)")]
    CapacityExceeded { capacity: usize },
    #[error("no tree at index {index} (registry holds {len})")]
    InvalidIndex { index: usize, len: usize },
    #[error("tree scale must be a positive number, got {scale}")]
    InvalidScale { scale: f32 },
}

/// How many trees a registry accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capacity {
    Fixed(usize),
    Unbounded,
}

impl Default for Capacity {
    fn default() -> Self {
        Capacity::Fixed(DEFAULT_CAPACITY)
    }
}

/// Where a tree goes, handed to the [`ModelLoader`] so it can prepare
/// placement dependent resources alongside the mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub position: Point3<f32>,
    pub scale: f32,
    pub bounding_box: BoundingBox,
}

/// Loads the renderable model a tree owns.
///
/// The GPU implementation lives in [`crate::data_structures::tree::GpuTreeLoader`];
/// anything else (e.g. a test double) works as long as it owns its resources
/// and releases them on drop.
pub trait ModelLoader {
    type Model;

    fn load(
        &self,
        path: &str,
        placement: &Placement,
    ) -> impl Future<Output = anyhow::Result<Self::Model>>;
}

#[derive(Debug)]
pub struct TreeRegistry<M> {
    trees: Vec<Tree<M>>,
    capacity: Capacity,
}

impl<M> TreeRegistry<M> {
    pub fn new(capacity: Capacity) -> Self {
        let trees = match capacity {
            Capacity::Fixed(max) => Vec::with_capacity(max),
            Capacity::Unbounded => Vec::new(),
        };
        Self { trees, capacity }
    }

    /// Load a model and append a tree standing at `position`.
    ///
    /// The registry is left untouched if the registry is full, the scale is
    /// invalid or the model fails to load.
    pub async fn create<L>(
        &mut self,
        loader: &L,
        model_path: &str,
        position: Point3<f32>,
        scale: f32,
    ) -> Result<&Tree<M>, RegistryError>
    where
        L: ModelLoader<Model = M>,
    {
        if let Capacity::Fixed(capacity) = self.capacity {
            if self.trees.len() >= capacity {
                return Err(RegistryError::CapacityExceeded { capacity });
            }
        }
        if !(scale.is_finite() && scale > 0.0) {
            return Err(RegistryError::InvalidScale { scale });
        }

        let placement = Placement {
            position,
            scale,
            bounding_box: BoundingBox::for_tree(position, scale),
        };
        let model = loader
            .load(model_path, &placement)
            .await
            .map_err(|source| RegistryError::ResourceLoad {
                path: model_path.to_string(),
                source,
            })?;

        let index = self.trees.len();
        self.trees.push(Tree::new(model, placement, index));
        log::debug!(
            "Planted tree {} at {:?} (scale {})",
            index,
            position,
            scale
        );
        Ok(&self.trees[index])
    }

    /// Release the tree at `index` and close the gap.
    ///
    /// Survivors keep their relative order. Every tree behind the removed one
    /// moves one slot forward and has its index rewritten. An out-of-range
    /// index changes nothing and is reported as [`RegistryError::InvalidIndex`].
    pub fn remove(&mut self, index: usize) -> Result<(), RegistryError> {
        let len = self.trees.len();
        if index >= len {
            return Err(RegistryError::InvalidIndex { index, len });
        }

        drop(self.trees.remove(index));

        for (offset, tree) in self.trees.iter_mut().enumerate().skip(index) {
            tree.set_index(offset);
        }
        Ok(())
    }

    /// Release every tree. Used on teardown.
    pub fn remove_all(&mut self) {
        let count = self.trees.len();
        self.trees.clear();
        if count > 0 {
            log::debug!("Released {} trees", count);
        }
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&Tree<M>> {
        self.trees.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tree<M>> {
        self.trees.iter()
    }
}

impl<M> Default for TreeRegistry<M> {
    fn default() -> Self {
        Self::new(Capacity::default())
    }
}

impl<'a, M> IntoIterator for &'a TreeRegistry<M> {
    type Item = &'a Tree<M>;
    type IntoIter = std::slice::Iter<'a, Tree<M>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
