use crate::catalog::CatalogItem;
use crate::model::TrainedModel;
use crate::persist::load_model;
use crate::resolver::{Resolution, ResolverConfig, TitleResolver};
use crate::similarity::{self, Neighbor};
use crate::Result;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;

/// A loaded model together with its title index. Immutable once built.
#[derive(Debug)]
pub struct Recommender {
    model: TrainedModel,
    resolver: TitleResolver,
}

impl Recommender {
    pub fn new(model: TrainedModel, config: ResolverConfig) -> Self {
        let resolver = TitleResolver::new(&model.items, config);
        Self { model, resolver }
    }

    pub fn load(path: &Path, config: ResolverConfig) -> Result<Self> {
        Ok(Self::new(load_model(path)?, config))
    }

    pub fn model(&self) -> &TrainedModel { &self.model }

    pub fn item(&self, row: usize) -> Option<&CatalogItem> { self.model.item(row) }

    pub fn item_by_id(&self, id: &str) -> Option<&CatalogItem> {
        self.model.row_of(id).and_then(|row| self.model.item(row))
    }

    pub fn resolve(&self, title: &str) -> Result<Resolution> { self.resolver.resolve(title) }

    pub fn recommend(&self, row: usize, n: i64) -> Result<Vec<Neighbor>> { similarity::top_n(&self.model, row, n) }

    pub fn similarity(&self, a: usize, b: usize) -> Result<f32> { similarity::similarity(&self.model, a, b) }
}

/// Process-wide pointer to the current [`Recommender`]. Readers take a
/// snapshot and keep using it even if a newer model is swapped in meanwhile.
#[derive(Debug, Clone)]
pub struct ModelHandle {
    current: Arc<RwLock<Arc<Recommender>>>,
}

impl ModelHandle {
    pub fn new(recommender: Recommender) -> Self {
        Self { current: Arc::new(RwLock::new(Arc::new(recommender))) }
    }

    pub fn snapshot(&self) -> Arc<Recommender> { self.current.read().clone() }

    /// Replace the current model wholesale; returns the previous one.
    pub fn swap(&self, next: Recommender) -> Arc<Recommender> {
        let next = Arc::new(next);
        let rows = next.model().num_rows();
        let prev = std::mem::replace(&mut *self.current.write(), next);
        tracing::info!(rows, "swapped in new model");
        prev
    }

    /// Load the artifact at `path` and swap it in. On any error the current
    /// model stays in place.
    pub fn reload(&self, path: &Path, config: ResolverConfig) -> Result<Arc<Recommender>> {
        let next = Recommender::load(path, config)?;
        Ok(self.swap(next))
    }
}
