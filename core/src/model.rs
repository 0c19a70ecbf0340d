use crate::catalog::{Catalog, CatalogItem};
use crate::features::FeatureConfig;
use crate::vectorizer::{FeatureMatrix, Vectorizer, VectorizerConfig, Vocabulary};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bumped whenever the serialized layout of [`TrainedModel`] changes.
pub const SCHEMA_VERSION: u32 = 2;

const NORM_TOLERANCE: f32 = 1e-3;

/// Everything the serving side needs, fitted offline and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub features: FeatureConfig,
    pub vectorizer: VectorizerConfig,
    pub vocabulary: Vocabulary,
    pub matrix: FeatureMatrix,
    /// Row `i` of `matrix` describes `items[i]`.
    pub items: Vec<CatalogItem>,
    pub id_to_row: BTreeMap<String, usize>,
}

impl TrainedModel {
    /// Fit a model over a validated catalog. Row order follows catalog order.
    pub fn fit(catalog: Catalog, features: FeatureConfig, config: VectorizerConfig) -> Result<Self> {
        let vectorizer = Vectorizer::new(config);
        let items = catalog.into_items();
        let documents: Vec<&str> = items.iter().map(|i| i.document.as_str()).collect();
        let (vocabulary, matrix) = vectorizer.fit(&documents)?;
        let id_to_row = items.iter().enumerate().map(|(row, item)| (item.id.clone(), row)).collect();
        Ok(Self { features, vectorizer: vectorizer.config().clone(), vocabulary, matrix, items, id_to_row })
    }

    pub fn num_rows(&self) -> usize { self.items.len() }

    pub fn item(&self, row: usize) -> Option<&CatalogItem> { self.items.get(row) }

    pub fn row_of(&self, id: &str) -> Option<usize> { self.id_to_row.get(id).copied() }

    /// Structural checks run on every loaded artifact. Returns the first
    /// violation found.
    pub fn check_structure(&self) -> std::result::Result<(), String> {
        let rows = self.matrix.num_rows();
        if rows != self.items.len() {
            return Err(format!("matrix has {rows} rows but {} items", self.items.len()));
        }
        if rows != self.id_to_row.len() {
            return Err(format!("matrix has {rows} rows but index has {} entries", self.id_to_row.len()));
        }
        if self.matrix.num_cols != self.vocabulary.len() {
            return Err(format!("matrix has {} columns but vocabulary has {} terms", self.matrix.num_cols, self.vocabulary.len()));
        }
        if !self.vocabulary.is_well_formed() {
            return Err("vocabulary columns are not contiguous".into());
        }
        for (id, &row) in &self.id_to_row {
            match self.items.get(row) {
                Some(item) if item.id == *id => {}
                _ => return Err(format!("index entry '{id}' points at row {row}, which holds a different item")),
            }
        }
        for (i, r) in self.matrix.rows.iter().enumerate() {
            if r.indices.len() != r.values.len() {
                return Err(format!("row {i} has mismatched index/value lengths"));
            }
            if !r.indices.windows(2).all(|w| w[0] < w[1]) {
                return Err(format!("row {i} columns are not strictly increasing"));
            }
            if r.indices.last().is_some_and(|&c| c as usize >= self.matrix.num_cols) {
                return Err(format!("row {i} references a column past {}", self.matrix.num_cols));
            }
            if r.values.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(format!("row {i} holds a negative or non-finite weight"));
            }
            if r.nnz() > 0 && (r.norm() - 1.0).abs() >= NORM_TOLERANCE {
                return Err(format!("row {i} has norm {} instead of 1", r.norm()));
            }
        }
        Ok(())
    }
}
