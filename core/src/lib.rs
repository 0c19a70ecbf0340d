//! Content-based title recommendations.
//!
//! Offline, catalog records become feature documents ([`features`]), are
//! fitted into a tf-idf model ([`vectorizer`], [`model`]) and saved as one
//! artifact ([`persist`]). At serving time the artifact is loaded into a
//! [`Recommender`], which resolves free-text titles ([`resolver`]) and ranks
//! cosine neighbours ([`similarity`]).

pub mod catalog;
pub mod error;
pub mod features;
pub mod handle;
pub mod model;
pub mod persist;
pub mod resolver;
pub mod similarity;
pub mod tokenizer;
pub mod vectorizer;

pub use catalog::{Catalog, CatalogItem, CatalogRecord};
pub use error::{Error, Result};
pub use features::{FeatureBuilder, FeatureConfig};
pub use handle::{ModelHandle, Recommender};
pub use model::{TrainedModel, SCHEMA_VERSION};
pub use persist::{load_model, save_model};
pub use resolver::{Resolution, ResolverConfig, TitleResolver};
pub use similarity::Neighbor;
pub use vectorizer::{FeatureMatrix, SparseVector, Vectorizer, VectorizerConfig, Vocabulary};
