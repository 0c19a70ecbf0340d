use crate::tokenizer::{document_tokens, is_stopword};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub type TermId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorizerConfig {
    /// Tokens found in fewer documents than this are dropped from the vocabulary.
    pub min_df: u32,
    /// Drop common English words before counting.
    pub stop_words: bool,
}

impl Default for VectorizerConfig {
    fn default() -> Self { Self { min_df: 1, stop_words: true } }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TermEntry {
    pub index: TermId,
    pub idf: f32,
}

/// Token -> column and idf weight. Columns follow lexicographic token order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    terms: BTreeMap<String, TermEntry>,
}

impl Vocabulary {
    pub fn len(&self) -> usize { self.terms.len() }
    pub fn is_empty(&self) -> bool { self.terms.is_empty() }
    pub fn get(&self, token: &str) -> Option<&TermEntry> { self.terms.get(token) }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TermEntry)> {
        self.terms.iter().map(|(t, e)| (t.as_str(), e))
    }

    /// Columns must be exactly `0..len` in token order.
    pub(crate) fn is_well_formed(&self) -> bool {
        self.terms.values().enumerate().all(|(i, e)| e.index as usize == i && e.idf.is_finite() && e.idf > 0.0)
    }
}

/// Sparse row: strictly increasing column indices with matching weights.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub indices: Vec<TermId>,
    pub values: Vec<f32>,
}

impl SparseVector {
    pub fn nnz(&self) -> usize { self.indices.len() }

    pub fn norm(&self) -> f32 {
        self.values.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    /// Dot product over the shared columns.
    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (mut i, mut j) = (0, 0);
        let mut acc = 0.0f32;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    acc += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        acc
    }

    fn normalize(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            for v in self.values.iter_mut() { *v /= norm; }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    pub num_cols: usize,
    pub rows: Vec<SparseVector>,
}

impl FeatureMatrix {
    pub fn num_rows(&self) -> usize { self.rows.len() }
    pub fn row(&self, i: usize) -> Option<&SparseVector> { self.rows.get(i) }
}

#[derive(Debug, Clone, Default)]
pub struct Vectorizer {
    config: VectorizerConfig,
}

impl Vectorizer {
    pub fn new(config: VectorizerConfig) -> Self { Self { config } }

    pub fn config(&self) -> &VectorizerConfig { &self.config }

    fn keep(&self, token: &str) -> bool {
        !(self.config.stop_words && is_stopword(token))
    }

    /// Learn the vocabulary and idf weights over `documents` and return one
    /// L2-normalized tf-idf row per document, in input order.
    pub fn fit<S: AsRef<str>>(&self, documents: &[S]) -> Result<(Vocabulary, FeatureMatrix)> {
        if documents.is_empty() {
            return Err(Error::EmptyCorpus("no documents to fit".into()));
        }

        // Document frequency per surviving token.
        let mut df: BTreeMap<&str, u32> = BTreeMap::new();
        for doc in documents {
            let mut seen: Vec<&str> = document_tokens(doc.as_ref()).filter(|t| self.keep(t)).collect();
            seen.sort_unstable();
            seen.dedup();
            for t in seen {
                *df.entry(t).or_insert(0) += 1;
            }
        }

        let n = documents.len() as f64;
        let mut terms = BTreeMap::new();
        for (token, count) in df.into_iter().filter(|(_, c)| *c >= self.config.min_df) {
            let idf = ((1.0 + n) / (1.0 + count as f64)).ln() + 1.0;
            let index = terms.len() as TermId;
            terms.insert(token.to_string(), TermEntry { index, idf: idf as f32 });
        }
        if terms.is_empty() {
            return Err(Error::EmptyCorpus(format!("all {} documents are empty after filtering", documents.len())));
        }
        let vocabulary = Vocabulary { terms };

        let rows: Vec<SparseVector> = documents.iter().map(|d| self.vectorize(&vocabulary, d.as_ref())).collect();
        let empty_rows = rows.iter().filter(|r| r.nnz() == 0).count();
        tracing::info!(num_docs = rows.len(), num_terms = vocabulary.len(), empty_rows, "fitted vectorizer");

        let num_cols = vocabulary.len();
        Ok((vocabulary, FeatureMatrix { num_cols, rows }))
    }

    /// Vectorize one document against an already fitted vocabulary. Unknown
    /// tokens are dropped.
    pub fn transform(&self, vocabulary: &Vocabulary, document: &str) -> SparseVector {
        self.vectorize(vocabulary, document)
    }

    fn vectorize(&self, vocabulary: &Vocabulary, document: &str) -> SparseVector {
        let mut tf: HashMap<TermId, (u32, f32)> = HashMap::new();
        for token in document_tokens(document).filter(|t| self.keep(t)) {
            if let Some(entry) = vocabulary.get(token) {
                tf.entry(entry.index).or_insert((0, entry.idf)).0 += 1;
            }
        }
        let mut weighted: Vec<(TermId, f32)> = tf.into_iter().map(|(id, (count, idf))| (id, count as f32 * idf)).collect();
        weighted.sort_unstable_by_key(|(id, _)| *id);
        let mut v = SparseVector {
            indices: weighted.iter().map(|(id, _)| *id).collect(),
            values: weighted.iter().map(|(_, w)| *w).collect(),
        };
        v.normalize();
        v
    }
}
