//! Free-text title lookup.
//!
//! A query is normalized (see [`normalize_title`]) and matched in three steps,
//! first hit wins: exact title, exact alternate title, then the best fuzzy
//! candidate above [`ResolverConfig::threshold`]. Equal candidates are ordered
//! by vote count (higher first) and then by id.

use crate::catalog::CatalogItem;
use crate::tokenizer::normalize_title;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Fuzzy matches must score strictly above this.
    pub threshold: f64,
    /// Shorter queries never match by containment alone.
    pub min_substring_len: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self { Self { threshold: 0.6, min_substring_len: 3 } }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub id: String,
    pub row: usize,
}

#[derive(Debug, Clone)]
struct Entry {
    id: String,
    vote_count: u64,
    title: String,
    alternate: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TitleResolver {
    config: ResolverConfig,
    entries: Vec<Entry>,
    by_title: HashMap<String, Vec<usize>>,
    by_alternate: HashMap<String, Vec<usize>>,
}

impl TitleResolver {
    /// Index the titles of `items`; entry `i` resolves to row `i`.
    pub fn new(items: &[CatalogItem], config: ResolverConfig) -> Self {
        let mut by_title: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_alternate: HashMap<String, Vec<usize>> = HashMap::new();
        let entries: Vec<Entry> = items
            .iter()
            .enumerate()
            .map(|(row, item)| {
                let title = normalize_title(&item.title);
                let alternate = item.alternate_title.as_deref().map(normalize_title).filter(|t| !t.is_empty());
                by_title.entry(title.clone()).or_default().push(row);
                if let Some(alt) = &alternate {
                    by_alternate.entry(alt.clone()).or_default().push(row);
                }
                Entry { id: item.id.clone(), vote_count: item.vote_count, title, alternate }
            })
            .collect();
        Self { config, entries, by_title, by_alternate }
    }

    pub fn config(&self) -> &ResolverConfig { &self.config }

    pub fn resolve(&self, query: &str) -> Result<Resolution> {
        let q = normalize_title(query);
        if q.is_empty() {
            return Err(Error::InvalidQuery { query: query.to_string(), reason: "query is empty after normalization".into() });
        }

        for (step, index) in [("title", &self.by_title), ("alternate_title", &self.by_alternate)] {
            if let Some(rows) = index.get(&q) {
                if let Some(&row) = rows.iter().min_by(|a, b| self.rank(**a, **b)) {
                    tracing::debug!(query = %q, step, row, "resolved exactly");
                    return Ok(self.resolution(row));
                }
            }
        }

        let mut best: Option<(usize, f64)> = None;
        for (row, entry) in self.entries.iter().enumerate() {
            let floor = best.map_or(self.config.threshold, |(_, s)| s);
            let titles = std::iter::once(entry.title.as_str()).chain(entry.alternate.as_deref());
            let score = titles.map(|t| self.fuzzy_score(&q, t, floor)).fold(0.0f64, f64::max);
            if score <= self.config.threshold {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_row, best_score)) => score
                    .total_cmp(&best_score)
                    .reverse()
                    .then_with(|| self.rank(row, best_row))
                    .is_lt(),
            };
            if better {
                best = Some((row, score));
            }
        }

        match best {
            Some((row, score)) => {
                tracing::debug!(query = %q, row, score, "resolved by fuzzy match");
                Ok(self.resolution(row))
            }
            None => Err(Error::NotFound { query: q }),
        }
    }

    fn resolution(&self, row: usize) -> Resolution {
        Resolution { id: self.entries[row].id.clone(), row }
    }

    /// Tie order between two rows: more votes first, then the smaller id.
    fn rank(&self, a: usize, b: usize) -> Ordering {
        let (ea, eb) = (&self.entries[a], &self.entries[b]);
        eb.vote_count.cmp(&ea.vote_count).then_with(|| ea.id.cmp(&eb.id))
    }

    /// Best of edit-distance ratio and containment. Returns 0 early when the
    /// length gap alone rules out beating `floor` by edit distance and the
    /// query is not contained in the title.
    fn fuzzy_score(&self, query: &str, title: &str, floor: f64) -> f64 {
        let containment = self.containment(query, title);
        let (lq, lt) = (query.chars().count(), title.chars().count());
        let longest = lq.max(lt);
        if longest == 0 {
            return containment;
        }
        let ceiling = 1.0 - lq.abs_diff(lt) as f64 / longest as f64;
        if ceiling < floor {
            return containment;
        }
        containment.max(levenshtein_ratio(query, title))
    }

    fn containment(&self, query: &str, title: &str) -> f64 {
        let lq = query.chars().count();
        if lq < self.config.min_substring_len || !title.contains(query) {
            return 0.0;
        }
        let lt = title.chars().count().max(1);
        0.75 + 0.25 * (lq as f64 / lt as f64)
    }
}

pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev_row: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr_row = vec![0; b_chars.len() + 1];
    for (i, ca) in a.chars().enumerate() {
        curr_row[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr_row[j + 1] = (curr_row[j] + 1).min(prev_row[j + 1] + 1).min(prev_row[j] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }
    prev_row[b_chars.len()]
}

/// `1 - distance / longer length`, in [0, 1]; two empty strings score 1.
pub fn levenshtein_ratio(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein_distance(a, b) as f64 / longest as f64
}
