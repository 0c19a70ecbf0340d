use crate::catalog::tie_break;
use crate::model::TrainedModel;
use crate::{Error, Result};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbor {
    pub id: String,
    pub title: String,
    pub score: f32,
}

fn check_row(model: &TrainedModel, row: usize) -> Result<()> {
    if row >= model.num_rows() {
        return Err(Error::invalid_parameter("row", row, format!("catalog has {} rows", model.num_rows())));
    }
    Ok(())
}

/// Cosine similarity between two rows. Rows are unit length, so this is the
/// dot product.
pub fn similarity(model: &TrainedModel, a: usize, b: usize) -> Result<f32> {
    check_row(model, a)?;
    check_row(model, b)?;
    Ok(model.matrix.rows[a].dot(&model.matrix.rows[b]).clamp(0.0, 1.0))
}

/// The `n` rows most similar to `row`, best first, never including `row`
/// itself. `n` larger than the rest of the catalog is clamped.
pub fn top_n(model: &TrainedModel, row: usize, n: i64) -> Result<Vec<Neighbor>> {
    if n <= 0 {
        return Err(Error::invalid_parameter("n", n, "must be at least 1"));
    }
    check_row(model, row)?;
    let k = (n as u64).min(model.num_rows().saturating_sub(1) as u64) as usize;
    if k == 0 {
        return Ok(Vec::new());
    }

    let query = &model.matrix.rows[row];
    let mut scored: Vec<(usize, f32)> = model
        .matrix
        .rows
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != row)
        .map(|(i, r)| (i, query.dot(r).clamp(0.0, 1.0)))
        .collect();

    let items = &model.items;
    let order = |a: &(usize, f32), b: &(usize, f32)| b.1.total_cmp(&a.1).then_with(|| tie_break(&items[a.0], &items[b.0]));
    if k < scored.len() {
        scored.select_nth_unstable_by(k - 1, order);
        scored.truncate(k);
    }
    scored.sort_unstable_by(order);

    Ok(scored
        .into_iter()
        .map(|(i, score)| Neighbor { id: items[i].id.clone(), title: items[i].title.clone(), score })
        .collect())
}
