use crate::error::{Error, Result};

/// Greedily pack `records` into chunks whose summed `cost` stays within `ceiling`.
///
/// Input order is kept. A record that alone costs more than `ceiling` is a
/// configuration error, reported before anything is packed.
///
/// ```rust
/// use dynamodb_shadow::resource::chunk;
///
/// let chunks = chunk::chunk(vec![60, 30, 20, 100], 100, |cost| *cost).unwrap();
/// assert_eq!(chunks, vec![vec![60, 30], vec![20], vec![100]]);
/// ```
pub fn chunk<T>(records: Vec<T>, ceiling: usize, cost: impl Fn(&T) -> usize) -> Result<Vec<Vec<T>>> {
    if let Some(oversized) = records.iter().map(&cost).find(|cost| *cost > ceiling) {
        return Err(Error::Config(format!(
            "a single record needs {oversized} transaction items, more than the ceiling of {ceiling}"
        )));
    }
    let mut chunks = Vec::new();
    let mut current = Vec::new();
    let mut current_cost = 0;
    for record in records {
        let record_cost = cost(&record);
        if !current.is_empty() && current_cost + record_cost > ceiling {
            chunks.push(std::mem::take(&mut current));
            current_cost = 0;
        }
        current_cost += record_cost;
        current.push(record);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    Ok(chunks)
}
