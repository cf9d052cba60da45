//! Injective assignment of scanned inks to stored inks.

use serde::{Deserialize, Serialize};

/// How scanned ink ids are paired with stored ink ids.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assignment {
    /// Minimum total cost over all injective pairings. Exhaustive, so only
    /// meant for the handful of inks a tag carries.
    #[default]
    Optimal,
    /// Each row in ascending order takes its cheapest unused column.
    Greedy,
}

/// Assign every row of `cost` to a distinct column.
///
/// `cost[r][c]` is the cost of pairing row `r` with column `c`; all rows must
/// have the same length. Returns `None` when there are more rows than
/// columns.
pub fn assign(cost: &[Vec<f32>], method: Assignment) -> Option<Vec<usize>> {
    let cols = cost.first().map_or(0, Vec::len);
    if cost.len() > cols || cost.iter().any(|row| row.len() != cols) {
        return None;
    }
    if cost.is_empty() {
        return Some(Vec::new());
    }
    match method {
        Assignment::Greedy => Some(greedy(cost, cols)),
        Assignment::Optimal => optimal(cost, cols),
    }
}

fn greedy(cost: &[Vec<f32>], cols: usize) -> Vec<usize> {
    let mut used = vec![false; cols];
    cost.iter()
        .map(|row| {
            let mut best = (usize::MAX, f32::INFINITY);
            for (c, &d) in row.iter().enumerate() {
                if !used[c] && (best.0 == usize::MAX || d < best.1) {
                    best = (c, d);
                }
            }
            used[best.0] = true;
            best.0
        })
        .collect()
}

fn optimal(cost: &[Vec<f32>], cols: usize) -> Option<Vec<usize>> {
    fn search(
        row: usize,
        cost: &[Vec<f32>],
        used: &mut [bool],
        current: &mut Vec<usize>,
        total: f32,
        best: &mut Option<(f32, Vec<usize>)>,
    ) {
        if let Some((b, _)) = best {
            if total >= *b {
                return;
            }
        }
        if row == cost.len() {
            *best = Some((total, current.clone()));
            return;
        }
        for c in 0..used.len() {
            if used[c] {
                continue;
            }
            used[c] = true;
            current.push(c);
            search(row + 1, cost, used, current, total + cost[row][c], best);
            current.pop();
            used[c] = false;
        }
    }

    let mut best = None;
    let mut used = vec![false; cols];
    search(
        0,
        cost,
        &mut used,
        &mut Vec::with_capacity(cost.len()),
        0.0,
        &mut best,
    );
    best.map(|(_, a)| a)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_injective(a: &[usize]) -> bool {
        let mut seen = a.to_vec();
        seen.sort_unstable();
        seen.dedup();
        seen.len() == a.len()
    }

    #[test]
    fn greedy_is_order_dependent_optimal_is_not() {
        // Row 0 grabs column 0 greedily, leaving row 1 with the expensive one.
        let cost = vec![vec![1.0, 2.0], vec![1.5, 10.0]];
        assert_eq!(assign(&cost, Assignment::Greedy), Some(vec![0, 1]));
        assert_eq!(assign(&cost, Assignment::Optimal), Some(vec![1, 0]));
    }

    #[test]
    fn assignments_are_injective() {
        let cost = vec![
            vec![0.0, 0.0, 0.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0, 0.0],
            vec![3.0, 1.0, 4.0, 1.0, 5.0],
            vec![9.0, 2.0, 6.0, 5.0, 3.0],
        ];
        for method in [Assignment::Greedy, Assignment::Optimal] {
            let a = assign(&cost, method).expect("assignment");
            assert_eq!(a.len(), 4);
            assert!(is_injective(&a), "{method:?}: {a:?}");
        }
    }

    #[test]
    fn more_rows_than_columns_is_rejected() {
        let cost = vec![vec![1.0], vec![2.0]];
        assert_eq!(assign(&cost, Assignment::Optimal), None);
        assert_eq!(assign(&[], Assignment::Greedy), Some(vec![]));
    }
}
