//! Square Q-table over waypoint states.

use serde::{Deserialize, Serialize};

/// Learned values `Q[s][a]` of moving from waypoint `s` to waypoint `a`.
///
/// Stored row-major. The diagonal is never updated nor selected: a charger
/// is not rewarded for staying where it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QTable {
    size: usize,
    values: Vec<f64>,
}

impl QTable {
    /// Creates a `size × size` table of zeros.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            values: vec![0.0; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, state: usize, action: usize) -> f64 {
        self.values[state * self.size + action]
    }

    pub fn set(&mut self, state: usize, action: usize, value: f64) {
        self.values[state * self.size + action] = value;
    }

    pub fn row(&self, state: usize) -> &[f64] {
        &self.values[state * self.size..(state + 1) * self.size]
    }

    /// Bootstrapped value of each action from `state`.
    ///
    /// Entry `a` is the best value reachable from waypoint `a`; the entry for
    /// `state` itself is `-inf` so it can never be the target of a move.
    pub fn q_max(&self, state: usize) -> Vec<f64> {
        (0..self.size)
            .map(|a| {
                if a == state {
                    f64::NEG_INFINITY
                } else {
                    self.row(a).iter().copied().fold(f64::NEG_INFINITY, f64::max)
                }
            })
            .collect()
    }

    /// Temporal-difference update of row `state`:
    ///
    /// `Q[s][a] ← (1 − α)·Q[s][a] + α·(r[a] + γ·q_max[a])` for every `a ≠ s`.
    pub fn update_row(&mut self, state: usize, rewards: &[f64], alpha: f64, gamma: f64) {
        let q_max = self.q_max(state);
        for (a, (&reward, &next)) in rewards.iter().zip(&q_max).enumerate() {
            if a == state {
                continue;
            }
            let old = self.get(state, a);
            self.set(state, a, (1.0 - alpha) * old + alpha * (reward + gamma * next));
        }
    }

    /// Action with the highest value from `state`, excluding `state` itself.
    ///
    /// Ties go to the lowest index. A one-state table returns `state`.
    pub fn best_action(&self, state: usize) -> usize {
        let mut best: Option<(usize, f64)> = None;
        for (a, &value) in self.row(state).iter().enumerate() {
            if a == state {
                continue;
            }
            match best {
                Some((_, best_value)) if best_value >= value => {}
                _ => best = Some((a, value)),
            }
        }
        best.map(|(a, _)| a).unwrap_or(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_table_is_zero() {
        let q = QTable::new(3);
        assert_eq!(q.size(), 3);
        assert!(q.row(1).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn q_max_excludes_current_state() {
        let mut q = QTable::new(3);
        q.set(0, 1, 5.0);
        q.set(2, 0, 7.0);
        let m = q.q_max(0);
        assert_eq!(m[0], f64::NEG_INFINITY);
        assert_eq!(m[1], 0.0);
        assert_eq!(m[2], 7.0);
    }

    #[test]
    fn update_row_follows_td_rule() {
        let mut q = QTable::new(3);
        q.set(1, 2, 4.0);
        q.update_row(0, &[1.0, 2.0, 3.0], 0.5, 0.5);
        // a = 1: 0.5·0 + 0.5·(2 + 0.5·4)
        assert!((q.get(0, 1) - 2.0).abs() < 1e-12);
        // a = 2: 0.5·0 + 0.5·(3 + 0.5·0)
        assert!((q.get(0, 2) - 1.5).abs() < 1e-12);
        // Diagonal untouched.
        assert_eq!(q.get(0, 0), 0.0);
        assert!(q.row(0).iter().all(|v| v.is_finite()));
    }

    #[test]
    fn best_action_never_selects_current_state() {
        let mut q = QTable::new(3);
        q.set(1, 1, 100.0);
        q.set(1, 0, 1.0);
        q.set(1, 2, 2.0);
        assert_eq!(q.best_action(1), 2);
    }

    #[test]
    fn best_action_breaks_ties_by_lowest_index() {
        let q = QTable::new(4);
        assert_eq!(q.best_action(0), 1);
        assert_eq!(q.best_action(2), 0);
    }

    #[test]
    fn single_state_table_stays_put() {
        let q = QTable::new(1);
        assert_eq!(q.best_action(0), 0);
    }
}
