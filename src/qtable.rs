use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::info;
use rand::seq::SliceRandom;
use rand::thread_rng;
use serde::{Deserialize, Serialize};

use crate::{Action, Error, MergePolicy, Result};

/// Snapshot format version, bumped whenever the on-disk layout changes.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything the learner is allowed to see about a round, canonicalized
/// into a fixed-shape key. A key with `can_act == false` is a terminal
/// marker and has no legal actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateKey {
    pub player_total: u8,
    pub is_soft: bool,
    pub dealer_up: u8,
    pub can_split: bool,
    pub can_double: bool,
    pub can_act: bool,
    /// Rounded true count clamped to [-5, 5].
    pub true_count: i8,
}

impl StateKey {
    /// Hit and stand whenever the hand is open, plus split and double when
    /// the flags allow them. Empty for terminal keys.
    pub fn legal_actions(&self) -> Vec<Action> {
        let mut actions = Vec::with_capacity(4);
        if self.can_act {
            actions.push(Action::Hit);
            actions.push(Action::Stand);
            if self.can_split {
                actions.push(Action::Split);
            }
            if self.can_double {
                actions.push(Action::Double);
            }
        }
        actions
    }
}

/// Clamps a raw true count into the closed range [-5, 5] used by the state
/// encoding.
pub fn clamp_true_count(raw: i32) -> i8 {
    raw.clamp(-5, 5) as i8
}

/// Sparse expected-return table over (state, action) pairs. Absent entries
/// read as 0.0 and are never materialized by a read.
#[derive(Debug, Default, Clone)]
pub struct QTable {
    values: HashMap<(StateKey, Action), f64>,
}

impl QTable {
    pub fn new() -> QTable {
        QTable {
            values: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Reads Q(state, action), defaulting to 0.0 without inserting.
    pub fn value(&self, state: &StateKey, action: Action) -> f64 {
        self.values.get(&(*state, action)).copied().unwrap_or(0.0)
    }

    pub fn set_value(&mut self, state: &StateKey, action: Action, value: f64) {
        self.values.insert((*state, action), value);
    }

    /// The greedy action for a state, chosen uniformly among ties.
    ///
    /// The first legal action seeds the running best; a strictly greater
    /// value replaces the tie set and an equal value joins it. On a table
    /// with no entries for the state every legal action reads 0.0, so they
    /// all tie and the choice is uniform over all of them. `None` only when
    /// the state has no legal actions.
    pub fn best_action(&self, state: &StateKey) -> Option<Action> {
        self.scan_best(state).0.choose(&mut thread_rng()).copied()
    }

    /// The value backing [`QTable::best_action`]: the maximum over the legal
    /// actions' entries, or 0.0 when there are none.
    pub fn max_value(&self, state: &StateKey) -> f64 {
        self.scan_best(state).1
    }

    fn scan_best(&self, state: &StateKey) -> (Vec<Action>, f64) {
        let mut ties: Vec<Action> = Vec::new();
        let mut best_value = 0.0;
        for action in state.legal_actions() {
            let value = self.value(state, action);
            if ties.is_empty() || value > best_value {
                best_value = value;
                ties.clear();
                ties.push(action);
            } else if value == best_value {
                ties.push(action);
            }
        }
        (ties, best_value)
    }

    /// Folds another table into this one under the given policy. Used to
    /// combine per-worker tables after parallel training.
    pub fn merge_from(&mut self, other: QTable, policy: MergePolicy) {
        match policy {
            MergePolicy::Average => {
                for (key, value) in other.values {
                    match self.values.get_mut(&key) {
                        Some(existing) => *existing = (*existing + value) / 2.0,
                        None => {
                            self.values.insert(key, value);
                        }
                    }
                }
            }
            MergePolicy::LatestWins => {
                self.values.extend(other.values);
            }
        }
    }

    fn entries(&self) -> Vec<(StateKey, Action, f64)> {
        self.values
            .iter()
            .map(|(&(state, action), &value)| (state, action, value))
            .collect()
    }
}

/// Versioned on-disk form of a trained table plus the scalar
/// hyperparameters a query service needs to reproduce the policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSnapshot {
    version: u32,
    pub epsilon: f64,
    pub alpha: f64,
    pub gamma: f64,
    entries: Vec<(StateKey, Action, f64)>,
}

impl TableSnapshot {
    pub fn new(table: &QTable, epsilon: f64, alpha: f64, gamma: f64) -> TableSnapshot {
        TableSnapshot {
            version: SNAPSHOT_VERSION,
            epsilon,
            alpha,
            gamma,
            entries: table.entries(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_table(self) -> QTable {
        let mut table = QTable::new();
        for (state, action, value) in self.entries {
            table.set_value(&state, action, value);
        }
        table
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        bincode::serialize_into(BufWriter::new(file), self)?;
        info!(
            "wrote table snapshot with {} entries to {}",
            self.entries.len(),
            path.display()
        );
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<TableSnapshot> {
        let file = File::open(path)?;
        let snapshot: TableSnapshot = bincode::deserialize_from(BufReader::new(file))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::SnapshotVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        info!(
            "loaded table snapshot with {} entries from {}",
            snapshot.entries.len(),
            path.display()
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_state() -> StateKey {
        StateKey {
            player_total: 16,
            is_soft: false,
            dealer_up: 10,
            can_split: false,
            can_double: true,
            can_act: true,
            true_count: 0,
        }
    }

    fn terminal_state() -> StateKey {
        StateKey {
            can_act: false,
            can_split: false,
            can_double: false,
            ..open_state()
        }
    }

    #[test]
    fn legal_actions_follow_the_state_flags() {
        let state = open_state();
        assert_eq!(
            state.legal_actions(),
            vec![Action::Hit, Action::Stand, Action::Double]
        );

        let pair = StateKey {
            can_split: true,
            ..open_state()
        };
        assert_eq!(
            pair.legal_actions(),
            vec![Action::Hit, Action::Stand, Action::Split, Action::Double]
        );

        assert!(terminal_state().legal_actions().is_empty());
    }

    #[test]
    fn clamp_true_count_saturates() {
        assert_eq!(clamp_true_count(7), 5);
        assert_eq!(clamp_true_count(-9), -5);
        assert_eq!(clamp_true_count(3), 3);
        assert_eq!(clamp_true_count(0), 0);
    }

    #[test]
    fn reads_never_materialize_entries() {
        let table = QTable::new();
        assert_eq!(table.value(&open_state(), Action::Hit), 0.0);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut table = QTable::new();
        table.set_value(&open_state(), Action::Stand, -0.25);
        assert_eq!(table.value(&open_state(), Action::Stand), -0.25);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn best_action_on_empty_table_ties_all_legal_actions() {
        let table = QTable::new();
        let state = open_state();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            seen.insert(table.best_action(&state).unwrap());
        }
        // Uniform over the full legal set: every action shows up.
        assert_eq!(seen.len(), state.legal_actions().len());
        assert_eq!(table.max_value(&state), 0.0);
    }

    #[test]
    fn best_action_prefers_strictly_greater_values() {
        let mut table = QTable::new();
        let state = open_state();
        table.set_value(&state, Action::Stand, 0.5);
        for _ in 0..50 {
            assert_eq!(table.best_action(&state), Some(Action::Stand));
        }
        assert_eq!(table.max_value(&state), 0.5);
    }

    #[test]
    fn best_action_picks_the_least_bad_when_all_are_negative() {
        let mut table = QTable::new();
        let state = open_state();
        table.set_value(&state, Action::Hit, -0.5);
        table.set_value(&state, Action::Stand, -0.2);
        table.set_value(&state, Action::Double, -0.9);
        for _ in 0..50 {
            assert_eq!(table.best_action(&state), Some(Action::Stand));
        }
        assert_eq!(table.max_value(&state), -0.2);
    }

    #[test]
    fn terminal_states_have_no_best_action_and_zero_max() {
        let table = QTable::new();
        assert_eq!(table.best_action(&terminal_state()), None);
        assert_eq!(table.max_value(&terminal_state()), 0.0);
    }

    #[test]
    fn merge_average_takes_pairwise_means() {
        let state = open_state();
        let mut left = QTable::new();
        left.set_value(&state, Action::Hit, 1.0);
        left.set_value(&state, Action::Stand, 0.4);
        let mut right = QTable::new();
        right.set_value(&state, Action::Hit, 0.0);
        right.set_value(&state, Action::Double, -0.6);

        left.merge_from(right, MergePolicy::Average);
        assert_eq!(left.value(&state, Action::Hit), 0.5);
        assert_eq!(left.value(&state, Action::Stand), 0.4);
        assert_eq!(left.value(&state, Action::Double), -0.6);
    }

    #[test]
    fn merge_latest_wins_overwrites() {
        let state = open_state();
        let mut left = QTable::new();
        left.set_value(&state, Action::Hit, 1.0);
        let mut right = QTable::new();
        right.set_value(&state, Action::Hit, 0.25);

        left.merge_from(right, MergePolicy::LatestWins);
        assert_eq!(left.value(&state, Action::Hit), 0.25);
    }

    #[test]
    fn snapshot_round_trips_through_disk() {
        let mut table = QTable::new();
        table.set_value(&open_state(), Action::Hit, 0.125);
        table.set_value(&open_state(), Action::Stand, -1.0);
        let snapshot = TableSnapshot::new(&table, 0.05, 0.001, 0.999);

        let path = std::env::temp_dir().join(format!(
            "blackjack_ql_snapshot_roundtrip_{}.bin",
            std::process::id()
        ));
        snapshot.write_to(&path).unwrap();
        let loaded = TableSnapshot::read_from(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.epsilon, 0.05);
        assert_eq!(loaded.alpha, 0.001);
        assert_eq!(loaded.gamma, 0.999);
        assert_eq!(loaded.len(), 2);
        let reloaded = loaded.into_table();
        assert_eq!(reloaded.value(&open_state(), Action::Hit), 0.125);
        assert_eq!(reloaded.value(&open_state(), Action::Stand), -1.0);
    }

    #[test]
    fn snapshot_rejects_unknown_versions() {
        let snapshot = TableSnapshot {
            version: SNAPSHOT_VERSION + 1,
            epsilon: 0.01,
            alpha: 0.0001,
            gamma: 0.999,
            entries: Vec::new(),
        };
        let path = std::env::temp_dir().join(format!(
            "blackjack_ql_snapshot_version_{}.bin",
            std::process::id()
        ));
        let file = File::create(&path).unwrap();
        bincode::serialize_into(BufWriter::new(file), &snapshot).unwrap();

        let result = TableSnapshot::read_from(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(
            result,
            Err(Error::SnapshotVersion {
                found,
                expected: SNAPSHOT_VERSION,
            }) if found == SNAPSHOT_VERSION + 1
        ));
    }
}
