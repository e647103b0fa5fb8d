use std::path::Path;

use crate::{Action, QTable, Result, StateKey, TableSnapshot};

/// A trained value table behind a pure query surface.
///
/// Built once (typically from a snapshot at service start) and immutable
/// afterwards: every method takes `&self`, so a serving layer can share one
/// instance by reference across its threads. Training and serving are
/// separate lifecycles; a table being trained is never aliased by one of
/// these.
pub struct PolicyTable {
    table: QTable,
}

impl PolicyTable {
    /// Loads a snapshot written by a training run, possibly from a
    /// different process.
    pub fn load(path: &Path) -> Result<PolicyTable> {
        let snapshot = TableSnapshot::read_from(path)?;
        Ok(PolicyTable {
            table: snapshot.into_table(),
        })
    }

    pub fn from_table(table: QTable) -> PolicyTable {
        PolicyTable { table }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// The greedy action for a state, or `None` for terminal states.
    pub fn action_for(&self, state: &StateKey) -> Option<Action> {
        self.table.best_action(state)
    }
}
