//! Cell snapshots for undo/redo
//!
//! A snapshot captures what a user wrote into one cell. Restoring replays it
//! through [`Spreadsheet::set_cell`], so dependency edges and dirty flags are
//! rebuilt exactly as for a fresh write.

use crate::cell::{Cell, CellInput};
use crate::sheet::Spreadsheet;
use serde::{Deserialize, Serialize};
use sheetcalc_core::{CellAddress, Value};

/// Saved content of one cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSnapshot {
    /// Cell the snapshot was taken from
    pub address: CellAddress,
    /// What the cell held
    pub content: SnapshotContent,
}

/// Content of a [`CellSnapshot`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotContent {
    /// The cell was empty
    Empty,
    /// A plain value
    Value { value: Value },
    /// Formula text and the cells it read when the snapshot was taken
    ///
    /// The dependency list is informational; restoring re-parses the source.
    Formula {
        source: String,
        dependencies: Vec<CellAddress>,
    },
}

impl CellSnapshot {
    /// The input that reproduces this snapshot when written back
    pub fn to_input(&self) -> CellInput {
        match &self.content {
            SnapshotContent::Empty => CellInput::Empty,
            SnapshotContent::Value { value } => CellInput::from(value.clone()),
            SnapshotContent::Formula { source, .. } => CellInput::Formula(source.clone()),
        }
    }
}

impl Spreadsheet {
    /// Capture the content of a cell
    pub fn snapshot(&self, address: CellAddress) -> CellSnapshot {
        let state = self.read_state();
        let content = match state.cell(address) {
            None => SnapshotContent::Empty,
            Some(Cell::Value(value)) => SnapshotContent::Value {
                value: value.clone(),
            },
            Some(Cell::Formula(formula)) => SnapshotContent::Formula {
                source: formula.source().to_string(),
                dependencies: formula.dependencies().to_vec(),
            },
            Some(Cell::Rejected { source, .. }) => SnapshotContent::Formula {
                source: source.clone(),
                dependencies: Vec::new(),
            },
        };

        CellSnapshot { address, content }
    }

    /// Capture every non-empty cell, in address order
    pub fn snapshot_all(&self) -> Vec<CellSnapshot> {
        self.used_addresses()
            .into_iter()
            .map(|addr| self.snapshot(addr))
            .collect()
    }

    /// Write a snapshot back into its cell
    pub fn restore(&self, snapshot: &CellSnapshot) {
        tracing::debug!(cell = %snapshot.address, "restoring snapshot");
        self.set_cell(snapshot.address, snapshot.to_input());
    }
}
