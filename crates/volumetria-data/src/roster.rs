//! Roster normalization: the authorized user set and optional leadership groups.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;
use volumetria_core::error::{Result, VolumetriaError};
use volumetria_core::models::{columns, CellValue, Identifier, TabularDataset};
use volumetria_core::settings::ALL_FILTER;

/// Table label used in validation messages.
pub const ROSTER_TABLE: &str = "de usuários";

/// Authorized users derived from one roster upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RosterModel {
    /// Unique normalized identifiers.
    pub authorized: BTreeSet<Identifier>,
    /// Leadership name → members, in first-seen order without repeats.
    pub groups: BTreeMap<String, Vec<Identifier>>,
    /// Whether the roster carried a `LIDERANCA` column.
    pub has_grouping: bool,
    /// Data rows in the source table, including rows without an identifier.
    pub row_count: usize,
}

impl RosterModel {
    pub fn is_authorized(&self, id: &Identifier) -> bool {
        self.authorized.contains(id)
    }

    /// Members of `group`; empty when the group is unknown.
    pub fn group_members(&self, group: &str) -> &[Identifier] {
        self.groups.get(group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Selector entries: [`ALL_FILTER`] then sorted group names when grouped,
    /// otherwise sorted authorized identifiers.
    pub fn filter_options(&self) -> Vec<String> {
        let mut options = vec![ALL_FILTER.to_string()];
        if self.has_grouping {
            options.extend(self.groups.keys().cloned());
        } else {
            options.extend(self.authorized.iter().map(|id| id.to_string()));
        }
        options
    }
}

/// Validate and normalize a raw roster table.
///
/// Requires `USUARIO`. When `LIDERANCA` is present every row with both an
/// identifier and a non-blank leadership value is added to that group.
pub fn normalize_roster(dataset: &TabularDataset) -> Result<RosterModel> {
    let users = dataset
        .column(columns::USER)
        .ok_or_else(|| VolumetriaError::missing_column(ROSTER_TABLE, columns::USER))?;

    let identifiers: Vec<Option<Identifier>> =
        users.cells.iter().map(Identifier::from_cell).collect();

    let authorized: BTreeSet<Identifier> = identifiers.iter().flatten().cloned().collect();

    let leadership = dataset.column(columns::LEADERSHIP);
    let mut groups: BTreeMap<String, Vec<Identifier>> = BTreeMap::new();

    if let Some(leadership) = leadership {
        for (id, cell) in identifiers.iter().zip(&leadership.cells) {
            let (Some(id), Some(group)) = (id, group_name(cell)) else {
                continue;
            };
            let members = groups.entry(group).or_default();
            if !members.contains(id) {
                members.push(id.clone());
            }
        }
    }

    debug!(
        "Roster: {} rows, {} authorized, {} groups",
        dataset.row_count(),
        authorized.len(),
        groups.len()
    );

    Ok(RosterModel {
        authorized,
        groups,
        has_grouping: leadership.is_some(),
        row_count: dataset.row_count(),
    })
}

/// Leadership names are trimmed but keep their case.
fn group_name(cell: &CellValue) -> Option<String> {
    let text = cell.as_text()?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
