//! Row-wise union of two tables with an optional authorization filter.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, warn};
use volumetria_core::error::{Result, Warning};
use volumetria_core::models::{columns, CellValue, Column, Identifier, TabularDataset};

/// Output of [`compile`]: the merged table and anything worth telling the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledDataset {
    pub dataset: TabularDataset,
    pub warnings: Vec<Warning>,
}

impl CompiledDataset {
    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }
}

/// Concatenate `first` and `second`, then optionally keep authorized rows.
///
/// Columns are the union of both inputs: `first`'s columns in order, then any
/// column only `second` has. Cells a table does not have are null. When
/// `authorized` is given and the merged table has `USUARIO`, that column is
/// normalized and rows outside the set are dropped; without the column the
/// rows pass through and a [`Warning::MissingJoinColumn`] is returned.
pub fn compile(
    first: &TabularDataset,
    second: &TabularDataset,
    authorized: Option<&BTreeSet<Identifier>>,
) -> Result<CompiledDataset> {
    let mut dataset = concat(first, second)?;
    let mut warnings = Vec::new();

    if let Some(authorized) = authorized {
        if dataset.has_column(columns::USER) {
            dataset.map_column(columns::USER, |cell| match Identifier::from_cell(cell) {
                Some(id) => CellValue::Text(id.to_string()),
                None => CellValue::Null,
            });
            let before = dataset.row_count();
            dataset = dataset.filter_rows(|row| {
                dataset
                    .cell(row, columns::USER)
                    .and_then(Identifier::from_cell)
                    .is_some_and(|id| authorized.contains(&id))
            });
            debug!(
                "Authorization filter kept {} of {} rows",
                dataset.row_count(),
                before
            );
        } else {
            warn!("Join column {} missing, compiling without filter", columns::USER);
            warnings.push(Warning::MissingJoinColumn {
                column: columns::USER.to_string(),
            });
        }
    }

    if dataset.is_empty() {
        warnings.push(Warning::EmptyResult {
            context: "Nenhum dado para salvar após os filtros.".to_string(),
        });
    }

    Ok(CompiledDataset { dataset, warnings })
}

/// Outer-union concatenation of two tables.
fn concat(first: &TabularDataset, second: &TabularDataset) -> Result<TabularDataset> {
    let mut names: Vec<&str> = first.column_names();
    for name in second.column_names() {
        if !names.contains(&name) {
            names.push(name);
        }
    }

    let merged: Vec<Column> = names
        .into_iter()
        .map(|name| {
            let mut cells = Vec::with_capacity(first.row_count() + second.row_count());
            for table in [first, second] {
                match table.column(name) {
                    Some(column) => cells.extend(column.cells.iter().cloned()),
                    None => cells.extend(std::iter::repeat(CellValue::Null).take(table.row_count())),
                }
            }
            Column::new(name, cells)
        })
        .collect();

    TabularDataset::from_columns(merged)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
