//! Tabular input: one record per terminal instead of range lines.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::first_number;
use crate::error::Result;
use crate::model::{RowSpec, Sheet};

/// Row id used when a record leaves it blank.
pub const DEFAULT_ROW_ID: &str = "Default";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableRow {
    #[serde(alias = "Row ID")]
    pub row_id: String,
    /// Function label, drawn above the terminal.
    #[serde(alias = "Header")]
    pub header: String,
    /// Cable detail, drawn below the terminal.
    #[serde(alias = "Footer")]
    pub footer: String,
    #[serde(alias = "Terminal ID")]
    pub terminal_id: String,
    pub sheet: Option<u32>,
}

/// Build sheets from table records.
///
/// Records without a terminal id are dropped. Terminals sort by the first
/// integer in their id (0 when there is none) and keep the id as written.
pub fn sheets_from_table(rows: &[TableRow]) -> Vec<Sheet> {
    let mut sheets: BTreeMap<u32, Sheet> = BTreeMap::new();
    for r in rows {
        let terminal = r.terminal_id.trim();
        if terminal.is_empty() {
            debug!(row = %r.row_id, "table record without terminal id dropped");
            continue;
        }
        let row_id = match r.row_id.trim() {
            "" => DEFAULT_ROW_ID.to_string(),
            id => id.to_uppercase(),
        };
        let terminal_number = match terminal.parse::<u32>() {
            Ok(n) if terminal.bytes().all(|b| b.is_ascii_digit()) => format!("{n:02}"),
            _ => terminal.to_string(),
        };
        let number = r.sheet.unwrap_or(1);
        sheets
            .entry(number)
            .or_insert_with(|| Sheet::new(number))
            .rows
            .push(RowSpec {
                row_id,
                function: r.header.trim().to_string(),
                cable_detail: r.footer.trim().to_string(),
                terminal_number,
                numeric_terminal: first_number(terminal).unwrap_or(0),
            });
    }
    sheets
        .into_values()
        .map(|mut s| {
            s.sort_rows();
            s
        })
        .collect()
}

pub fn sheets_from_json(text: &str) -> Result<Vec<Sheet>> {
    let rows: Vec<TableRow> = serde_json::from_str(text)?;
    Ok(sheets_from_table(&rows))
}
