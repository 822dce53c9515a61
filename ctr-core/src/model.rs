use serde::{Deserialize, Serialize};
use std::fmt;

/// Metadata keys recognised on `KEY: value` lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetaKey {
    Station,
    Location,
    Sip,
    Heading,
}

impl MetaKey {
    pub const ALL: [MetaKey; 4] = [
        MetaKey::Station,
        MetaKey::Location,
        MetaKey::Sip,
        MetaKey::Heading,
    ];

    /// Keyword as written in the source text, without the colon.
    pub fn keyword(self) -> &'static str {
        match self {
            MetaKey::Station => "STATION",
            MetaKey::Location => "LOCATION",
            MetaKey::Sip => "SIP",
            MetaKey::Heading => "HEADING",
        }
    }
}

/// Title-block fields of one sheet. Empty string means "not declared".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetMeta {
    pub station: String,
    pub location: String,
    pub sip: String,
    pub heading: String,
}

impl SheetMeta {
    pub fn get(&self, key: MetaKey) -> &str {
        match key {
            MetaKey::Station => &self.station,
            MetaKey::Location => &self.location,
            MetaKey::Sip => &self.sip,
            MetaKey::Heading => &self.heading,
        }
    }

    pub fn set(&mut self, key: MetaKey, value: impl Into<String>) {
        let value = value.into();
        match key {
            MetaKey::Station => self.station = value,
            MetaKey::Location => self.location = value,
            MetaKey::Sip => self.sip = value,
            MetaKey::Heading => self.heading = value,
        }
    }

    pub fn is_empty(&self) -> bool {
        MetaKey::ALL.iter().all(|k| self.get(*k).is_empty())
    }

    /// Serialize the declared fields as `KEY: value` lines, in keyword order.
    pub fn to_lines(&self) -> Vec<String> {
        MetaKey::ALL
            .iter()
            .filter(|k| !self.get(**k).is_empty())
            .map(|k| format!("{}: {}", k.keyword(), self.get(*k)))
            .collect()
    }
}

/// One terminal of one row, as expanded from a `LABEL[start to end]` range.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSpec {
    pub row_id: String,
    pub function: String,
    pub cable_detail: String,
    /// Zero-padded (at least two digits) form of `numeric_terminal`.
    pub terminal_number: String,
    pub numeric_terminal: u32,
}

impl RowSpec {
    pub fn new(
        row_id: impl Into<String>,
        function: impl Into<String>,
        cable_detail: impl Into<String>,
        numeric_terminal: u32,
    ) -> Self {
        RowSpec {
            row_id: row_id.into(),
            function: function.into(),
            cable_detail: cable_detail.into(),
            terminal_number: format!("{numeric_terminal:02}"),
            numeric_terminal,
        }
    }
}

impl AsRef<RowSpec> for RowSpec {
    fn as_ref(&self) -> &RowSpec {
        self
    }
}

/// Where a symbol overlay is anchored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SymbolAnchor {
    /// Spans terminals `start..=end` of `row`; placed at their mean x.
    Range { row: String, start: u32, end: u32 },
    /// Sits on a single terminal of `row`.
    Position { row: String, terminal: u32 },
    /// Absolute page coordinates (points, origin bottom-left).
    Absolute { x: f64, y: f64 },
}

impl SymbolAnchor {
    pub fn row(&self) -> Option<&str> {
        match self {
            SymbolAnchor::Range { row, .. } | SymbolAnchor::Position { row, .. } => Some(row),
            SymbolAnchor::Absolute { .. } => None,
        }
    }

    /// Whether terminal `n` of `row` lies under this anchor.
    pub fn covers(&self, row: &str, n: u32) -> bool {
        match self {
            SymbolAnchor::Range { row: r, start, end } => r == row && (*start..=*end).contains(&n),
            SymbolAnchor::Position { row: r, terminal } => r == row && *terminal == n,
            SymbolAnchor::Absolute { .. } => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SymbolDirective {
    /// Upper-cased asset key, e.g. `CHARGER`.
    pub symbol_type: String,
    pub anchor: SymbolAnchor,
    pub label: Option<String>,
    /// Explicit `(width, height)` in points; config defaults apply otherwise.
    pub size: Option<(f64, f64)>,
    /// 1-based source line, 0 when built programmatically.
    pub line: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub number: u32,
    pub meta: SheetMeta,
    pub rows: Vec<RowSpec>,
    pub symbols: Vec<SymbolDirective>,
}

impl Sheet {
    pub fn new(number: u32) -> Self {
        Sheet {
            number,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.symbols.is_empty()
    }

    /// Stable sort by `(row_id, numeric_terminal)`; the layout relies on it.
    pub fn sort_rows(&mut self) {
        self.rows.sort_by(|a, b| {
            a.row_id
                .cmp(&b.row_id)
                .then(a.numeric_terminal.cmp(&b.numeric_terminal))
        });
    }

    /// Distinct row ids in row order.
    pub fn row_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for r in &self.rows {
            if !ids.contains(&r.row_id.as_str()) {
                ids.push(&r.row_id);
            }
        }
        ids
    }

    pub fn row(&self, row_id: &str) -> Vec<&RowSpec> {
        self.rows.iter().filter(|r| r.row_id == row_id).collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Function,
    Cable,
}

/// A contiguous, same-labelled run of terminals within one row chunk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketGroup {
    pub start_index: usize,
    pub end_index: usize,
    pub label: String,
    pub kind: GroupKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    MalformedRange,
    RangeTooWide,
    NoTerminals,
    MalformedSymbol,
    DuplicateTerminal,
    EmptySheet,
    MissingSymbolAsset,
    SymbolAnchorNotFound,
}

/// A non-fatal problem found while parsing or rendering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// 1-based source line; 0 when not tied to a line.
    pub line: usize,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(line: usize, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            line,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(f, "line {}: {}", self.line, self.message)
        } else {
            f.write_str(&self.message)
        }
    }
}
