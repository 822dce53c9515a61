//! Symbol directive grammars.
//!
//! The canonical form is
//!
//! ```text
//! SYMBOL: CHARGER [A, 7 to 8], 24V CHG
//! SYMBOL: FUSE [B, 3], F1, 30x40
//! ```
//!
//! Two older spellings are still accepted, dispatched on their prefix:
//!
//! ```text
//! @CHOKE: B, 3, 4, CH1          row, start[, end][, label]
//! SYMBOL, FUSE, 900, 500, 30, 40, F1   type, x, y, w, h[, label]
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::classify::{DirectiveSyntax, strip_prefix_ci};
use crate::model::{SymbolAnchor, SymbolDirective};
use crate::row::parse_range;

static CANONICAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z0-9_\-]+)\s*\[\s*([^,\[\]]+?)\s*,\s*([^\[\]]+?)\s*\]\s*(?:,(.*))?$")
        .expect("canonical symbol regex")
});

static SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d+(?:\.\d+)?)\s*x\s*(\d+(?:\.\d+)?)\s*$").expect("size regex")
});

/// Parse a directive line whose family was detected by [`crate::classify`].
///
/// The error string describes why the line was rejected; callers turn it
/// into a diagnostic.
pub fn parse_directive(
    syntax: &DirectiveSyntax,
    text: &str,
    line: usize,
) -> Result<SymbolDirective, String> {
    match syntax {
        DirectiveSyntax::Canonical => parse_canonical(text, line),
        DirectiveSyntax::Absolute => parse_absolute(text, line),
        DirectiveSyntax::AtPrefixed(ty) => parse_at_prefixed(ty, text, line),
    }
}

fn parse_size(s: &str) -> Option<(f64, f64)> {
    let caps = SIZE.captures(s)?;
    let w: f64 = caps[1].parse().ok()?;
    let h: f64 = caps[2].parse().ok()?;
    (w > 0.0 && h > 0.0).then_some((w, h))
}

/// Split trailing `label[, WxH]` parts.
fn label_and_size(parts: &[&str]) -> (Option<String>, Option<(f64, f64)>) {
    let mut label = None;
    let mut size = None;
    for p in parts.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
        if size.is_none()
            && let Some(sz) = parse_size(p)
        {
            size = Some(sz);
        } else if label.is_none() {
            label = Some(p.to_string());
        }
    }
    (label, size)
}

fn parse_canonical(text: &str, line: usize) -> Result<SymbolDirective, String> {
    let body = strip_prefix_ci(text.trim(), "SYMBOL:").ok_or("missing `SYMBOL:` prefix")?;
    let caps = CANONICAL
        .captures(body)
        .ok_or_else(|| format!("expected `SYMBOL: TYPE [ROW, START to END]`, got `{text}`"))?;
    let symbol_type = caps[1].to_ascii_uppercase();
    let row = caps[2].trim().to_uppercase();
    let pos = caps[3].trim();
    let anchor = if let Some((start, end)) = parse_range(pos) {
        if end < start {
            return Err(format!("symbol range [{pos}] ends before it starts"));
        }
        SymbolAnchor::Range { row, start, end }
    } else if let Ok(terminal) = pos.parse::<u32>() {
        SymbolAnchor::Position { row, terminal }
    } else {
        return Err(format!("cannot read symbol position `{pos}`"));
    };
    let rest: Vec<&str> = caps.get(4).map_or(Vec::new(), |m| m.as_str().split(',').collect());
    let (label, size) = label_and_size(&rest);
    Ok(SymbolDirective {
        symbol_type,
        anchor,
        label,
        size,
        line,
    })
}

fn parse_absolute(text: &str, line: usize) -> Result<SymbolDirective, String> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    if parts.len() < 6 {
        return Err(format!("expected `SYMBOL, TYPE, X, Y, W, H`, got `{text}`"));
    }
    let symbol_type = parts[1].to_ascii_uppercase();
    if symbol_type.is_empty() {
        return Err("symbol type is empty".to_string());
    }
    let mut nums = [0.0f64; 4];
    for (slot, raw) in nums.iter_mut().zip(&parts[2..6]) {
        *slot = raw
            .parse()
            .map_err(|_| format!("`{raw}` is not a number"))?;
    }
    let [x, y, w, h] = nums;
    if w <= 0.0 || h <= 0.0 {
        return Err(format!("symbol size {w}x{h} must be positive"));
    }
    let label = parts[6..]
        .iter()
        .find(|p| !p.is_empty())
        .map(|p| p.to_string());
    Ok(SymbolDirective {
        symbol_type,
        anchor: SymbolAnchor::Absolute { x, y },
        label,
        size: Some((w, h)),
        line,
    })
}

fn parse_at_prefixed(ty: &str, text: &str, line: usize) -> Result<SymbolDirective, String> {
    let body = text
        .split_once(':')
        .map(|(_, b)| b)
        .ok_or("missing `:` after symbol type")?;
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();
    let row = parts.first().map(|r| r.to_uppercase()).unwrap_or_default();
    if row.is_empty() {
        return Err(format!("@{ty}: missing row"));
    }
    let first = parts.get(1).copied().unwrap_or("");
    let first = first.trim_start_matches('[').trim_end_matches(']');
    let (anchor, rest_from) = if let Some((start, end)) = parse_range(first) {
        (SymbolAnchor::Range { row, start, end }, 2)
    } else if let Ok(start) = first.parse::<u32>() {
        match parts.get(2).and_then(|p| p.parse::<u32>().ok()) {
            Some(end) if end > start => (SymbolAnchor::Range { row, start, end }, 3),
            Some(end) if end == start => (SymbolAnchor::Position { row, terminal: start }, 3),
            Some(_) => return Err(format!("@{ty}: range ends before it starts")),
            None => (SymbolAnchor::Position { row, terminal: start }, 2),
        }
    } else {
        return Err(format!("@{ty}: cannot read position `{first}`"));
    };
    if let SymbolAnchor::Range { start, end, .. } = &anchor
        && end < start
    {
        return Err(format!("@{ty}: range ends before it starts"));
    }
    let (label, size) = label_and_size(parts.get(rest_from..).unwrap_or(&[]));
    Ok(SymbolDirective {
        symbol_type: ty.to_string(),
        anchor,
        label,
        size,
        line,
    })
}
