//! Run-length grouping of function / cable labels into bracket groups.

use crate::model::{BracketGroup, GroupKind, RowSpec};

fn normalize(label: &str) -> String {
    label.trim().to_lowercase()
}

fn selector(row: &RowSpec, kind: GroupKind) -> &str {
    match kind {
        GroupKind::Function => &row.function,
        GroupKind::Cable => &row.cable_detail,
    }
}

/// Collapse consecutive terminals with the same non-empty label.
///
/// Empty labels never open a group and do not close the open one, so
/// `HR, "", HR` is a single `HR` group spanning all three slots. The label
/// of a group is the first spelling seen, trimmed.
pub fn group_runs<R: AsRef<RowSpec>>(rows: &[R], kind: GroupKind) -> Vec<BracketGroup> {
    let mut out: Vec<BracketGroup> = Vec::new();
    let mut open: Option<(BracketGroup, String)> = None;
    for (idx, row) in rows.iter().enumerate() {
        let raw = selector(row.as_ref(), kind);
        let key = normalize(raw);
        if key.is_empty() {
            continue;
        }
        match &mut open {
            Some((g, k)) if *k == key => g.end_index = idx,
            _ => {
                if let Some((g, _)) = open.take() {
                    out.push(g);
                }
                open = Some((
                    BracketGroup {
                        start_index: idx,
                        end_index: idx,
                        label: raw.trim().to_string(),
                        kind,
                    },
                    key,
                ));
            }
        }
    }
    if let Some((g, _)) = open {
        out.push(g);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(function: &str, cable: &str, n: u32) -> RowSpec {
        RowSpec::new("A", function, cable, n)
    }

    #[test]
    fn merges_equal_neighbours() {
        let rows = vec![row("HR", "HR", 1), row("HR", "HR", 2), row("SP", "SP", 3)];
        for kind in [GroupKind::Function, GroupKind::Cable] {
            let groups = group_runs(&rows, kind);
            assert_eq!(groups.len(), 2);
            assert_eq!(
                (groups[0].label.as_str(), groups[0].start_index, groups[0].end_index),
                ("HR", 0, 1)
            );
            assert_eq!(
                (groups[1].label.as_str(), groups[1].start_index, groups[1].end_index),
                ("SP", 2, 2)
            );
            assert!(groups.iter().all(|g| g.kind == kind));
        }
    }

    #[test]
    fn empty_labels_are_skipped_without_closing() {
        let rows = vec![row("HR", "", 1), row("", "", 2), row("hr ", "", 3)];
        let groups = group_runs(&rows, GroupKind::Function);
        assert_eq!(groups.len(), 1);
        assert_eq!((groups[0].start_index, groups[0].end_index), (0, 2));
        assert!(group_runs(&rows, GroupKind::Cable).is_empty());
    }

    #[test]
    fn leading_empty_labels_do_not_start_a_group() {
        let rows = vec![row("", "", 1), row("X", "", 2)];
        let groups = group_runs(&rows, GroupKind::Function);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].start_index, 1);
    }

    #[test]
    fn equal_labels_separated_by_another_label_stay_apart() {
        let rows = vec![row("A", "", 1), row("B", "", 2), row("A", "", 3)];
        assert_eq!(group_runs(&rows, GroupKind::Function).len(), 3);
    }

    #[test]
    fn grouping_is_pure() {
        let rows = vec![row("HR", "C1", 1), row("HR", "C1", 2), row("SP", "C2", 3)];
        let refs: Vec<&RowSpec> = rows.iter().collect();
        assert_eq!(
            group_runs(&refs, GroupKind::Cable),
            group_runs(&refs, GroupKind::Cable)
        );
    }
}
