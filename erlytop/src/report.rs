//! Plain-text summaries printed by the binary: process table and chart slices.

use std::fmt::Write;

use crate::aggregate::ChartSlice;
use crate::sort::SortSpec;
use crate::types::ProcessInfo;

const NAME_WIDTH: usize = 28;

pub fn truncate_middle(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max {
        return s.to_string();
    }
    if max <= 3 {
        return "...".into();
    }
    let keep = max - 3;
    let left = keep / 2;
    let right = keep - left;
    let head: String = s.chars().take(left).collect();
    let tail: String = s.chars().skip(len - right).collect();
    format!("{head}...{tail}")
}

/// Column headers, with a marker on the active sort column.
fn header(sort: Option<&SortSpec>) -> [String; 7] {
    let cols = [
        ("pid", "PID"),
        ("proc", "Name"),
        ("reduc", "Reductions"),
        ("mqueue", "MsgQ"),
        ("heapsize", "Heap"),
        ("stacksize", "Stack"),
        ("totalheapsize", "Total Heap"),
    ];
    cols.map(|(id, title)| match sort {
        Some(s) if s.key.id() == id => format!("{title} •"),
        _ => title.to_string(),
    })
}

pub fn format_table(procs: &[ProcessInfo], sort: Option<&SortSpec>) -> String {
    let h = header(sort);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<14} {:<w$} {:>12} {:>6} {:>10} {:>8} {:>12}",
        h[0], h[1], h[2], h[3], h[4], h[5], h[6],
        w = NAME_WIDTH
    );
    for p in procs {
        let _ = writeln!(
            out,
            "{:<14} {:<w$} {:>12} {:>6} {:>10} {:>8} {:>12}",
            p.pid,
            truncate_middle(&p.process_name, NAME_WIDTH),
            p.reductions,
            p.msg_queue_len,
            p.heap_size,
            p.stack_size,
            p.total_heap_size,
            w = NAME_WIDTH
        );
    }
    out
}

pub fn format_chart(title: &str, slices: &[ChartSlice]) -> String {
    let total: u128 = slices.iter().map(|s| s.value).sum();
    let mut out = format!("{title}\n");
    if total == 0 {
        out.push_str("  (no data)\n");
        return out;
    }
    for s in slices {
        let pct = s.value as f64 / total as f64 * 100.0;
        let _ = writeln!(
            out,
            "  {:<w$} {:>12} {pct:>6.2}%",
            truncate_middle(&s.label, NAME_WIDTH),
            s.value,
            w = NAME_WIDTH
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::{SortDirection, SortKey};

    #[test]
    fn truncate_keeps_both_ends() {
        assert_eq!(truncate_middle("short", 10), "short");
        assert_eq!(truncate_middle("application_controller", 10), "app...ller");
        assert_eq!(truncate_middle("abcdef", 3), "...");
    }

    #[test]
    fn table_marks_sort_column() {
        let p = ProcessInfo {
            pid: "<0.1.0>".into(),
            process_name: "init".into(),
            reductions: 42,
            msg_queue_len: 0,
            heap_size: 376,
            stack_size: 7,
            total_heap_size: 1974,
        };
        let spec = SortSpec::new(SortKey::Reduc, SortDirection::Descending);
        let out = format_table(&[p], Some(&spec));
        let mut lines = out.lines();
        assert!(lines.next().unwrap().contains("Reductions •"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("<0.1.0>"));
        assert!(row.contains("init") && row.contains("1974"));
    }

    #[test]
    fn chart_handles_totals_past_u64() {
        let slices = vec![
            ChartSlice { label: "a".into(), value: u64::MAX as u128 },
            ChartSlice { label: "Other".into(), value: u64::MAX as u128 },
        ];
        let out = format_chart("Reductions", &slices);
        assert_eq!(out.matches("50.00%").count(), 2, "{out}");
    }

    #[test]
    fn chart_lists_percentages() {
        let slices = vec![
            ChartSlice { label: "a".into(), value: 3 },
            ChartSlice { label: "Other".into(), value: 1 },
        ];
        let out = format_chart("Process Heap", &slices);
        assert!(out.starts_with("Process Heap\n"));
        assert!(out.contains("75.00%"));
        assert!(out.contains("25.00%"));
        assert!(format_chart("Empty", &[]).contains("(no data)"));
    }
}
