//! Single-column process table sorting.
//!
//! Column ids match the table's column ids (`pid`, `proc`, `reduc`, ...).
//! Only one column is ever active; choosing another replaces it.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::types::ProcessInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    Pid,
    Proc,
    Reduc,
    MQueue,
    HeapSize,
    StackSize,
    TotalHeapSize,
}

impl SortKey {
    pub const ALL: [SortKey; 7] = [
        SortKey::Pid,
        SortKey::Proc,
        SortKey::Reduc,
        SortKey::MQueue,
        SortKey::HeapSize,
        SortKey::StackSize,
        SortKey::TotalHeapSize,
    ];

    pub fn id(self) -> &'static str {
        match self {
            SortKey::Pid => "pid",
            SortKey::Proc => "proc",
            SortKey::Reduc => "reduc",
            SortKey::MQueue => "mqueue",
            SortKey::HeapSize => "heapsize",
            SortKey::StackSize => "stacksize",
            SortKey::TotalHeapSize => "totalheapsize",
        }
    }

    fn compare(self, a: &ProcessInfo, b: &ProcessInfo) -> Ordering {
        match self {
            SortKey::Pid => a.pid.cmp(&b.pid),
            SortKey::Proc => a.process_name.cmp(&b.process_name),
            SortKey::Reduc => a.reductions.cmp(&b.reductions),
            SortKey::MQueue => a.msg_queue_len.cmp(&b.msg_queue_len),
            SortKey::HeapSize => a.heap_size.cmp(&b.heap_size),
            SortKey::StackSize => a.stack_size.cmp(&b.stack_size),
            SortKey::TotalHeapSize => a.total_heap_size.cmp(&b.total_heap_size),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|k| k.id() == s)
            .ok_or_else(|| format!("unknown sort column '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            _ => Err(format!("unknown sort direction '{s}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    pub fn compare(&self, a: &ProcessInfo, b: &ProcessInfo) -> Ordering {
        let ord = self.key.compare(a, b);
        match self.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }
}

/// Parses `COL` or `COL:asc` / `COL:desc`.
impl FromStr for SortSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (col, dir) = match s.split_once(':') {
            Some((c, d)) => (c, d.parse()?),
            None => (s, SortDirection::Ascending),
        };
        Ok(SortSpec::new(col.parse()?, dir))
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        };
        write!(f, "{}:{dir}", self.key)
    }
}

/// Reorder `items` in place. `None` leaves them untouched; the sort is
/// stable, so rows with equal keys keep their relative order.
pub fn apply_sort(spec: Option<&SortSpec>, items: &mut [ProcessInfo]) {
    if let Some(spec) = spec {
        items.sort_by(|a, b| spec.compare(a, b));
    }
}

pub fn sorted(spec: Option<&SortSpec>, mut items: Vec<ProcessInfo>) -> Vec<ProcessInfo> {
    apply_sort(spec, &mut items);
    items
}
