//! Chart data: fold small processes into a single "Other" slice.
//!
//! Too many slices make a pie chart unreadable, so any process whose share
//! of the total is below the threshold fraction is summed into "Other".

use std::fmt;
use std::str::FromStr;

use crate::types::ProcessInfo;

pub const OTHER_LABEL: &str = "Other";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSlice {
    pub label: String,
    /// Widened so a folded "Other" never overflows.
    pub value: u128,
}

/// Minimum share of the total, `num / den`, for a process to get its own slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdFraction {
    num: u64,
    den: u64,
}

impl ThresholdFraction {
    pub fn new(num: u64, den: u64) -> Option<Self> {
        (den != 0).then_some(Self { num, den })
    }

    /// `total * num / den`, floored. Below `den / num` the threshold is 0
    /// and every process, zero-valued ones included, gets its own slice.
    pub fn threshold(&self, total: u128) -> u128 {
        total.saturating_mul(self.num as u128) / self.den as u128
    }
}

impl Default for ThresholdFraction {
    fn default() -> Self {
        Self { num: 1, den: 200 }
    }
}

impl fmt::Display for ThresholdFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcMetric {
    Reductions,
    HeapSize,
    StackSize,
    TotalHeapSize,
}

impl ProcMetric {
    pub fn extract(self, p: &ProcessInfo) -> u64 {
        match self {
            ProcMetric::Reductions => p.reductions,
            ProcMetric::HeapSize => p.heap_size,
            ProcMetric::StackSize => p.stack_size,
            ProcMetric::TotalHeapSize => p.total_heap_size,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ProcMetric::Reductions => "Reductions",
            ProcMetric::HeapSize => "Process Heap",
            ProcMetric::StackSize => "Process Stack",
            ProcMetric::TotalHeapSize => "Total Heap",
        }
    }
}

impl FromStr for ProcMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reduc" | "reductions" => Ok(ProcMetric::Reductions),
            "heap" | "heapsize" => Ok(ProcMetric::HeapSize),
            "stack" | "stacksize" => Ok(ProcMetric::StackSize),
            "totalheap" | "totalheapsize" => Ok(ProcMetric::TotalHeapSize),
            _ => Err(format!("unknown chart metric '{s}'")),
        }
    }
}

/// Split `items` into individually labelled slices and one trailing "Other".
///
/// Individual slices keep input order and carry the extracted value. The
/// slice values always sum to the sum of the extracted values. An all-zero
/// input yields no slices.
pub fn aggregate<F>(items: &[ProcessInfo], extractor: F, fraction: ThresholdFraction) -> Vec<ChartSlice>
where
    F: Fn(&ProcessInfo) -> u64,
{
    let total: u128 = items.iter().map(|p| extractor(p) as u128).sum();
    if total == 0 {
        return Vec::new();
    }

    let threshold = fraction.threshold(total);
    let mut slices = Vec::new();
    let mut other: u128 = 0;
    for p in items {
        let value = extractor(p) as u128;
        if value >= threshold {
            slices.push(ChartSlice {
                label: p.label().to_string(),
                value,
            });
        } else {
            other += value;
        }
    }

    if other > 0 {
        slices.push(ChartSlice {
            label: OTHER_LABEL.to_string(),
            value: other,
        });
    }
    slices
}

pub fn aggregate_metric(
    items: &[ProcessInfo],
    metric: ProcMetric,
    fraction: ThresholdFraction,
) -> Vec<ChartSlice> {
    aggregate(items, |p| metric.extract(p), fraction)
}
