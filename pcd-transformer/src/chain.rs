use pcd_core::pointcloud::{header::Header, point::Point, quantize::ScaleOffset};
use serde::{Deserialize, Serialize};

use crate::{
    decompress::Decompress,
    filter::PointFilter,
    registers::Registers,
    transform::{OffsetAdjust, Operation, OperationContext},
};

const GROWTH_BLOCK: usize = 16;

pub(crate) struct ChainEntry {
    pub(crate) operation: Box<dyn Operation>,
    pub(crate) adjust: OffsetAdjust,
    overflow: u64,
}

/// Overflow total of one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverflowReport {
    pub operation: String,
    pub count: u64,
}

/// Header seen and produced by the last offset adjustment.
#[derive(Debug, Clone)]
pub(crate) struct AdjustmentMemo {
    pub(crate) input: Header,
    pub(crate) output: Header,
    pub(crate) rescale: Option<[f64; 3]>,
}

/// Ordered operations applied to one point at a time, plus the state they share.
///
/// A chain is not shared between threads; parallel workers each build their own.
#[derive(Default)]
pub struct OperationChain {
    pub(crate) entries: Vec<ChainEntry>,
    registers: Registers,
    filter: Option<Box<dyn PointFilter>>,
    is_filtered: bool,
    pub(crate) memo: Option<AdjustmentMemo>,
}

impl OperationChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_operation(&mut self, operation: Box<dyn Operation>) {
        if self.entries.len() == self.entries.capacity() {
            self.entries.reserve_exact(GROWTH_BLOCK);
        }
        self.entries.push(ChainEntry {
            operation,
            adjust: OffsetAdjust::default(),
            overflow: 0,
        });
        self.memo = None;
    }

    /// Removes every operation named `name` and returns how many were removed.
    pub fn remove_operations_by_name(&mut self, name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.operation.name() != name);
        let removed = before - self.entries.len();
        if removed > 0 {
            self.memo = None;
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn operations(&self) -> impl Iterator<Item = &dyn Operation> {
        self.entries.iter().map(|entry| entry.operation.as_ref())
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    pub fn set_filter(&mut self, filter: Box<dyn PointFilter>) {
        self.filter = Some(filter);
    }

    /// With `true`, points rejected by the filter bypass the chain instead of being dropped.
    pub fn set_filtered(&mut self, is_filtered: bool) {
        self.is_filtered = is_filtered;
    }

    pub fn is_filtered(&self) -> bool {
        self.is_filtered
    }

    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }

    pub fn rejects(&self, point: &Point) -> bool {
        self.filter
            .as_ref()
            .is_some_and(|filter| !filter.accepts(point))
    }

    /// Offset adjustment state of the operation at `index`.
    pub fn offset_adjust(&self, index: usize) -> Option<&OffsetAdjust> {
        self.entries.get(index).map(|entry| &entry.adjust)
    }

    pub fn is_adjusting(&self) -> bool {
        self.entries.iter().any(|entry| entry.adjust.enabled)
    }

    /// Turns offset adjustment off for every operation.
    pub fn disable_offset_adjust(&mut self) {
        for entry in &mut self.entries {
            entry.adjust = OffsetAdjust::default();
        }
        self.memo = None;
    }

    /// Quantization points leave the chain with while offsets are adjusted.
    pub fn output_quantization(&self) -> Option<ScaleOffset> {
        if !self.is_adjusting() {
            return None;
        }
        self.entries.last().map(|entry| entry.adjust.adjusted)
    }

    /// Runs every operation on `point` in order.
    ///
    /// When the chain is filtered and the filter rejects the point, its fields and stored
    /// integers are left as they are. While adjusting, those integers are then read against the
    /// output quantization.
    ///
    /// After an adjusting operation the point carries that operation's adjusted quantization.
    pub fn apply_all(&mut self, point: &mut Point) {
        if self.is_filtered && self.rejects(point) {
            if let Some(quantization) = self.output_quantization() {
                point.quantizer = quantization;
            }
            return;
        }

        let registers = &mut self.registers;
        for entry in &mut self.entries {
            let mut cx = OperationContext::new(registers, Some(&entry.adjust), &mut entry.overflow);
            entry.operation.apply(point, &mut cx);
            if cx.is_adjusting() {
                if !entry.operation.moves_coordinates() {
                    cx.requantize(point);
                }
                point.quantizer = entry.adjust.adjusted;
            }
        }
    }

    pub fn decompression_requirements(&self) -> Decompress {
        let baseline = if self.is_adjusting() {
            Decompress::CHANNEL_RETURNS_XY | Decompress::Z
        } else {
            Decompress::CHANNEL_RETURNS_XY
        };
        self.entries.iter().fold(baseline, |acc, entry| {
            acc | entry.operation.decompression_requirements()
        })
    }

    /// Rewinds every operation and zeroes the registers, before each new input file.
    pub fn reset_all(&mut self) {
        for entry in &mut self.entries {
            entry.operation.reset();
        }
        self.registers.clear();
    }

    pub fn overflow_count(&self, index: usize) -> Option<u64> {
        self.entries.get(index).map(|entry| entry.overflow)
    }

    pub fn clear_overflow(&mut self) {
        for entry in &mut self.entries {
            entry.overflow = 0;
        }
    }

    /// Operations with at least one overflowing value.
    pub fn overflow_summary(&self) -> Vec<OverflowReport> {
        self.entries
            .iter()
            .filter(|entry| entry.overflow > 0)
            .map(|entry| OverflowReport {
                operation: entry.operation.command_text(),
                count: entry.overflow,
            })
            .collect()
    }

    pub fn report_overflow(&self) {
        for report in self.overflow_summary() {
            log::warn!(
                "'{}' produced {} values that did not fit their field",
                report.operation,
                report.count
            );
        }
    }
}

impl std::fmt::Debug for OperationChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let commands: Vec<String> = self.operations().map(|op| op.command_text()).collect();
        f.debug_struct("OperationChain")
            .field("operations", &commands)
            .field("is_filtered", &self.is_filtered)
            .finish()
    }
}
