use pcd_core::pointcloud::{
    header::{Header, QuantizationSink},
    point::Point,
};

use crate::{
    builder::TransformOptions,
    chain::{OperationChain, OverflowReport},
    decompress::Decompress,
    offset::{adjust_offsets, AdjustmentPlan},
};

pub trait Transformer {
    /// Readies the transformer for a new file and returns the offset adjustment, if any.
    fn prepare(&mut self, header: &mut Header, sink: &mut dyn QuantizationSink) -> Option<AdjustmentPlan>;

    /// Transforms one point; `false` means the point is dropped from the output.
    fn execute(&mut self, point: &mut Point) -> bool;

    /// Ends the current file and returns its overflow totals.
    fn finish(&mut self) -> Vec<OverflowReport>;
}

pub struct PointCloudTransformer {
    chain: OperationChain,
    options: TransformOptions,
}

impl PointCloudTransformer {
    pub fn new(chain: OperationChain, options: TransformOptions) -> Self {
        Self { chain, options }
    }

    pub fn chain(&self) -> &OperationChain {
        &self.chain
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    pub fn decompression_requirements(&self) -> Decompress {
        self.chain.decompression_requirements()
    }
}

impl Transformer for PointCloudTransformer {
    fn prepare(&mut self, header: &mut Header, sink: &mut dyn QuantizationSink) -> Option<AdjustmentPlan> {
        self.chain.reset_all();
        self.chain.clear_overflow();

        if !self.options.auto_reoffset {
            self.chain.disable_offset_adjust();
            return None;
        }

        let plan = adjust_offsets(&mut self.chain, header, self.options.rescale, sink);
        for step in plan.steps.iter().filter(|step| step.enabled) {
            log::debug!(
                "{}: offset {:?} -> {:?}",
                step.operation,
                step.original.offset,
                step.adjusted.offset
            );
        }
        log::info!(
            "re-offset to {:?} with scale {:?}",
            plan.quantization.offset,
            plan.quantization.scale
        );
        Some(plan)
    }

    fn execute(&mut self, point: &mut Point) -> bool {
        if !self.chain.is_filtered() && self.chain.rejects(point) {
            return false;
        }
        self.chain.apply_all(point);
        true
    }

    fn finish(&mut self) -> Vec<OverflowReport> {
        self.chain.report_overflow();
        self.chain.overflow_summary()
    }
}
