//! Re-offsetting the quantization while a chain moves points around.
//!
//! Before any point is read, the header's bounding box is pushed through every operation's
//! preview. After each operation a new offset is picked near the middle of the moved box so
//! that the coordinates it produces still fit in `i32` under the (unchanged or requested)
//! scale. Only the two box corners are transformed; for rotations this underestimates the
//! true box.

use pcd_core::pointcloud::{
    header::{BoundingVolume, Header, QuantizationSink},
    quantize::ScaleOffset,
};
use serde::{Deserialize, Serialize};

use crate::{
    chain::{AdjustmentMemo, OperationChain},
    transform::{OffsetAdjust, Preview},
};

/// Candidate offsets are snapped to multiples of this many scale units.
const OFFSET_GRID: f64 = 10_000_000.0;

/// What the adjustment decided for one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentStep {
    pub operation: String,
    pub enabled: bool,
    pub original: ScaleOffset,
    pub adjusted: ScaleOffset,
    /// Bounding box after this operation.
    pub bounding_volume: BoundingVolume,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentPlan {
    pub steps: Vec<AdjustmentStep>,
    pub quantization: ScaleOffset,
    pub bounding_volume: BoundingVolume,
}

fn snapped_offset(min: f64, max: f64, scale: f64) -> f64 {
    ((min + max) / scale / (2.0 * OFFSET_GRID)).floor() * OFFSET_GRID * scale
}

/// Box the adjustment starts from. Axes whose extent was never recorded collapse onto the
/// header offset.
fn starting_box(header: &Header) -> BoundingVolume {
    let mut bounds = header.bounding_volume;
    for axis in 0..3 {
        if bounds.is_degenerate(axis) {
            log::debug!(
                "bounding box of axis {axis} is not known, starting from the offset {}",
                header.quantization.offset[axis]
            );
            bounds.min[axis] = header.quantization.offset[axis];
            bounds.max[axis] = header.quantization.offset[axis];
        }
    }
    bounds
}

/// Configures every operation of `chain` for offset adjustment and rewrites `header` with the
/// final scale, offset and bounding box.
///
/// `rescale` replaces the scale of every adjusted operation. The final quantization is also
/// handed to `sink`. Running it again on the header it produced, with an unchanged chain,
/// gives the same result.
pub fn adjust_offsets(
    chain: &mut OperationChain,
    header: &mut Header,
    rescale: Option<[f64; 3]>,
    sink: &mut dyn QuantizationSink,
) -> AdjustmentPlan {
    let input = match &chain.memo {
        Some(memo) if memo.output == *header && memo.rescale == rescale => memo.input.clone(),
        _ => header.clone(),
    };

    let original = input.quantization;
    let mut bounds = starting_box(&input);
    let mut previous = original;
    let mut steps = Vec::with_capacity(chain.entries.len());

    for (index, entry) in chain.entries.iter_mut().enumerate() {
        let operation = &entry.operation;
        let corners = (operation.preview(bounds.min), operation.preview(bounds.max));

        entry.adjust = match corners {
            (Preview::Coordinates(low), Preview::Coordinates(high)) => {
                let mut offset = previous.offset;
                for axis in 0..3 {
                    if !(low[axis].is_finite() && high[axis].is_finite()) {
                        continue;
                    }
                    let unchanged = low[axis] == bounds.min[axis] && high[axis] == bounds.max[axis];
                    if !unchanged {
                        let candidate = snapped_offset(low[axis], high[axis], original.scale[axis]);
                        offset[axis] = if candidate == 0.0 && index == 0 {
                            original.offset[axis]
                        } else {
                            candidate
                        };
                    }
                    bounds.min[axis] = low[axis].min(high[axis]);
                    bounds.max[axis] = low[axis].max(high[axis]);
                }
                OffsetAdjust {
                    enabled: true,
                    original: previous,
                    adjusted: ScaleOffset::new(rescale.unwrap_or(original.scale), offset),
                }
            }
            _ => {
                log::warn!(
                    "'{}' cannot be offset adjusted, it runs on the quantization it receives",
                    operation.command_text()
                );
                OffsetAdjust {
                    enabled: false,
                    original: previous,
                    adjusted: previous,
                }
            }
        };

        previous = entry.adjust.adjusted;
        steps.push(AdjustmentStep {
            operation: entry.operation.command_text(),
            enabled: entry.adjust.enabled,
            original: entry.adjust.original,
            adjusted: entry.adjust.adjusted,
            bounding_volume: bounds,
        });
    }

    header.quantization = previous;
    header.bounding_volume = bounds;
    sink.set_offset(previous.offset);
    sink.set_scale_factor(previous.scale);

    chain.memo = Some(AdjustmentMemo {
        input,
        output: header.clone(),
        rescale,
    });

    AdjustmentPlan {
        steps,
        quantization: previous,
        bounding_volume: bounds,
    }
}

#[cfg(test)]
mod tests {
    use pcd_core::pointcloud::{point::Point, quantize::quantize};

    use super::*;
    use crate::{
        filter::{CriteriaFilter, Criterion},
        transform::{
            attribute::CopyAttributeIntoZ,
            catalog::SetClassification,
            coordinate::{Plane, Rotate, ScaleX, TranslateX, TranslateXyz},
        },
    };

    #[derive(Default)]
    struct RecordingSink {
        offset: Option<[f64; 3]>,
        scale: Option<[f64; 3]>,
    }

    impl QuantizationSink for RecordingSink {
        fn set_offset(&mut self, offset: [f64; 3]) {
            self.offset = Some(offset);
        }

        fn set_scale_factor(&mut self, scale: [f64; 3]) {
            self.scale = Some(scale);
        }
    }

    fn make_header() -> Header {
        Header {
            point_count: 4,
            quantization: ScaleOffset::new([0.01; 3], [0.0; 3]),
            bounding_volume: BoundingVolume::new([0.0, 0.0, 0.0], [1000.0, 1000.0, 100.0]),
        }
    }

    fn fits(quantization: &ScaleOffset, xyz: [f64; 3]) -> bool {
        (0..3).all(|axis| quantize(xyz[axis], quantization.offset[axis], quantization.scale[axis]).is_some())
    }

    #[test]
    fn zero_translation_keeps_header() {
        let mut header = Header {
            quantization: ScaleOffset::new([0.001, 0.001, 0.01], [123.45, -67.8, 9.0]),
            ..make_header()
        };
        let input = header.clone();
        let mut chain = OperationChain::new();
        chain.add_operation(Box::new(TranslateX { offset: 0.0 }));

        let mut sink = RecordingSink::default();
        adjust_offsets(&mut chain, &mut header, None, &mut sink);
        assert_eq!(
            header.quantization.offset.map(f64::to_bits),
            input.quantization.offset.map(f64::to_bits)
        );
        assert_eq!(
            header.quantization.scale.map(f64::to_bits),
            input.quantization.scale.map(f64::to_bits)
        );
        assert_eq!(sink.offset, Some(input.quantization.offset));
    }

    #[test]
    fn first_step_keeps_original_offset_near_zero() {
        let mut header = Header {
            quantization: ScaleOffset::new([0.01; 3], [5.0, 5.0, 5.0]),
            ..make_header()
        };
        let mut chain = OperationChain::new();
        chain.add_operation(Box::new(TranslateXyz {
            x: 1.0,
            y: 1.0,
            z: 1.0,
        }));
        let plan = adjust_offsets(&mut chain, &mut header, None, &mut RecordingSink::default());
        assert_eq!(plan.quantization.offset, [5.0, 5.0, 5.0]);
        assert_eq!(plan.bounding_volume.max, [1001.0, 1001.0, 101.0]);
    }

    #[test]
    fn translate_then_rotate_stays_representable() {
        let mut header = make_header();
        let mut chain = OperationChain::new();
        chain.add_operation(Box::new(TranslateXyz {
            x: 1_000_000.0,
            y: 1_000_000.0,
            z: 0.0,
        }));
        chain.add_operation(Box::new(Rotate::new(Plane::XY, 45.0, [0.0, 0.0])));

        let mut sink = RecordingSink::default();
        let plan = adjust_offsets(&mut chain, &mut header, None, &mut sink);
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].adjusted.offset, [1_000_000.0, 1_000_000.0, 0.0]);
        assert_eq!(plan.steps[1].original, plan.steps[0].adjusted);
        assert_eq!(header.quantization, plan.quantization);
        assert_eq!(sink.offset, Some(plan.quantization.offset));
        assert_eq!(sink.scale, Some([0.01; 3]));

        let corners = [plan.bounding_volume.min, plan.bounding_volume.max];
        for corner in corners {
            assert!(fits(&plan.quantization, corner), "{corner:?} overflows");
        }

        let first = plan.quantization;
        let again = adjust_offsets(&mut chain, &mut header, None, &mut RecordingSink::default());
        assert_eq!(again.quantization, first);
        assert_eq!(again, plan);

        let mut fresh = make_header();
        let replay = adjust_offsets(&mut chain, &mut fresh, None, &mut RecordingSink::default());
        assert_eq!(replay.quantization, first);
    }

    #[test]
    fn adjusted_chain_moves_points_without_overflow() {
        let mut header = make_header();
        let mut chain = OperationChain::new();
        chain.add_operation(Box::new(TranslateXyz {
            x: 30_000_000.0,
            y: -30_000_000.0,
            z: 0.0,
        }));
        chain.add_operation(Box::new(SetClassification { class: 2 }));
        adjust_offsets(&mut chain, &mut header, None, &mut RecordingSink::default());

        let original = ScaleOffset::new([0.01; 3], [0.0; 3]);
        for xyz in [[0.0, 0.0, 0.0], [1000.0, 1000.0, 100.0], [512.25, 3.5, 7.0]] {
            let mut point = Point {
                quantizer: original,
                ..Default::default()
            };
            for axis in 0..3 {
                assert!(point.set_coordinate(axis, xyz[axis]));
            }
            chain.apply_all(&mut point);

            assert_eq!(point.quantizer, header.quantization);
            let moved = point.coordinates();
            assert!((moved[0] - (xyz[0] + 30_000_000.0)).abs() < 1e-6);
            assert!((moved[1] - (xyz[1] - 30_000_000.0)).abs() < 1e-6);
            assert!((moved[2] - xyz[2]).abs() < 1e-6);
            assert_eq!(point.attributes.classification, 2);
        }
        assert_eq!(chain.overflow_count(0), Some(0));
    }

    #[test]
    fn unsupported_operation_runs_unadjusted() {
        let mut header = make_header();
        let mut chain = OperationChain::new();
        chain.add_operation(Box::new(TranslateX {
            offset: 50_000_000.0,
        }));
        chain.add_operation(Box::new(CopyAttributeIntoZ { index: 0 }));

        let plan = adjust_offsets(&mut chain, &mut header, None, &mut RecordingSink::default());
        let step = &plan.steps[1];
        assert!(!step.enabled);
        assert_eq!(step.original, plan.steps[0].adjusted);
        assert_eq!(step.adjusted, step.original);
        assert_eq!(chain.offset_adjust(1).map(|adjust| adjust.enabled), Some(false));

        let mut point = Point {
            quantizer: ScaleOffset::new([0.01; 3], [0.0; 3]),
            extra_bytes: vec![12.5],
            ..Default::default()
        };
        point.set_coordinate(0, 10.0);
        chain.apply_all(&mut point);
        assert!((point.x() - 50_000_010.0).abs() < 1e-6);
        assert!((point.z() - 12.5).abs() < 1e-6);
    }

    #[test]
    fn rescale_applies_to_adjusted_operations() {
        let mut header = make_header();
        let mut chain = OperationChain::new();
        chain.add_operation(Box::new(TranslateX { offset: 10.0 }));
        let mut sink = RecordingSink::default();
        adjust_offsets(&mut chain, &mut header, Some([0.001, 0.001, 0.001]), &mut sink);
        assert_eq!(header.quantization.scale, [0.001; 3]);
        assert_eq!(sink.scale, Some([0.001; 3]));
    }

    #[test]
    fn unknown_extent_starts_from_offset() {
        let mut header = Header {
            quantization: ScaleOffset::new([0.01; 3], [100.0, 200.0, 0.0]),
            bounding_volume: BoundingVolume::default(),
            ..make_header()
        };
        let mut chain = OperationChain::new();
        chain.add_operation(Box::new(TranslateX { offset: 1.0 }));
        let plan = adjust_offsets(&mut chain, &mut header, None, &mut RecordingSink::default());
        assert_eq!(plan.bounding_volume.min, [101.0, 200.0, 0.0]);
        assert_eq!(plan.bounding_volume.max, [101.0, 200.0, 0.0]);
    }

    #[test]
    fn non_finite_axis_keeps_previous_offset() {
        let mut header = make_header();
        let mut chain = OperationChain::new();
        chain.add_operation(Box::new(TranslateX { offset: 40_000_000.0 }));
        chain.add_operation(Box::new(ScaleX { scale: f64::INFINITY }));
        let plan = adjust_offsets(&mut chain, &mut header, None, &mut RecordingSink::default());
        assert_eq!(plan.steps[1].adjusted.offset, plan.steps[0].adjusted.offset);
        assert_eq!(plan.bounding_volume, plan.steps[0].bounding_volume);
    }

    fn make_point(xyz: [f64; 3], class: u8) -> Point {
        let mut point = Point {
            quantizer: ScaleOffset::new([0.01; 3], [0.0; 3]),
            ..Default::default()
        };
        for axis in 0..3 {
            assert!(point.set_coordinate(axis, xyz[axis]));
        }
        point.attributes.classification = class;
        point
    }

    #[test]
    fn overflow_is_counted_against_adjusted_offset() {
        let mut header = Header {
            bounding_volume: BoundingVolume::new([0.0; 3], [100.0; 3]),
            ..make_header()
        };
        let mut chain = OperationChain::new();
        chain.add_operation(Box::new(TranslateX {
            offset: 100_000_000.0,
        }));
        chain.add_operation(Box::new(ScaleX { scale: 2.0 }));
        let plan = adjust_offsets(&mut chain, &mut header, None, &mut RecordingSink::default());
        assert_eq!(plan.steps[0].adjusted.offset, [100_000_000.0, 0.0, 0.0]);
        assert_eq!(plan.steps[1].adjusted.offset, [200_000_000.0, 0.0, 0.0]);

        // points far outside the header box leave the second step's range
        let mut points: Vec<Point> = (0..10)
            .map(|i| {
                let x = if i % 3 == 0 { 20_000_000.0 } else { 10.0 };
                make_point([x, 1.0, 1.0], 1)
            })
            .collect();
        for point in &mut points {
            chain.apply_all(point);
        }

        assert_eq!(chain.overflow_count(0), Some(0));
        assert_eq!(chain.overflow_count(1), Some(4));
        for (i, point) in points.iter().enumerate() {
            assert_eq!(point.quantizer, plan.quantization);
            if i % 3 == 0 {
                // left where the translation put it
                assert_eq!(point.raw[0], 2_000_000_000);
            } else {
                assert!((point.x() - 200_000_020.0).abs() < 1e-6);
            }
            assert!((point.y() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn rejected_points_keep_stored_integers_when_adjusting() {
        let mut header = make_header();
        let mut chain = OperationChain::new();
        chain.add_operation(Box::new(TranslateX {
            offset: 100_000_000.0,
        }));
        chain.set_filter(Box::new(CriteriaFilter::new(vec![Criterion::DropClass(vec![5])])));
        chain.set_filtered(true);
        let plan = adjust_offsets(&mut chain, &mut header, None, &mut RecordingSink::default());
        assert_eq!(chain.output_quantization(), Some(plan.quantization));

        let mut kept = make_point([10.0, 2.0, 3.0], 2);
        let mut rejected = make_point([10.0, 2.0, 3.0], 5);
        let raw = rejected.raw;
        chain.apply_all(&mut kept);
        chain.apply_all(&mut rejected);

        assert!((kept.x() - 100_000_010.0).abs() < 1e-6);
        assert_eq!(rejected.raw, raw);
        assert_eq!(rejected.quantizer, plan.quantization);
        assert!(fits(&plan.quantization, rejected.coordinates()));
        assert_eq!(chain.overflow_count(0), Some(0));
    }
}
