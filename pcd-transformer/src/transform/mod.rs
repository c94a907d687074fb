use pcd_core::pointcloud::{
    point::Point,
    quantize::{quantize_u16, quantize_u8, ScaleOffset},
};

use crate::{decompress::Decompress, registers::Registers};

#[macro_use]
mod macros;

pub mod attribute;
pub mod catalog;
pub mod coordinate;
pub mod mapping;
pub mod raw;

/// Result of running an operation's formula on a bare coordinate triple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Preview {
    Coordinates([f64; 3]),
    /// The operation takes its coordinates from something other than x/y/z, so the
    /// bounding box after it cannot be derived from the box before it.
    Unsupported,
}

/// One per-point mutation of the chain.
pub trait Operation: Send {
    fn name(&self) -> &'static str;

    /// The flag and arguments this operation was parsed from.
    fn command_text(&self) -> String {
        format!("-{}", self.name())
    }

    fn apply(&mut self, point: &mut Point, cx: &mut OperationContext<'_>);

    /// Runs the formula on `xyz` without touching a point.
    ///
    /// Operations that leave coordinates alone keep the default and pass `xyz` through.
    fn preview(&self, xyz: [f64; 3]) -> Preview {
        Preview::Coordinates(xyz)
    }

    /// `true` when [`Operation::apply`] rewrites coordinates through
    /// [`OperationContext::map_coordinates`].
    fn moves_coordinates(&self) -> bool {
        false
    }

    fn decompression_requirements(&self) -> Decompress {
        Decompress::empty()
    }

    /// Rewinds replay or random state.
    fn reset(&mut self) {}
}

/// Scale/offset bookkeeping of one chain entry while offsets are being adjusted.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OffsetAdjust {
    pub enabled: bool,
    /// Quantization of the coordinates this entry receives.
    pub original: ScaleOffset,
    /// Quantization of the coordinates this entry hands on.
    pub adjusted: ScaleOffset,
}

impl OffsetAdjust {
    pub fn is_identity(&self) -> bool {
        self.original == self.adjusted
    }
}

/// Per-call view of the chain state an operation may touch.
pub struct OperationContext<'a> {
    pub registers: &'a mut Registers,
    adjust: Option<&'a OffsetAdjust>,
    overflow: &'a mut u64,
}

impl<'a> OperationContext<'a> {
    /// `adjust` is only honoured when it is enabled.
    pub fn new(
        registers: &'a mut Registers,
        adjust: Option<&'a OffsetAdjust>,
        overflow: &'a mut u64,
    ) -> Self {
        Self {
            registers,
            adjust: adjust.filter(|adjust| adjust.enabled),
            overflow,
        }
    }

    pub fn is_adjusting(&self) -> bool {
        self.adjust.is_some()
    }

    pub fn coordinate(&self, point: &Point, axis: usize) -> f64 {
        match self.adjust {
            Some(adjust) => adjust.original.dequantize(axis, point.raw[axis]),
            None => point.coordinate(axis),
        }
    }

    pub fn coordinates(&self, point: &Point) -> [f64; 3] {
        [
            self.coordinate(point, 0),
            self.coordinate(point, 1),
            self.coordinate(point, 2),
        ]
    }

    /// Writes one axis. A value that does not fit an `i32` is counted and not written.
    pub fn set_coordinate(&mut self, point: &mut Point, axis: usize, value: f64) {
        let raw = match self.adjust {
            Some(adjust) => adjust.adjusted.quantize(axis, value),
            None => point.quantizer.quantize(axis, value),
        };
        match raw {
            Some(raw) => point.raw[axis] = raw,
            None => *self.overflow += 1,
        }
    }

    /// Reads all three coordinates, runs `f`, and writes the result back.
    ///
    /// While adjusting every axis is re-quantized because the adjusted offset may differ from
    /// the original one even on axes `f` leaves alone.
    pub fn map_coordinates(&mut self, point: &mut Point, f: impl FnOnce([f64; 3]) -> [f64; 3]) {
        let before = self.coordinates(point);
        let after = f(before);
        let adjusting = self.is_adjusting();
        for axis in 0..3 {
            if adjusting || after[axis].to_bits() != before[axis].to_bits() {
                self.set_coordinate(point, axis, after[axis]);
            }
        }
    }

    /// Moves the point from the original onto the adjusted quantization unchanged.
    pub fn requantize(&mut self, point: &mut Point) {
        if self.adjust.is_some_and(|adjust| !adjust.is_identity()) {
            self.map_coordinates(point, |xyz| xyz);
        }
    }

    pub fn clamp_u8(&mut self, value: f64) -> u8 {
        let (value, clamped) = quantize_u8(value);
        if clamped {
            *self.overflow += 1;
        }
        value
    }

    pub fn clamp_u16(&mut self, value: f64) -> u16 {
        let (value, clamped) = quantize_u16(value);
        if clamped {
            *self.overflow += 1;
        }
        value
    }

    pub fn record_overflow(&mut self) {
        *self.overflow += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_point() -> Point {
        Point {
            raw: [100, 200, 300],
            quantizer: ScaleOffset::new([0.01; 3], [0.0; 3]),
            ..Default::default()
        }
    }

    #[test]
    fn plain_context_uses_point_quantizer() {
        let mut registers = Registers::default();
        let mut overflow = 0;
        let mut cx = OperationContext::new(&mut registers, None, &mut overflow);
        let mut point = make_point();
        cx.map_coordinates(&mut point, |[x, y, z]| [x + 1.0, y, z]);
        assert_eq!(point.raw, [200, 200, 300]);
        assert!(!cx.is_adjusting());
    }

    #[test]
    fn disabled_adjustment_is_ignored() {
        let adjust = OffsetAdjust {
            enabled: false,
            original: ScaleOffset::new([0.01; 3], [0.0; 3]),
            adjusted: ScaleOffset::new([0.01; 3], [1.0; 3]),
        };
        let mut registers = Registers::default();
        let mut overflow = 0;
        let mut cx = OperationContext::new(&mut registers, Some(&adjust), &mut overflow);
        let mut point = make_point();
        cx.requantize(&mut point);
        assert_eq!(point.raw, [100, 200, 300]);
    }

    #[test]
    fn requantize_moves_onto_adjusted_offset() {
        let adjust = OffsetAdjust {
            enabled: true,
            original: ScaleOffset::new([0.01; 3], [0.0; 3]),
            adjusted: ScaleOffset::new([0.01; 3], [1.0, 2.0, 0.0]),
        };
        let mut registers = Registers::default();
        let mut overflow = 0;
        let mut cx = OperationContext::new(&mut registers, Some(&adjust), &mut overflow);
        let mut point = make_point();
        cx.requantize(&mut point);
        assert_eq!(point.raw, [0, 0, 300]);
    }

    #[test]
    fn overflow_is_counted_and_value_kept() {
        let mut registers = Registers::default();
        let mut overflow = 0;
        let mut point = make_point();
        {
            let mut cx = OperationContext::new(&mut registers, None, &mut overflow);
            cx.set_coordinate(&mut point, 0, 1.0e12);
            assert_eq!(cx.clamp_u8(256.0), 255);
            assert_eq!(cx.clamp_u16(12.2), 12);
        }
        assert_eq!(point.raw[0], 100);
        assert_eq!(overflow, 2);
    }
}
