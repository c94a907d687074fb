use serde::{Deserialize, Serialize};

pub const X: usize = 0;
pub const Y: usize = 1;
pub const Z: usize = 2;

/// Rounds a real value into the integer grid defined by `offset` and `scale`.
///
/// Values at or above the offset round with `+0.5`, values below it with `-0.5`, and the
/// result is truncated toward zero. This is not `f64::round`, and files written by other
/// tools depend on the difference.
///
/// Returns `None` when the result does not fit into an `i32`.
pub fn quantize(value: f64, offset: f64, scale: f64) -> Option<i32> {
    let n = (value - offset) / scale;
    round_half_away(n).and_then(|n| i32::try_from(n).ok())
}

/// Same rounding rule as [`quantize`], clamped into `u8`.
///
/// The second element is `true` when clamping was needed.
pub fn quantize_u8(value: f64) -> (u8, bool) {
    let (v, clamped) = clamp_rounded(value, u8::MIN as i64, u8::MAX as i64);
    (v as u8, clamped)
}

/// Same rounding rule as [`quantize`], clamped into `u16`.
pub fn quantize_u16(value: f64) -> (u16, bool) {
    let (v, clamped) = clamp_rounded(value, u16::MIN as i64, u16::MAX as i64);
    (v as u16, clamped)
}

fn round_half_away(n: f64) -> Option<i64> {
    if !n.is_finite() {
        return None;
    }
    let rounded = if n >= 0.0 { (n + 0.5).trunc() } else { (n - 0.5).trunc() };
    if rounded < i64::MIN as f64 || rounded > i64::MAX as f64 {
        return None;
    }
    Some(rounded as i64)
}

fn clamp_rounded(value: f64, min: i64, max: i64) -> (i64, bool) {
    match round_half_away(value) {
        Some(v) if v < min => (min, true),
        Some(v) if v > max => (max, true),
        Some(v) => (v, false),
        None if value > 0.0 => (max, true),
        None => (min, true),
    }
}

// real = integer * scale + offset, per axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleOffset {
    pub scale: [f64; 3],
    pub offset: [f64; 3],
}

impl Default for ScaleOffset {
    fn default() -> Self {
        Self {
            scale: [0.001; 3],
            offset: [0.0; 3],
        }
    }
}

impl ScaleOffset {
    pub fn new(scale: [f64; 3], offset: [f64; 3]) -> Self {
        Self { scale, offset }
    }

    pub fn quantize(&self, axis: usize, value: f64) -> Option<i32> {
        quantize(value, self.offset[axis], self.scale[axis])
    }

    pub fn dequantize(&self, axis: usize, raw: i32) -> f64 {
        raw as f64 * self.scale[axis] + self.offset[axis]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_away_from_offset() {
        // below the offset: -0.6 - 0.5 = -1.1 -> -1
        let below = quantize(999.994, 1000.0, 0.01).unwrap();
        assert_eq!(below, ((999.994 - 1000.0) / 0.01 - 0.5) as i32);
        assert_eq!(below, -1);

        // above the offset: 1.6 + 0.5 = 2.1 -> 2
        let above = quantize(1000.016, 1000.0, 0.01).unwrap();
        assert_eq!(above, ((1000.016 - 1000.0) / 0.01 + 0.5) as i32);
        assert_eq!(above, 2);

        assert_eq!(quantize(1000.004, 1000.0, 0.01), Some(0));
        assert_eq!(quantize(999.987, 1000.0, 0.01), Some(-1));
        assert_eq!(quantize(1000.0, 1000.0, 0.01), Some(0));
    }

    #[test]
    fn reports_out_of_range() {
        assert_eq!(quantize(21_474_836.48, 0.0, 0.01), None);
        assert_eq!(quantize(-21_474_836.49, 0.0, 0.01), None);
        assert_eq!(quantize(21_474_836.46, 0.0, 0.01), Some(i32::MAX - 1));
        assert_eq!(quantize(f64::NAN, 0.0, 0.01), None);
        assert_eq!(quantize(f64::INFINITY, 0.0, 0.01), None);
    }

    #[test]
    fn clamps_small_integers() {
        assert_eq!(quantize_u8(254.6), (255, false));
        assert_eq!(quantize_u8(300.0), (255, true));
        assert_eq!(quantize_u8(-3.0), (0, true));
        assert_eq!(quantize_u16(1.49), (1, false));
        assert_eq!(quantize_u16(70_000.0), (u16::MAX, true));
        assert_eq!(quantize_u16(f64::NEG_INFINITY), (0, true));
    }

    #[test]
    fn dequantize_inverts_quantize() {
        let q = ScaleOffset::new([0.01, 0.01, 0.001], [500_000.0, 4_000_000.0, 0.0]);
        for raw in [-123_456, -1, 0, 1, 987_654] {
            for axis in [X, Y, Z] {
                assert_eq!(q.quantize(axis, q.dequantize(axis, raw)), Some(raw));
            }
        }
    }
}
