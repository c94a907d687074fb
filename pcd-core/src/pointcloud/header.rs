use serde::{Deserialize, Serialize};

use super::{point::Point, quantize::ScaleOffset};

// This represents the maximum and minimum values of the original coordinate values obtained by combining the scale and offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingVolume {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Default for BoundingVolume {
    fn default() -> Self {
        Self {
            min: [f64::MAX; 3],
            max: [f64::MIN; 3],
        }
    }
}

impl BoundingVolume {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Self { min, max }
    }

    /// The bounds on `axis` were never tracked: equal, inverted or non-finite.
    pub fn is_degenerate(&self, axis: usize) -> bool {
        let (min, max) = (self.min[axis], self.max[axis]);
        !(min.is_finite() && max.is_finite() && min < max)
    }

    pub fn extend(&mut self, point: &Point) {
        for axis in 0..3 {
            let v = point.coordinate(axis);
            self.min[axis] = self.min[axis].min(v);
            self.max[axis] = self.max[axis].max(v);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub point_count: u64,
    pub quantization: ScaleOffset,
    pub bounding_volume: BoundingVolume,
}

/// Receives the scale/offset chosen for the output before any point is written.
pub trait QuantizationSink {
    fn set_offset(&mut self, offset: [f64; 3]);
    fn set_scale_factor(&mut self, scale: [f64; 3]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_tracks_real_coordinates() {
        let mut bounds = BoundingVolume::default();
        let quantizer = ScaleOffset::new([0.5; 3], [10.0, 20.0, 30.0]);
        for raw in [[0, 4, -2], [6, -4, 2]] {
            bounds.extend(&Point {
                raw,
                quantizer,
                ..Default::default()
            });
        }
        assert_eq!(bounds, BoundingVolume::new([10.0, 18.0, 29.0], [13.0, 22.0, 31.0]));
        assert!(!bounds.is_degenerate(0));
    }

    #[test]
    fn equal_bounds_are_degenerate() {
        let bounds = BoundingVolume::new([0.0, 1.0, 5.0], [0.0, 2.0, 5.0]);
        assert!(bounds.is_degenerate(0));
        assert!(!bounds.is_degenerate(1));
        assert!(bounds.is_degenerate(2));
        assert!(BoundingVolume::default().is_degenerate(0));
        assert!(BoundingVolume::new([0.0; 3], [f64::INFINITY; 3]).is_degenerate(1));
    }
}
