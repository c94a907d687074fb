use super::quantize::ScaleOffset;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointAttributes {
    pub intensity: u16,
    pub return_number: u8,
    pub number_of_returns: u8,
    pub classification: u8,
    pub scanner_channel: u8,
    pub scan_direction: bool,
    pub edge_of_flight_line: bool,
    pub synthetic: bool,
    pub key_point: bool,
    pub withheld: bool,
    pub overlap: bool,
    // degrees
    pub scan_angle: f32,
    pub user_data: u8,
    pub point_source_id: u16,
    pub gps_time: f64,
    pub nir: u16,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Color {
    pub r: u16,
    pub g: u16,
    pub b: u16,
}

// LAS data coordinates are stored as i32
// The actual coordinates are calculated based on a combination of scale and offset, as follows
// x = (raw[0] * scale[0]) + offset[0]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Point {
    pub raw: [i32; 3],
    pub quantizer: ScaleOffset,
    pub color: Color,
    pub attributes: PointAttributes,
    /// Extra-bytes attributes, already scaled into their real values.
    pub extra_bytes: Vec<f64>,
}

impl Point {
    pub fn coordinate(&self, axis: usize) -> f64 {
        self.quantizer.dequantize(axis, self.raw[axis])
    }

    pub fn coordinates(&self) -> [f64; 3] {
        [self.coordinate(0), self.coordinate(1), self.coordinate(2)]
    }

    pub fn x(&self) -> f64 {
        self.coordinate(0)
    }

    pub fn y(&self) -> f64 {
        self.coordinate(1)
    }

    pub fn z(&self) -> f64 {
        self.coordinate(2)
    }

    /// Stores `value` on `axis` using the point's own quantizer.
    ///
    /// Returns `false` and leaves the raw value untouched when `value` does not fit.
    pub fn set_coordinate(&mut self, axis: usize, value: f64) -> bool {
        match self.quantizer.quantize(axis, value) {
            Some(raw) => {
                self.raw[axis] = raw;
                true
            }
            None => false,
        }
    }

    pub fn attribute(&self, index: usize) -> f64 {
        self.extra_bytes.get(index).copied().unwrap_or(0.0)
    }

    pub fn set_attribute(&mut self, index: usize, value: f64) {
        if let Some(slot) = self.extra_bytes.get_mut(index) {
            *slot = value;
        }
    }
}
