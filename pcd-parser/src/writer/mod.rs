pub mod las;

use pcd_core::pointcloud::point::Point;

use crate::error::ParseError;

pub trait PointWriter {
    fn write_point(&mut self, point: &Point) -> Result<(), ParseError>;
}
