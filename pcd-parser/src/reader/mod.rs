pub mod las;

use pcd_core::pointcloud::point::Point;

use crate::error::ParseError;

pub trait PointReader {
    fn next_point(&mut self) -> Result<Option<Point>, ParseError>;
}
