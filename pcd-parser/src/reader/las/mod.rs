use std::path::Path;

use las::point::ScanDirection;
use pcd_core::pointcloud::{
    header::{BoundingVolume, Header},
    point::{Color, Point, PointAttributes},
    quantize::ScaleOffset,
};

use super::PointReader;
use crate::{error::ParseError, extra_bytes::ExtraBytesLayout};

/// Streams the points of one LAS or LAZ file.
pub struct LasPointReader {
    reader: las::Reader,
    header: Header,
    layout: ExtraBytesLayout,
}

impl LasPointReader {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ParseError> {
        let reader = las::Reader::from_path(path)?;
        let las_header = reader.header();

        let transforms = las_header.transforms();
        let quantization = ScaleOffset::new(
            [transforms.x.scale, transforms.y.scale, transforms.z.scale],
            [transforms.x.offset, transforms.y.offset, transforms.z.offset],
        );
        let bounds = las_header.bounds();
        let bounding_volume = BoundingVolume::new(
            [bounds.min.x, bounds.min.y, bounds.min.z],
            [bounds.max.x, bounds.max.y, bounds.max.z],
        );
        let header = Header {
            point_count: las_header.number_of_points(),
            quantization,
            bounding_volume,
        };
        let layout = ExtraBytesLayout::from_vlrs(
            las_header.vlrs().iter().chain(las_header.evlrs()),
            usize::from(las_header.point_format().extra_bytes),
        )?;

        log::debug!(
            "opened LAS {:?} with {} points, scale {:?}, offset {:?}",
            las_header.version(),
            header.point_count,
            header.quantization.scale,
            header.quantization.offset
        );

        Ok(Self {
            reader,
            header,
            layout,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The header as the file stores it, for writing a file of the same kind.
    pub fn las_header(&self) -> &las::Header {
        self.reader.header()
    }

    fn convert_las_point(&self, las_point: las::Point) -> Result<Point, ParseError> {
        let quantizer = self.header.quantization;
        let mut raw = [0; 3];
        for (axis, value) in [las_point.x, las_point.y, las_point.z].into_iter().enumerate() {
            raw[axis] = quantizer
                .quantize(axis, value)
                .ok_or(ParseError::CoordinateOutOfRange { axis, value })?;
        }

        let color = las_point
            .color
            .map(|c| Color {
                r: c.red,
                g: c.green,
                b: c.blue,
            })
            .unwrap_or_default();

        let attributes = PointAttributes {
            intensity: las_point.intensity,
            return_number: las_point.return_number,
            number_of_returns: las_point.number_of_returns,
            classification: u8::from(las_point.classification),
            scanner_channel: las_point.scanner_channel,
            scan_direction: las_point.scan_direction == ScanDirection::LeftToRight,
            edge_of_flight_line: las_point.is_edge_of_flight_line,
            synthetic: las_point.is_synthetic,
            key_point: las_point.is_key_point,
            withheld: las_point.is_withheld,
            overlap: las_point.is_overlap,
            scan_angle: las_point.scan_angle,
            user_data: las_point.user_data,
            point_source_id: las_point.point_source_id,
            gps_time: las_point.gps_time.unwrap_or(0.0),
            nir: las_point.nir.unwrap_or(0),
        };

        Ok(Point {
            raw,
            quantizer,
            color,
            attributes,
            extra_bytes: self.layout.decode(&las_point.extra_bytes)?,
        })
    }
}

impl PointReader for LasPointReader {
    fn next_point(&mut self) -> Result<Option<Point>, ParseError> {
        match self.reader.points().next() {
            Some(Ok(las_point)) => self.convert_las_point(las_point).map(Some),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }
}
