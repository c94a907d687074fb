use std::{fs::File, io::BufWriter, path::Path};

use las::point::{Classification, Format, ScanDirection};
use pcd_core::pointcloud::{header::QuantizationSink, point::Point};

use super::PointWriter;
use crate::{error::ParseError, extra_bytes::ExtraBytesLayout};

const LASZIP_USER_ID: &str = "laszip encoded";
/// ASPRS "overlap points"; the `las` crate carries it as the overlap flag.
const OVERLAP_CLASS: u8 = 12;

/// Quantization the output file is written with, when it differs from the source.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WriterOptions {
    pub offset: Option<[f64; 3]>,
    pub scale: Option<[f64; 3]>,
}

impl QuantizationSink for WriterOptions {
    fn set_offset(&mut self, offset: [f64; 3]) {
        self.offset = Some(offset);
    }

    fn set_scale_factor(&mut self, scale: [f64; 3]) {
        self.scale = Some(scale);
    }
}

/// Writes points into a LAS or LAZ file shaped like a source file.
///
/// Version, point format and VLRs come from the source header; scale and offset come from
/// [`WriterOptions`] when set. Waveform packets are not carried over.
pub struct LasPointWriter {
    writer: las::Writer<BufWriter<File>>,
    format: Format,
    layout: ExtraBytesLayout,
    points_written: u64,
}

impl LasPointWriter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        source: &las::Header,
        options: &WriterOptions,
    ) -> Result<Self, ParseError> {
        let transforms = source.transforms();
        let scale = options.scale.unwrap_or([
            transforms.x.scale,
            transforms.y.scale,
            transforms.z.scale,
        ]);
        let offset = options.offset.unwrap_or([
            transforms.x.offset,
            transforms.y.offset,
            transforms.z.offset,
        ]);

        let mut format = source.point_format().clone();
        format.has_waveform = false;

        let mut builder = las::Builder::from(source.version());
        builder.point_format = format.clone();
        builder.transforms = las::Vector {
            x: las::Transform {
                scale: scale[0],
                offset: offset[0],
            },
            y: las::Transform {
                scale: scale[1],
                offset: offset[1],
            },
            z: las::Transform {
                scale: scale[2],
                offset: offset[2],
            },
        };
        builder.vlrs = source
            .vlrs()
            .iter()
            .filter(|vlr| vlr.user_id != LASZIP_USER_ID)
            .cloned()
            .collect();
        builder.evlrs = source.evlrs().clone();
        builder.system_identifier = source.system_identifier().to_string();
        builder.generating_software = source.generating_software().to_string();
        builder.file_source_id = source.file_source_id();
        builder.gps_time_type = source.gps_time_type();
        let header = builder.into_header()?;

        let layout = ExtraBytesLayout::from_vlrs(
            source.vlrs().iter().chain(source.evlrs()),
            usize::from(format.extra_bytes),
        )?;
        let writer = las::Writer::from_path(path, header)?;

        Ok(Self {
            writer,
            format,
            layout,
            points_written: 0,
        })
    }

    pub fn points_written(&self) -> u64 {
        self.points_written
    }

    /// Flushes the header and returns the number of points written.
    pub fn close(mut self) -> Result<u64, ParseError> {
        self.writer.close()?;
        Ok(self.points_written)
    }

    /// Ends an output whose writing failed part way.
    pub fn discard(mut self) {
        if let Err(e) = self.writer.close() {
            log::warn!("output left incomplete: {}", e);
            // las::Writer closes again on drop and panics when that fails
            std::mem::forget(self.writer);
        }
    }

    fn to_las_point(&self, point: &Point) -> Result<las::Point, ParseError> {
        let attributes = &point.attributes;
        let [x, y, z] = point.coordinates();

        let transforms = self.writer.header().transforms();
        for (axis, (value, transform)) in [x, y, z]
            .into_iter()
            .zip([transforms.x, transforms.y, transforms.z])
            .enumerate()
        {
            if transform.inverse(value).is_err() {
                return Err(ParseError::CoordinateOutOfRange { axis, value });
            }
        }

        let (classification, is_overlap) = match attributes.classification {
            OVERLAP_CLASS => (Classification::Unclassified, true),
            class => (Classification::new(class)?, attributes.overlap),
        };

        let mut las_point = las::Point {
            x,
            y,
            z,
            ..Default::default()
        };
        las_point.intensity = attributes.intensity;
        las_point.return_number = attributes.return_number;
        las_point.number_of_returns = attributes.number_of_returns;
        las_point.scan_direction = if attributes.scan_direction {
            ScanDirection::LeftToRight
        } else {
            ScanDirection::RightToLeft
        };
        las_point.is_edge_of_flight_line = attributes.edge_of_flight_line;
        las_point.classification = classification;
        las_point.is_synthetic = attributes.synthetic;
        las_point.is_key_point = attributes.key_point;
        las_point.is_withheld = attributes.withheld;
        las_point.is_overlap = is_overlap;
        las_point.scanner_channel = attributes.scanner_channel;
        las_point.scan_angle = attributes.scan_angle;
        las_point.user_data = attributes.user_data;
        las_point.point_source_id = attributes.point_source_id;
        las_point.gps_time = self.format.has_gps_time.then_some(attributes.gps_time);
        las_point.color = self.format.has_color.then(|| las::Color {
            red: point.color.r,
            green: point.color.g,
            blue: point.color.b,
        });
        las_point.nir = self.format.has_nir.then_some(attributes.nir);
        las_point.extra_bytes = self.layout.encode(&point.extra_bytes);
        Ok(las_point)
    }
}

impl PointWriter for LasPointWriter {
    fn write_point(&mut self, point: &Point) -> Result<(), ParseError> {
        let las_point = self.to_las_point(point)?;
        self.writer.write_point(las_point)?;
        self.points_written += 1;
        Ok(())
    }
}
