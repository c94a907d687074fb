use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::Local;
use clap::Parser;
use env_logger::Builder;
use glob::glob;
use log::LevelFilter;
use rayon::iter::{IntoParallelRefIterator as _, ParallelIterator as _};
use serde::Serialize;
use thiserror::Error;

use pcd_core::pointcloud::{header::BoundingVolume, quantize::ScaleOffset};
use pcd_parser::{
    reader::{las::LasPointReader, PointReader as _},
    writer::{
        las::{LasPointWriter, WriterOptions},
        PointWriter as _,
    },
};
use pcd_transformer::{
    ArgumentTransformBuilder, OverflowReport, PointCloudTransformer, TransformBuilder,
    Transformer as _,
};

#[derive(Parser, Debug)]
#[command(
    name = "Point Transformer",
    about = "Applies a chain of point operations to LAS/LAZ files",
    author = "MIERUNE Inc.",
    version = "0.0.1"
)]
struct Cli {
    #[arg(short, long, required = true, num_args = 1.., value_name = "FILE")]
    input: Vec<String>,

    #[arg(short, long, required = true, value_name = "DIR")]
    output: String,

    /// Writes a JSON summary of every processed file.
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Operations such as `-translate_x 10 -rotate_xy 45 0 0`, given after `--`.
    #[arg(last = true, allow_hyphen_values = true, value_name = "OPERATION")]
    operations: Vec<String>,
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Operations(#[from] pcd_transformer::ParseError),

    #[error("unrecognised operation arguments: {0}")]
    UnknownArguments(String),

    #[error("{path}: {source}")]
    Pointcloud {
        path: PathBuf,
        source: pcd_parser::ParseError,
    },

    #[error("{0}: output would overwrite the input file")]
    SameFile(PathBuf),

    #[error("{failed} of {total} files failed")]
    FilesFailed { failed: usize, total: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct FileReport {
    input: PathBuf,
    output: PathBuf,
    points_read: u64,
    points_written: u64,
    quantization: ScaleOffset,
    /// Extent of the points written.
    bounding_volume: BoundingVolume,
    overflow: Vec<OverflowReport>,
}

fn expand_globs(input_patterns: Vec<String>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for pattern in input_patterns {
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            match glob(&pattern) {
                Ok(entries) => {
                    for entry in entries {
                        match entry {
                            Ok(path) => paths.push(path),
                            Err(e) => log::error!("Error processing glob entry: {}", e),
                        }
                    }
                }
                Err(e) => log::error!("Invalid glob pattern {}: {}", pattern, e),
            }
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }
    paths
}

fn output_path_for(input: &Path, output_dir: &Path) -> Result<PathBuf, AppError> {
    let file_name = input
        .file_name()
        .ok_or_else(|| AppError::SameFile(input.to_path_buf()))?;
    let output = output_dir.join(file_name);
    if let (Ok(a), Ok(b)) = (input.canonicalize(), output.canonicalize()) {
        if a == b {
            return Err(AppError::SameFile(input.to_path_buf()));
        }
    }
    Ok(output)
}

fn process_file(
    transformer: &mut PointCloudTransformer,
    input: &Path,
    output_dir: &Path,
) -> Result<FileReport, AppError> {
    let pointcloud_error = |source| AppError::Pointcloud {
        path: input.to_path_buf(),
        source,
    };
    let output = output_path_for(input, output_dir)?;

    let mut reader = LasPointReader::from_path(input).map_err(pointcloud_error)?;
    let mut header = reader.header().clone();
    let mut options = WriterOptions::default();
    transformer.prepare(&mut header, &mut options);

    let mut writer = LasPointWriter::from_path(&output, reader.las_header(), &options)
        .map_err(pointcloud_error)?;

    let mut bounding_volume = BoundingVolume::default();
    let points_read = match copy_points(transformer, &mut reader, &mut writer, &mut bounding_volume)
    {
        Ok(points_read) => points_read,
        Err(e) => {
            writer.discard();
            return Err(pointcloud_error(e));
        }
    };
    let points_written = writer.close().map_err(pointcloud_error)?;
    let overflow = transformer.finish();

    log::info!(
        "{:?}: {} of {} points written to {:?}",
        input,
        points_written,
        points_read,
        output
    );

    Ok(FileReport {
        input: input.to_path_buf(),
        output,
        points_read,
        points_written,
        quantization: header.quantization,
        bounding_volume,
        overflow,
    })
}

/// Streams every point through the transformer and returns how many were read.
fn copy_points(
    transformer: &mut PointCloudTransformer,
    reader: &mut LasPointReader,
    writer: &mut LasPointWriter,
    bounding_volume: &mut BoundingVolume,
) -> Result<u64, pcd_parser::ParseError> {
    let mut points_read = 0;
    while let Some(mut point) = reader.next_point()? {
        points_read += 1;
        if transformer.execute(&mut point) {
            writer.write_point(&point)?;
            bounding_volume.extend(&point);
        }
    }
    Ok(points_read)
}

fn write_report(path: &Path, reports: &[FileReport]) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, reports)?;
    writer.flush()?;
    Ok(())
}

fn run(args: Cli) -> Result<(), AppError> {
    let builder = ArgumentTransformBuilder::new(args.operations.clone());
    let parsed = builder.build()?;
    if !parsed.leftover.is_empty() {
        let unknown: Vec<&str> = parsed
            .leftover
            .iter()
            .map(|&index| args.operations[index].as_str())
            .collect();
        return Err(AppError::UnknownArguments(unknown.join(" ")));
    }
    log::info!("operations: {:?}", parsed.chain);

    let input_files = expand_globs(args.input);
    log::info!("Expanded input files: {:?}", input_files);

    let output_path = PathBuf::from(args.output);
    fs::create_dir_all(&output_path)?;

    let results: Vec<Result<FileReport, AppError>> = input_files
        .par_iter()
        .map_init(
            || {
                builder
                    .build()
                    .map(|parsed| PointCloudTransformer::new(parsed.chain, parsed.options))
            },
            |transformer, input| {
                let transformer = transformer.as_mut().map_err(|e| e.clone())?;
                process_file(transformer, input, &output_path)
            },
        )
        .collect();

    let mut reports = Vec::with_capacity(results.len());
    let mut failed = 0;
    for result in results {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                log::error!("{}", e);
                failed += 1;
            }
        }
    }

    if let Some(report_path) = args.report {
        log::info!("write report: {:?}", report_path);
        write_report(&report_path, &reports)?;
    }
    if failed > 0 {
        return Err(AppError::FilesFailed {
            failed,
            total: input_files.len(),
        });
    }
    Ok(())
}

fn main() {
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, LevelFilter::Info)
        .init();

    let args = Cli::parse();

    log::info!("input files: {:?}", args.input);
    log::info!("output folder: {}", args.output);

    let start = std::time::Instant::now();
    if let Err(e) = run(args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
    log::info!("Elapsed: {:?}", start.elapsed());
    log::info!("Finish processing");
}
