//! Operations backed by a text file.

use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufRead, BufReader, Lines},
    path::{Path, PathBuf},
};

use pcd_core::pointcloud::point::Point;

use crate::{
    arguments::Arguments,
    decompress::Decompress,
    error::ParseError,
    transform::{Operation, OperationContext},
};

pub(crate) fn parse(
    flag: &str,
    args: &mut Arguments<'_>,
) -> Option<Result<Box<dyn Operation>, ParseError>> {
    let path = match flag {
        MapIntensity::FLAG
        | MapUserData::FLAG
        | MapPointSource::FLAG
        | SetGpsTimeFromFile::FLAG => match args.path("file") {
            Ok(path) => path,
            Err(e) => return Some(Err(e)),
        },
        _ => return None,
    };

    let operation: Box<dyn Operation> = match flag {
        MapIntensity::FLAG => Box::new(MapIntensity::new(path)),
        MapUserData::FLAG => Box::new(MapUserData::new(path)),
        MapPointSource::FLAG => Box::new(MapPointSource::new(path)),
        _ => Box::new(SetGpsTimeFromFile::new(path)),
    };
    Some(Ok(operation))
}

/// Reads `from to` pairs, one per line, separated by whitespace or a comma.
///
/// Blank lines and lines starting with `#` are skipped.
pub fn read_table<T>(path: &Path) -> io::Result<HashMap<T, T>>
where
    T: std::str::FromStr + std::hash::Hash + Eq,
{
    let reader = BufReader::new(File::open(path)?);
    let mut table = HashMap::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut columns = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|column| !column.is_empty());
        let pair = match (columns.next(), columns.next()) {
            (Some(from), Some(to)) => from.parse().ok().zip(to.parse().ok()),
            _ => None,
        };
        let (from, to) = pair.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line {}: expected two values, got '{line}'", number + 1),
            )
        })?;
        table.insert(from, to);
    }
    Ok(table)
}

fn load_table<T>(flag: &str, path: &Path) -> HashMap<T, T>
where
    T: std::str::FromStr + std::hash::Hash + Eq,
{
    match read_table(path) {
        Ok(table) => {
            log::info!("-{flag}: loaded {} entries from {:?}", table.len(), path);
            table
        }
        Err(e) => {
            log::warn!("-{flag}: cannot load {:?}, values stay unchanged: {e}", path);
            HashMap::new()
        }
    }
}

macro_rules! map_operations {
    ($($ty:ident($flag:literal, $req:expr, $value:ty) |$point:ident| $field:expr;)*) => {
        $(
            /// Replaces values found in the table's first column by the second column.
            /// Values missing from the table are left as they are.
            #[derive(Debug, Clone)]
            pub struct $ty {
                path: PathBuf,
                table: HashMap<$value, $value>,
            }

            impl $ty {
                pub const FLAG: &'static str = $flag;

                pub fn new(path: PathBuf) -> Self {
                    let table = load_table($flag, &path);
                    Self { path, table }
                }

                pub fn len(&self) -> usize {
                    self.table.len()
                }

                pub fn is_empty(&self) -> bool {
                    self.table.is_empty()
                }
            }

            impl Operation for $ty {
                fn name(&self) -> &'static str {
                    $flag
                }

                fn command_text(&self) -> String {
                    format!("-{} {}", $flag, self.path.display())
                }

                fn apply(&mut self, $point: &mut Point, _cx: &mut OperationContext<'_>) {
                    if let Some(to) = self.table.get(&$field) {
                        $field = *to;
                    }
                }

                fn decompression_requirements(&self) -> Decompress {
                    $req
                }
            }
        )*
    };
}

map_operations! {
    MapIntensity("map_intensity", Decompress::INTENSITY, u16) |point| point.attributes.intensity;
    MapUserData("map_user_data", Decompress::USER_DATA, u8) |point| point.attributes.user_data;
    MapPointSource("map_point_source", Decompress::POINT_SOURCE, u16) |point| point.attributes.point_source_id;
}

/// Assigns the GPS time of each point from the next line of a file.
///
/// Once the file runs out, or a line fails to read or parse, the remaining points keep
/// their GPS time.
#[derive(Debug)]
pub struct SetGpsTimeFromFile {
    path: PathBuf,
    lines: Option<Lines<BufReader<File>>>,
}

impl SetGpsTimeFromFile {
    pub const FLAG: &'static str = "set_gps_time_from_file";

    pub fn new(path: PathBuf) -> Self {
        let mut operation = Self { path, lines: None };
        operation.rewind();
        operation
    }

    fn rewind(&mut self) {
        self.lines = match File::open(&self.path) {
            Ok(file) => Some(BufReader::new(file).lines()),
            Err(e) => {
                log::warn!("-{}: cannot open {:?}: {e}", Self::FLAG, self.path);
                None
            }
        };
    }

    fn next_time(&mut self) -> Option<f64> {
        let lines = self.lines.as_mut()?;
        let time = match lines.next() {
            Some(Ok(line)) => match line.trim().parse::<f64>() {
                Ok(time) => Some(time),
                Err(e) => {
                    log::warn!("-{}: stopping at '{}': {e}", Self::FLAG, line.trim());
                    None
                }
            },
            Some(Err(e)) => {
                log::warn!("-{}: stopping after read error: {e}", Self::FLAG);
                None
            }
            None => None,
        };
        if time.is_none() {
            self.lines = None;
        }
        time
    }
}

impl Operation for SetGpsTimeFromFile {
    fn name(&self) -> &'static str {
        Self::FLAG
    }

    fn command_text(&self) -> String {
        format!("-{} {}", Self::FLAG, self.path.display())
    }

    fn apply(&mut self, point: &mut Point, _cx: &mut OperationContext<'_>) {
        if let Some(time) = self.next_time() {
            point.attributes.gps_time = time;
        }
    }

    fn decompression_requirements(&self) -> Decompress {
        Decompress::GPS_TIME
    }

    fn reset(&mut self) {
        self.rewind();
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::registers::Registers;

    fn write_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn run(op: &mut dyn Operation, point: &mut Point) {
        let mut registers = Registers::default();
        let mut overflow = 0;
        let mut cx = OperationContext::new(&mut registers, None, &mut overflow);
        op.apply(point, &mut cx);
    }

    #[test]
    fn map_intensity_replaces_listed_values() {
        let file = write_file("# from to\n10 100\n20,200\n\n");
        let mut op = MapIntensity::new(file.path().to_path_buf());
        assert_eq!(op.len(), 2);

        let mut point = Point::default();
        point.attributes.intensity = 20;
        run(&mut op, &mut point);
        assert_eq!(point.attributes.intensity, 200);

        point.attributes.intensity = 30;
        run(&mut op, &mut point);
        assert_eq!(point.attributes.intensity, 30);
    }

    #[test]
    fn unreadable_table_is_identity() {
        let mut op = MapUserData::new(PathBuf::from("/nonexistent/user_data.txt"));
        assert!(op.is_empty());
        let mut point = Point::default();
        point.attributes.user_data = 7;
        run(&mut op, &mut point);
        assert_eq!(point.attributes.user_data, 7);

        let file = write_file("1 2\nthree 4\n");
        let op = MapPointSource::new(file.path().to_path_buf());
        assert!(op.is_empty());
    }

    #[test]
    fn gps_time_replay_stops_and_rewinds() {
        let file = write_file("10.5\n11.5\nnot-a-number\n12.5\n");
        let mut op = SetGpsTimeFromFile::new(file.path().to_path_buf());

        let times: Vec<f64> = (0..5)
            .map(|_| {
                let mut point = Point::default();
                point.attributes.gps_time = -1.0;
                run(&mut op, &mut point);
                point.attributes.gps_time
            })
            .collect();
        assert_eq!(times, vec![10.5, 11.5, -1.0, -1.0, -1.0]);

        op.reset();
        let mut point = Point::default();
        run(&mut op, &mut point);
        assert_eq!(point.attributes.gps_time, 10.5);
    }

    #[test]
    fn parse_reads_path_argument() {
        let tokens = vec!["table.txt".to_string()];
        let mut args = Arguments::new("map_intensity", &tokens, 0);
        let op = parse("map_intensity", &mut args).unwrap().unwrap();
        assert_eq!(op.command_text(), "-map_intensity table.txt");

        let mut args = Arguments::new("set_gps_time_from_file", &[], 0);
        assert!(parse("set_gps_time_from_file", &mut args).unwrap().is_err());
        assert!(parse("translate_x", &mut args).is_none());
    }
}
