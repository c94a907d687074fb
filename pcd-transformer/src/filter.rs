use pcd_core::pointcloud::point::Point;

use crate::{arguments::Arguments, error::ParseError};

/// Decides whether a point takes part in the run.
pub trait PointFilter: Send {
    fn accepts(&self, point: &Point) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    KeepClass(Vec<u8>),
    DropClass(Vec<u8>),
    KeepZ { min: f64, max: f64 },
    DropZBelow(f64),
    DropZAbove(f64),
}

impl Criterion {
    pub fn accepts(&self, point: &Point) -> bool {
        match self {
            Self::KeepClass(classes) => classes.contains(&point.attributes.classification),
            Self::DropClass(classes) => !classes.contains(&point.attributes.classification),
            Self::KeepZ { min, max } => {
                let z = point.z();
                *min <= z && z <= *max
            }
            Self::DropZBelow(min) => point.z() >= *min,
            Self::DropZAbove(max) => point.z() <= *max,
        }
    }

    /// Parses one filter flag; `None` when `flag` is not a filter flag.
    pub(crate) fn parse(flag: &str, args: &mut Arguments<'_>) -> Option<Result<Self, ParseError>> {
        let criterion = match flag {
            "keep_class" => classes(args).map(Self::KeepClass),
            "drop_class" => classes(args).map(Self::DropClass),
            "keep_z" => z_range(args),
            "drop_z_below" => args.value("min").map(Self::DropZBelow),
            "drop_z_above" => args.value("max").map(Self::DropZAbove),
            _ => return None,
        };
        Some(criterion)
    }
}

/// One or more class numbers, up to the next flag.
fn classes(args: &mut Arguments<'_>) -> Result<Vec<u8>, ParseError> {
    let mut classes = vec![args.value("class")?];
    while args.peek().is_some_and(|token| !token.starts_with('-')) {
        classes.push(args.value("class")?);
    }
    Ok(classes)
}

fn z_range(args: &mut Arguments<'_>) -> Result<Criterion, ParseError> {
    Ok(Criterion::KeepZ {
        min: args.value("min")?,
        max: args.value("max")?,
    })
}

/// Accepts a point when every criterion does.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CriteriaFilter {
    criteria: Vec<Criterion>,
}

impl CriteriaFilter {
    pub fn new(criteria: Vec<Criterion>) -> Self {
        Self { criteria }
    }

    pub fn push(&mut self, criterion: Criterion) {
        self.criteria.push(criterion);
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }
}

impl PointFilter for CriteriaFilter {
    fn accepts(&self, point: &Point) -> bool {
        self.criteria.iter().all(|criterion| criterion.accepts(point))
    }
}

#[cfg(test)]
mod tests {
    use pcd_core::pointcloud::quantize::ScaleOffset;

    use super::*;

    fn make_point(class: u8, z: i32) -> Point {
        let mut point = Point {
            raw: [0, 0, z],
            quantizer: ScaleOffset::new([1.0; 3], [0.0; 3]),
            ..Default::default()
        };
        point.attributes.classification = class;
        point
    }

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn criteria_are_combined() {
        let filter = CriteriaFilter::new(vec![
            Criterion::KeepClass(vec![2, 6]),
            Criterion::DropZAbove(100.0),
        ]);
        assert!(filter.accepts(&make_point(2, 50)));
        assert!(!filter.accepts(&make_point(2, 150)));
        assert!(!filter.accepts(&make_point(1, 50)));
        assert!(CriteriaFilter::default().accepts(&make_point(1, 50)));
    }

    #[test]
    fn class_list_stops_at_next_flag() {
        let tokens = tokens(&["2", "6", "9", "-translate_x", "1"]);
        let mut args = Arguments::new("keep_class", &tokens, 0);
        let criterion = Criterion::parse("keep_class", &mut args).unwrap().unwrap();
        assert_eq!(criterion, Criterion::KeepClass(vec![2, 6, 9]));
        assert_eq!(args.position(), 3);
    }

    #[test]
    fn z_range_and_errors() {
        let range = tokens(&["-5", "5"]);
        let mut args = Arguments::new("keep_z", &range, 0);
        let criterion = Criterion::parse("keep_z", &mut args).unwrap().unwrap();
        assert!(criterion.accepts(&make_point(0, 3)));
        assert!(!criterion.accepts(&make_point(0, 6)));

        let invalid = tokens(&["300"]);
        let mut args = Arguments::new("drop_class", &invalid, 0);
        assert!(Criterion::parse("drop_class", &mut args).unwrap().is_err());
        assert!(Criterion::parse("set_intensity", &mut args).is_none());
    }
}
