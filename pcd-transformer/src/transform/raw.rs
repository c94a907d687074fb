//! Operations on the stored integer coordinates.
//!
//! They bypass the real coordinate formula altogether, which is why none of them can be
//! previewed for offset adjustment.

use pcd_core::pointcloud::point::Point;
use rand::{rngs::StdRng, Rng as _, SeedableRng as _};

use crate::{
    arguments::Arguments,
    decompress::Decompress,
    error::ParseError,
    transform::{Operation, OperationContext, Preview},
};

pub const DEFAULT_SEED: u64 = 0;

fn translate_raw(point: &mut Point, cx: &mut OperationContext<'_>, axis: usize, offset: i32) {
    match point.raw[axis].checked_add(offset) {
        Some(raw) => point.raw[axis] = raw,
        None => cx.record_overflow(),
    }
}

operations! {
    TranslateRawX("translate_raw_x", Decompress::empty(), unsupported) { offset: i32 }
    |op, point, cx| { translate_raw(point, cx, 0, op.offset); }

    TranslateRawY("translate_raw_y", Decompress::empty(), unsupported) { offset: i32 }
    |op, point, cx| { translate_raw(point, cx, 1, op.offset); }

    TranslateRawZ("translate_raw_z", Decompress::Z, unsupported) { offset: i32 }
    |op, point, cx| { translate_raw(point, cx, 2, op.offset); }

    TranslateRawXyz("translate_raw_xyz", Decompress::Z, unsupported) { x: i32, y: i32, z: i32 }
    |op, point, cx| {
        translate_raw(point, cx, 0, op.x);
        translate_raw(point, cx, 1, op.y);
        translate_raw(point, cx, 2, op.z);
    }

    ClampRawZ("clamp_raw_z", Decompress::Z, unsupported) { min: i32, max: i32 }
    |op, point, cx| { point.raw[2] = point.raw[2].max(op.min).min(op.max); }
}

pub(crate) fn parse(
    flag: &str,
    args: &mut Arguments<'_>,
) -> Option<Result<Box<dyn Operation>, ParseError>> {
    match flag {
        TranslateRawXyzAtRandom::FLAG => Some(
            TranslateRawXyzAtRandom::parse(args).map(|op| Box::new(op) as Box<dyn Operation>),
        ),
        _ => parse_table(flag, args),
    }
}

/// Adds a uniformly drawn integer in `-max..=max` to each raw coordinate.
///
/// The generator belongs to the operation and is reseeded by [`Operation::reset`], so two
/// runs over the same points produce the same output.
#[derive(Debug, Clone)]
pub struct TranslateRawXyzAtRandom {
    max: [u32; 3],
    seed: u64,
    rng: StdRng,
}

impl TranslateRawXyzAtRandom {
    pub const FLAG: &'static str = "translate_raw_xyz_at_random";

    pub fn new(max: [u32; 3], seed: u64) -> Self {
        Self {
            max,
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn parse(args: &mut Arguments<'_>) -> Result<Self, ParseError> {
        let x = args.value("max_x")?;
        let y = args.value("max_y")?;
        let z = args.value("max_z")?;
        Ok(Self::new([x, y, z], DEFAULT_SEED))
    }
}

impl Operation for TranslateRawXyzAtRandom {
    fn name(&self) -> &'static str {
        Self::FLAG
    }

    fn command_text(&self) -> String {
        format!(
            "-{} {} {} {}",
            Self::FLAG,
            self.max[0],
            self.max[1],
            self.max[2]
        )
    }

    fn apply(&mut self, point: &mut Point, cx: &mut OperationContext<'_>) {
        for axis in 0..3 {
            let max = i64::from(self.max[axis]);
            if max == 0 {
                continue;
            }
            let delta = self.rng.gen_range(-max..=max);
            match i32::try_from(i64::from(point.raw[axis]) + delta) {
                Ok(raw) => point.raw[axis] = raw,
                Err(_) => cx.record_overflow(),
            }
        }
    }

    fn preview(&self, _xyz: [f64; 3]) -> Preview {
        Preview::Unsupported
    }

    fn decompression_requirements(&self) -> Decompress {
        Decompress::Z
    }

    fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
    }
}
