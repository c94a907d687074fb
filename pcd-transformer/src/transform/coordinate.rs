//! Operations that move points in real coordinate space.
//!
//! All of them support offset adjustment: their preview runs the same formula as the
//! per-point update.

use pcd_core::pointcloud::point::Point;

use crate::{
    arguments::Arguments,
    decompress::Decompress,
    error::ParseError,
    transform::{Operation, OperationContext, Preview},
};

const ARC_SECONDS_TO_RADIANS: f64 = std::f64::consts::PI / (180.0 * 3600.0);

coordinate_operations! {
    TranslateX("translate_x", Decompress::empty()) { offset: f64 }
    |op, [x, y, z]| [x + op.offset, y, z];

    TranslateY("translate_y", Decompress::empty()) { offset: f64 }
    |op, [x, y, z]| [x, y + op.offset, z];

    TranslateZ("translate_z", Decompress::Z) { offset: f64 }
    |op, [x, y, z]| [x, y, z + op.offset];

    TranslateXyz("translate_xyz", Decompress::Z) { x: f64, y: f64, z: f64 }
    |op, [x, y, z]| [x + op.x, y + op.y, z + op.z];

    ScaleX("scale_x", Decompress::empty()) { scale: f64 }
    |op, [x, y, z]| [x * op.scale, y, z];

    ScaleY("scale_y", Decompress::empty()) { scale: f64 }
    |op, [x, y, z]| [x, y * op.scale, z];

    ScaleZ("scale_z", Decompress::Z) { scale: f64 }
    |op, [x, y, z]| [x, y, z * op.scale];

    ScaleXyz("scale_xyz", Decompress::Z) { x: f64, y: f64, z: f64 }
    |op, [x, y, z]| [x * op.x, y * op.y, z * op.z];

    TranslateThenScaleX("translate_then_scale_x", Decompress::empty()) { offset: f64, scale: f64 }
    |op, [x, y, z]| [(x + op.offset) * op.scale, y, z];

    TranslateThenScaleY("translate_then_scale_y", Decompress::empty()) { offset: f64, scale: f64 }
    |op, [x, y, z]| [x, (y + op.offset) * op.scale, z];

    TranslateThenScaleZ("translate_then_scale_z", Decompress::Z) { offset: f64, scale: f64 }
    |op, [x, y, z]| [x, y, (z + op.offset) * op.scale];

    ClampZ("clamp_z", Decompress::Z) { min: f64, max: f64 }
    |op, [x, y, z]| [x, y, z.max(op.min).min(op.max)];

    ClampZBelow("clamp_z_below", Decompress::Z) { min: f64 }
    |op, [x, y, z]| [x, y, z.max(op.min)];

    ClampZAbove("clamp_z_above", Decompress::Z) { max: f64 }
    |op, [x, y, z]| [x, y, z.min(op.max)];

    SwitchXY("switch_x_y", Decompress::empty()) {}
    |op, [x, y, z]| [y, x, z];

    SwitchXZ("switch_x_z", Decompress::Z) {}
    |op, [x, y, z]| [z, y, x];

    SwitchYZ("switch_y_z", Decompress::Z) {}
    |op, [x, y, z]| [x, z, y];
}

pub(crate) fn parse(
    flag: &str,
    args: &mut Arguments<'_>,
) -> Option<Result<Box<dyn Operation>, ParseError>> {
    fn boxed<T: Operation + 'static>(op: Result<T, ParseError>) -> Option<Result<Box<dyn Operation>, ParseError>> {
        Some(op.map(|op| Box::new(op) as Box<dyn Operation>))
    }

    match flag {
        "rotate_xy" => boxed(Rotate::parse(Plane::XY, args)),
        "rotate_xz" => boxed(Rotate::parse(Plane::XZ, args)),
        "rotate_yz" => boxed(Rotate::parse(Plane::YZ, args)),
        TransformAffine::FLAG => boxed(TransformAffine::parse(args)),
        TransformHelmert::FLAG => boxed(TransformHelmert::parse(args)),
        TransformMatrix::FLAG => boxed(TransformMatrix::parse(args)),
        _ => parse_table(flag, args),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    XY,
    XZ,
    YZ,
}

impl Plane {
    fn axes(self) -> (usize, usize) {
        match self {
            Self::XY => (0, 1),
            Self::XZ => (0, 2),
            Self::YZ => (1, 2),
        }
    }

    fn flag(self) -> &'static str {
        match self {
            Self::XY => "rotate_xy",
            Self::XZ => "rotate_xz",
            Self::YZ => "rotate_yz",
        }
    }
}

/// Counter-clockwise rotation by `angle` degrees around `center` within one plane.
#[derive(Debug, Clone)]
pub struct Rotate {
    plane: Plane,
    angle: f64,
    center: [f64; 2],
    sin: f64,
    cos: f64,
}

impl Rotate {
    pub fn new(plane: Plane, angle: f64, center: [f64; 2]) -> Self {
        let (sin, cos) = angle.to_radians().sin_cos();
        Self {
            plane,
            angle,
            center,
            sin,
            cos,
        }
    }

    pub fn parse(plane: Plane, args: &mut Arguments<'_>) -> Result<Self, ParseError> {
        let angle = args.value("angle")?;
        let a = args.value("center_a")?;
        let b = args.value("center_b")?;
        Ok(Self::new(plane, angle, [a, b]))
    }

    pub fn transform(&self, mut xyz: [f64; 3]) -> [f64; 3] {
        let (a, b) = self.plane.axes();
        let da = xyz[a] - self.center[0];
        let db = xyz[b] - self.center[1];
        xyz[a] = self.cos * da - self.sin * db + self.center[0];
        xyz[b] = self.sin * da + self.cos * db + self.center[1];
        xyz
    }
}

impl Operation for Rotate {
    fn name(&self) -> &'static str {
        self.plane.flag()
    }

    fn command_text(&self) -> String {
        format!(
            "-{} {} {} {}",
            self.plane.flag(),
            self.angle,
            self.center[0],
            self.center[1]
        )
    }

    fn apply(&mut self, point: &mut Point, cx: &mut OperationContext<'_>) {
        cx.map_coordinates(point, |xyz| self.transform(xyz));
    }

    fn preview(&self, xyz: [f64; 3]) -> Preview {
        Preview::Coordinates(self.transform(xyz))
    }

    fn moves_coordinates(&self) -> bool {
        true
    }

    fn decompression_requirements(&self) -> Decompress {
        match self.plane {
            Plane::XY => Decompress::empty(),
            Plane::XZ | Plane::YZ => Decompress::Z,
        }
    }
}

/// Planar similarity transform: scale `k`, rotation `w` in arc seconds, shift `tx`/`ty`.
///
/// ```text
/// x' = k * ( cos(w) * x - sin(w) * y) + tx
/// y' = k * ( sin(w) * x + cos(w) * y) + ty
/// ```
#[derive(Debug, Clone)]
pub struct TransformAffine {
    k: f64,
    w: f64,
    tx: f64,
    ty: f64,
    sin: f64,
    cos: f64,
}

impl TransformAffine {
    pub const FLAG: &'static str = "transform_affine";

    pub fn new([k, w, tx, ty]: [f64; 4]) -> Self {
        let (sin, cos) = (w * ARC_SECONDS_TO_RADIANS).sin_cos();
        Self {
            k,
            w,
            tx,
            ty,
            sin,
            cos,
        }
    }

    pub fn parse(args: &mut Arguments<'_>) -> Result<Self, ParseError> {
        Ok(Self::new(args.list::<4>("k,w,tx,ty")?))
    }

    pub fn transform(&self, [x, y, z]: [f64; 3]) -> [f64; 3] {
        [
            self.k * (self.cos * x - self.sin * y) + self.tx,
            self.k * (self.sin * x + self.cos * y) + self.ty,
            z,
        ]
    }
}

impl Operation for TransformAffine {
    fn name(&self) -> &'static str {
        Self::FLAG
    }

    fn command_text(&self) -> String {
        format!("-{} {},{},{},{}", Self::FLAG, self.k, self.w, self.tx, self.ty)
    }

    fn apply(&mut self, point: &mut Point, cx: &mut OperationContext<'_>) {
        cx.map_coordinates(point, |xyz| self.transform(xyz));
    }

    fn preview(&self, xyz: [f64; 3]) -> Preview {
        Preview::Coordinates(self.transform(xyz))
    }

    fn moves_coordinates(&self) -> bool {
        true
    }
}

/// Seven parameter Helmert transform (small angle, coordinate frame rotation).
///
/// Translations in coordinate units, rotations in arc seconds, scale `m` in ppm.
#[derive(Debug, Clone)]
pub struct TransformHelmert {
    parameters: [f64; 7],
    rotation: [f64; 3],
    scale: f64,
}

impl TransformHelmert {
    pub const FLAG: &'static str = "transform_helmert";

    pub fn new(parameters: [f64; 7]) -> Self {
        let [_, _, _, rx, ry, rz, m] = parameters;
        Self {
            parameters,
            rotation: [
                rx * ARC_SECONDS_TO_RADIANS,
                ry * ARC_SECONDS_TO_RADIANS,
                rz * ARC_SECONDS_TO_RADIANS,
            ],
            scale: 1.0 + m * 1.0e-6,
        }
    }

    pub fn parse(args: &mut Arguments<'_>) -> Result<Self, ParseError> {
        Ok(Self::new(args.list::<7>("dx,dy,dz,rx,ry,rz,m")?))
    }

    pub fn transform(&self, [x, y, z]: [f64; 3]) -> [f64; 3] {
        let [dx, dy, dz, ..] = self.parameters;
        let [rx, ry, rz] = self.rotation;
        let s = self.scale;
        [
            dx + s * (x + rz * y - ry * z),
            dy + s * (-rz * x + y + rx * z),
            dz + s * (ry * x - rx * y + z),
        ]
    }
}

impl Operation for TransformHelmert {
    fn name(&self) -> &'static str {
        Self::FLAG
    }

    fn command_text(&self) -> String {
        let values: Vec<String> = self.parameters.iter().map(|v| v.to_string()).collect();
        format!("-{} {}", Self::FLAG, values.join(","))
    }

    fn apply(&mut self, point: &mut Point, cx: &mut OperationContext<'_>) {
        cx.map_coordinates(point, |xyz| self.transform(xyz));
    }

    fn preview(&self, xyz: [f64; 3]) -> Preview {
        Preview::Coordinates(self.transform(xyz))
    }

    fn moves_coordinates(&self) -> bool {
        true
    }

    fn decompression_requirements(&self) -> Decompress {
        Decompress::Z
    }
}

/// Full 3x3 matrix followed by a translation.
#[derive(Debug, Clone)]
pub struct TransformMatrix {
    rows: [[f64; 3]; 3],
    translation: [f64; 3],
}

impl TransformMatrix {
    pub const FLAG: &'static str = "transform_matrix";

    pub fn new(rows: [[f64; 3]; 3], translation: [f64; 3]) -> Self {
        Self { rows, translation }
    }

    pub fn parse(args: &mut Arguments<'_>) -> Result<Self, ParseError> {
        let r1 = args.list::<3>("r11,r12,r13")?;
        let r2 = args.list::<3>("r21,r22,r23")?;
        let r3 = args.list::<3>("r31,r32,r33")?;
        let translation = args.list::<3>("tr1,tr2,tr3")?;
        Ok(Self::new([r1, r2, r3], translation))
    }

    pub fn transform(&self, xyz: [f64; 3]) -> [f64; 3] {
        let mut out = self.translation;
        for (out, row) in out.iter_mut().zip(&self.rows) {
            *out += row[0] * xyz[0] + row[1] * xyz[1] + row[2] * xyz[2];
        }
        out
    }
}

impl Operation for TransformMatrix {
    fn name(&self) -> &'static str {
        Self::FLAG
    }

    fn command_text(&self) -> String {
        let group = |values: &[f64; 3]| format!("{},{},{}", values[0], values[1], values[2]);
        format!(
            "-{} {} {} {} {}",
            Self::FLAG,
            group(&self.rows[0]),
            group(&self.rows[1]),
            group(&self.rows[2]),
            group(&self.translation)
        )
    }

    fn apply(&mut self, point: &mut Point, cx: &mut OperationContext<'_>) {
        cx.map_coordinates(point, |xyz| self.transform(xyz));
    }

    fn preview(&self, xyz: [f64; 3]) -> Preview {
        Preview::Coordinates(self.transform(xyz))
    }

    fn moves_coordinates(&self) -> bool {
        true
    }

    fn decompression_requirements(&self) -> Decompress {
        Decompress::Z
    }
}
