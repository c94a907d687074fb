//! Extra-bytes attributes, and copies from non-geometric fields into coordinates.
//!
//! A copy into x, y or z has no formula over the previous coordinates, so those operations
//! report [`Preview::Unsupported`](crate::transform::Preview::Unsupported) and always run with
//! the quantization the point carries.

use crate::{decompress::Decompress, registers::Register};

operations! {
    SetAttribute("set_attribute", Decompress::EXTRA_BYTES) { index: usize, value: f64 }
    |op, point, cx| { point.set_attribute(op.index, op.value); }

    ScaleAttribute("scale_attribute", Decompress::EXTRA_BYTES) { index: usize, scale: f64 }
    |op, point, cx| {
        let value = point.attribute(op.index) * op.scale;
        point.set_attribute(op.index, value);
    }

    TranslateAttribute("translate_attribute", Decompress::EXTRA_BYTES) { index: usize, offset: f64 }
    |op, point, cx| {
        let value = point.attribute(op.index) + op.offset;
        point.set_attribute(op.index, value);
    }

    CopyZIntoAttribute("copy_z_into_attribute", Decompress::Z.union(Decompress::EXTRA_BYTES)) { index: usize }
    |op, point, cx| {
        let z = cx.coordinate(point, 2);
        point.set_attribute(op.index, z);
    }

    CopyIntensityIntoAttribute("copy_intensity_into_attribute", Decompress::INTENSITY.union(Decompress::EXTRA_BYTES)) { index: usize }
    |op, point, cx| {
        let intensity = f64::from(point.attributes.intensity);
        point.set_attribute(op.index, intensity);
    }

    CopyAttributeIntoIntensity("copy_attribute_into_intensity", Decompress::EXTRA_BYTES.union(Decompress::INTENSITY)) { index: usize }
    |op, point, cx| { point.attributes.intensity = cx.clamp_u16(point.attribute(op.index)); }

    CopyAttributeIntoRegister("copy_attribute_into_register", Decompress::EXTRA_BYTES) { index: usize, register: Register }
    |op, point, cx| { cx.registers[op.register] = point.attribute(op.index); }

    CopyRegisterIntoAttribute("copy_register_into_attribute", Decompress::EXTRA_BYTES) { register: Register, index: usize }
    |op, point, cx| { point.set_attribute(op.index, cx.registers[op.register]); }

    CopyAttributeIntoX("copy_attribute_into_x", Decompress::EXTRA_BYTES, unsupported) { index: usize }
    |op, point, cx| {
        let value = point.attribute(op.index);
        cx.set_coordinate(point, 0, value);
    }

    CopyAttributeIntoY("copy_attribute_into_y", Decompress::EXTRA_BYTES, unsupported) { index: usize }
    |op, point, cx| {
        let value = point.attribute(op.index);
        cx.set_coordinate(point, 1, value);
    }

    CopyAttributeIntoZ("copy_attribute_into_z", Decompress::Z.union(Decompress::EXTRA_BYTES), unsupported) { index: usize }
    |op, point, cx| {
        let value = point.attribute(op.index);
        cx.set_coordinate(point, 2, value);
    }

    AddAttributeToZ("add_attribute_to_z", Decompress::Z.union(Decompress::EXTRA_BYTES), unsupported) { index: usize }
    |op, point, cx| {
        let z = cx.coordinate(point, 2) + point.attribute(op.index);
        cx.set_coordinate(point, 2, z);
    }

    AddScaledAttributeToZ("add_scaled_attribute_to_z", Decompress::Z.union(Decompress::EXTRA_BYTES), unsupported) { index: usize, scale: f64 }
    |op, point, cx| {
        let z = cx.coordinate(point, 2) + point.attribute(op.index) * op.scale;
        cx.set_coordinate(point, 2, z);
    }

    CopyRegisterIntoX("copy_register_into_x", Decompress::empty(), unsupported) { register: Register }
    |op, point, cx| {
        let value = cx.registers[op.register];
        cx.set_coordinate(point, 0, value);
    }

    CopyRegisterIntoY("copy_register_into_y", Decompress::empty(), unsupported) { register: Register }
    |op, point, cx| {
        let value = cx.registers[op.register];
        cx.set_coordinate(point, 1, value);
    }

    CopyRegisterIntoZ("copy_register_into_z", Decompress::Z, unsupported) { register: Register }
    |op, point, cx| {
        let value = cx.registers[op.register];
        cx.set_coordinate(point, 2, value);
    }

    CopyIntensityIntoZ("copy_intensity_into_z", Decompress::Z.union(Decompress::INTENSITY), unsupported) {}
    |op, point, cx| {
        let value = f64::from(point.attributes.intensity);
        cx.set_coordinate(point, 2, value);
    }
}

#[cfg(test)]
mod tests {
    use pcd_core::pointcloud::{point::Point, quantize::ScaleOffset};

    use super::*;
    use crate::{
        registers::Registers,
        transform::{Operation, OperationContext, Preview},
    };

    fn make_point() -> Point {
        Point {
            raw: [100, 200, 300],
            quantizer: ScaleOffset::new([0.01; 3], [0.0; 3]),
            extra_bytes: vec![1.5, -2.0],
            ..Default::default()
        }
    }

    fn run(op: &mut dyn Operation, point: &mut Point, registers: &mut Registers) -> u64 {
        let mut overflow = 0;
        let mut cx = OperationContext::new(registers, None, &mut overflow);
        op.apply(point, &mut cx);
        overflow
    }

    #[test]
    fn attribute_arithmetic() {
        let mut point = make_point();
        let mut registers = Registers::default();
        run(&mut ScaleAttribute { index: 0, scale: 4.0 }, &mut point, &mut registers);
        run(
            &mut TranslateAttribute {
                index: 1,
                offset: 0.5,
            },
            &mut point,
            &mut registers,
        );
        assert_eq!(point.extra_bytes, vec![6.0, -1.5]);

        run(&mut CopyZIntoAttribute { index: 1 }, &mut point, &mut registers);
        assert_eq!(point.attribute(1), 3.0);
    }

    #[test]
    fn missing_attribute_reads_zero_and_ignores_writes() {
        let mut point = make_point();
        let mut registers = Registers::default();
        run(&mut SetAttribute { index: 5, value: 9.0 }, &mut point, &mut registers);
        assert_eq!(point.extra_bytes.len(), 2);

        run(&mut CopyAttributeIntoZ { index: 5 }, &mut point, &mut registers);
        assert_eq!(point.z(), 0.0);
    }

    #[test]
    fn attribute_into_coordinates() {
        let mut point = make_point();
        let mut registers = Registers::default();
        run(
            &mut AddScaledAttributeToZ {
                index: 0,
                scale: 2.0,
            },
            &mut point,
            &mut registers,
        );
        assert_eq!(point.raw[2], 600);

        let register = Register::new(3).unwrap();
        registers[register] = 12.34;
        run(&mut CopyRegisterIntoX { register }, &mut point, &mut registers);
        assert_eq!(point.raw[0], 1234);
    }

    #[test]
    fn coordinate_copies_decline_adjustment() {
        let op = CopyIntensityIntoZ {};
        assert_eq!(op.preview([1.0, 2.0, 3.0]), Preview::Unsupported);
        let op = CopyZIntoAttribute { index: 0 };
        assert_eq!(op.preview([1.0, 2.0, 3.0]), Preview::Coordinates([1.0, 2.0, 3.0]));
    }

    #[test]
    fn overflowing_copy_keeps_coordinate() {
        let mut point = make_point();
        let mut registers = Registers::default();
        let register = Register::new(0).unwrap();
        registers[register] = 1.0e10;
        let overflow = run(&mut CopyRegisterIntoY { register }, &mut point, &mut registers);
        assert_eq!(overflow, 1);
        assert_eq!(point.raw[1], 200);
    }
}
