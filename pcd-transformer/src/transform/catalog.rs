//! Single-expression operations on point fields other than the coordinates.

use crate::{
    arguments::{Bit, Channel},
    decompress::Decompress,
    registers::Register,
};

const SECONDS_PER_WEEK: f64 = 604_800.0;
// adjusted standard GPS time is GPS time minus 1e9 seconds
const ADJUSTED_GPS_TIME_OFFSET: f64 = 1.0e9;
const MAX_SCAN_ANGLE: f32 = 180.0;

fn clamp_scan_angle(angle: f32) -> (f32, bool) {
    let clamped = angle.clamp(-MAX_SCAN_ANGLE, MAX_SCAN_ANGLE);
    (clamped, clamped != angle)
}

operations! {
    // intensity

    SetIntensity("set_intensity", Decompress::INTENSITY) { value: u16 }
    |op, point, cx| { point.attributes.intensity = op.value; }

    ScaleIntensity("scale_intensity", Decompress::INTENSITY) { scale: f64 }
    |op, point, cx| {
        point.attributes.intensity = cx.clamp_u16(f64::from(point.attributes.intensity) * op.scale);
    }

    TranslateIntensity("translate_intensity", Decompress::INTENSITY) { offset: f64 }
    |op, point, cx| {
        point.attributes.intensity = cx.clamp_u16(f64::from(point.attributes.intensity) + op.offset);
    }

    TranslateThenScaleIntensity("translate_then_scale_intensity", Decompress::INTENSITY) { offset: f64, scale: f64 }
    |op, point, cx| {
        let value = (f64::from(point.attributes.intensity) + op.offset) * op.scale;
        point.attributes.intensity = cx.clamp_u16(value);
    }

    ClampIntensity("clamp_intensity", Decompress::INTENSITY) { min: u16, max: u16 }
    |op, point, cx| { point.attributes.intensity = point.attributes.intensity.max(op.min).min(op.max); }

    ClampIntensityBelow("clamp_intensity_below", Decompress::INTENSITY) { min: u16 }
    |op, point, cx| { point.attributes.intensity = point.attributes.intensity.max(op.min); }

    ClampIntensityAbove("clamp_intensity_above", Decompress::INTENSITY) { max: u16 }
    |op, point, cx| { point.attributes.intensity = point.attributes.intensity.min(op.max); }

    CopyRgbIntoIntensity("copy_RGB_into_intensity", Decompress::RGB.union(Decompress::INTENSITY)) {}
    |op, point, cx| {
        let color = &point.color;
        let luminance = 0.2989 * f64::from(color.r) + 0.5870 * f64::from(color.g) + 0.1140 * f64::from(color.b);
        point.attributes.intensity = cx.clamp_u16(luminance);
    }

    CopyNirIntoIntensity("copy_NIR_into_intensity", Decompress::NIR.union(Decompress::INTENSITY)) {}
    |op, point, cx| { point.attributes.intensity = point.attributes.nir; }

    // scan angle

    SetScanAngle("set_scan_angle", Decompress::SCAN_ANGLE) { angle: f32 }
    |op, point, cx| {
        let (angle, clamped) = clamp_scan_angle(op.angle);
        if clamped {
            cx.record_overflow();
        }
        point.attributes.scan_angle = angle;
    }

    ScaleScanAngle("scale_scan_angle", Decompress::SCAN_ANGLE) { scale: f32 }
    |op, point, cx| {
        let (angle, clamped) = clamp_scan_angle(point.attributes.scan_angle * op.scale);
        if clamped {
            cx.record_overflow();
        }
        point.attributes.scan_angle = angle;
    }

    TranslateScanAngle("translate_scan_angle", Decompress::SCAN_ANGLE) { offset: f32 }
    |op, point, cx| {
        let (angle, clamped) = clamp_scan_angle(point.attributes.scan_angle + op.offset);
        if clamped {
            cx.record_overflow();
        }
        point.attributes.scan_angle = angle;
    }

    TranslateThenScaleScanAngle("translate_then_scale_scan_angle", Decompress::SCAN_ANGLE) { offset: f32, scale: f32 }
    |op, point, cx| {
        let (angle, clamped) = clamp_scan_angle((point.attributes.scan_angle + op.offset) * op.scale);
        if clamped {
            cx.record_overflow();
        }
        point.attributes.scan_angle = angle;
    }

    // classification and flags

    SetClassification("set_classification", Decompress::CLASSIFICATION) { class: u8 }
    |op, point, cx| { point.attributes.classification = op.class; }

    ChangeClassificationFromTo("change_classification_from_to", Decompress::CLASSIFICATION) { from: u8, to: u8 }
    |op, point, cx| {
        if point.attributes.classification == op.from {
            point.attributes.classification = op.to;
        }
    }

    ClassifyZBelowAs("classify_z_below_as", Decompress::Z.union(Decompress::CLASSIFICATION)) { z: f64, class: u8 }
    |op, point, cx| {
        if cx.coordinate(point, 2) < op.z {
            point.attributes.classification = op.class;
        }
    }

    ClassifyZAboveAs("classify_z_above_as", Decompress::Z.union(Decompress::CLASSIFICATION)) { z: f64, class: u8 }
    |op, point, cx| {
        if cx.coordinate(point, 2) > op.z {
            point.attributes.classification = op.class;
        }
    }

    ClassifyZBetweenAs("classify_z_between_as", Decompress::Z.union(Decompress::CLASSIFICATION)) { min: f64, max: f64, class: u8 }
    |op, point, cx| {
        let z = cx.coordinate(point, 2);
        if op.min <= z && z <= op.max {
            point.attributes.classification = op.class;
        }
    }

    ClassifyIntensityBelowAs("classify_intensity_below_as", Decompress::INTENSITY.union(Decompress::CLASSIFICATION)) { value: u16, class: u8 }
    |op, point, cx| {
        if point.attributes.intensity < op.value {
            point.attributes.classification = op.class;
        }
    }

    ClassifyIntensityAboveAs("classify_intensity_above_as", Decompress::INTENSITY.union(Decompress::CLASSIFICATION)) { value: u16, class: u8 }
    |op, point, cx| {
        if point.attributes.intensity > op.value {
            point.attributes.classification = op.class;
        }
    }

    ClassifyIntensityBetweenAs("classify_intensity_between_as", Decompress::INTENSITY.union(Decompress::CLASSIFICATION)) { min: u16, max: u16, class: u8 }
    |op, point, cx| {
        if (op.min..=op.max).contains(&point.attributes.intensity) {
            point.attributes.classification = op.class;
        }
    }

    ClassifyAttributeBelowAs("classify_attribute_below_as", Decompress::EXTRA_BYTES.union(Decompress::CLASSIFICATION)) { index: usize, value: f64, class: u8 }
    |op, point, cx| {
        if point.attribute(op.index) < op.value {
            point.attributes.classification = op.class;
        }
    }

    ClassifyAttributeAboveAs("classify_attribute_above_as", Decompress::EXTRA_BYTES.union(Decompress::CLASSIFICATION)) { index: usize, value: f64, class: u8 }
    |op, point, cx| {
        if point.attribute(op.index) > op.value {
            point.attributes.classification = op.class;
        }
    }

    ClassifyAttributeBetweenAs("classify_attribute_between_as", Decompress::EXTRA_BYTES.union(Decompress::CLASSIFICATION)) { index: usize, min: f64, max: f64, class: u8 }
    |op, point, cx| {
        let value = point.attribute(op.index);
        if op.min <= value && value <= op.max {
            point.attributes.classification = op.class;
        }
    }

    SetWithheldFlag("set_withheld_flag", Decompress::FLAGS) { flag: Bit }
    |op, point, cx| { point.attributes.withheld = op.flag.0; }

    SetSyntheticFlag("set_synthetic_flag", Decompress::FLAGS) { flag: Bit }
    |op, point, cx| { point.attributes.synthetic = op.flag.0; }

    SetKeypointFlag("set_keypoint_flag", Decompress::FLAGS) { flag: Bit }
    |op, point, cx| { point.attributes.key_point = op.flag.0; }

    SetOverlapFlag("set_overlap_flag", Decompress::FLAGS) { flag: Bit }
    |op, point, cx| { point.attributes.overlap = op.flag.0; }

    SetScanDirectionFlag("set_scan_direction_flag", Decompress::FLAGS) { flag: Bit }
    |op, point, cx| { point.attributes.scan_direction = op.flag.0; }

    SetEdgeOfFlightLine("set_edge_of_flight_line", Decompress::FLAGS) { flag: Bit }
    |op, point, cx| { point.attributes.edge_of_flight_line = op.flag.0; }

    SetScannerChannel("set_scanner_channel", Decompress::empty()) { channel: Channel }
    |op, point, cx| { point.attributes.scanner_channel = op.channel.0; }

    // user data

    SetUserData("set_user_data", Decompress::USER_DATA) { value: u8 }
    |op, point, cx| { point.attributes.user_data = op.value; }

    ChangeUserDataFromTo("change_user_data_from_to", Decompress::USER_DATA) { from: u8, to: u8 }
    |op, point, cx| {
        if point.attributes.user_data == op.from {
            point.attributes.user_data = op.to;
        }
    }

    CopyScannerChannelIntoUserData("copy_scanner_channel_into_user_data", Decompress::USER_DATA) {}
    |op, point, cx| { point.attributes.user_data = point.attributes.scanner_channel; }

    CopyUserDataIntoScannerChannel("copy_user_data_into_scanner_channel", Decompress::USER_DATA) {}
    |op, point, cx| {
        if point.attributes.user_data <= 3 {
            point.attributes.scanner_channel = point.attributes.user_data;
        } else {
            cx.record_overflow();
        }
    }

    CopyUserDataIntoPointSource("copy_user_data_into_point_source", Decompress::USER_DATA.union(Decompress::POINT_SOURCE)) {}
    |op, point, cx| { point.attributes.point_source_id = u16::from(point.attributes.user_data); }

    CopyAttributeIntoUserData("copy_attribute_into_user_data", Decompress::EXTRA_BYTES.union(Decompress::USER_DATA)) { index: usize }
    |op, point, cx| { point.attributes.user_data = cx.clamp_u8(point.attribute(op.index)); }

    // point source ID

    SetPointSource("set_point_source", Decompress::POINT_SOURCE) { value: u16 }
    |op, point, cx| { point.attributes.point_source_id = op.value; }

    ChangePointSourceFromTo("change_point_source_from_to", Decompress::POINT_SOURCE) { from: u16, to: u16 }
    |op, point, cx| {
        if point.attributes.point_source_id == op.from {
            point.attributes.point_source_id = op.to;
        }
    }

    CopyPointSourceIntoUserData("copy_point_source_into_user_data", Decompress::POINT_SOURCE.union(Decompress::USER_DATA)) {}
    |op, point, cx| { point.attributes.user_data = cx.clamp_u8(f64::from(point.attributes.point_source_id)); }

    MergeScannerChannelIntoPointSource("merge_scanner_channel_into_point_source", Decompress::POINT_SOURCE) {}
    |op, point, cx| {
        let merged = u32::from(point.attributes.point_source_id) * 4 + u32::from(point.attributes.scanner_channel);
        match u16::try_from(merged) {
            Ok(merged) => point.attributes.point_source_id = merged,
            Err(_) => cx.record_overflow(),
        }
    }

    SplitScannerChannelFromPointSource("split_scanner_channel_from_point_source", Decompress::POINT_SOURCE) {}
    |op, point, cx| {
        point.attributes.scanner_channel = (point.attributes.point_source_id & 3) as u8;
        point.attributes.point_source_id >>= 2;
    }

    BinGpsTimeIntoPointSource("bin_gps_time_into_point_source", Decompress::GPS_TIME.union(Decompress::POINT_SOURCE)) { bin_size: f64 }
    |op, point, cx| {
        let bin = (point.attributes.gps_time / op.bin_size).floor();
        point.attributes.point_source_id = cx.clamp_u16(bin);
    }

    // returns

    SetReturnNumber("set_return_number", Decompress::empty()) { number: u8 }
    |op, point, cx| { point.attributes.return_number = op.number; }

    ChangeReturnNumberFromTo("change_return_number_from_to", Decompress::empty()) { from: u8, to: u8 }
    |op, point, cx| {
        if point.attributes.return_number == op.from {
            point.attributes.return_number = op.to;
        }
    }

    SetNumberOfReturns("set_number_of_returns", Decompress::empty()) { number: u8 }
    |op, point, cx| { point.attributes.number_of_returns = op.number; }

    ChangeNumberOfReturnsFromTo("change_number_of_returns_from_to", Decompress::empty()) { from: u8, to: u8 }
    |op, point, cx| {
        if point.attributes.number_of_returns == op.from {
            point.attributes.number_of_returns = op.to;
        }
    }

    RepairZeroReturns("repair_zero_returns", Decompress::empty()) {}
    |op, point, cx| {
        if point.attributes.number_of_returns == 0 {
            point.attributes.number_of_returns = 1;
        }
        if point.attributes.return_number == 0 {
            point.attributes.return_number = 1;
        }
    }

    // GPS time

    SetGpsTime("set_gps_time", Decompress::GPS_TIME) { time: f64 }
    |op, point, cx| { point.attributes.gps_time = op.time; }

    TranslateGpsTime("translate_gps_time", Decompress::GPS_TIME) { offset: f64 }
    |op, point, cx| { point.attributes.gps_time += op.offset; }

    AdjustedToWeek("adjusted_to_week", Decompress::GPS_TIME) {}
    |op, point, cx| {
        let gps_time = point.attributes.gps_time + ADJUSTED_GPS_TIME_OFFSET;
        let week = (gps_time / SECONDS_PER_WEEK).floor();
        point.attributes.gps_time = gps_time - week * SECONDS_PER_WEEK;
    }

    WeekToAdjusted("week_to_adjusted", Decompress::GPS_TIME) { week: u32 }
    |op, point, cx| {
        point.attributes.gps_time += f64::from(op.week) * SECONDS_PER_WEEK - ADJUSTED_GPS_TIME_OFFSET;
    }

    // RGB and NIR

    SetRgb("set_RGB", Decompress::RGB) { r: u16, g: u16, b: u16 }
    |op, point, cx| {
        point.color.r = op.r;
        point.color.g = op.g;
        point.color.b = op.b;
    }

    ScaleRgb("scale_RGB", Decompress::RGB) { r: f64, g: f64, b: f64 }
    |op, point, cx| {
        point.color.r = cx.clamp_u16(f64::from(point.color.r) * op.r);
        point.color.g = cx.clamp_u16(f64::from(point.color.g) * op.g);
        point.color.b = cx.clamp_u16(f64::from(point.color.b) * op.b);
    }

    ScaleRgbDown("scale_RGB_down", Decompress::RGB) {}
    |op, point, cx| {
        point.color.r >>= 8;
        point.color.g >>= 8;
        point.color.b >>= 8;
    }

    ScaleRgbUp("scale_RGB_up", Decompress::RGB) {}
    |op, point, cx| {
        point.color.r = cx.clamp_u16(f64::from(point.color.r) * 256.0);
        point.color.g = cx.clamp_u16(f64::from(point.color.g) * 256.0);
        point.color.b = cx.clamp_u16(f64::from(point.color.b) * 256.0);
    }

    SwitchRG("switch_R_G", Decompress::RGB) {}
    |op, point, cx| { std::mem::swap(&mut point.color.r, &mut point.color.g); }

    SwitchRB("switch_R_B", Decompress::RGB) {}
    |op, point, cx| { std::mem::swap(&mut point.color.r, &mut point.color.b); }

    SwitchGB("switch_G_B", Decompress::RGB) {}
    |op, point, cx| { std::mem::swap(&mut point.color.g, &mut point.color.b); }

    CopyRIntoNir("copy_R_into_NIR", Decompress::RGB.union(Decompress::NIR)) {}
    |op, point, cx| { point.attributes.nir = point.color.r; }

    CopyGIntoNir("copy_G_into_NIR", Decompress::RGB.union(Decompress::NIR)) {}
    |op, point, cx| { point.attributes.nir = point.color.g; }

    CopyBIntoNir("copy_B_into_NIR", Decompress::RGB.union(Decompress::NIR)) {}
    |op, point, cx| { point.attributes.nir = point.color.b; }

    CopyIntensityIntoNir("copy_intensity_into_NIR", Decompress::INTENSITY.union(Decompress::NIR)) {}
    |op, point, cx| { point.attributes.nir = point.attributes.intensity; }

    SetNir("set_NIR", Decompress::NIR) { value: u16 }
    |op, point, cx| { point.attributes.nir = op.value; }

    ScaleNir("scale_NIR", Decompress::NIR) { scale: f64 }
    |op, point, cx| { point.attributes.nir = cx.clamp_u16(f64::from(point.attributes.nir) * op.scale); }

    // registers

    SetRegister("set_register", Decompress::empty()) { register: Register, value: f64 }
    |op, point, cx| { cx.registers[op.register] = op.value; }

    ScaleRegister("scale_register", Decompress::empty()) { register: Register, scale: f64 }
    |op, point, cx| { cx.registers[op.register] *= op.scale; }

    TranslateRegister("translate_register", Decompress::empty()) { register: Register, offset: f64 }
    |op, point, cx| { cx.registers[op.register] += op.offset; }

    AddRegisters("add_registers", Decompress::empty()) { a: Register, b: Register, out: Register }
    |op, point, cx| { cx.registers[op.out] = cx.registers[op.a] + cx.registers[op.b]; }

    SubtractRegisters("subtract_registers", Decompress::empty()) { a: Register, b: Register, out: Register }
    |op, point, cx| { cx.registers[op.out] = cx.registers[op.a] - cx.registers[op.b]; }

    MultiplyRegisters("multiply_registers", Decompress::empty()) { a: Register, b: Register, out: Register }
    |op, point, cx| { cx.registers[op.out] = cx.registers[op.a] * cx.registers[op.b]; }

    DivideRegisters("divide_registers", Decompress::empty()) { a: Register, b: Register, out: Register }
    |op, point, cx| {
        let divisor = cx.registers[op.b];
        if divisor == 0.0 {
            cx.record_overflow();
        } else {
            cx.registers[op.out] = cx.registers[op.a] / divisor;
        }
    }

    CopyXIntoRegister("copy_x_into_register", Decompress::empty()) { register: Register }
    |op, point, cx| { cx.registers[op.register] = cx.coordinate(point, 0); }

    CopyYIntoRegister("copy_y_into_register", Decompress::empty()) { register: Register }
    |op, point, cx| { cx.registers[op.register] = cx.coordinate(point, 1); }

    CopyZIntoRegister("copy_z_into_register", Decompress::Z) { register: Register }
    |op, point, cx| { cx.registers[op.register] = cx.coordinate(point, 2); }

    CopyIntensityIntoRegister("copy_intensity_into_register", Decompress::INTENSITY) { register: Register }
    |op, point, cx| { cx.registers[op.register] = f64::from(point.attributes.intensity); }

    CopyRegisterIntoIntensity("copy_register_into_intensity", Decompress::INTENSITY) { register: Register }
    |op, point, cx| {
        let value = cx.registers[op.register];
        point.attributes.intensity = cx.clamp_u16(value);
    }

    CopyUserDataIntoRegister("copy_user_data_into_register", Decompress::USER_DATA) { register: Register }
    |op, point, cx| { cx.registers[op.register] = f64::from(point.attributes.user_data); }

    CopyRegisterIntoUserData("copy_register_into_user_data", Decompress::USER_DATA) { register: Register }
    |op, point, cx| {
        let value = cx.registers[op.register];
        point.attributes.user_data = cx.clamp_u8(value);
    }

    CopyPointSourceIntoRegister("copy_point_source_into_register", Decompress::POINT_SOURCE) { register: Register }
    |op, point, cx| { cx.registers[op.register] = f64::from(point.attributes.point_source_id); }

    CopyRegisterIntoPointSource("copy_register_into_point_source", Decompress::POINT_SOURCE) { register: Register }
    |op, point, cx| {
        let value = cx.registers[op.register];
        point.attributes.point_source_id = cx.clamp_u16(value);
    }

    CopyGpsTimeIntoRegister("copy_gps_time_into_register", Decompress::GPS_TIME) { register: Register }
    |op, point, cx| { cx.registers[op.register] = point.attributes.gps_time; }

    CopyRegisterIntoGpsTime("copy_register_into_gps_time", Decompress::GPS_TIME) { register: Register }
    |op, point, cx| { point.attributes.gps_time = cx.registers[op.register]; }
}
