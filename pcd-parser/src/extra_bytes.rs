//! Typed extra-bytes attributes described by the `LASF_Spec` record 4 VLR.

use byteorder::{ByteOrder as _, LittleEndian};

use crate::error::ParseError;

pub const USER_ID: &str = "LASF_Spec";
pub const RECORD_ID: u16 = 4;
const DESCRIPTOR_LEN: usize = 192;

const OPTION_SCALE: u8 = 1 << 3;
const OPTION_OFFSET: u8 = 1 << 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl DataType {
    fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            1 => Self::U8,
            2 => Self::I8,
            3 => Self::U16,
            4 => Self::I16,
            5 => Self::U32,
            6 => Self::I32,
            7 => Self::U64,
            8 => Self::I64,
            9 => Self::F32,
            10 => Self::F64,
            _ => return None,
        })
    }

    pub fn size(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }

    fn read(self, buf: &[u8]) -> f64 {
        match self {
            Self::U8 => f64::from(buf[0]),
            Self::I8 => f64::from(buf[0] as i8),
            Self::U16 => f64::from(LittleEndian::read_u16(buf)),
            Self::I16 => f64::from(LittleEndian::read_i16(buf)),
            Self::U32 => f64::from(LittleEndian::read_u32(buf)),
            Self::I32 => f64::from(LittleEndian::read_i32(buf)),
            Self::U64 => LittleEndian::read_u64(buf) as f64,
            Self::I64 => LittleEndian::read_i64(buf) as f64,
            Self::F32 => f64::from(LittleEndian::read_f32(buf)),
            Self::F64 => LittleEndian::read_f64(buf),
        }
    }

    /// Integer types round half away from zero and saturate at their range.
    fn write(self, buf: &mut [u8], value: f64) {
        let rounded = value.round();
        match self {
            Self::U8 => buf[0] = rounded as u8,
            Self::I8 => buf[0] = rounded as i8 as u8,
            Self::U16 => LittleEndian::write_u16(buf, rounded as u16),
            Self::I16 => LittleEndian::write_i16(buf, rounded as i16),
            Self::U32 => LittleEndian::write_u32(buf, rounded as u32),
            Self::I32 => LittleEndian::write_i32(buf, rounded as i32),
            Self::U64 => LittleEndian::write_u64(buf, rounded as u64),
            Self::I64 => LittleEndian::write_i64(buf, rounded as i64),
            Self::F32 => LittleEndian::write_f32(buf, value as f32),
            Self::F64 => LittleEndian::write_f64(buf, value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtraAttribute {
    pub name: String,
    pub data_type: DataType,
    pub scale: f64,
    pub offset: f64,
}

impl ExtraAttribute {
    fn plain(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            scale: 1.0,
            offset: 0.0,
        }
    }
}

/// How the extra bytes of one point split into attributes.
///
/// Bytes without a typed description become one `U8` attribute each, so every byte of the
/// record survives a read and write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtraBytesLayout {
    attributes: Vec<ExtraAttribute>,
}

impl ExtraBytesLayout {
    pub fn new(attributes: Vec<ExtraAttribute>) -> Self {
        Self { attributes }
    }

    /// Builds the layout for `record_len` extra bytes from the VLR payloads of a file.
    pub fn from_vlrs<'a>(
        vlrs: impl IntoIterator<Item = &'a las::Vlr>,
        record_len: usize,
    ) -> Result<Self, ParseError> {
        let mut attributes = Vec::new();
        if let Some(vlr) = vlrs
            .into_iter()
            .find(|vlr| vlr.user_id == USER_ID && vlr.record_id == RECORD_ID)
        {
            attributes = parse_descriptors(&vlr.data)?;
        }

        let mut layout = Self { attributes };
        let described = layout.record_len();
        if described > record_len {
            return Err(ParseError::ExtraBytes(format!(
                "descriptors cover {described} bytes but points carry {record_len}"
            )));
        }
        for _ in described..record_len {
            layout
                .attributes
                .push(ExtraAttribute::plain("undocumented", DataType::U8));
        }
        Ok(layout)
    }

    pub fn attributes(&self) -> &[ExtraAttribute] {
        &self.attributes
    }

    pub fn record_len(&self) -> usize {
        self.attributes.iter().map(|a| a.data_type.size()).sum()
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Vec<f64>, ParseError> {
        if bytes.len() != self.record_len() {
            return Err(ParseError::ExtraBytes(format!(
                "expected {} extra bytes, got {}",
                self.record_len(),
                bytes.len()
            )));
        }
        let mut values = Vec::with_capacity(self.attributes.len());
        let mut start = 0;
        for attribute in &self.attributes {
            let end = start + attribute.data_type.size();
            let raw = attribute.data_type.read(&bytes[start..end]);
            values.push(raw * attribute.scale + attribute.offset);
            start = end;
        }
        Ok(values)
    }

    /// Missing values are written as zero.
    pub fn encode(&self, values: &[f64]) -> Vec<u8> {
        let mut bytes = vec![0; self.record_len()];
        let mut start = 0;
        for (index, attribute) in self.attributes.iter().enumerate() {
            let end = start + attribute.data_type.size();
            if let Some(value) = values.get(index) {
                let raw = (value - attribute.offset) / attribute.scale;
                attribute.data_type.write(&mut bytes[start..end], raw);
            }
            start = end;
        }
        bytes
    }
}

fn parse_descriptors(data: &[u8]) -> Result<Vec<ExtraAttribute>, ParseError> {
    if data.len() % DESCRIPTOR_LEN != 0 {
        return Err(ParseError::ExtraBytes(format!(
            "descriptor record of {} bytes is not a multiple of {DESCRIPTOR_LEN}",
            data.len()
        )));
    }

    let mut attributes = Vec::new();
    for descriptor in data.chunks_exact(DESCRIPTOR_LEN) {
        let code = descriptor[2];
        let options = descriptor[3];
        let name = String::from_utf8_lossy(&descriptor[4..36])
            .trim_end_matches('\0')
            .to_string();

        if code == 0 {
            // untyped, `options` holds the byte count
            for _ in 0..options {
                attributes.push(ExtraAttribute::plain(&name, DataType::U8));
            }
            continue;
        }

        let data_type = DataType::from_code(code).ok_or_else(|| {
            ParseError::ExtraBytes(format!("attribute '{name}' has unsupported data type {code}"))
        })?;
        let scale = if options & OPTION_SCALE != 0 {
            LittleEndian::read_f64(&descriptor[112..120])
        } else {
            1.0
        };
        let offset = if options & OPTION_OFFSET != 0 {
            LittleEndian::read_f64(&descriptor[136..144])
        } else {
            0.0
        };
        if scale == 0.0 {
            return Err(ParseError::ExtraBytes(format!(
                "attribute '{name}' has a zero scale"
            )));
        }
        attributes.push(ExtraAttribute {
            name,
            data_type,
            scale,
            offset,
        });
    }
    Ok(attributes)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// One descriptor the way LAS 1.4 lays it out.
    pub(crate) fn descriptor(name: &str, code: u8, scale: Option<f64>, offset: Option<f64>) -> Vec<u8> {
        let mut data = vec![0; DESCRIPTOR_LEN];
        data[2] = code;
        data[4..4 + name.len()].copy_from_slice(name.as_bytes());
        if let Some(scale) = scale {
            data[3] |= OPTION_SCALE;
            LittleEndian::write_f64(&mut data[112..120], scale);
        }
        if let Some(offset) = offset {
            data[3] |= OPTION_OFFSET;
            LittleEndian::write_f64(&mut data[136..144], offset);
        }
        data
    }

    pub(crate) fn vlr(data: Vec<u8>) -> las::Vlr {
        las::Vlr {
            user_id: USER_ID.to_string(),
            record_id: RECORD_ID,
            description: "Extra Bytes Record".to_string(),
            data,
        }
    }

    #[test]
    fn decodes_scaled_attributes() {
        let mut data = descriptor("height", 3, Some(0.01), Some(-10.0));
        data.extend(descriptor("confidence", 9, None, None));
        let layout = ExtraBytesLayout::from_vlrs(&[vlr(data)], 6).unwrap();
        assert_eq!(layout.attributes().len(), 2);
        assert_eq!(layout.attributes()[0].name, "height");

        let mut bytes = vec![0; 6];
        LittleEndian::write_u16(&mut bytes[0..2], 1250);
        LittleEndian::write_f32(&mut bytes[2..6], 0.5);
        let values = layout.decode(&bytes).unwrap();
        assert!((values[0] - 2.5).abs() < 1e-9);
        assert_eq!(values[1], 0.5);

        assert_eq!(layout.encode(&values), bytes);
    }

    #[test]
    fn undescribed_bytes_are_kept() {
        let layout = ExtraBytesLayout::from_vlrs(std::iter::empty(), 3).unwrap();
        assert_eq!(layout.record_len(), 3);
        let bytes = vec![7, 0, 255];
        let values = layout.decode(&bytes).unwrap();
        assert_eq!(values, vec![7.0, 0.0, 255.0]);
        assert_eq!(layout.encode(&values), bytes);
    }

    #[test]
    fn integer_encoding_saturates() {
        let layout = ExtraBytesLayout::new(vec![
            ExtraAttribute::plain("a", DataType::U8),
            ExtraAttribute::plain("b", DataType::I16),
        ]);
        assert_eq!(layout.encode(&[300.0, -40_000.0]), vec![255, 0x00, 0x80]);
        assert_eq!(layout.encode(&[]), vec![0, 0, 0]);
    }

    #[test]
    fn rejects_malformed_descriptors() {
        assert!(ExtraBytesLayout::from_vlrs(&[vlr(vec![0; 10])], 0).is_err());
        assert!(ExtraBytesLayout::from_vlrs(&[vlr(descriptor("x", 42, None, None))], 8).is_err());
        assert!(ExtraBytesLayout::from_vlrs(&[vlr(descriptor("x", 10, None, None))], 4).is_err());
    }
}
