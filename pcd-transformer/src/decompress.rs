use std::ops::{BitOr, BitOrAssign};

/// Point layers a compressed reader has to decode for an operation to see real values.
///
/// The bits follow LASzip's selective decompression layers. X, Y, return numbers and the
/// scanner channel always come together and are always decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Decompress(u32);

impl Decompress {
    pub const CHANNEL_RETURNS_XY: Self = Self(0);
    pub const Z: Self = Self(1 << 0);
    pub const CLASSIFICATION: Self = Self(1 << 1);
    pub const FLAGS: Self = Self(1 << 2);
    pub const INTENSITY: Self = Self(1 << 3);
    pub const SCAN_ANGLE: Self = Self(1 << 4);
    pub const USER_DATA: Self = Self(1 << 5);
    pub const POINT_SOURCE: Self = Self(1 << 6);
    pub const GPS_TIME: Self = Self(1 << 7);
    pub const RGB: Self = Self(1 << 8);
    pub const NIR: Self = Self(1 << 9);
    pub const WAVEPACKET: Self = Self(1 << 10);
    pub const EXTRA_BYTES: Self = Self(1 << 11);
    pub const ALL: Self = Self(u32::MAX);

    pub const fn empty() -> Self {
        Self::CHANNEL_RETURNS_XY
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for Decompress {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for Decompress {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_and_contains() {
        let mut layers = Decompress::Z | Decompress::RGB;
        assert!(layers.contains(Decompress::Z));
        assert!(!layers.contains(Decompress::NIR));
        layers |= Decompress::NIR;
        assert!(layers.contains(Decompress::RGB.union(Decompress::NIR)));
        assert!(Decompress::ALL.contains(layers));
        assert!(layers.contains(Decompress::CHANNEL_RETURNS_XY));
    }
}
