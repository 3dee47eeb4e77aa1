//! Packed ARGB colors as carried on the wire.

use peniko::Color;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A 32-bit `0xAARRGGBB` color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PackedColor(pub u32);

impl PackedColor {
    pub const WHITE: Self = Self(0xFFFF_FFFF);
    pub const BLACK: Self = Self(0xFF00_0000);
    pub const GRAY: Self = Self(0xFF88_8888);
    pub const RED: Self = Self(0xFFFF_0000);
    pub const TRANSPARENT: Self = Self(0);

    pub fn from_argb(argb: u32) -> Self {
        Self(argb)
    }

    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(u32::from_be_bytes([a, r, g, b]))
    }

    /// `[r, g, b, a]` byte order, as stored in an RGBA bitmap.
    pub fn to_rgba8(self) -> [u8; 4] {
        let [a, r, g, b] = self.0.to_be_bytes();
        [r, g, b, a]
    }

    pub fn argb(self) -> u32 {
        self.0
    }

    pub fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }
}

impl From<Color> for PackedColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self::from_rgba8(rgba.r, rgba.g, rgba.b, rgba.a)
    }
}

impl From<PackedColor> for Color {
    fn from(color: PackedColor) -> Self {
        let [r, g, b, a] = color.to_rgba8();
        Color::from_rgba8(r, g, b, a)
    }
}

/// Serialized as a signed 32-bit integer, the form JVM peers emit.
impl Serialize for PackedColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.0 as i32)
    }
}

/// Accepts both the signed and the unsigned reading of the same bits.
impl<'de> Deserialize<'de> for PackedColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        if raw < i64::from(i32::MIN) || raw > i64::from(u32::MAX) {
            return Err(serde::de::Error::custom(format!("color out of range: {}", raw)));
        }
        Ok(Self(raw as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba8_byte_order() {
        let c = PackedColor::from_rgba8(0x12, 0x34, 0x56, 0x78);
        assert_eq!(c.argb(), 0x7812_3456);
        assert_eq!(c.to_rgba8(), [0x12, 0x34, 0x56, 0x78]);
        assert_eq!(c.alpha(), 0x78);
    }

    #[test]
    fn test_serialize_signed() {
        let json = serde_json::to_string(&PackedColor::RED).unwrap();
        assert_eq!(json, "-65536");
    }

    #[test]
    fn test_deserialize_signed_and_unsigned() {
        let signed: PackedColor = serde_json::from_str("-65536").unwrap();
        let unsigned: PackedColor = serde_json::from_str("4294901760").unwrap();
        assert_eq!(signed, PackedColor::RED);
        assert_eq!(unsigned, PackedColor::RED);
    }

    #[test]
    fn test_deserialize_out_of_range() {
        assert!(serde_json::from_str::<PackedColor>("4294967296").is_err());
        assert!(serde_json::from_str::<PackedColor>("-2147483649").is_err());
    }

    #[test]
    fn test_peniko_conversion() {
        let color: Color = PackedColor::from_rgba8(10, 20, 30, 255).into();
        assert_eq!(PackedColor::from(color), PackedColor::from_rgba8(10, 20, 30, 255));
    }
}
