// Entity colors

use serde::{Serialize, Serializer};

/// Text and fills below this luma get white text.
pub const CONTRAST_LUMA_THRESHOLD: f64 = 140.0;

/// An opaque RGB color stored as `0xRRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rgb(u32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0x000000);
    pub const WHITE: Rgb = Rgb(0xFFFFFF);

    /// Convert from hex u32 (0xRRGGBB). Bits above 24 are dropped.
    pub const fn from_hex(hex: u32) -> Self {
        Self(hex & 0xFF_FFFF)
    }

    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | (b as u32))
    }

    /// Parse `#RRGGBB` or `RRGGBB`.
    pub fn parse(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        u32::from_str_radix(hex, 16).ok().map(Self)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub const fn r(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    pub const fn g(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    pub const fn b(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Channels as 0.0..=1.0 floats, for PDF color operators.
    pub fn unit(self) -> (f32, f32, f32) {
        (
            self.r() as f32 / 255.0,
            self.g() as f32 / 255.0,
            self.b() as f32 / 255.0,
        )
    }

    /// Rec. 709 luma on the 0..=255 scale.
    pub fn luma(self) -> f64 {
        0.2126 * self.r() as f64 + 0.7152 * self.g() as f64 + 0.0722 * self.b() as f64
    }

    /// Text color readable on top of this fill.
    pub fn contrast_text(self) -> Rgb {
        if self.luma() < CONTRAST_LUMA_THRESHOLD {
            Self::WHITE
        } else {
            Self::BLACK
        }
    }

    /// This color painted with `opacity` over a white background.
    pub fn tint(self, opacity: f64) -> Rgb {
        let a = opacity.clamp(0.0, 1.0);
        let mix = |c: u8| -> u8 { (c as f64 * a + 255.0 * (1.0 - a)).round() as u8 };
        Self::from_rgb(mix(self.r()), mix(self.g()), mix(self.b()))
    }

    pub fn to_hex(self) -> String {
        format!("#{:06X}", self.0)
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:06X}", self.0)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_with_and_without_hash() {
        assert_eq!(Rgb::parse("#E3000F"), Some(Rgb::from_hex(0xE3000F)));
        assert_eq!(Rgb::parse("e3000f"), Some(Rgb::from_hex(0xE3000F)));
        assert_eq!(Rgb::parse("#E3000"), None);
        assert_eq!(Rgb::parse("#GGGGGG"), None);
        assert_eq!(Rgb::parse("+E3000F"), None);
    }

    #[test]
    fn contrast_threshold() {
        // black, SPD red and Linke magenta are dark fills
        assert_eq!(Rgb::from_hex(0x000000).contrast_text(), Rgb::WHITE);
        assert_eq!(Rgb::from_hex(0xE3000F).contrast_text(), Rgb::WHITE);
        assert_eq!(Rgb::from_hex(0xBE3075).contrast_text(), Rgb::WHITE);
        // FDP yellow and the grey fallback are light
        assert_eq!(Rgb::from_hex(0xFFED00).contrast_text(), Rgb::BLACK);
        assert_eq!(Rgb::from_hex(0x9CA3AF).contrast_text(), Rgb::BLACK);
    }

    #[test]
    fn tint_blends_towards_white() {
        let red = Rgb::from_hex(0xFF0000);
        assert_eq!(red.tint(1.0), red);
        assert_eq!(red.tint(0.0), Rgb::WHITE);
        assert_eq!(red.tint(0.5), Rgb::from_rgb(255, 128, 128));
    }

    #[test]
    fn hex_display() {
        assert_eq!(Rgb::from_hex(0x1AA037).to_hex(), "#1AA037");
        assert_eq!(Rgb::from_hex(0x00B3A4).to_string(), "#00B3A4");
    }
}
