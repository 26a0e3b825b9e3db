use ratatui::style::Color;

/// An opaque sRGB color parsed from a CSS-style string
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Terminal background the fills are blended against
pub const BACKGROUND: Rgb = Rgb(0, 0, 0);

impl Rgb {
    /// Parse `#rgb`, `#rrggbb` or a handful of CSS color names
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }
        let named = match s.to_ascii_lowercase().as_str() {
            "black" => Rgb(0, 0, 0),
            "white" => Rgb(255, 255, 255),
            "red" => Rgb(255, 0, 0),
            "green" => Rgb(0, 128, 0),
            "blue" => Rgb(0, 0, 255),
            "yellow" => Rgb(255, 255, 0),
            "orange" => Rgb(255, 165, 0),
            "purple" => Rgb(128, 0, 128),
            "gray" | "grey" => Rgb(128, 128, 128),
            _ => return None,
        };
        Some(named)
    }

    /// Alpha-composite `self` over `under`
    pub fn blend(self, under: Rgb, alpha: f64) -> Rgb {
        let a = alpha.clamp(0.0, 1.0);
        let mix = |top: u8, bottom: u8| (top as f64 * a + bottom as f64 * (1.0 - a)).round() as u8;
        Rgb(mix(self.0, under.0), mix(self.1, under.1), mix(self.2, under.2))
    }
}

impl From<Rgb> for Color {
    fn from(c: Rgb) -> Self {
        Color::Rgb(c.0, c.1, c.2)
    }
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    let digit = |i: usize, len: usize| u8::from_str_radix(hex.get(i..i + len)?, 16).ok();
    match hex.len() {
        3 => {
            let r = digit(0, 1)?;
            let g = digit(1, 1)?;
            let b = digit(2, 1)?;
            Some(Rgb(r * 17, g * 17, b * 17))
        }
        6 => Some(Rgb(digit(0, 2)?, digit(2, 2)?, digit(4, 2)?)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(Rgb::parse("#cccccc"), Some(Rgb(204, 204, 204)));
        assert_eq!(Rgb::parse("#fff"), Some(Rgb(255, 255, 255)));
        assert_eq!(Rgb::parse("#12345"), None);
        assert_eq!(Rgb::parse("#zzzzzz"), None);
    }

    #[test]
    fn test_parse_named() {
        assert_eq!(Rgb::parse("Red"), Some(Rgb(255, 0, 0)));
        assert_eq!(Rgb::parse("chartreuse-ish"), None);
    }

    #[test]
    fn test_blend_halfway() {
        let c = Rgb(200, 100, 0).blend(BACKGROUND, 0.5);
        assert_eq!(c, Rgb(100, 50, 0));
    }
}
