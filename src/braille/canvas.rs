/// Empty braille pattern (U+2800)
pub const BLANK: char = '\u{2800}';

/// Braille Unicode canvas for high-resolution terminal graphics.
/// Each character cell represents a 2x4 pixel grid (8 dots).
/// Unicode Braille patterns: U+2800 to U+28FF
#[derive(Clone, Debug)]
pub struct BrailleCanvas {
    width: usize,  // Characters
    height: usize, // Characters
    cells: Vec<u8>, // Bit pattern per char, row-major
}

impl BrailleCanvas {
    /// Create a new canvas with the given character dimensions.
    /// Effective pixel resolution: width*2 x height*4
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![0u8; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Set a pixel at the given coordinates.
    /// Braille dot layout per character:
    /// ```text
    /// (0,0) (1,0)   bits: 0x01 0x08
    /// (0,1) (1,1)   bits: 0x02 0x10
    /// (0,2) (1,2)   bits: 0x04 0x20
    /// (0,3) (1,3)   bits: 0x40 0x80
    /// ```
    pub fn set_pixel(&mut self, x: usize, y: usize) {
        let cx = x / 2;
        let cy = y / 4;

        if cx >= self.width || cy >= self.height {
            return;
        }

        let bit = match (x % 2, y % 4) {
            (0, 0) => 0x01,
            (1, 0) => 0x08,
            (0, 1) => 0x02,
            (1, 1) => 0x10,
            (0, 2) => 0x04,
            (1, 2) => 0x20,
            (0, 3) => 0x40,
            (1, 3) => 0x80,
            _ => 0,
        };

        self.cells[cy * self.width + cx] |= bit;
    }

    /// Set a pixel using signed coordinates (ignores negative values)
    pub fn set_pixel_signed(&mut self, x: i32, y: i32) {
        if x >= 0 && y >= 0 {
            self.set_pixel(x as usize, y as usize);
        }
    }

    /// Braille glyph for one character cell; blank when out of range
    pub fn cell(&self, cx: usize, cy: usize) -> char {
        if cx >= self.width || cy >= self.height {
            return BLANK;
        }
        char::from_u32(0x2800 + self.cells[cy * self.width + cx] as u32).unwrap_or(BLANK)
    }

    /// Convert the canvas to a string of Braille characters
    #[cfg(test)]
    pub fn to_string(&self) -> String {
        (0..self.height)
            .map(|cy| (0..self.width).map(|cx| self.cell(cx, cy)).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_pixel() {
        let mut canvas = BrailleCanvas::new(1, 1);
        canvas.set_pixel(0, 0);
        assert_eq!(canvas.to_string(), "⠁"); // U+2801
    }

    #[test]
    fn test_all_dots() {
        let mut canvas = BrailleCanvas::new(1, 1);
        for x in 0..2 {
            for y in 0..4 {
                canvas.set_pixel(x, y);
            }
        }
        assert_eq!(canvas.to_string(), "⣿"); // U+28FF (all dots)
    }

    #[test]
    fn test_out_of_bounds_ignored() {
        let mut canvas = BrailleCanvas::new(1, 1);
        canvas.set_pixel(2, 0);
        canvas.set_pixel_signed(-1, 0);
        assert_eq!(canvas.cell(0, 0), BLANK);
        assert_eq!(canvas.cell(5, 5), BLANK);
    }
}
