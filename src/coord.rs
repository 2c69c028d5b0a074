//! Image coordinates and their linear index.

use std::fmt;

/// Number of values each coordinate digit can take.
pub const DIGITS: u8 = 6;

/// Number of addressable images (6 x 6 x 6).
pub const IMAGE_COUNT: u16 = 216;

/// A position in the 6x6x6 image grid, one digit (0-5) per switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ImageCoordinate {
    /// First digit, from switch 1.
    pub a: u8,
    /// Second digit, from switch 2.
    pub b: u8,
    /// Third digit, from switch 3.
    pub c: u8,
}

impl ImageCoordinate {
    /// Create a coordinate. Digits are reduced modulo 6.
    pub const fn new(a: u8, b: u8, c: u8) -> Self {
        Self {
            a: a % DIGITS,
            b: b % DIGITS,
            c: c % DIGITS,
        }
    }

    /// Build a coordinate from three switch detents (1-6).
    pub fn from_positions(positions: [u8; 3]) -> Self {
        let [p1, p2, p3] = positions.map(|p| p.clamp(1, DIGITS) - 1);
        Self::new(p1, p2, p3)
    }

    /// The linear index (0-215) used for slideshow cycling.
    pub fn to_index(self) -> u16 {
        self.a as u16 * 36 + self.b as u16 * 6 + self.c as u16
    }

    /// The coordinate at a linear index. The index is reduced modulo 216.
    pub fn from_index(index: u16) -> Self {
        let index = index % IMAGE_COUNT;
        Self {
            a: (index / 36) as u8,
            b: ((index / 6) % 6) as u8,
            c: (index % 6) as u8,
        }
    }

    /// The digits as an array, in switch order.
    pub fn digits(self) -> [u8; 3] {
        [self.a, self.b, self.c]
    }

    /// The image file name for this coordinate, e.g. `1-4-0.jpeg`.
    pub fn file_name(self, extension: &str) -> String {
        format!("{}-{}-{}.{}", self.a, self.b, self.c, extension)
    }
}

impl fmt::Display for ImageCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.a, self.b, self.c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        for i in 0..IMAGE_COUNT {
            assert_eq!(ImageCoordinate::from_index(i).to_index(), i);
        }
        for a in 0..6 {
            for b in 0..6 {
                for c in 0..6 {
                    let coord = ImageCoordinate::new(a, b, c);
                    assert_eq!(ImageCoordinate::from_index(coord.to_index()), coord);
                }
            }
        }
    }

    #[test]
    fn test_index_wraps() {
        assert_eq!(ImageCoordinate::from_index(216), ImageCoordinate::new(0, 0, 0));
        assert_eq!(ImageCoordinate::from_index(217), ImageCoordinate::new(0, 0, 1));
        assert_eq!(ImageCoordinate::from_index(215), ImageCoordinate::new(5, 5, 5));
    }

    #[test]
    fn test_from_positions_and_file_name() {
        let coord = ImageCoordinate::from_positions([2, 5, 1]);
        assert_eq!(coord, ImageCoordinate::new(1, 4, 0));
        assert_eq!(coord.file_name("jpeg"), "1-4-0.jpeg");
        assert_eq!(coord.to_string(), "1-4-0");
    }
}
