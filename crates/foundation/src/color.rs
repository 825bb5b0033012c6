/// Linear RGB color with channels in `[0, 1]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    BadLength(String),
    BadDigit(String),
}

impl std::fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorParseError::BadLength(s) => write!(f, "hex color must have 6 digits: {s:?}"),
            ColorParseError::BadDigit(s) => write!(f, "invalid hex digit in color: {s:?}"),
        }
    }
}

impl std::error::Error for ColorParseError {}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);
    pub const CYAN: Rgb = Rgb::new(0.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Builds a color from 0..=255 channel values.
    pub fn from_bytes(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// Parses `#rrggbb` or `rrggbb` (case-insensitive).
    pub fn from_hex(hex: &str) -> Result<Self, ColorParseError> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(ColorParseError::BadLength(hex.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map_err(|_| ColorParseError::BadDigit(hex.to_string()))
        };
        Ok(Self::from_bytes(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub fn to_bytes(self) -> [u8; 3] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b)]
    }

    /// Lower-case `#rrggbb`.
    pub fn to_hex(self) -> String {
        let [r, g, b] = self.to_bytes();
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    pub fn scale(self, s: f32) -> Self {
        Self::new(self.r * s, self.g * s, self.b * s)
    }

    pub fn clamped(self) -> Self {
        Self::new(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
        )
    }

    /// Weighted mix in byte space, e.g. portions `1:1` or `3:5`.
    ///
    /// Rounds each channel to the nearest byte so a blended legend round-trips
    /// through hex unchanged.
    pub fn blend(self, other: Rgb, self_portion: u32, other_portion: u32) -> Rgb {
        let total = (self_portion + other_portion).max(1) as f64;
        let a = self.to_bytes();
        let b = other.to_bytes();
        let mix = |i: usize| {
            ((a[i] as f64 * self_portion as f64 + b[i] as f64 * other_portion as f64) / total)
                .round() as u8
        };
        Rgb::from_bytes(mix(0), mix(1), mix(2))
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

/// `count` distinct colors stepping from `start` to `end`, both included.
///
/// Fewer than three requested colors still yields the two endpoints.
pub fn gradient(count: usize, start: Rgb, end: Rgb) -> Vec<Rgb> {
    if count < 3 {
        return vec![start, end];
    }

    let mut out = Vec::with_capacity(count);
    out.push(start);
    for i in 1..count - 1 {
        // Weight shifts from `start` toward `end` as `i` grows.
        out.push(start.blend(end, (count - 1 - i) as u32, i as u32));
    }
    out.push(end);
    out
}

#[cfg(test)]
mod tests {
    use super::{ColorParseError, Rgb, gradient};

    #[test]
    fn parses_hex_with_and_without_hash() {
        let a = Rgb::from_hex("#002850").expect("valid");
        let b = Rgb::from_hex("002850").expect("valid");
        assert_eq!(a, b);
        assert_eq!(a.to_hex(), "#002850");
        assert_eq!(Rgb::from_hex("#FFFFFF").expect("valid"), Rgb::WHITE);
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!(matches!(
            Rgb::from_hex("#fff"),
            Err(ColorParseError::BadLength(_))
        ));
        assert!(matches!(
            Rgb::from_hex("#zz0000"),
            Err(ColorParseError::BadDigit(_))
        ));
    }

    #[test]
    fn blend_even_portions() {
        let black = Rgb::from_bytes(0, 0, 0);
        let c = black.blend(Rgb::from_bytes(200, 100, 50), 1, 1);
        assert_eq!(c.to_bytes(), [100, 50, 25]);
    }

    #[test]
    fn gradient_keeps_endpoints_and_count() {
        let start = Rgb::from_bytes(0, 0, 0);
        let end = Rgb::from_bytes(120, 240, 60);
        let g = gradient(5, start, end);
        assert_eq!(g.len(), 5);
        assert_eq!(g[0], start);
        assert_eq!(g[4], end);
        assert_eq!(g[2].to_bytes(), [60, 120, 30]);
        assert_eq!(gradient(1, start, end).len(), 2);
    }
}
