use std::fmt;

/// 8-bit RGB color, parsed from and printed as `#rrggbb`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorParseError {
    pub input: String,
}

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid hex color: {:?}", self.input)
    }
}

impl std::error::Error for ColorParseError {}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb`, `rrggbb` or the short `#rgb` form.
    pub fn from_hex(input: &str) -> Result<Self, ColorParseError> {
        let err = || ColorParseError {
            input: input.to_string(),
        };
        let hex = input.trim().trim_start_matches('#');
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return Err(err()),
        };
        let num = u32::from_str_radix(&expanded, 16).map_err(|_| err())?;
        Ok(Self::new(
            ((num >> 16) & 0xff) as u8,
            ((num >> 8) & 0xff) as u8,
            (num & 0xff) as u8,
        ))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Additive lightening: every channel gains `round(2.55 * percent)`,
    /// clamped to `0..=255` independently.
    ///
    /// Negative percentages darken.
    pub fn lighten(&self, percent: f64) -> Self {
        let amount = (2.55 * percent).round() as i32;
        let shift = |c: u8| (c as i32 + amount).clamp(0, 255) as u8;
        Self::new(shift(self.r), shift(self.g), shift(self.b))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for Rgb {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
