//! Length and colour conversions used throughout WordprocessingML.

pub const TWIPS_PER_POINT: f64 = 20.0;
pub const TWIPS_PER_INCH: f64 = 1440.0;
pub const EMU_PER_INCH: f64 = 914_400.0;
pub const EMU_PER_POINT: f64 = 12_700.0;
pub const CM_PER_INCH: f64 = 2.54;

/// Usable text width of a US Letter page with one-inch margins.
pub const DEFAULT_TEXT_WIDTH_TWIPS: i64 = 9360;

/// Unit accepted by table width and padding settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUnit {
    Points,
    Inches,
    Centimeters,
    Percent,
    Auto,
}

impl LengthUnit {
    /// Parses a unit name; accepts `points`/`pt`, `inches`/`in`, `cm`, `percent`/`pct`, `auto`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "points" | "point" | "pt" | "dxa" => Some(Self::Points),
            "inches" | "inch" | "in" => Some(Self::Inches),
            "cm" | "centimeters" | "centimetres" => Some(Self::Centimeters),
            "percent" | "pct" | "%" => Some(Self::Percent),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }
}

/// A width ready to be written as `w:w` / `w:type` on `w:tcW`, `w:tblW`, or `w:gridCol`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableWidth {
    pub value: i64,
    pub kind: &'static str,
}

impl TableWidth {
    /// Converts a user width in `unit` to OOXML. Percent is stored in fiftieths.
    #[must_use]
    pub fn from_unit(width: f64, unit: LengthUnit) -> Self {
        match unit {
            LengthUnit::Points => Self {
                value: points_to_twips(width),
                kind: "dxa",
            },
            LengthUnit::Inches => Self {
                value: inches_to_twips(width),
                kind: "dxa",
            },
            LengthUnit::Centimeters => Self {
                value: cm_to_twips(width),
                kind: "dxa",
            },
            LengthUnit::Percent => Self {
                value: round(width * 50.0),
                kind: "pct",
            },
            LengthUnit::Auto => Self {
                value: 0,
                kind: "auto",
            },
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn round(value: f64) -> i64 {
    value.round() as i64
}

#[must_use]
pub fn points_to_twips(points: f64) -> i64 {
    round(points * TWIPS_PER_POINT)
}

#[must_use]
pub fn inches_to_twips(inches: f64) -> i64 {
    round(inches * TWIPS_PER_INCH)
}

#[must_use]
pub fn cm_to_twips(cm: f64) -> i64 {
    round(cm / CM_PER_INCH * TWIPS_PER_INCH)
}

#[must_use]
pub fn inches_to_emu(inches: f64) -> i64 {
    round(inches * EMU_PER_INCH)
}

#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn twips_to_inches(twips: i64) -> f64 {
    twips as f64 / TWIPS_PER_INCH
}

/// Font size in points to half-points (`w:sz`).
#[must_use]
pub fn points_to_half_points(points: f64) -> i64 {
    round(points * 2.0)
}

/// Converts a length to twips; `Percent` and `Auto` have no absolute value.
#[must_use]
pub fn to_twips(value: f64, unit: LengthUnit) -> Option<i64> {
    match unit {
        LengthUnit::Points => Some(points_to_twips(value)),
        LengthUnit::Inches => Some(inches_to_twips(value)),
        LengthUnit::Centimeters => Some(cm_to_twips(value)),
        LengthUnit::Percent | LengthUnit::Auto => None,
    }
}

/// Normalizes `#RRGGBB` or `RRGGBB` to uppercase `RRGGBB`.
#[must_use]
pub fn parse_hex_color(value: &str) -> Option<String> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() == 6 && hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        Some(hex.to_ascii_uppercase())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_lengths() {
        assert_eq!(points_to_twips(12.0), 240);
        assert_eq!(inches_to_twips(8.5), 12240);
        assert_eq!(cm_to_twips(2.54), 1440);
        assert_eq!(inches_to_emu(1.0), 914_400);
        assert_eq!(points_to_half_points(10.5), 21);
    }

    #[test]
    fn percent_widths_use_fiftieths() {
        let width = TableWidth::from_unit(25.0, LengthUnit::Percent);
        assert_eq!(width, TableWidth { value: 1250, kind: "pct" });
        assert_eq!(to_twips(10.0, LengthUnit::Auto), None);
    }

    #[test]
    fn parses_hex_colors() {
        assert_eq!(parse_hex_color("#ff0000").as_deref(), Some("FF0000"));
        assert_eq!(parse_hex_color("00aa11").as_deref(), Some("00AA11"));
        assert_eq!(parse_hex_color("red"), None);
        assert_eq!(parse_hex_color("#12345"), None);
    }

    #[test]
    fn parses_unit_names() {
        assert_eq!(LengthUnit::parse("Inches"), Some(LengthUnit::Inches));
        assert_eq!(LengthUnit::parse("pct"), Some(LengthUnit::Percent));
        assert_eq!(LengthUnit::parse("furlongs"), None);
    }
}
