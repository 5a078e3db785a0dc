use std::str::FromStr;

use palette::{Hsl, IntoColor, Srgb};

use crate::error::{PipelineError, Result};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Srgb<u8>> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            rgb.into_format::<u8>()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color specs: "#1f77b4" / "green" → hex string for the renderer
// ---------------------------------------------------------------------------

/// Parse a hex (`#1f77b4`, `#f80`) or CSS named colour (`green`).
pub fn parse_color(spec: &str) -> Result<Srgb<u8>> {
    let spec = spec.trim();
    if spec.starts_with('#') {
        return Srgb::<u8>::from_str(spec)
            .map_err(|e| PipelineError::InvalidConfig(format!("bad colour '{spec}': {e}")));
    }
    palette::named::from_str(&spec.to_ascii_lowercase())
        .ok_or_else(|| PipelineError::InvalidConfig(format!("unknown colour name '{spec}'")))
}

/// Lower-case `#rrggbb` form.
pub fn to_hex(color: Srgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

/// Resolve the colour for series `index` of `count`: the configured spec if
/// any, else a generated hue.
pub fn resolve(spec: Option<&str>, index: usize, count: usize) -> Result<String> {
    match spec {
        Some(spec) => parse_color(spec).map(to_hex),
        None => {
            let palette = generate_palette(count.max(index + 1));
            Ok(to_hex(palette[index]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_named_colours() {
        assert_eq!(to_hex(parse_color("#1f77b4").unwrap()), "#1f77b4");
        assert_eq!(to_hex(parse_color("green").unwrap()), "#008000");
        assert_eq!(to_hex(parse_color("Orange").unwrap()), "#ffa500");
        assert!(parse_color("not-a-colour").is_err());
        assert!(parse_color("#12345g").is_err());
    }

    #[test]
    fn palette_hues_are_distinct() {
        let colours = generate_palette(3);
        assert_eq!(colours.len(), 3);
        assert_ne!(colours[0], colours[1]);
        assert_ne!(colours[1], colours[2]);
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn resolve_falls_back_to_palette() {
        assert_eq!(resolve(Some("red"), 0, 2).unwrap(), "#ff0000");
        let generated = resolve(None, 1, 3).unwrap();
        assert_eq!(generated, to_hex(generate_palette(3)[1]));
    }
}
