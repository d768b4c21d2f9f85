use serde::Serialize;

/// A resolved color as reported by a computed style.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Rgba { r, g, b, a: 1.0 }
    }

    pub fn all_channels_above(&self, threshold: u8) -> bool {
        self.r > threshold && self.g > threshold && self.b > threshold
    }
}

/// Parses the resolved background color of an element.
///
/// Returns `None` for anything that does not carry a numeric color
/// (`inherit`, `initial`, empty strings, malformed functions).
pub fn parse_color(input: &str) -> Option<Rgba> {
    let value = input.trim().to_ascii_lowercase();
    if value.is_empty() {
        return None;
    }

    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex);
    }

    match value.as_str() {
        "transparent" => return Some(Rgba { r: 0, g: 0, b: 0, a: 0.0 }),
        "white" => return Some(Rgba::opaque(255, 255, 255)),
        "black" => return Some(Rgba::opaque(0, 0, 0)),
        _ => {}
    }

    let args = value
        .strip_prefix("rgba(")
        .or_else(|| value.strip_prefix("rgb("))?
        .strip_suffix(')')?;

    parse_rgb_args(args)
}

fn parse_rgb_args(args: &str) -> Option<Rgba> {
    // Both `r, g, b, a` and `r g b / a` are produced by browsers.
    let (channels, alpha) = match args.split_once('/') {
        Some((channels, alpha)) => (channels, Some(alpha)),
        None => (args, None),
    };

    let parts: Vec<&str> = if channels.contains(',') {
        channels.split(',').map(str::trim).collect()
    } else {
        channels.split_whitespace().collect()
    };

    let (rgb, alpha) = match (parts.as_slice(), alpha) {
        ([r, g, b], Some(a)) => ([*r, *g, *b], Some(a.trim())),
        ([r, g, b], None) => ([*r, *g, *b], None),
        ([r, g, b, a], None) => ([*r, *g, *b], Some(*a)),
        _ => return None,
    };

    let r = parse_channel(rgb[0])?;
    let g = parse_channel(rgb[1])?;
    let b = parse_channel(rgb[2])?;
    let a = match alpha {
        Some(a) => parse_alpha(a)?,
        None => 1.0,
    };

    Some(Rgba { r, g, b, a })
}

fn parse_channel(raw: &str) -> Option<u8> {
    let value = match raw.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f32>().ok()? * 2.55,
        None => raw.parse::<f32>().ok()?,
    };
    if !value.is_finite() {
        return None;
    }
    Some(value.round().clamp(0.0, 255.0) as u8)
}

fn parse_alpha(raw: &str) -> Option<f32> {
    let value = match raw.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f32>().ok()? / 100.0,
        None => raw.parse::<f32>().ok()?,
    };
    if !value.is_finite() {
        return None;
    }
    Some(value.clamp(0.0, 1.0))
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    match hex.len() {
        3 => Some(Rgba::opaque(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(Rgba {
            r: nibble(0)?,
            g: nibble(1)?,
            b: nibble(2)?,
            a: nibble(3)? as f32 / 255.0,
        }),
        6 => Some(Rgba::opaque(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Rgba {
            r: byte(0)?,
            g: byte(2)?,
            b: byte(4)?,
            a: byte(6)? as f32 / 255.0,
        }),
        _ => None,
    }
}
