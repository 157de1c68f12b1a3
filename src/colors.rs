use image::Rgba;

/// Sequential colour ramp, low values first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorRamp {
    pub name: &'static str,
    stops: &'static [&'static str],
}

const YL_OR_RD: &[&str] = &[
    "#ffffcc", "#ffeda0", "#fed976", "#feb24c", "#fd8d3c", "#fc4e2a", "#e31a1c", "#bd0026",
    "#800026",
];
const REDS: &[&str] = &[
    "#fff5f0", "#fee0d2", "#fcbba1", "#fc9272", "#fb6a4a", "#ef3b2c", "#cb181d", "#a50f15",
    "#67000d",
];
const BLUES: &[&str] = &[
    "#f7fbff", "#deebf7", "#c6dbef", "#9ecae1", "#6baed6", "#4292c6", "#2171b5", "#08519c",
    "#08306b",
];
const VIRIDIS: &[&str] = &[
    "#440154", "#482878", "#3e4989", "#31688e", "#26828e", "#1f9e89", "#35b779", "#6ece58",
    "#b5de2b", "#fde725",
];

impl ColorRamp {
    pub const NAMES: &'static [&'static str] = &["YlOrRd", "Reds", "Blues", "Viridis"];

    pub fn by_name(name: &str) -> Option<Self> {
        let stops = match name {
            "YlOrRd" => YL_OR_RD,
            "Reds" => REDS,
            "Blues" => BLUES,
            "Viridis" => VIRIDIS,
            _ => return None,
        };
        let name = Self::NAMES.iter().find(|n| **n == name).copied()?;
        Some(Self { name, stops })
    }

    /// `[[position, "#rrggbb"], ...]` pairs in plotly's colorscale form.
    pub fn plotly_stops(&self) -> Vec<(f64, String)> {
        let last = (self.stops.len() - 1) as f64;
        self.stops
            .iter()
            .enumerate()
            .map(|(i, hex)| (i as f64 / last, hex.to_string()))
            .collect()
    }

    /// Linear interpolation between neighbouring stops. `t` is clamped to [0, 1].
    pub fn sample(&self, t: f64) -> Rgba<u8> {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let scaled = t * (self.stops.len() - 1) as f64;
        let lo = scaled.floor() as usize;
        let hi = (lo + 1).min(self.stops.len() - 1);
        let frac = scaled - lo as f64;

        let a = hex_to_rgba(self.stops[lo]);
        let b = hex_to_rgba(self.stops[hi]);
        let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
        Rgba([mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2]), 255])
    }
}

pub fn hex_to_rgba(hex: &str) -> Rgba<u8> {
    let hex = hex.trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .unwrap_or(0)
    };
    Rgba([channel(0..2), channel(2..4), channel(4..6), 255])
}

/// Alpha-composite `fg` over an opaque `bg`.
pub fn blend(fg: Rgba<u8>, bg: Rgba<u8>, opacity: f64) -> Rgba<u8> {
    let mix = |f: u8, b: u8| (f as f64 * opacity + b as f64 * (1.0 - opacity)).round() as u8;
    Rgba([mix(fg[0], bg[0]), mix(fg[1], bg[1]), mix(fg[2], bg[2]), 255])
}
