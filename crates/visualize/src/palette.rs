use plotters::style::RGBAColor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolved light/dark appearance used for every colour decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    #[default]
    Light,
    Dark,
}

impl Appearance {
    pub fn is_dark(&self) -> bool {
        matches!(self, Self::Dark)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Same hue, fully opaque (used for borders)
    pub fn opaque(&self) -> Self {
        Self { a: 1.0, ..*self }
    }

    pub fn with_alpha(&self, a: f64) -> Self {
        Self { a, ..*self }
    }

    pub fn to_plotters(&self) -> RGBAColor {
        RGBAColor(self.r, self.g, self.b, self.a)
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Linear blend from `self` to `target`; `t` is clamped to [0, 1].
    pub fn interpolate(&self, target: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb::new(mix(self.r, target.r), mix(self.g, target.g), mix(self.b, target.b))
    }

    /// Perceived brightness on a 0-255 scale
    pub fn brightness(&self) -> f64 {
        (self.r as f64 * 299.0 + self.g as f64 * 587.0 + self.b as f64 * 114.0) / 1000.0
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

pub const LIGHT_SERIES: [Rgba; 10] = [
    Rgba::new(54, 162, 235, 0.85),
    Rgba::new(255, 99, 132, 0.85),
    Rgba::new(75, 192, 192, 0.85),
    Rgba::new(255, 206, 86, 0.85),
    Rgba::new(153, 102, 255, 0.85),
    Rgba::new(255, 159, 64, 0.85),
    Rgba::new(199, 199, 199, 0.85),
    Rgba::new(83, 102, 255, 0.85),
    Rgba::new(102, 255, 83, 0.85),
    Rgba::new(255, 83, 102, 0.85),
];

pub const DARK_SERIES: [Rgba; 10] = [
    Rgba::new(100, 181, 246, 0.85),
    Rgba::new(255, 138, 128, 0.85),
    Rgba::new(77, 208, 225, 0.85),
    Rgba::new(212, 170, 38, 0.85),
    Rgba::new(179, 157, 219, 0.85),
    Rgba::new(255, 183, 77, 0.85),
    Rgba::new(100, 116, 139, 0.85),
    Rgba::new(121, 134, 203, 0.85),
    Rgba::new(129, 212, 250, 0.85),
    Rgba::new(240, 98, 146, 0.85),
];

/// Series colour for the i-th point, cycling through the palette
pub fn series_color(appearance: Appearance, index: usize) -> Rgba {
    let palette = match appearance {
        Appearance::Light => &LIGHT_SERIES,
        Appearance::Dark => &DARK_SERIES,
    };
    palette[index % palette.len()]
}

/// Text colour that stays legible on a filled background
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextTone {
    Dark,
    Light,
}

impl TextTone {
    pub fn css(&self) -> &'static str {
        match self {
            Self::Dark => "#0f172a",
            Self::Light => "#f1f5f9",
        }
    }
}

pub fn text_tone_for(background: Rgb, appearance: Appearance) -> TextTone {
    let brightness = background.brightness();
    match appearance {
        Appearance::Dark if brightness > 100.0 => TextTone::Dark,
        Appearance::Dark => TextTone::Light,
        Appearance::Light if brightness < 128.0 => TextTone::Light,
        Appearance::Light => TextTone::Dark,
    }
}

/// Surface and ink colours for a given appearance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub panel: Rgba,
    pub canvas: Rgba,
    pub title: Rgba,
    pub text: Rgba,
    pub muted: Rgba,
    pub grid: Rgba,
    pub border: Rgba,
}

impl Surface {
    pub fn for_appearance(appearance: Appearance) -> Self {
        match appearance {
            Appearance::Light => Self {
                panel: Rgba::new(255, 255, 255, 1.0),
                canvas: Rgba::new(248, 250, 252, 1.0),
                title: Rgba::new(30, 41, 59, 1.0),
                text: Rgba::new(51, 65, 85, 1.0),
                muted: Rgba::new(71, 85, 105, 1.0),
                grid: Rgba::new(203, 213, 225, 0.5),
                border: Rgba::new(226, 232, 240, 1.0),
            },
            Appearance::Dark => Self {
                panel: Rgba::new(30, 41, 59, 1.0),
                canvas: Rgba::new(30, 41, 59, 1.0),
                title: Rgba::new(226, 232, 240, 1.0),
                text: Rgba::new(226, 232, 240, 1.0),
                muted: Rgba::new(148, 163, 184, 1.0),
                grid: Rgba::new(71, 85, 105, 0.5),
                border: Rgba::new(71, 85, 105, 1.0),
            },
        }
    }
}
