//! Deterministic per-description colors.
//!
//! A color comes from the SHA-256 of the description. When it lands too close
//! to a color already handed out in this run, salted variants (`desc#1`,
//! `desc#2`, ...) are tried and the most distinct one wins.

use std::collections::HashMap;

use ratatui::style::Color;
use sha2::{Digest, Sha256};

use crate::config::DisplayConfig;

type Rgb = (u8, u8, u8);

pub struct Palette {
    avoid_hue: (f64, f64),
    min_distance: f64,
    attempts: usize,
    assigned: HashMap<String, Rgb>,
    used: Vec<Rgb>,
}

impl Palette {
    pub fn new(display: &DisplayConfig) -> Self {
        Self {
            avoid_hue: (display.avoid_hue_min, display.avoid_hue_max),
            min_distance: display.min_color_distance,
            attempts: display.color_attempts.max(1),
            assigned: HashMap::new(),
            used: Vec::new(),
        }
    }

    pub fn color_for(&mut self, description: &str) -> Color {
        let (r, g, b) = match self.assigned.get(description) {
            Some(rgb) => *rgb,
            None => {
                let rgb = self.pick(description);
                self.assigned.insert(description.to_string(), rgb);
                self.used.push(rgb);
                rgb
            }
        };
        Color::Rgb(r, g, b)
    }

    fn pick(&self, description: &str) -> Rgb {
        let mut best: Option<(f64, Rgb)> = None;

        for attempt in 0..self.attempts {
            let seed = if attempt == 0 {
                description.to_string()
            } else {
                format!("{description}#{attempt}")
            };
            let (hue, saturation, value) = hsv_from_seed(&seed, self.avoid_hue);
            let rgb = hsv_to_rgb(hue, saturation, value);

            let nearest = self
                .used
                .iter()
                .map(|other| distance(rgb, *other))
                .fold(f64::INFINITY, f64::min);
            if nearest >= self.min_distance {
                return rgb;
            }
            if best.is_none_or(|(score, _)| nearest > score) {
                best = Some((nearest, rgb));
            }
        }

        best.map(|(_, rgb)| rgb)
            .unwrap_or_else(|| hsv_to_rgb(0.0, 0.0, 1.0))
    }
}

/// Hue in degrees, saturation in `[0.6, 1.0]`, value in `[0.7, 1.0]`.
fn hsv_from_seed(seed: &str, avoid_hue: (f64, f64)) -> (f64, f64, f64) {
    let digest = Sha256::digest(seed.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);

    let hue = rotate_out((u64::from_be_bytes(head) % 360) as f64, avoid_hue);
    let saturation = 0.6 + f64::from(digest[8]) / 255.0 * 0.4;
    let value = 0.7 + f64::from(digest[9]) / 255.0 * 0.3;
    (hue, saturation, value)
}

/// Moves a hue inside the inclusive band forward in 60 degree steps until it
/// leaves the band.
fn rotate_out(mut hue: f64, avoid_hue: (f64, f64)) -> f64 {
    for _ in 0..6 {
        if hue < avoid_hue.0 || hue > avoid_hue.1 {
            break;
        }
        hue = (hue + 60.0) % 360.0;
    }
    hue
}

fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> Rgb {
    let chroma = value * saturation;
    let sector = hue / 60.0;
    let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = value - chroma;
    let channel = |c: f64| ((c + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (channel(r), channel(g), channel(b))
}

fn distance(a: Rgb, b: Rgb) -> f64 {
    let dr = f64::from(a.0) - f64::from(b.0);
    let dg = f64::from(a.1) - f64::from(b.1);
    let db = f64::from(a.2) - f64::from(b.2);
    (dr * dr + dg * dg + db * db).sqrt()
}

#[cfg(test)]
mod tests {
    use ratatui::style::Color;

    use crate::config::DisplayConfig;

    use super::{Palette, distance, hsv_from_seed, hsv_to_rgb, rotate_out};

    fn rgb(color: Color) -> (u8, u8, u8) {
        match color {
            Color::Rgb(r, g, b) => (r, g, b),
            other => panic!("expected an rgb color, got {other:?}"),
        }
    }

    #[test]
    fn same_description_same_color() {
        let display = DisplayConfig::default();
        let mut palette = Palette::new(&display);
        let first = palette.color_for("write report");
        palette.color_for("deploy");
        assert_eq!(palette.color_for("write report"), first);

        let mut fresh = Palette::new(&display);
        assert_eq!(fresh.color_for("write report"), first);
    }

    #[test]
    fn hues_skip_the_avoided_band() {
        for index in 0..200 {
            let (hue, saturation, value) = hsv_from_seed(&format!("task {index}"), (220.0, 280.0));
            assert!(!(220.0..=280.0).contains(&hue), "hue {hue} fell in the band");
            assert!((0.6..=1.0).contains(&saturation));
            assert!((0.7..=1.0).contains(&value));
        }
    }

    #[test]
    fn band_edges_are_avoided_too() {
        assert_eq!(rotate_out(220.0, (220.0, 280.0)), 340.0);
        assert_eq!(rotate_out(250.0, (220.0, 280.0)), 310.0);
        assert_eq!(rotate_out(280.0, (220.0, 280.0)), 340.0);
        assert_eq!(rotate_out(219.0, (220.0, 280.0)), 219.0);
        assert_eq!(rotate_out(330.0, (300.0, 359.0)), 30.0);
    }

    #[test]
    fn hsv_conversion_hits_primaries() {
        assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), (255, 0, 0));
        assert_eq!(hsv_to_rgb(120.0, 1.0, 1.0), (0, 255, 0));
        assert_eq!(hsv_to_rgb(300.0, 1.0, 1.0), (255, 0, 255));
    }

    #[test]
    fn later_colors_keep_their_distance_when_possible() {
        let display = DisplayConfig {
            min_color_distance: 30.0,
            color_attempts: 32,
            ..DisplayConfig::default()
        };
        let mut palette = Palette::new(&display);
        let first = rgb(palette.color_for("alpha"));
        let second = rgb(palette.color_for("beta"));
        assert!(distance(first, second) >= 30.0);
    }
}
