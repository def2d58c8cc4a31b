//! Theme loading: btop-style `theme[key]="value"` files and hex → ratatui Color.
//!
//! Orb colours use their own keys (`water`, `fire`, `earth`, `air`); frame and text
//! colours reuse the btop keys so an existing btop theme already dresses the board.

use crate::Palette;
use crate::grid::Element;
use crate::loot::LootKind;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

const WATER: Color = Color::Rgb(0x34, 0x98, 0xDB);
const FIRE: Color = Color::Rgb(0xE7, 0x4C, 0x3C);
const EARTH: Color = Color::Rgb(0x8B, 0x45, 0x13);
const AIR: Color = Color::Rgb(0x95, 0xA5, 0xA6);

#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    /// Orb colours, indexed by `Element::index`.
    pub elements: [Color; 4],
    /// Loot sprite colours, indexed by `LootKind::index`.
    pub loot: [Color; 4],
    pub bg: Color,
    pub div_line: Color,
    pub main_fg: Color,
    pub title: Color,
    pub inactive_fg: Color,
    /// Selected orb outline.
    pub selected: Color,
    pub chest: Color,
    /// Health bar: healthy, hurt (below 60%), critical (below 30%).
    pub health: [Color; 3],
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            elements: [WATER, FIRE, EARTH, AIR],
            loot: [
                Color::Rgb(0xC6, 0x78, 0xDD),
                Color::Rgb(0xE5, 0xC0, 0x7B),
                Color::Rgb(0xF1, 0xE0, 0x5A),
                Color::Rgb(0x56, 0xB6, 0xC2),
            ],
            bg: Color::Rgb(0x31, 0x35, 0x3F),
            div_line: Color::Rgb(0x3F, 0x44, 0x4F),
            main_fg: Color::Rgb(0xAB, 0xB2, 0xBF),
            title: Color::Rgb(0xE5, 0xC0, 0x7B),
            inactive_fg: Color::Rgb(0x5C, 0x63, 0x70),
            selected: Color::Rgb(0xFF, 0xFF, 0xFF),
            chest: Color::Rgb(0xD1, 0x9A, 0x66),
            health: [
                Color::Rgb(0x98, 0xC3, 0x79),
                Color::Rgb(0xE5, 0xC0, 0x7B),
                Color::Rgb(0xE0, 0x6C, 0x75),
            ],
        }
    }
}

impl Theme {
    /// Load a btop-style theme file, then apply `palette`.
    /// No path, or a path that does not exist, gives the built-in colours.
    pub fn load(path: Option<&Path>, palette: Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => {
                let s = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&s))
            }
            _ => Self::default(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Override orb colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: Palette) {
        match palette {
            Palette::Normal => {}
            Palette::HighContrast => {
                self.elements = [
                    Color::Rgb(0x00, 0x88, 0xFF),
                    Color::Rgb(0xFF, 0x00, 0x00),
                    Color::Rgb(0xFF, 0xFF, 0x00),
                    Color::Rgb(0xFF, 0xFF, 0xFF),
                ];
            }
            Palette::Colorblind => {
                // Okabe-Ito hues
                self.elements = [
                    Color::Rgb(0x00, 0x72, 0xB2),
                    Color::Rgb(0xE6, 0x9F, 0x00),
                    Color::Rgb(0x00, 0x9E, 0x73),
                    Color::Rgb(0xCC, 0x79, 0xA7),
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let base = Self::default();
        Self {
            elements: [
                get("water").unwrap_or(base.elements[0]),
                get("fire").unwrap_or(base.elements[1]),
                get("earth").unwrap_or(base.elements[2]),
                get("air").unwrap_or(base.elements[3]),
            ],
            loot: [
                get("net_box").unwrap_or(base.loot[0]),
                get("title").unwrap_or(base.loot[1]),
                get("cpu_mid").unwrap_or(base.loot[2]),
                get("hi_fg").unwrap_or(base.loot[3]),
            ],
            bg: get("meter_bg").unwrap_or(base.bg),
            div_line: get("div_line").unwrap_or(base.div_line),
            main_fg: get("main_fg").unwrap_or(base.main_fg),
            title: get("title").unwrap_or(base.title),
            inactive_fg: get("inactive_fg").unwrap_or(base.inactive_fg),
            selected: get("selected_fg").unwrap_or(base.selected),
            chest: get("proc_misc").unwrap_or(base.chest),
            health: [
                get("cpu_start").unwrap_or(base.health[0]),
                get("cpu_mid").unwrap_or(base.health[1]),
                get("cpu_end").unwrap_or(base.health[2]),
            ],
        }
    }

    #[inline]
    pub fn element(&self, element: Element) -> Color {
        self.elements[element.index()]
    }

    #[inline]
    pub fn loot(&self, kind: LootKind) -> Color {
        self.loot[kind.index()]
    }

    /// Bar colour for a health ratio.
    pub fn health(&self, ratio: f64) -> Color {
        if ratio >= 0.6 {
            self.health[0]
        } else if ratio >= 0.3 {
            self.health[1]
        } else {
            self.health[2]
        }
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(rest) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some((key, value)) = rest.split_once(']') else {
            continue;
        };
        let Some((_, value)) = value.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'');
        if !value.is_empty() {
            map.insert(key.trim().to_string(), value.to_string());
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |hex: &str| u8::from_str_radix(hex, 16).map_err(|_| invalid());
    if !s.is_ascii() {
        return Err(invalid());
    }
    match s.len() {
        6 => Ok(Color::Rgb(
            channel(&s[0..2])?,
            channel(&s[2..4])?,
            channel(&s[4..6])?,
        )),
        3 => Ok(Color::Rgb(
            channel(&s[0..1])? * 17,
            channel(&s[1..2])? * 17,
            channel(&s[2..3])? * 17,
        )),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        assert_eq!(parse_hex("#3498db").unwrap(), WATER);
    }

    #[test]
    fn test_parse_hex_3() {
        assert_eq!(parse_hex("#FFF").unwrap(), Color::Rgb(255, 255, 255));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("zzzzzz").is_err());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(
            "# comment\ntheme[meter_bg]=\"#31353F\"\ntheme[fire] = '#ff0000'\nnot a theme line",
        );
        assert_eq!(map.get("meter_bg").map(String::as_str), Some("#31353F"));
        assert_eq!(map.get("fire").map(String::as_str), Some("#ff0000"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_from_map_overrides_only_given_keys() {
        let map = parse_theme_file("theme[fire]=\"#00ff00\"\ntheme[air]=\"bogus\"");
        let theme = Theme::from_map(&map);
        assert_eq!(theme.element(Element::Fire), Color::Rgb(0, 255, 0));
        assert_eq!(theme.element(Element::Air), AIR);
        assert_eq!(theme.element(Element::Water), WATER);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let theme = Theme::load(Some(Path::new("/nonexistent/orbclash.theme")), Palette::Normal)
            .unwrap();
        assert_eq!(theme, Theme::default());
    }

    #[test]
    fn test_palette_changes_orbs_only() {
        let mut theme = Theme::default();
        theme.apply_palette(Palette::Colorblind);
        assert_ne!(theme.elements, Theme::default().elements);
        assert_eq!(theme.bg, Theme::default().bg);
    }

    #[test]
    fn test_health_thresholds() {
        let theme = Theme::default();
        assert_eq!(theme.health(0.6), theme.health[0]);
        assert_eq!(theme.health(0.59), theme.health[1]);
        assert_eq!(theme.health(0.3), theme.health[1]);
        assert_eq!(theme.health(0.29), theme.health[2]);
    }
}
