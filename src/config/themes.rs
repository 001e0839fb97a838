use std::collections::HashMap;

use ratatui::style::Color;

use super::ThemeName;

/// Colors the screens draw with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub accent: Color,
    pub muted: Color,
    pub highlight: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    pub today: Color,
    pub outside_month: Color,
    pub error: Color,
}

#[derive(Debug, Clone)]
pub struct ThemeRegistry {
    palettes: HashMap<ThemeName, Palette>,
}

impl ThemeRegistry {
    pub fn contains(&self, theme: &ThemeName) -> bool {
        self.palettes.contains_key(theme)
    }

    pub fn palette(&self, theme: ThemeName) -> Palette {
        self.palettes
            .get(&theme)
            .or_else(|| self.palettes.get(&ThemeName::Dark))
            .copied()
            .unwrap_or(DARK)
    }
}

const DARK: Palette = Palette {
    accent: Color::Cyan,
    muted: Color::Gray,
    highlight: Color::Yellow,
    selection_bg: Color::Blue,
    selection_fg: Color::Black,
    today: Color::Magenta,
    outside_month: Color::DarkGray,
    error: Color::Red,
};

impl Default for ThemeRegistry {
    fn default() -> Self {
        let palettes = [
            (ThemeName::Dark, DARK),
            (
                ThemeName::Light,
                Palette {
                    accent: Color::Blue,
                    muted: Color::DarkGray,
                    highlight: Color::Magenta,
                    selection_bg: Color::LightBlue,
                    selection_fg: Color::Black,
                    today: Color::Red,
                    outside_month: Color::Gray,
                    error: Color::Red,
                },
            ),
            (
                ThemeName::HighContrast,
                Palette {
                    accent: Color::White,
                    muted: Color::White,
                    highlight: Color::LightYellow,
                    selection_bg: Color::White,
                    selection_fg: Color::Black,
                    today: Color::LightRed,
                    outside_month: Color::Gray,
                    error: Color::LightRed,
                },
            ),
            (
                ThemeName::Solarized,
                Palette {
                    accent: Color::Rgb(38, 139, 210),
                    muted: Color::Rgb(131, 148, 150),
                    highlight: Color::Rgb(181, 137, 0),
                    selection_bg: Color::Rgb(7, 54, 66),
                    selection_fg: Color::Rgb(238, 232, 213),
                    today: Color::Rgb(211, 54, 130),
                    outside_month: Color::Rgb(88, 110, 117),
                    error: Color::Rgb(220, 50, 47),
                },
            ),
        ]
        .into_iter()
        .collect();
        Self { palettes }
    }
}
