//! Theme configuration for the dashboard.
//!
//! Supports light and dark themes with automatic terminal detection.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use crate::data::ColorClass;

/// Color and style theme for the dashboard.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Color for rows that need no emphasis.
    pub neutral: Color,
    /// Color for borders and separators.
    pub border: Color,
    /// Style for the title bar.
    pub title: Style,
    /// Style for the table header row.
    pub header: Style,
    /// Style for group header rows.
    pub group: Style,
    /// Border style (rounded, plain, etc.).
    pub border_type: BorderType,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            neutral: Color::Gray,
            border: Color::Gray,
            title: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            group: Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            neutral: Color::DarkGray,
            border: Color::DarkGray,
            title: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            group: Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Get style for a queue row's color class
    pub fn row_style(&self, class: ColorClass) -> Style {
        match class {
            ColorClass::HighAlert => Style::default()
                .fg(Color::White)
                .bg(Color::Red)
                .add_modifier(Modifier::BOLD),
            ColorClass::HighRelief => Style::default().fg(Color::White).bg(Color::Green),
            ColorClass::Alert => Style::default().fg(Color::Red),
            ColorClass::Attention => Style::default().fg(Color::Blue),
            ColorClass::Relief => Style::default().fg(Color::Green),
            ColorClass::Neutral => Style::default().fg(self.neutral),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_classes_use_background() {
        let theme = Theme::dark();
        assert_eq!(theme.row_style(ColorClass::HighAlert).bg, Some(Color::Red));
        assert_eq!(theme.row_style(ColorClass::HighRelief).bg, Some(Color::Green));
        assert_eq!(theme.row_style(ColorClass::Alert).bg, None);
    }

    #[test]
    fn neutral_follows_theme() {
        assert_eq!(Theme::dark().row_style(ColorClass::Neutral).fg, Some(Color::Gray));
        assert_eq!(Theme::light().row_style(ColorClass::Neutral).fg, Some(Color::DarkGray));
    }
}
