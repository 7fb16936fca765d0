use ratatui::style::{Color, Modifier, Style};

use ppop_core::BackendStatus;

// Color palette
pub const PRIMARY: Color = Color::Rgb(72, 120, 200);
pub const GOOD: Color = Color::Rgb(96, 168, 112);
pub const WARN: Color = Color::Rgb(208, 168, 64);
pub const ERROR: Color = Color::Rgb(200, 72, 72);
pub const MUTED: Color = Color::Rgb(128, 128, 136);
pub const HIGHLIGHT: Color = Color::Rgb(44, 48, 64);

pub fn title_style() -> Style {
    Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)
}

pub fn selected_style() -> Style {
    Style::default().bg(HIGHLIGHT).add_modifier(Modifier::BOLD)
}

pub fn text_style() -> Style {
    Style::default().fg(Color::White)
}

pub fn muted_style() -> Style {
    Style::default().fg(MUTED)
}

pub fn error_style() -> Style {
    Style::default().fg(ERROR)
}

pub fn success_style() -> Style {
    Style::default().fg(GOOD)
}

pub fn label_style() -> Style {
    Style::default().fg(WARN)
}

pub fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(PRIMARY)
    } else {
        Style::default().fg(MUTED)
    }
}

pub fn field_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::White).bg(HIGHLIGHT)
    } else {
        text_style()
    }
}

pub fn status_bar_style() -> Style {
    Style::default().bg(Color::Rgb(30, 32, 40)).fg(Color::White)
}

pub fn help_key_style() -> Style {
    Style::default().fg(WARN).add_modifier(Modifier::BOLD)
}

pub fn backend_style(status: BackendStatus) -> Style {
    match status {
        BackendStatus::Connected => success_style(),
        BackendStatus::Offline => error_style(),
        BackendStatus::Unknown => muted_style(),
    }
}

/// Color for a model risk category ("low", "moderate", "high")
pub fn risk_style(category: &str) -> Style {
    match category.to_ascii_lowercase().as_str() {
        "low" => success_style(),
        "moderate" | "medium" => label_style(),
        "high" => error_style().add_modifier(Modifier::BOLD),
        _ => text_style(),
    }
}
