//! Frame layout and per-screen rendering.

use chrono::{DateTime, Local, Utc};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};

use ppop_core::models::{Prediction, Regimen};
use ppop_core::Screen;

use super::styles;
use crate::app::{App, AppState};
use crate::forms::TextForm;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Header
            Constraint::Min(8),    // Screen
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    render_screen(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);

    match app.state {
        AppState::AddingInfusion => render_infusion_overlay(frame, app),
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        AppState::Normal | AppState::Quitting => {}
    }
}

/// Right-hand header text: backend status and who is signed in
pub fn header_status(app: &App) -> String {
    let who = app
        .shell
        .session()
        .identity()
        .unwrap_or("Not signed in")
        .to_string();
    format!("Backend: {}  |  {}", app.backend_status(), who)
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let title = format!("  PPOP · {}", app.screen().label());
    let status = header_status(app);
    let padding = (area.width as usize)
        .saturating_sub(title.chars().count())
        .saturating_sub(status.chars().count() + 2);

    let line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(padding)),
        Span::styled(status, styles::backend_style(app.backend_status())),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let left = if let Some(ref msg) = app.status_message {
        format!(" {} ", msg)
    } else if app.loading {
        " Loading... ".to_string()
    } else {
        String::new()
    };
    let right = if app.is_form_screen() {
        " [Tab] next field | [Enter] submit | [Esc] back "
    } else {
        " [?] help | [q] quit "
    };
    let padding = (area.width as usize)
        .saturating_sub(left.chars().count())
        .saturating_sub(right.chars().count());

    let line = Line::from(vec![
        Span::styled(left, styles::muted_style()),
        Span::raw(" ".repeat(padding)),
        Span::styled(right, styles::muted_style()),
    ]);
    frame.render_widget(Paragraph::new(line).style(styles::status_bar_style()), area);
}

fn render_screen(frame: &mut Frame, app: &App, area: Rect) {
    let screen = app.screen();
    // Protected screens show nothing while signed out; the guard is
    // already moving the user to the login screen.
    if matches!(
        screen,
        Screen::Patients | Screen::NewPatient | Screen::Patient(_) | Screen::Optimize(_)
    ) && !app.shell.is_authenticated()
    {
        return;
    }

    match screen {
        Screen::Home => render_home(frame, app, area),
        Screen::Try => render_try(frame, app, area),
        Screen::Login => render_form_screen(frame, app, &app.login_form, "Sign in", area),
        Screen::Patients => render_patients(frame, app, area),
        Screen::NewPatient => {
            render_form_screen(frame, app, &app.patient_form, "New patient", area)
        }
        Screen::Patient(_) => render_patient(frame, app, area),
        Screen::Optimize(_) => render_optimize(frame, app, area),
        Screen::Unknown => {
            let text = Paragraph::new(Line::from(Span::styled(
                "  Nothing here. Press [h] to go home.",
                styles::muted_style(),
            )));
            frame.render_widget(text, area);
        }
    }
}

// ============================================================================
// Screens
// ============================================================================

fn key_line(key: &str, desc: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::help_key_style()),
        Span::styled(desc.to_string(), styles::text_style()),
    ])
}

fn render_home(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines = vec![
        Line::from(Span::styled(
            "  Personalized Prophylaxis Platform",
            styles::title_style(),
        )),
        Line::from(Span::styled(
            "  Factor level and bleed risk modelling for hemophilia prophylaxis",
            styles::muted_style(),
        )),
        Line::from(""),
        key_line("t", "Try a simulation (no account needed)"),
    ];
    if app.shell.is_authenticated() {
        lines.push(key_line("p", "Patients"));
        lines.push(key_line("n", "New patient"));
        lines.push(key_line("L", "Sign out"));
    } else {
        lines.push(key_line("l", "Sign in"));
    }
    frame.render_widget(Paragraph::new(lines), area);
}

fn form_lines(form: &TextForm, active: bool) -> Vec<Line<'static>> {
    form.fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let focused = active && i == form.focus;
            let cursor = if focused && field.choices.is_none() { "▌" } else { "" };
            Line::from(vec![
                Span::styled(format!("  {:<34}", field.label), styles::label_style()),
                Span::styled(
                    format!("{}{}", field.display(), cursor),
                    styles::field_style(focused),
                ),
            ])
        })
        .collect()
}

fn error_line(app: &App) -> Option<Line<'static>> {
    app.error_message
        .as_ref()
        .map(|msg| Line::from(Span::styled(format!("  {}", msg), styles::error_style())))
}

fn render_form_screen(frame: &mut Frame, app: &App, form: &TextForm, title: &str, area: Rect) {
    let mut lines = form_lines(form, app.state == AppState::Normal);
    if let Some(line) = error_line(app) {
        lines.push(Line::from(""));
        lines.push(line);
    }
    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), area);
}

fn render_try(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    render_form_screen(frame, app, &app.simulation_form, "Try a simulation", chunks[0]);

    let lines = match app.simulation {
        Some(ref prediction) => prediction_lines(prediction),
        None => vec![Line::from(Span::styled(
            "  Fill in the form and press Enter.",
            styles::muted_style(),
        ))],
    };
    let block = Block::default()
        .title(" Result ")
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), chunks[1]);
}

fn render_patients(frame: &mut Frame, app: &App, area: Rect) {
    let header = Row::new(vec!["Name", "Type", "Severity", "Age", "Weight (kg)"])
        .style(styles::label_style());
    let rows: Vec<Row> = app
        .patients
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let style = if i == app.patients_selection {
                styles::selected_style()
            } else {
                styles::text_style()
            };
            Row::new(vec![
                Cell::from(p.name.clone()),
                Cell::from(p.hemophilia_type.to_string()),
                Cell::from(p.severity.as_str()),
                Cell::from(format!("{}", p.age)),
                Cell::from(format!("{}", p.weight_kg)),
            ])
            .style(style)
        })
        .collect();

    let title = match app.error_message {
        Some(ref msg) => format!(" Patients: {} ", msg),
        None => format!(" Patients ({}) ", app.patients.len()),
    };
    let border = if app.error_message.is_some() {
        styles::error_style()
    } else {
        styles::border_style(true)
    };

    let table = Table::new(
        rows,
        [
            Constraint::Min(20),
            Constraint::Length(14),
            Constraint::Length(10),
            Constraint::Length(6),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(Block::default().title(title).borders(Borders::ALL).border_style(border));
    frame.render_widget(table, area);
}

fn render_patient(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(5)])
        .split(area);
    let lower = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    // Summary
    let mut summary = match app.patient {
        Some(ref p) => vec![
            Line::from(Span::styled(format!("  {}", p.name), styles::title_style())),
            Line::from(Span::styled(
                format!(
                    "  {} · {} · {} y · {} kg{}",
                    p.hemophilia_type,
                    p.severity.as_str(),
                    p.age,
                    p.weight_kg,
                    p.hospital_id
                        .as_deref()
                        .map(|id| format!(" · {}", id))
                        .unwrap_or_default()
                ),
                styles::text_style(),
            )),
        ],
        None => vec![Line::from(Span::styled("  Loading patient...", styles::muted_style()))],
    };
    if let Some(line) = error_line(app) {
        summary.push(line);
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .title(" [i] add infusion  [r] predict  [e] explain  [o] optimize ");
    frame.render_widget(Paragraph::new(summary).block(block), chunks[0]);

    // Infusion history
    let rows: Vec<Row> = app
        .infusions
        .iter()
        .map(|inf| {
            Row::new(vec![
                Cell::from(format_time(&inf.infusion_time)),
                Cell::from(format!("{} IU/kg", inf.dose_iu_per_kg)),
                Cell::from(inf.product_type.map(|p| p.as_str()).unwrap_or("-")),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [Constraint::Length(17), Constraint::Length(12), Constraint::Length(5)],
    )
    .header(Row::new(vec!["Time", "Dose", "Type"]).style(styles::label_style()))
    .block(
        Block::default()
            .title(format!(" Infusions ({}) ", app.infusions.len()))
            .borders(Borders::ALL)
            .border_style(styles::border_style(false)),
    );
    frame.render_widget(table, lower[0]);

    // Prediction and explanation
    let mut lines = match app.prediction {
        Some(ref prediction) => prediction_lines(prediction),
        None => vec![Line::from(Span::styled(
            "  Press [r] to estimate the current state.",
            styles::muted_style(),
        ))],
    };
    if let Some(ref explanation) = app.explanation {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("  Drivers", styles::label_style())));
        for impact in &explanation.explanation {
            let style = if impact.increases_risk() {
                styles::error_style()
            } else {
                styles::success_style()
            };
            lines.push(Line::from(vec![
                Span::styled(format!("  {:<28}", impact.label()), styles::text_style()),
                Span::styled(format!("{:+.3}", impact.impact), style),
            ]));
        }
    }
    let block = Block::default()
        .title(" Current state ")
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), lower[1]);
}

fn render_optimize(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(5)])
        .split(area);

    render_form_screen(frame, app, &app.optimization_form, "Constraints", chunks[0]);
    frame.render_widget(regimen_table(&app.regimens), chunks[1]);
}

fn regimen_table(regimens: &[Regimen]) -> Table<'static> {
    let rows: Vec<Row> = regimens
        .iter()
        .map(|r| {
            Row::new(vec![
                Cell::from(format!("{} IU/kg", r.dose_iu_per_kg)),
                Cell::from(format!("every {} d", r.interval_days)),
                Cell::from(r.product_type.clone().unwrap_or_else(|| "-".to_string())),
                Cell::from(format!("{:.0}", r.weekly_iu)),
                Cell::from(format_percent(r.predicted_risk)),
                Cell::from(
                    r.predicted_annual_bleeds
                        .map(|b| format!("{:.1}", b))
                        .unwrap_or_else(|| "-".to_string()),
                ),
            ])
        })
        .collect();
    Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(6),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Length(14),
        ],
    )
    .header(
        Row::new(vec!["Dose", "Interval", "Type", "Weekly IU", "Risk", "Annual bleeds"])
            .style(styles::label_style()),
    )
    .block(
        Block::default()
            .title(format!(" Regimens ({}) ", regimens.len()))
            .borders(Borders::ALL)
            .border_style(styles::border_style(false)),
    )
}

fn prediction_lines(prediction: &Prediction) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(vec![
            Span::styled("  Factor level   ", styles::label_style()),
            Span::styled(format!("{:.1}%", prediction.factor_percent), styles::text_style()),
        ]),
        Line::from(vec![
            Span::styled("  Bleed risk     ", styles::label_style()),
            Span::styled(
                format!("{:.1}%", prediction.bleed_risk_percent()),
                styles::text_style(),
            ),
        ]),
        Line::from(vec![
            Span::styled("  Risk category  ", styles::label_style()),
            Span::styled(
                prediction.risk_category.clone(),
                styles::risk_style(&prediction.risk_category),
            ),
        ]),
    ];
    if let Some(note) = prediction.meta.as_ref().and_then(|m| m.note.clone()) {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!("  {}", note), styles::muted_style())));
    }
    let curve = prediction.factor_curve();
    if let (Some(first), Some(last)) = (curve.first(), curve.last()) {
        lines.push(Line::from(Span::styled(
            format!(
                "  Curve: {:.1}% at {}h to {:.1}% at {}h ({} points)",
                first.factor_percent,
                first.hours,
                last.factor_percent,
                last.hours,
                curve.len()
            ),
            styles::muted_style(),
        )));
    }
    lines
}

pub fn format_percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

pub fn format_time(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

// ============================================================================
// Overlays
// ============================================================================

fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_infusion_overlay(frame: &mut Frame, app: &App) {
    let height = if app.error_message.is_some() { 8 } else { 6 };
    let area = centered_rect_fixed(72, height, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = form_lines(&app.infusion_form, true);
    if let Some(line) = error_line(app) {
        lines.push(Line::from(""));
        lines.push(line);
    }
    let block = Block::default()
        .title(" Add infusion  [Enter] save  [Esc] cancel ")
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 20, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(Span::styled(
            format!("  ppop {}", env!("CARGO_PKG_VERSION")),
            styles::title_style(),
        )),
        Line::from(""),
        key_line("h", "Home"),
        key_line("t", "Try a simulation"),
        key_line("l", "Sign in"),
        key_line("p", "Patients"),
        key_line("n", "New patient"),
        key_line("L", "Sign out"),
        key_line("↑/↓ j/k", "Move selection"),
        key_line("Enter", "Open / submit"),
        key_line("Esc", "Back"),
        key_line("R", "Reload"),
        key_line("q", "Quit"),
        Line::from(""),
        Line::from(Span::styled("  Press any key to close", styles::muted_style())),
    ];
    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(40, 5, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(Span::styled("  Quit ppop?", styles::title_style())),
        Line::from(vec![
            Span::styled("  Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ratatui::{backend::TestBackend, Terminal};

    use ppop_core::auth::{CredentialStore, MemoryStore};
    use ppop_core::{ApiClient, Config, Credential};

    fn app_with(credential: Option<Credential>, path: &str) -> App {
        let mut store = CredentialStore::new(MemoryStore::new());
        if let Some(credential) = credential {
            store.save(&credential).unwrap();
        }
        let mut app = App::with_parts(Config::default(), store, ApiClient::new(None).unwrap(), path);
        app.shell.hydrate();
        app
    }

    fn draw(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>()
    }

    #[test]
    fn test_header_status_signed_out() {
        let app = app_with(None, "/");
        assert_eq!(header_status(&app), "Backend: unknown  |  Not signed in");
    }

    #[test]
    fn test_header_status_shows_identity() {
        let app = app_with(Some(Credential::new("tok", "doc@example.org")), "/");
        assert!(header_status(&app).ends_with("doc@example.org"));
    }

    #[test]
    fn test_home_renders_sign_in_entry() {
        let app = app_with(None, "/");
        let screen = draw(&app);
        assert!(screen.contains("PPOP"));
        assert!(screen.contains("Sign in"));
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.123), "12.3%");
        assert_eq!(format_percent(0.0), "0.0%");
    }

    #[test]
    fn test_format_time_uses_local_clock() {
        let time = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        let expected = time.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string();
        assert_eq!(format_time(&time), expected);
    }
}
