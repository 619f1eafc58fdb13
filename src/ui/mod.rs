use std::sync::OnceLock;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Phase, Popup};
use crate::theme::Theme;

// Load theme colors from system (Omarchy/Hyprland) once at startup
static THEME: OnceLock<Theme> = OnceLock::new();

fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::load)
}

fn accent() -> Color { theme().accent }
fn success() -> Color { theme().success }
fn danger() -> Color { theme().danger }
fn warning() -> Color { theme().warning }
fn text() -> Color { theme().text }
fn text_dim() -> Color { theme().text_dim }
fn inactive() -> Color { theme().inactive }
fn header() -> Color { theme().header }

/// Positive frames the backend wants in a row before it grants access.
/// Shown as a gauge so the person can tell a near-miss from dead air.
const STREAK_TARGET: u32 = 15;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Character used for the animated scan line. Heavy box drawing so it can
/// never be confused with the light border glyphs.
const SCAN_LINE: &str = "━";

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Info line
            Constraint::Min(8),    // Camera feed box
            Constraint::Length(7), // State card
            Constraint::Length(1), // Footer
        ])
        .split(area);

    draw_info_line(f, app, chunks[0]);
    draw_feed_box(f, app, chunks[1]);
    draw_state_card(f, app, chunks[2]);
    draw_footer(f, app, chunks[3]);

    if app.popup == Popup::Help {
        draw_help_popup(f);
    }
}

/// Title of the one card shown for a phase.
pub fn card_title(phase: Phase) -> &'static str {
    match phase {
        Phase::Idle => " Ready ",
        Phase::Scanning => " Scanning ",
        Phase::Granted => " Access Granted ",
    }
}

fn draw_info_line(f: &mut Frame, app: &App, area: Rect) {
    let line = if let Some(ref status) = app.status_message {
        Line::from(Span::styled(status.as_str(), Style::default().fg(warning())))
    } else {
        let mut spans = vec![
            Span::styled("garita", Style::default().fg(accent())),
            Span::styled(" │ ", Style::default().fg(text_dim())),
            Span::styled(
                app.config.backend_url.as_str(),
                Style::default().fg(text_dim()),
            ),
        ];
        if app.detection.debug_mode {
            spans.push(Span::styled(" │ ", Style::default().fg(text_dim())));
            spans.push(Span::styled(
                "DEBUG",
                Style::default().fg(danger()).add_modifier(Modifier::BOLD),
            ));
        }
        Line::from(spans)
    };

    let info = Paragraph::new(line).alignment(Alignment::Center);
    f.render_widget(info, area);
}

/// The camera feed stand-in. Three mutually exclusive looks: dim border
/// while idle, accent border with a travelling scan line while live, and
/// the granted border once the backend has confirmed.
fn draw_feed_box(f: &mut Frame, app: &App, area: Rect) {
    let (border_color, title) = match app.phase {
        Phase::Idle => (inactive(), " Camera "),
        Phase::Scanning => (accent(), " Camera ● LIVE "),
        Phase::Granted => (success(), " Camera ✔ "),
    };

    let block = Block::default()
        .title(Span::styled(title, Style::default().fg(border_color)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let inner = block.inner(area);
    f.render_widget(block, area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    match app.phase {
        Phase::Idle => {
            let standby = Paragraph::new(Line::from(Span::styled(
                "STANDBY",
                Style::default().fg(text_dim()),
            )))
            .alignment(Alignment::Center);
            let mid = Rect::new(inner.x, inner.y + inner.height / 2, inner.width, 1);
            f.render_widget(standby, mid);
        }
        Phase::Scanning => {
            // One travelling line, wrapping top to bottom with the tick count
            let row = (app.frame % inner.height as u64) as u16;
            let line = Paragraph::new(Line::from(Span::styled(
                SCAN_LINE.repeat(inner.width as usize),
                Style::default().fg(accent()),
            )));
            f.render_widget(line, Rect::new(inner.x, inner.y + row, inner.width, 1));
        }
        Phase::Granted => {
            let confirmed = Paragraph::new(Line::from(Span::styled(
                "✔ MATCH CONFIRMED",
                Style::default().fg(success()).add_modifier(Modifier::BOLD),
            )))
            .alignment(Alignment::Center);
            let mid = Rect::new(inner.x, inner.y + inner.height / 2, inner.width, 1);
            f.render_widget(confirmed, mid);
        }
    }
}

/// Exactly one card per frame, picked by the phase.
fn draw_state_card(f: &mut Frame, app: &App, area: Rect) {
    match app.phase {
        Phase::Idle => draw_idle_card(f, area),
        Phase::Scanning => draw_scanning_card(f, app, area),
        Phase::Granted => draw_granted_card(f, area),
    }
}

fn card_block(phase: Phase, color: Color) -> Block<'static> {
    Block::default()
        .title(Span::styled(
            card_title(phase),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
}

fn draw_idle_card(f: &mut Frame, area: Rect) {
    let body = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Step up to the camera with your coat on",
            Style::default().fg(text()),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Press ", Style::default().fg(text_dim())),
            Span::styled("s", Style::default().fg(accent()).add_modifier(Modifier::BOLD)),
            Span::styled(" to start the check", Style::default().fg(text_dim())),
        ]),
    ];

    let card = Paragraph::new(body)
        .alignment(Alignment::Center)
        .block(card_block(Phase::Idle, header()));
    f.render_widget(card, area);
}

fn draw_scanning_card(f: &mut Frame, app: &App, area: Rect) {
    let block = card_block(Phase::Scanning, accent());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // spinner line
            Constraint::Length(1),
            Constraint::Length(1), // streak gauge
            Constraint::Min(0),
        ])
        .split(inner);

    let spinner = SPINNER[(app.frame as usize) % SPINNER.len()];
    let mut spans = vec![
        Span::styled(spinner, Style::default().fg(accent())),
        Span::styled(" Checking for the required coat", Style::default().fg(text())),
    ];
    if let Some(elapsed) = app.scan_elapsed() {
        spans.push(Span::styled(
            format!("  ({}s)", elapsed.as_secs()),
            Style::default().fg(text_dim()),
        ));
    }
    f.render_widget(
        Paragraph::new(Line::from(spans)).alignment(Alignment::Center),
        rows[0],
    );

    let streak = app.detection.consecutive_frames.min(STREAK_TARGET);
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(accent()).bg(inactive()))
        .ratio(streak as f64 / STREAK_TARGET as f64)
        .label(format!("{}/{} frames", streak, STREAK_TARGET));
    f.render_widget(gauge, rows[2]);
}

fn draw_granted_card(f: &mut Frame, area: Rect) {
    let body = vec![
        Line::from(""),
        Line::from(Span::styled(
            "ACCESS GRANTED",
            Style::default().fg(success()).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Press ", Style::default().fg(text_dim())),
            Span::styled("r", Style::default().fg(accent()).add_modifier(Modifier::BOLD)),
            Span::styled(" for the next person", Style::default().fg(text_dim())),
        ]),
    ];

    let card = Paragraph::new(body)
        .alignment(Alignment::Center)
        .block(card_block(Phase::Granted, success()));
    f.render_widget(card, area);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let hints: Vec<(&str, &str)> = match app.phase {
        Phase::Idle => vec![("s", "Start"), ("d", "Debug"), ("h", "Help"), ("q", "Quit")],
        Phase::Scanning => vec![("r/Esc", "Cancel"), ("d", "Debug"), ("q", "Quit")],
        Phase::Granted => vec![("r", "Next"), ("h", "Help"), ("q", "Quit")],
    };

    let hint_spans: Vec<Span> = hints
        .iter()
        .flat_map(|(key, action)| {
            vec![
                Span::styled(*key, Style::default().fg(accent())),
                Span::styled(format!(" {} │ ", action), Style::default().fg(text_dim())),
            ]
        })
        .collect();

    let footer = Paragraph::new(Line::from(hint_spans)).alignment(Alignment::Center);
    f.render_widget(footer, area);
}

fn draw_help_popup(f: &mut Frame) {
    let popup_area = centered_rect(60, 70, f.area());

    f.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(Span::styled(
            "═══ Kiosk ═══",
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("  s / Enter ", Style::default().fg(accent())),
            Span::raw("Start the camera check"),
        ]),
        Line::from(vec![
            Span::styled("  r         ", Style::default().fg(accent())),
            Span::raw("Reset for the next person (cancels a running scan)"),
        ]),
        Line::from(vec![
            Span::styled("  Esc       ", Style::default().fg(accent())),
            Span::raw("Cancel a running scan"),
        ]),
        Line::from(vec![
            Span::styled("  d         ", Style::default().fg(accent())),
            Span::raw("Toggle the backend's debug overlay"),
        ]),
        Line::from(vec![
            Span::styled("  q         ", Style::default().fg(accent())),
            Span::raw("Quit"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "═══ Scripting ═══",
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("  garita --status       ", Style::default().fg(accent())),
            Span::raw("Detection state as JSON"),
        ]),
        Line::from(vec![
            Span::styled("  garita --begin        ", Style::default().fg(accent())),
            Span::raw("Start a scan and exit"),
        ]),
        Line::from(vec![
            Span::styled("  garita --reset        ", Style::default().fg(accent())),
            Span::raw("Clear the backend and exit"),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", Style::default().fg(text_dim())),
            Span::styled("h", Style::default().fg(accent())),
            Span::styled("/", Style::default().fg(text_dim())),
            Span::styled("Esc", Style::default().fg(accent())),
            Span::styled(" to close", Style::default().fg(text_dim())),
        ]),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(Span::styled(" 󰋖 garita Help ", Style::default().fg(accent())))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent())),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DetectionStatus;
    use crate::config::AppConfig;
    use ratatui::{backend::TestBackend, Terminal};

    fn test_app() -> App {
        let config = AppConfig {
            backend_url: "http://192.0.2.1:1".to_string(),
            notifications: false,
            ..AppConfig::default()
        };
        App::new(config).unwrap()
    }

    fn render_to_text(app: &App) -> String {
        let backend = TestBackend::new(80, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn idle_frame_shows_only_the_ready_card() {
        let app = test_app();
        let text = render_to_text(&app);

        assert!(text.contains("Ready"));
        assert!(text.contains("STANDBY"));
        assert!(!text.contains("ACCESS GRANTED"));
        assert!(!text.contains("Checking for the required coat"));
        assert!(!text.contains(SCAN_LINE));
    }

    #[test]
    fn scanning_frame_shows_scan_line_and_streak_gauge() {
        let mut app = test_app();
        app.phase = Phase::Scanning;
        app.detection = DetectionStatus {
            consecutive_frames: 7,
            is_scanning: true,
            ..DetectionStatus::default()
        };
        let text = render_to_text(&app);

        assert!(text.contains("Scanning"));
        assert!(text.contains(SCAN_LINE));
        assert!(text.contains("7/15 frames"));
        assert!(text.contains("LIVE"));
        assert!(!text.contains("STANDBY"));
        assert!(!text.contains("ACCESS GRANTED"));
    }

    #[test]
    fn granted_frame_shows_only_the_granted_card() {
        let mut app = test_app();
        app.phase = Phase::Granted;
        let text = render_to_text(&app);

        assert!(text.contains("ACCESS GRANTED"));
        assert!(text.contains("MATCH CONFIRMED"));
        assert!(!text.contains(SCAN_LINE));
        assert!(!text.contains("STANDBY"));
    }

    #[test]
    fn scan_line_travels_with_the_tick_counter() {
        let mut app = test_app();
        app.phase = Phase::Scanning;
        let first = render_to_text(&app);
        app.frame = 3;
        let moved = render_to_text(&app);

        assert!(first.contains(SCAN_LINE));
        assert!(moved.contains(SCAN_LINE));
        assert_ne!(first, moved);
    }

    #[test]
    fn debug_badge_follows_the_backend_flag() {
        let mut app = test_app();
        assert!(!render_to_text(&app).contains("DEBUG"));
        app.detection.debug_mode = true;
        assert!(render_to_text(&app).contains("DEBUG"));
    }

    #[test]
    fn status_message_takes_over_the_info_line() {
        let mut app = test_app();
        app.status_message = Some("Backend unreachable: connection refused".to_string());
        let text = render_to_text(&app);
        assert!(text.contains("Backend unreachable"));
    }

    #[test]
    fn each_phase_has_its_own_card_title() {
        assert_ne!(card_title(Phase::Idle), card_title(Phase::Scanning));
        assert_ne!(card_title(Phase::Scanning), card_title(Phase::Granted));
        assert_ne!(card_title(Phase::Idle), card_title(Phase::Granted));
    }

    #[test]
    fn help_popup_renders_on_top() {
        let mut app = test_app();
        app.popup = Popup::Help;
        let text = render_to_text(&app);
        assert!(text.contains("garita Help"));
    }
}
