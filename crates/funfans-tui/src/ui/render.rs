use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use funfans_core::auth::credentials::{
    FALLBACK_PASSWORD, FALLBACK_USERNAME, PASSWORD_ENV, USERNAME_ENV,
};

use crate::app::{App, AppState, LoginFocus};

use super::styles;

const LOGO: [&str; 3] = [
    "    ╔═╗╦ ╦╔╗╔╔═╗╔═╗╔╗╔╔═╗",
    "    ╠╣ ║ ║║║║╠╣ ╠═╣║║║╚═╗  admin",
    "    ╚  ╚═╝╝╚╝╚  ╩ ╩╝╚╝╚═╝",
];

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(8),    // Admin panel
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, chunks[0]);
    render_admin_panel(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);

    // Render overlays
    if matches!(app.state, AppState::ShowingHelp) {
        render_help_overlay(frame);
    }

    if matches!(app.state, AppState::LoggingIn) {
        render_login_overlay(frame, app);
    }

    if matches!(app.state, AppState::ConfirmingQuit) {
        render_quit_overlay(frame);
    }
}

fn render_title_bar(frame: &mut Frame, area: Rect) {
    let title = "  FunFansPlay Admin Panel";
    let help_hint = "[?] Help";

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(
            area.width
                .saturating_sub(title.chars().count() as u16 + help_hint.len() as u16 + 4)
                as usize,
        )),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::border_style(false));

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

fn render_admin_panel(frame: &mut Frame, app: &App, area: Rect) {
    let authenticated = matches!(
        app.state,
        AppState::Normal | AppState::ShowingHelp | AppState::ConfirmingQuit
    );

    let state_span = if authenticated {
        Span::styled("Active", styles::success_style())
    } else {
        Span::styled("Signed out", styles::error_style())
    };

    let mut lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  Session:      ", styles::muted_style()),
            state_span,
        ]),
        Line::from(vec![
            Span::styled("  Remaining:    ", styles::muted_style()),
            Span::styled(format!("{}m", app.session_minutes), styles::list_item_style()),
        ]),
        Line::from(vec![
            Span::styled("  Established:  ", styles::muted_style()),
            Span::styled(app.established_display(), styles::list_item_style()),
        ]),
        Line::from(vec![
            Span::styled("  Expires:      ", styles::muted_style()),
            Span::styled(app.expires_display(), styles::list_item_style()),
        ]),
        Line::from(vec![
            Span::styled("  Stored in:    ", styles::muted_style()),
            Span::styled(app.store_location.clone(), styles::muted_style()),
        ]),
    ];

    if app.using_fallback_credentials() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "  Development mode: default admin credentials in use",
            styles::warning_style(),
        )));
    }

    let block = Block::default()
        .title(Span::styled(" Admin Session ", styles::title_style()))
        .borders(Borders::ALL)
        .border_style(styles::border_style(authenticated));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = "[r]efresh | [l]ogout | [q]uit";

    let left_text = if let Some(ref msg) = app.status_message {
        format!(" {} ", msg)
    } else {
        format!(" {} ", app.session_display())
    };
    let right_text = format!(" {} ", shortcuts);

    let padding_len = (area.width as usize)
        .saturating_sub(left_text.len())
        .saturating_sub(right_text.len());
    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);

    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 12, frame.area());
    frame.render_widget(Clear, area);

    let keys = [
        ("r", "Refresh session countdown"),
        ("l", "Log out"),
        ("?", "Toggle this help"),
        ("q", "Quit"),
        ("Ctrl+C", "Quit immediately"),
    ];

    let mut lines = vec![
        Line::from(Span::styled("  Keyboard Shortcuts", styles::title_style())),
        Line::from(""),
    ];
    for (key, desc) in keys {
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<8}", key), styles::help_key_style()),
            Span::styled(desc, styles::help_desc_style()),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  Sessions expire 60 minutes after login",
        styles::muted_style(),
    )));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let fallback = app.using_fallback_credentials();
    let mut height = 12;
    if app.login_error.is_some() {
        height += 2;
    }
    if fallback {
        height += 6;
    }
    let area = centered_rect_fixed(50, height, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let mut lines: Vec<Line> = LOGO
        .iter()
        .map(|row| Line::from(Span::styled(*row, styles::title_style())))
        .collect();
    lines.push(Line::from(""));

    if fallback {
        lines.push(Line::from(Span::styled(
            " Development Mode: using default credentials.",
            styles::warning_style(),
        )));
        lines.push(Line::from(Span::styled(
            format!(" Set {} and {}", USERNAME_ENV, PASSWORD_ENV),
            styles::highlight_style(),
        )));
        lines.push(Line::from(Span::styled(
            " in your .env file for production.",
            styles::highlight_style(),
        )));
        lines.push(Line::from(vec![
            Span::styled(" Default: ", styles::muted_style()),
            Span::styled(FALLBACK_USERNAME, styles::highlight_style()),
            Span::styled(" / ", styles::muted_style()),
            Span::styled(FALLBACK_PASSWORD, styles::highlight_style()),
        ]));
        lines.push(Line::from(""));
    }

    let username_focused = app.login_focus == LoginFocus::Username;
    let username_style = if username_focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let username_display = format!("{:<16}", app.login_username);
    let cursor = if username_focused { "▌" } else { "" };
    lines.push(Line::from(vec![
        Span::raw("      "),
        Span::styled("Username: [", styles::muted_style()),
        Span::styled(format!("{}{}", username_display, cursor), username_style),
        Span::styled("]", styles::muted_style()),
    ]));

    let password_focused = app.login_focus == LoginFocus::Password;
    let password_style = if password_focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let password_masked: String = "*".repeat(app.login_password.chars().count().min(16));
    let password_display = format!("{:<16}", password_masked);
    let cursor = if password_focused { "▌" } else { "" };
    lines.push(Line::from(vec![
        Span::raw("      "),
        Span::styled("Password: [", styles::muted_style()),
        Span::styled(format!("{}{}", password_display, cursor), password_style),
        Span::styled("]", styles::muted_style()),
    ]));

    let button_focused = app.login_focus == LoginFocus::Button;
    let button_style = if button_focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let button_label = if button_focused { " ▶ Login ◀ " } else { "   Login   " };
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw("              ["),
        Span::styled(button_label, button_style),
        Span::raw("]"),
    ]));

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(" {}", error),
            styles::error_style(),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(50, 10, frame.area());
    frame.render_widget(Clear, area);

    let mut lines: Vec<Line> = LOGO
        .iter()
        .map(|row| Line::from(Span::styled(*row, styles::title_style())))
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "   Are you sure you want to quit?",
        styles::highlight_style(),
    )));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("   Press ", styles::muted_style()),
        Span::styled("[Y]", styles::help_key_style()),
        Span::styled(" to quit, ", styles::muted_style()),
        Span::styled("[N]", styles::help_key_style()),
        Span::styled(" to cancel", styles::muted_style()),
    ]));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
