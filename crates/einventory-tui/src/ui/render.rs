use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use einventory_core::Location;

use crate::app::{App, AppState, LoginFocus, NoticeKind};

use super::styles;

const LOGO: [&str; 3] = [
    "   ╔═╗   ╦╔╗╔╦  ╦╔═╗╔╗╔╔╦╗╔═╗╦═╗╦ ╦",
    "   ║╣ ── ║║║║╚╗╔╝║╣ ║║║ ║ ║ ║╠╦╝╚╦╝",
    "   ╚═╝   ╩╝╚╝ ╚╝ ╚═╝╝╚╝ ╩ ╚═╝╩╚═ ╩ ",
];

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_main_content(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);

    // Render overlays
    if matches!(app.state, AppState::ShowingHelp) {
        render_help_overlay(frame);
    }

    if matches!(app.state, AppState::ConfirmingQuit) {
        render_quit_overlay(frame);
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = format!("  E-Inventory  ·  {}", app.current_location().title());
    let right = match app.operator_name() {
        Some(name) => format!("{}  [?] Help", name),
        None if app.is_authenticated() => "[?] Help".to_string(),
        None => String::new(),
    };

    let title_line = Line::from(vec![
        Span::styled(title.clone(), styles::title_style()),
        Span::raw(" ".repeat(
            (area.width as usize).saturating_sub(title.chars().count() + right.chars().count() + 2),
        )),
        Span::styled(right, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(title_line).block(block);
    frame.render_widget(paragraph, area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.current_location() {
        Location::Login | Location::Root => render_login(frame, app, area),
        Location::ForgotPassword | Location::ResetPassword => render_recovery(frame, app, area),
        location => render_shell(frame, app, location, area),
    }
}

// ============================================================================
// Protected shell
// ============================================================================

fn render_shell(frame: &mut Frame, app: &App, location: Location, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(22), Constraint::Min(30)])
        .split(area);

    render_sidebar(frame, app, location, chunks[0]);
    render_panel(frame, app, location, chunks[1]);
}

fn render_sidebar(frame: &mut Frame, app: &App, location: Location, area: Rect) {
    let mut items: Vec<ListItem> = Location::PROTECTED
        .iter()
        .enumerate()
        .map(|(i, l)| {
            let marker = if *l == location { "▸" } else { " " };
            let line = Line::from(format!("{} {} {}", marker, i + 1, l.title()));
            let style = if i == app.sidebar_selection {
                styles::selected_style()
            } else if *l == location {
                styles::highlight_style()
            } else {
                styles::list_item_style()
            };
            ListItem::new(line).style(style)
        })
        .collect();

    items.push(ListItem::new(Line::from("")));
    items.push(ListItem::new(Line::from(Span::styled(
        "  [L] Log out",
        styles::error_style(),
    ))));

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(styles::border_style(true))
            .title(" Menu "),
    );
    frame.render_widget(list, area);
}

fn render_panel(frame: &mut Frame, app: &App, location: Location, area: Rect) {
    let mut lines = vec![
        Line::from(Span::styled(location.title(), styles::highlight_style())),
        Line::from(Span::styled(location.path(), styles::muted_style())),
        Line::from(""),
    ];

    match (location, app.session.profile()) {
        (Location::Dashboard, Some(profile)) => {
            if let Some(name) = profile.display_name() {
                lines.push(Line::from(vec![
                    Span::styled("Signed in as ", styles::muted_style()),
                    Span::styled(name.to_string(), styles::list_item_style()),
                ]));
            }
            if let Some(message) = profile.message.as_deref() {
                lines.push(Line::from(Span::styled(message.to_string(), styles::success_style())));
            }
            for (key, value) in &profile.extra {
                lines.push(Line::from(vec![
                    Span::styled(format!("{}: ", key), styles::muted_style()),
                    Span::styled(value.to_string(), styles::list_item_style()),
                ]));
            }
        }
        (Location::Dashboard, None) => {
            lines.push(Line::from(Span::styled("Loading profile...", styles::muted_style())));
        }
        _ => {
            lines.push(Line::from(Span::styled(
                "Records for this view are managed by the inventory service.",
                styles::list_item_style(),
            )));
        }
    }

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(styles::border_style(false)),
        );
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Public views
// ============================================================================

fn logo_lines() -> Vec<Line<'static>> {
    LOGO.iter()
        .map(|l| Line::from(Span::styled(*l, styles::title_style())))
        .collect()
}

fn field_style(focused: bool) -> Style {
    if focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    }
}

fn render_login(frame: &mut Frame, app: &App, area: Rect) {
    let notice_line = app.notice.as_ref().filter(|_| app.login_error.is_none());
    let height = if app.login_error.is_some() || notice_line.is_some() { 15 } else { 13 };
    let area = centered_rect_fixed(48, height, area);

    // Clear the area
    frame.render_widget(Clear, area);

    let mut lines = logo_lines();
    lines.push(Line::from(""));

    // Username field
    let focused = app.login_focus == LoginFocus::Username;
    let cursor = if focused { "▌" } else { "" };
    lines.push(Line::from(vec![
        Span::raw("   "),
        Span::styled("Username: [", styles::muted_style()),
        Span::styled(
            format!("{:<20}{}", app.login_form.identifier, cursor),
            field_style(focused),
        ),
        Span::styled("]", styles::muted_style()),
    ]));

    // Password field
    let focused = app.login_focus == LoginFocus::Password;
    let cursor = if focused { "▌" } else { "" };
    let masked = "*".repeat(app.login_form.secret.chars().count().min(20));
    lines.push(Line::from(vec![
        Span::raw("   "),
        Span::styled("Password: [", styles::muted_style()),
        Span::styled(format!("{:<20}{}", masked, cursor), field_style(focused)),
        Span::styled("]", styles::muted_style()),
    ]));

    // Site selector
    let focused = app.login_focus == LoginFocus::Site;
    let site = match app.selected_site() {
        Some(site) => site.label(),
        None if app.sites.is_empty() => "(none available)".to_string(),
        None => "Select a site".to_string(),
    };
    let site: String = site.chars().take(20).collect();
    lines.push(Line::from(vec![
        Span::raw("   "),
        Span::styled("Site:    ◀ ", styles::muted_style()),
        Span::styled(format!("{:<20}", site), field_style(focused)),
        Span::styled(" ▶", styles::muted_style()),
    ]));

    // Login button
    lines.push(Line::from(""));
    let focused = app.login_focus == LoginFocus::Button;
    let label = if focused { " ▶ Sign in ◀ " } else { "   Sign in   " };
    lines.push(Line::from(vec![
        Span::raw("               ["),
        Span::styled(label, field_style(focused)),
        Span::raw("]"),
    ]));
    lines.push(Line::from(Span::styled(
        "      [F2] Forgot password   [Esc] Quit",
        styles::muted_style(),
    )));

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {}", error), styles::error_style())));
    } else if let Some(notice) = notice_line {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {}", notice.text), notice_style(notice.kind))));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}

fn render_recovery(frame: &mut Frame, app: &App, area: Rect) {
    let area = centered_rect_fixed(48, 11, area);
    frame.render_widget(Clear, area);

    let mut lines = logo_lines();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!(" {}", app.current_location().title()),
        styles::highlight_style(),
    )));
    lines.push(Line::from(Span::styled(
        " Ask an administrator to reset your password.",
        styles::list_item_style(),
    )));
    lines.push(Line::from(""));
    let hint = if app.current_location() == Location::ForgotPassword {
        " [r] I have a reset code   [Esc] Back"
    } else {
        " [Esc] Back"
    };
    lines.push(Line::from(Span::styled(hint, styles::muted_style())));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

// ============================================================================
// Chrome
// ============================================================================

fn notice_style(kind: NoticeKind) -> Style {
    match kind {
        NoticeKind::Info => styles::success_style(),
        NoticeKind::Error => styles::error_style(),
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = if app.current_location().is_protected() {
        "[1-9] views | [L]ogout | [q]uit"
    } else {
        "[Tab] next field | [Enter] select"
    };

    let (left_text, left_style) = match app.notice {
        Some(ref notice) => (
            format!(" {} {} ", notice.at.format("%H:%M"), notice.text),
            notice_style(notice.kind),
        ),
        None => (String::new(), styles::muted_style()),
    };
    let right_text = format!(" {} ", shortcuts);

    let padding_len = (area.width as usize)
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.chars().count());
    let status_line = Line::from(vec![
        Span::styled(left_text, left_style),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(48, 16, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");
    let key = |k: &'static str, desc: &'static str| {
        Line::from(vec![
            Span::styled(k, styles::help_key_style()),
            Span::styled(desc, styles::help_desc_style()),
        ])
    };

    let mut help_text = logo_lines();
    help_text.push(Line::from(Span::styled(
        format!("              version {}", version),
        styles::muted_style(),
    )));
    help_text.push(Line::from(""));
    help_text.push(Line::from(Span::styled(" Navigation", styles::highlight_style())));
    help_text.push(key("  1-9       ", "Open a view"));
    help_text.push(key("  ↑/↓ Enter ", "Move in the menu / open"));
    help_text.push(key("  Esc       ", "Go back"));
    help_text.push(Line::from(""));
    help_text.push(Line::from(Span::styled(" Session", styles::highlight_style())));
    help_text.push(key("  L         ", "Log out"));
    help_text.push(key("  q         ", "Quit"));
    help_text.push(Line::from(vec![
        Span::styled("       Press ", styles::muted_style()),
        Span::styled("?", styles::help_key_style()),
        Span::styled(" or ", styles::muted_style()),
        Span::styled("Esc", styles::help_key_style()),
        Span::styled(" to close", styles::muted_style()),
    ]));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(48, 9, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let mut lines = logo_lines();
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
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
