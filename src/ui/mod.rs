mod layout;

use layout::{centered, AppLayout, FormLayout, HomeLayout, RequestLayout};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Modal, ResponseStatus};
use crate::forms::{Field, FieldInput, Form};
use crate::handlers::SIGN_IN_NOTICE;
use crate::shortcuts::{self, PageContext};

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

pub fn render(frame: &mut Frame, app: &App) {
    let shortcuts_width = app.session.shortcuts_visible().then_some(app.shortcuts_width);
    let layout = AppLayout::new(frame.area(), shortcuts_width);

    render_navbar(frame, app, layout.navbar);
    match app.page {
        PageContext::Home => render_home(frame, app, layout.body),
        _ => render_form_page(frame, app, layout.body),
    }
    if let Some(area) = layout.shortcuts {
        render_shortcuts(frame, app, area);
    }
    render_status_bar(frame, app, layout.status_bar);

    if let Some(modal) = app.modal {
        render_modal(frame, app, modal, layout.body);
    }
}

fn render_navbar(frame: &mut Frame, app: &App, area: Rect) {
    let links = app.navbar.lines().collect::<Vec<_>>().join("  ");
    let block = Block::default().borders(Borders::ALL).title(" gURL ");
    let navbar = Paragraph::new(Line::from(links)).block(block);
    frame.render_widget(navbar, area);
}

fn border_color(focused: bool) -> Color {
    if focused {
        Color::Yellow
    } else {
        Color::White
    }
}

fn render_field(frame: &mut Frame, form: &Form, field: &Field, area: Rect) {
    let focused = form.focused().is_some_and(|f| f.label == field.label);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(focused)))
        .title(field.label);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    match &field.input {
        FieldInput::Text(textarea) => frame.render_widget(textarea, inner),
        FieldInput::Method(method) => {
            let text = Paragraph::new(Line::from(method.as_str()))
                .style(Style::default().fg(border_color(focused)));
            frame.render_widget(text, inner);
        }
    }
}

fn render_home(frame: &mut Frame, app: &App, area: Rect) {
    let layout = HomeLayout::new(area);

    let visible = layout.console.height.saturating_sub(2) as usize;
    let start = app.console.len().saturating_sub(visible);
    let console = Paragraph::new(app.console[start..].join("\n"))
        .block(Block::default().borders(Borders::ALL).title("console"));
    frame.render_widget(console, layout.console);

    render_request_panel(frame, &app.request_form, &layout.request);
    render_response_panel(frame, app, layout.response);
}

fn render_request_panel(frame: &mut Frame, form: &Form, layout: &RequestLayout) {
    let areas = [
        (crate::forms::METHOD, layout.input_row.method_area),
        (crate::forms::URL, layout.input_row.url_area),
        (crate::forms::HEADERS, layout.headers_area),
        (crate::forms::ORIGIN, layout.origin_area),
        (crate::forms::BODY, layout.body_area),
    ];
    for (label, area) in areas {
        if let Some(field) = form.field(label) {
            render_field(frame, form, field, area);
        }
    }
}

fn render_response_panel(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("response");

    let text = match &app.response {
        ResponseStatus::Empty => Text::raw(""),
        ResponseStatus::Loading => {
            let spinner = SPINNER[(app.loading_tick / 4) as usize % SPINNER.len()];
            Text::raw(format!("$  curling... {}", spinner))
        }
        ResponseStatus::Done { summary, body } => {
            let mut lines: Vec<Line> = summary.lines().map(|l| Line::from(l.to_string())).collect();
            if !body.is_empty() {
                lines.push(Line::default());
                lines.extend(body.lines().map(|l| Line::from(l.to_string())));
            }
            Text::from(lines)
        }
        ResponseStatus::Error(message) => Text::styled(
            format!("$  error: {}", message),
            Style::default().fg(Color::Red),
        ),
    };

    let paragraph = Paragraph::new(text)
        .block(block)
        .scroll((app.response_scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_form_page(frame: &mut Frame, app: &App, area: Rect) {
    let info_height = if app.info.is_empty() {
        1
    } else {
        app.info.lines().count() as u16 + 1
    };
    let layout = FormLayout::new(area, app.page_form.fields.len(), info_height);

    let title = Paragraph::new(app.info.as_str()).style(Style::default().add_modifier(Modifier::BOLD));
    frame.render_widget(title, layout.info);

    for (field, field_area) in app.page_form.fields.iter().zip(layout.fields.iter()) {
        render_field(frame, &app.page_form, field, *field_area);
    }

    let message = Paragraph::new(app.message.as_str()).wrap(Wrap { trim: true });
    frame.render_widget(message, layout.message);

    if let Some(countdown) = &app.countdown {
        frame.render_widget(Paragraph::new(countdown.as_str()), layout.countdown);
    }
}

fn render_shortcuts(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = shortcuts::available(app.page, app.session.is_logged_in())
        .map(|action| {
            let key = action.key().trim_start_matches("Key").to_ascii_lowercase();
            let chord = if action.key() == "Enter" {
                "enter".to_string()
            } else {
                format!("ctrl+alt+{}", key)
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<12}", chord), Style::default().fg(Color::Cyan)),
                Span::raw(action.label()),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title("shortcuts (F1 hides)"),
    );
    frame.render_widget(list, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let line = match &app.status {
        Some(status) => Line::styled(status.as_str(), Style::default().fg(Color::Red)),
        None => Line::styled(
            "tab: next field  esc: close  pgup/pgdn: scroll  F1: shortcuts  ctrl+c: quit",
            Style::default().fg(Color::DarkGray),
        ),
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn render_modal(frame: &mut Frame, app: &App, modal: Modal, area: Rect) {
    let popup = centered(area, 70, 60);
    frame.render_widget(Clear, popup);

    let title = match modal {
        Modal::History => "history",
        Modal::Favorites | Modal::SignInNotice => "favorites",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(title);

    if modal == Modal::SignInNotice {
        frame.render_widget(Paragraph::new(SIGN_IN_NOTICE).block(block), popup);
        return;
    }
    if app.records_loading {
        frame.render_widget(Paragraph::new("$  loading...").block(block), popup);
        return;
    }
    if app.records.is_empty() {
        frame.render_widget(Paragraph::new("$  no requests yet").block(block), popup);
        return;
    }

    let profile = app.session.profile().ok().flatten();
    let items: Vec<ListItem> = app
        .records
        .iter()
        .map(|record| {
            let starred = profile.as_ref().is_some_and(|p| p.is_favorite(record.id));
            let mut spans = vec![
                Span::styled(if starred { "* " } else { "  " }, Style::default().fg(Color::Yellow)),
                Span::styled(format!("{:<7}", record.method), Style::default().fg(Color::Cyan)),
                Span::raw(format!("{:<5}", record.status)),
                Span::raw(record.url.clone()),
            ];
            if let Some((id, notice)) = &app.item_notice {
                if *id == record.id {
                    spans.push(Span::styled(format!("  {}", notice), Style::default().fg(Color::Green)));
                }
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut state = ListState::default().with_selected(Some(app.selected));
    frame.render_stateful_widget(list, popup, &mut state);
}
