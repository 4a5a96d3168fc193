use ratatui::layout::{Constraint, Flex, Layout, Rect};

pub struct AppLayout {
    pub navbar: Rect,
    pub body: Rect,
    pub shortcuts: Option<Rect>,
    pub status_bar: Rect,
}

impl AppLayout {
    /// `shortcuts_width` is `None` when the shortcuts panel is hidden.
    pub fn new(area: Rect, shortcuts_width: Option<u16>) -> Self {
        let vertical = Layout::vertical([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

        let main_area = vertical[1];
        let (body, shortcuts) = match shortcuts_width {
            Some(width) => {
                let width = width.min(main_area.width / 2);
                let split = Layout::horizontal([Constraint::Min(1), Constraint::Length(width)]).split(main_area);
                (split[0], Some(split[1]))
            }
            None => (main_area, None),
        };

        Self {
            navbar: vertical[0],
            body,
            shortcuts,
            status_bar: vertical[2],
        }
    }
}

/// Home page: console strip on top, request | response below.
pub struct HomeLayout {
    pub console: Rect,
    pub request: RequestLayout,
    pub response: Rect,
}

impl HomeLayout {
    pub fn new(area: Rect) -> Self {
        let vertical = Layout::vertical([Constraint::Length(5), Constraint::Min(1)]).split(area);
        let horizontal = Layout::horizontal([
            Constraint::Percentage(45),
            Constraint::Percentage(55),
        ])
        .split(vertical[1]);

        Self {
            console: vertical[0],
            request: RequestLayout::new(horizontal[0]),
            response: horizontal[1],
        }
    }
}

/// Layout for the horizontal request input row: [Method] [URL]
pub struct RequestInputLayout {
    pub method_area: Rect,
    pub url_area: Rect,
}

impl RequestInputLayout {
    pub fn new(area: Rect) -> Self {
        let chunks = Layout::horizontal([
            Constraint::Length(10), // fits "DELETE" + padding
            Constraint::Min(1),
        ])
        .split(area);

        Self {
            method_area: chunks[0],
            url_area: chunks[1],
        }
    }
}

pub struct RequestLayout {
    pub input_row: RequestInputLayout,
    pub headers_area: Rect,
    pub origin_area: Rect,
    pub body_area: Rect,
}

impl RequestLayout {
    pub fn new(area: Rect) -> Self {
        let chunks = Layout::vertical([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(5),
        ])
        .split(area);

        Self {
            input_row: RequestInputLayout::new(chunks[0]),
            headers_area: chunks[1],
            origin_area: chunks[2],
            body_area: chunks[3],
        }
    }
}

/// Login, signup and profile pages: a narrow centered column.
pub struct FormLayout {
    pub info: Rect,
    pub fields: Vec<Rect>,
    pub message: Rect,
    pub countdown: Rect,
}

impl FormLayout {
    pub fn new(area: Rect, field_count: usize, info_height: u16) -> Self {
        let [column] = Layout::horizontal([Constraint::Max(60)])
            .flex(Flex::Center)
            .areas(area);

        let mut constraints = vec![Constraint::Length(info_height)];
        constraints.extend(std::iter::repeat(Constraint::Length(3)).take(field_count));
        constraints.push(Constraint::Length(3));
        constraints.push(Constraint::Length(1));
        constraints.push(Constraint::Min(0));
        let chunks = Layout::vertical(constraints).split(column);

        Self {
            info: chunks[0],
            fields: chunks[1..=field_count].to_vec(),
            message: chunks[field_count + 1],
            countdown: chunks[field_count + 2],
        }
    }
}

/// Centered popup covering the given percentages of `area`.
pub fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [vertical] = Layout::vertical([Constraint::Percentage(percent_y)])
        .flex(Flex::Center)
        .areas(area);
    let [popup] = Layout::horizontal([Constraint::Percentage(percent_x)])
        .flex(Flex::Center)
        .areas(vertical);
    popup
}
