use crossterm::event::KeyEvent;
use ratatui::style::{Modifier, Style};
use tui_textarea::TextArea;

use crate::api::RequestRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            HttpMethod::Get => 0,
            HttpMethod::Post => 1,
            HttpMethod::Put => 2,
            HttpMethod::Patch => 3,
            HttpMethod::Delete => 4,
        }
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(value.trim()))
    }

    pub fn next(&self) -> Self {
        Self::from_index(self.index() + 1)
    }

    pub fn prev(&self) -> Self {
        Self::from_index(self.index() + Self::ALL.len() - 1)
    }
}

pub enum FieldInput {
    Text(TextArea<'static>),
    Method(HttpMethod),
}

pub struct Field {
    pub label: &'static str,
    pub input: FieldInput,
    pub multiline: bool,
    placeholder: &'static str,
    masked: bool,
}

impl Field {
    pub fn text(label: &'static str, placeholder: &'static str) -> Self {
        Self {
            label,
            input: FieldInput::Text(new_textarea(placeholder, false)),
            multiline: false,
            placeholder,
            masked: false,
        }
    }

    pub fn secret(label: &'static str, placeholder: &'static str) -> Self {
        Self {
            input: FieldInput::Text(new_textarea(placeholder, true)),
            masked: true,
            ..Self::text(label, placeholder)
        }
    }

    pub fn multiline(label: &'static str, placeholder: &'static str) -> Self {
        Self {
            multiline: true,
            ..Self::text(label, placeholder)
        }
    }

    pub fn method(label: &'static str) -> Self {
        Self {
            label,
            input: FieldInput::Method(HttpMethod::default()),
            multiline: false,
            placeholder: "",
            masked: false,
        }
    }

    pub fn value(&self) -> String {
        match &self.input {
            FieldInput::Text(area) => area.lines().join("\n"),
            FieldInput::Method(method) => method.as_str().to_string(),
        }
    }

    pub fn set_value(&mut self, value: &str) {
        match &mut self.input {
            FieldInput::Text(area) => {
                let mut fresh = new_textarea(self.placeholder, self.masked);
                fresh.insert_str(value);
                *area = fresh;
            }
            FieldInput::Method(method) => {
                *method = HttpMethod::parse(value).unwrap_or_default();
            }
        }
    }

    pub fn clear(&mut self) {
        match &mut self.input {
            FieldInput::Text(area) => *area = new_textarea(self.placeholder, self.masked),
            FieldInput::Method(method) => *method = HttpMethod::default(),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        use crossterm::event::KeyCode;

        match &mut self.input {
            FieldInput::Text(area) => {
                if key.code == KeyCode::Enter && !self.multiline {
                    return;
                }
                area.input(key);
            }
            FieldInput::Method(method) => match key.code {
                KeyCode::Right | KeyCode::Down | KeyCode::Char(' ') | KeyCode::Char('j') => {
                    *method = method.next()
                }
                KeyCode::Left | KeyCode::Up | KeyCode::Char('k') => *method = method.prev(),
                _ => {}
            },
        }
    }

    fn set_focused(&mut self, focused: bool) {
        if let FieldInput::Text(area) = &mut self.input {
            let style = if focused {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            area.set_cursor_style(style);
        }
    }

    pub fn insert_newline(&mut self) {
        if let FieldInput::Text(area) = &mut self.input {
            if self.multiline {
                area.insert_newline();
            }
        }
    }
}

fn new_textarea(placeholder: &'static str, masked: bool) -> TextArea<'static> {
    let mut area = TextArea::default();
    area.set_placeholder_text(placeholder);
    area.set_cursor_line_style(Style::default());
    if masked {
        area.set_mask_char('\u{2022}');
    }
    area
}

/// An ordered set of fields with a single focused one.
pub struct Form {
    pub fields: Vec<Field>,
    pub focus: usize,
}

impl Form {
    pub fn new(fields: Vec<Field>) -> Self {
        let mut form = Self { fields, focus: 0 };
        form.set_focus(0);
        form
    }

    pub fn set_focus(&mut self, index: usize) {
        if self.fields.is_empty() {
            return;
        }
        self.focus = index % self.fields.len();
        for (i, field) in self.fields.iter_mut().enumerate() {
            field.set_focused(i == self.focus);
        }
    }

    pub fn value(&self, label: &str) -> String {
        self.field(label).map(Field::value).unwrap_or_default()
    }

    pub fn field(&self, label: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.label == label)
    }

    pub fn field_mut(&mut self, label: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|field| field.label == label)
    }

    pub fn focused(&self) -> Option<&Field> {
        self.fields.get(self.focus)
    }

    pub fn focused_mut(&mut self) -> Option<&mut Field> {
        self.fields.get_mut(self.focus)
    }

    pub fn focus_label(&mut self, label: &str) {
        if let Some(index) = self.fields.iter().position(|field| field.label == label) {
            self.set_focus(index);
        }
    }

    pub fn next_field(&mut self) {
        self.set_focus(self.focus + 1);
    }

    pub fn prev_field(&mut self) {
        self.set_focus(self.focus + self.fields.len().saturating_sub(1));
    }

    pub fn reset(&mut self) {
        for field in &mut self.fields {
            field.clear();
        }
        self.set_focus(0);
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if let Some(field) = self.focused_mut() {
            field.handle_key(key);
        }
    }
}

pub const METHOD: &str = "method";
pub const URL: &str = "url";
pub const HEADERS: &str = "headers";
pub const ORIGIN: &str = "origin";
pub const BODY: &str = "body";
pub const USERNAME: &str = "username";
pub const EMAIL: &str = "email";
pub const PASSWORD: &str = "password";

pub fn request_form() -> Form {
    Form::new(vec![
        Field::method(METHOD),
        Field::text(HEADERS, "headers"),
        Field::text(ORIGIN, "origin"),
        Field::multiline(BODY, "body"),
        Field::text(URL, "url"),
    ])
}

/// Copies a history or favorites entry into the request form.
pub fn fill_request_form(form: &mut Form, record: &RequestRecord) {
    let values = [
        (METHOD, record.method.as_str()),
        (URL, record.url.as_str()),
        (HEADERS, record.headers.as_deref().unwrap_or("")),
        (ORIGIN, record.origin.as_deref().unwrap_or("")),
        (BODY, record.body.as_deref().unwrap_or("")),
    ];
    for (label, value) in values {
        if let Some(field) = form.field_mut(label) {
            field.set_value(value);
        }
    }
    form.focus_label(URL);
}

pub fn login_form() -> Form {
    Form::new(vec![
        Field::text(EMAIL, "email"),
        Field::secret(PASSWORD, "password"),
    ])
}

pub fn signup_form() -> Form {
    Form::new(vec![
        Field::text(USERNAME, "username"),
        Field::text(EMAIL, "email"),
        Field::secret(PASSWORD, "password"),
    ])
}

pub fn profile_form() -> Form {
    Form::new(vec![
        Field::text(USERNAME, "username"),
        Field::secret(PASSWORD, "new password"),
    ])
}
