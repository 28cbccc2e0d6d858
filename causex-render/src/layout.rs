use causex_core::{Rgba, Scene, CANVAS_HEIGHT, CANVAS_WIDTH, WHITE};

pub const TEXT_SIZE: f32 = 28.0;
pub const TEXT_PADDING: f32 = 20.0;
pub const LINE_SPACING: f32 = 1.2;
pub const OBJECT_TEXT_SIZE: f32 = 30.0;
pub const ECHO_SIZE: f32 = 36.0;
pub const FOOTER_SIZE: f32 = 24.0;
pub const STATUS_SIZE: f32 = 18.0;

const STATUS_COLOR: Rgba = [190, 190, 190, 255];

#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum Align {
    Center,
    /// `pos.0` is the left edge
    Left,
}

/// One piece of text in canvas coordinates; `pos.1` is the vertical center.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRow {
    pub text: String,
    pub size: f32,
    pub color: Rgba,
    pub pos: (f32, f32),
    pub align: Align,
}

impl TextRow {
    pub fn centered(text: impl Into<String>, size: f32, color: Rgba, pos: (f32, f32)) -> Self {
        Self {
            text: text.into(),
            size,
            color,
            pos,
            align: Align::Center,
        }
    }

    pub fn status(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            size: STATUS_SIZE,
            color: STATUS_COLOR,
            pos: (10.0, 16.0),
            align: Align::Left,
        }
    }
}

/// Maps the fixed logical canvas onto a window, preserving aspect ratio.
#[derive(Copy, Debug, Clone, PartialEq)]
pub struct CanvasTransform {
    pub scale: f32,
    pub offset: (f32, f32),
}

impl CanvasTransform {
    pub fn fit(width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        let scale = (w / CANVAS_WIDTH).min(h / CANVAS_HEIGHT);
        Self {
            scale,
            offset: (
                (w - CANVAS_WIDTH * scale) * 0.5,
                (h - CANVAS_HEIGHT * scale) * 0.5,
            ),
        }
    }

    pub fn apply(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (
            self.offset.0 + x * self.scale,
            self.offset.1 + y * self.scale,
        )
    }
}

pub fn max_chars_per_line(width: f32, font_size: f32) -> usize {
    ((width - 2.0 * TEXT_PADDING) / (font_size / 1.5)).floor().max(1.0) as usize
}

/// Greedy word wrap by character count. Lines that already fit are kept
/// as they are, blank ones included.
pub fn wrap_lines<S: AsRef<str>>(lines: &[S], max_chars: usize) -> Vec<String> {
    let mut wrapped = Vec::with_capacity(lines.len());
    for line in lines.iter().map(AsRef::as_ref) {
        if line.chars().count() <= max_chars {
            wrapped.push(line.to_string());
            continue;
        }
        let mut current = String::new();
        for word in line.split(' ') {
            if current.chars().count() + word.chars().count() > max_chars {
                let done = current.trim();
                if !done.is_empty() {
                    wrapped.push(done.to_string());
                }
                current.clear();
            }
            current.push_str(word);
            current.push(' ');
        }
        let rest = current.trim();
        if !rest.is_empty() {
            wrapped.push(rest.to_string());
        }
    }
    wrapped
}

/// Everything textual the scene draws
pub fn scene_rows(scene: &Scene) -> Vec<TextRow> {
    match scene {
        Scene::Text(screen) => text_screen_rows(&screen.lines),
        Scene::Objects { o1, o2, .. } => [o1, o2]
            .into_iter()
            .map(|o| TextRow::centered(o.text.clone(), OBJECT_TEXT_SIZE, o.color, (o.x, o.y)))
            .collect(),
        Scene::Prompt {
            prompt,
            echo,
            footer,
        } => prompt_rows(prompt, echo.as_deref(), *footer),
        Scene::Blank => Vec::new(),
    }
}

fn text_screen_rows(lines: &[String]) -> Vec<TextRow> {
    let wrapped = wrap_lines(lines, max_chars_per_line(CANVAS_WIDTH, TEXT_SIZE));
    let line_height = TEXT_SIZE * LINE_SPACING;
    let total = wrapped.len() as f32 * line_height;
    let top = (CANVAS_HEIGHT - total) / 2.0 + TEXT_PADDING / 2.0;

    wrapped
        .into_iter()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            let y = top + i as f32 * line_height + line_height / 2.0;
            TextRow::centered(line, TEXT_SIZE, WHITE, (CANVAS_WIDTH / 2.0, y))
        })
        .collect()
}

fn prompt_rows(prompt: &str, echo: Option<&str>, footer: Option<&str>) -> Vec<TextRow> {
    let cx = CANVAS_WIDTH / 2.0;
    let cy = CANVAS_HEIGHT / 2.0;
    // the second prompt sits higher to leave room for the footer
    let (prompt_y, echo_y) = match footer {
        Some(_) => (cy - 40.0, cy),
        None => (cy, cy + 40.0),
    };

    let mut rows = vec![TextRow::centered(prompt, TEXT_SIZE, WHITE, (cx, prompt_y))];
    if let Some(echo) = echo.filter(|e| !e.is_empty()) {
        rows.push(TextRow::centered(echo, ECHO_SIZE, WHITE, (cx, echo_y)));
    }
    if let Some(footer) = footer {
        rows.push(TextRow::centered(footer, FOOTER_SIZE, WHITE, (cx, cy + 80.0)));
    }
    rows
}
