use crate::stimulus::ObjectTrace;

/// Full-screen text pages
#[derive(Debug, Clone, PartialEq)]
pub struct TextScreen {
    pub lines: Vec<String>,
}

impl TextScreen {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

/// What the renderer should draw this frame
#[derive(Debug, Clone, PartialEq)]
pub enum Scene {
    Text(TextScreen),
    Objects {
        o1: ObjectTrace,
        o2: ObjectTrace,
        /// Spark anchor while a burst is active
        burst_at: Option<(f32, f32)>,
    },
    Prompt {
        prompt: &'static str,
        echo: Option<String>,
        footer: Option<&'static str>,
    },
    Blank,
}

/// Logical drawing area stimulus coordinates live in; renderers scale it
/// to the window.
pub const CANVAS_WIDTH: f32 = 800.0;
pub const CANVAS_HEIGHT: f32 = 600.0;
