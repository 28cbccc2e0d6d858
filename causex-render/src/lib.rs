pub mod font;
pub mod layout;
pub mod render;

pub use font::{load_font, FONT_ENV};
pub use layout::{scene_rows, wrap_lines, CanvasTransform, TextRow};
pub use render::{render_text_pixmap, FrameStats, SkiaRenderer};

pub use ab_glyph::FontVec;
