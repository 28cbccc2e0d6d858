use std::path::Path;

use ab_glyph::FontVec;
use anyhow::{bail, Context, Result};
use tracing::{debug, info};

/// Overrides the search below when set
pub const FONT_ENV: &str = "CAUSEX_FONT";

const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Loads the UI font: an explicit path, then `CAUSEX_FONT`, then the first
/// readable system font.
pub fn load_font(explicit: Option<&Path>) -> Result<FontVec> {
    if let Some(path) = explicit {
        return read_font(path);
    }
    if let Some(path) = std::env::var_os(FONT_ENV) {
        return read_font(Path::new(&path));
    }
    for candidate in SYSTEM_FONTS.iter().map(Path::new) {
        if !candidate.is_file() {
            continue;
        }
        match read_font(candidate) {
            Ok(font) => return Ok(font),
            Err(e) => debug!(path = %candidate.display(), error = %e, "skipping font"),
        }
    }
    bail!("no usable font found; pass --font or set {FONT_ENV}")
}

fn read_font(path: &Path) -> Result<FontVec> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
    let font = FontVec::try_from_vec(bytes)
        .with_context(|| format!("parsing font {}", path.display()))?;
    info!(path = %path.display(), "font loaded");
    Ok(font)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_missing_path_is_an_error() {
        let err = load_font(Some(Path::new("/nonexistent/font.ttf"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/font.ttf"));
    }

    #[test]
    fn explicit_path_wins_over_search() {
        // a readable file that is not a font must fail rather than fall back
        let manifest = Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml");
        let err = load_font(Some(&manifest)).unwrap_err();
        assert!(err.to_string().starts_with("parsing font"));
    }
}
