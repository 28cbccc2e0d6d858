use ab_glyph::{point, Font, FontVec, Glyph, PxScale, ScaleFont};
use anyhow::{bail, Context, Result};
use bytemuck::{cast_slice, cast_slice_mut};
use causex_core::{Rgba, Scene};
use causex_timing::{CalibrationStats, HighPrecisionTimer, Timer};
use rand::Rng;
use std::collections::{HashMap, VecDeque};
use std::f32::consts::TAU;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;
use string_cache::DefaultAtom as Atom;
use tiny_skia::{Paint, PathBuilder, Pixmap, PremultipliedColorU8, Rect, Stroke, Transform};

use crate::layout::{scene_rows, Align, CanvasTransform, TextRow};

const BACKGROUND: [u8; 4] = [0, 0, 0, 255];
const SPARK_YELLOW: Rgba = [255, 255, 0, 255];
const SPARK_ORANGE: Rgba = [255, 165, 0, 255];
/// Longest spark, in canvas units
const SPARK_REACH: f32 = 30.0;
/// Entries kept before the oldest is evicted
const TEXT_CACHE_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TextKey {
    text: Atom,
    size_px: u32,
    color: Rgba,
}

/// Rasterized text keyed by content, pixel size and colour. Digits and
/// letters repeat every frame, so most lookups hit. Evicts in insertion
/// order once full.
struct TextCache {
    font: FontVec,
    map: HashMap<TextKey, Arc<Pixmap>>,
    order: VecDeque<TextKey>,
    capacity: usize,
}

impl TextCache {
    fn new(font: FontVec) -> Self {
        Self::with_capacity(font, TEXT_CACHE_CAPACITY)
    }

    fn with_capacity(font: FontVec, capacity: usize) -> Self {
        Self {
            font,
            map: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    fn get_or_render(&mut self, text: &str, size_px: f32, color: Rgba) -> Option<Arc<Pixmap>> {
        let key = TextKey {
            text: Atom::from(text),
            size_px: size_px.round().max(1.0) as u32,
            color,
        };
        if let Some(p) = self.map.get(&key) {
            return Some(Arc::clone(p));
        }
        let pm = Arc::new(render_text_pixmap(
            text,
            key.size_px as f32,
            &self.font,
            color,
        )?);
        while self.map.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.map.remove(&oldest);
        }
        self.order.push_back(key.clone());
        self.map.insert(key, Arc::clone(&pm));
        Some(pm)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.map.len()
    }

    fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }
}

/// Rasterizes a single line into a tight, premultiplied pixmap. Returns
/// `None` when nothing in `text` has an outline (empty or whitespace).
pub fn render_text_pixmap<F: Font>(
    text: &str,
    font_size: f32,
    font: &F,
    color: Rgba,
) -> Option<Pixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);

    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::with_capacity(text.len());
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    let outlines: Vec<_> = glyphs
        .into_iter()
        .filter_map(|g| font.outline_glyph(g))
        .collect();
    if outlines.is_empty() {
        return None;
    }

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for out in &outlines {
        let b = out.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    let mut pm = Pixmap::new(w, h)?;
    let stride = w as usize;
    let dst = pm.pixels_mut();

    for out in &outlines {
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + b.min.x - min_x).floor() as i32;
            let iy = (y as f32 + b.min.y - min_y).floor() as i32;
            if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                return;
            }
            let i = iy as usize * stride + ix as usize;

            let a = (cov * color[3] as f32 / 255.0).clamp(0.0, 1.0);
            let sa = (a * 255.0) as u8;
            let bg = dst[i];
            // source over, premultiplied
            let inv = 1.0 - a;
            let blend = |s: u8, d: u8| ((s as f32 * a) as u8).saturating_add((d as f32 * inv) as u8);
            let px = PremultipliedColorU8::from_rgba(
                blend(color[0], bg.red()),
                blend(color[1], bg.green()),
                blend(color[2], bg.blue()),
                sa.saturating_add((bg.alpha() as f32 * inv) as u8),
            );
            if let Some(px) = px {
                dst[i] = px;
            }
        });
    }

    Some(pm)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub clear: Duration,
    pub draw: Duration,
    pub copy: Duration,
    pub total: Duration,
    pub dirty_count: usize,
}

/// Software renderer drawing [`Scene`]s into an RGBA frame buffer.
///
/// Draws go to an opaque offscreen canvas. Only the rectangles touched on
/// this frame or the previous one are cleared and copied out, so the frame
/// buffer must persist between calls.
pub struct SkiaRenderer {
    width: u32,
    height: u32,
    transform: CanvasTransform,
    text_cache: TextCache,
    canvas: Pixmap,
    dirty_regions: Vec<Rect>,
    first_frame: bool,
    clear_buffer: Vec<u8>,
    clock: HighPrecisionTimer,
}

impl SkiaRenderer {
    pub fn new(width: u32, height: u32, font: FontVec) -> Result<Self> {
        let (canvas, clear_buffer) = blank_canvas(width, height)?;
        Ok(Self {
            width,
            height,
            transform: CanvasTransform::fit(width, height),
            text_cache: TextCache::new(font),
            canvas,
            dirty_regions: Vec::with_capacity(16),
            first_frame: true,
            clear_buffer,
            clock: HighPrecisionTimer::new(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let (canvas, clear_buffer) = blank_canvas(width, height)?;
        self.width = width;
        self.height = height;
        self.transform = CanvasTransform::fit(width, height);
        self.canvas = canvas;
        self.clear_buffer = clear_buffer;
        self.dirty_regions.clear();
        // glyph sizes follow the scale
        self.text_cache.clear();
        self.first_frame = true;
        Ok(())
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Draw-time distribution over recent frames
    pub fn draw_stats(&self) -> CalibrationStats {
        self.clock.calibration_stats()
    }

    pub fn render_frame(
        &mut self,
        scene: &Scene,
        status: Option<&str>,
        frame_buffer: &mut [u8],
    ) -> Result<FrameStats> {
        if frame_buffer.len() != self.clear_buffer.len() {
            bail!(
                "frame buffer is {} bytes, expected {} for {}x{}",
                frame_buffer.len(),
                self.clear_buffer.len(),
                self.width,
                self.height
            );
        }
        if self.first_frame {
            self.first_frame = false;
            self.canvas.data_mut().copy_from_slice(&self.clear_buffer);
            frame_buffer.copy_from_slice(&self.clear_buffer);
            self.dirty_regions.clear();
        }

        let old_dirty = std::mem::take(&mut self.dirty_regions);

        let t = self.clock.now();
        self.clear_dirty(&old_dirty);
        let t_clear = self.clock.elapsed(t);

        let t = self.clock.now();
        self.draw_scene(scene, status);
        let t_draw = self.clock.elapsed(t);

        let mut present = old_dirty;
        present.extend_from_slice(&self.dirty_regions);
        coalesce_dirty(&mut present);

        let t = self.clock.now();
        for rect in &present {
            self.copy_dirty_region(*rect, frame_buffer);
        }
        let t_copy = self.clock.elapsed(t);

        self.clock.record_frame(t_draw);
        Ok(FrameStats {
            clear: t_clear,
            draw: t_draw,
            copy: t_copy,
            total: t_clear + t_draw + t_copy,
            dirty_count: self.dirty_regions.len(),
        })
    }

    fn draw_scene(&mut self, scene: &Scene, status: Option<&str>) {
        for row in scene_rows(scene) {
            self.draw_text(&row);
        }
        if let Scene::Objects {
            burst_at: Some(anchor),
            ..
        } = scene
        {
            self.draw_sparks(*anchor);
        }
        if let Some(status) = status {
            self.draw_text(&TextRow::status(status));
        }
    }

    fn draw_text(&mut self, row: &TextRow) {
        let size_px = row.size * self.transform.scale;
        let Some(pm) = self.text_cache.get_or_render(&row.text, size_px, row.color) else {
            return;
        };
        let (x, y) = self.transform.apply(row.pos);
        let left = match row.align {
            Align::Center => x - pm.width() as f32 * 0.5,
            Align::Left => x,
        };
        let top = y - pm.height() as f32 * 0.5;
        self.blit_pixmap(&pm, left as i32, top as i32);
    }

    fn draw_sparks(&mut self, anchor: (f32, f32)) {
        let origin = self.transform.apply(anchor);
        let scale = self.transform.scale;
        let mut rng = rand::rng();
        self.stroke_sparks(&mut rng, origin, 8, 10.0..30.0, SPARK_YELLOW);
        self.stroke_sparks(&mut rng, origin, 5, 5.0..20.0, SPARK_ORANGE);

        let reach = SPARK_REACH * scale + 2.0 * scale + 1.0;
        if let Some(r) = self.clip_rect(origin.0 - reach, origin.1 - reach, 2.0 * reach, 2.0 * reach) {
            self.dirty_regions.push(r);
        }
    }

    fn stroke_sparks<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        (x, y): (f32, f32),
        count: usize,
        lengths: Range<f32>,
        color: Rgba,
    ) {
        let scale = self.transform.scale;
        let mut pb = PathBuilder::new();
        for _ in 0..count {
            let angle = rng.random_range(0.0..TAU);
            let len = rng.random_range(lengths.clone()) * scale;
            pb.move_to(x, y);
            pb.line_to(x + angle.cos() * len, y + angle.sin() * len);
        }
        let Some(path) = pb.finish() else {
            return;
        };
        let mut paint = Paint::default();
        paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
        let stroke = Stroke {
            width: 2.0 * scale,
            ..Stroke::default()
        };
        self.canvas
            .stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    fn clip_rect(&self, x: f32, y: f32, w: f32, h: f32) -> Option<Rect> {
        Rect::from_ltrb(
            x.max(0.0),
            y.max(0.0),
            (x + w).min(self.width as f32),
            (y + h).min(self.height as f32),
        )
    }

    /// Composites `pm` with its top-left corner at (`x`, `y`), clipped to
    /// the canvas.
    fn blit_pixmap(&mut self, pm: &Pixmap, x: i32, y: i32) {
        let (w, h) = (pm.width() as i32, pm.height() as i32);
        let (cw, ch) = (self.width as i32, self.height as i32);
        if x + w <= 0 || y + h <= 0 || x >= cw || y >= ch {
            return;
        }

        let dst_x = x.max(0) as usize;
        let dst_y = y.max(0) as usize;
        let src_x = (-x).max(0) as usize;
        let src_y = (-y).max(0) as usize;
        let copy_w = (w as usize - src_x).min(cw as usize - dst_x);
        let copy_h = (h as usize - src_y).min(ch as usize - dst_y);
        let src_stride = pm.width() as usize;
        let dst_stride = self.width as usize;

        let src: &[u32] = cast_slice(pm.data());
        let dst: &mut [u32] = cast_slice_mut(self.canvas.data_mut());

        for row in 0..copy_h {
            let s_off = (src_y + row) * src_stride + src_x;
            let d_off = (dst_y + row) * dst_stride + dst_x;
            let s_row = &src[s_off..s_off + copy_w];
            let d_row = &mut dst[d_off..d_off + copy_w];
            for (d, &s) in d_row.iter_mut().zip(s_row) {
                *d = blend_over(s, *d);
            }
        }

        if let Some(r) = Rect::from_xywh(dst_x as f32, dst_y as f32, copy_w as f32, copy_h as f32) {
            self.dirty_regions.push(r);
        }
    }

    fn clear_dirty(&mut self, dirty: &[Rect]) {
        let stride = self.width as usize * 4;
        let data = self.canvas.data_mut();
        for rect in dirty {
            let (x0, y0, x1, y1) = pixel_bounds(*rect, self.width, self.height);
            if x1 <= x0 || y1 <= y0 {
                continue;
            }
            for y in y0..y1 {
                let off = y * stride + x0 * 4;
                let len = (x1 - x0) * 4;
                data[off..off + len].copy_from_slice(&self.clear_buffer[off..off + len]);
            }
        }
    }

    fn copy_dirty_region(&self, dirty: Rect, frame_buffer: &mut [u8]) {
        let (x0, y0, x1, y1) = pixel_bounds(dirty, self.width, self.height);
        if x1 <= x0 || y1 <= y0 {
            return;
        }
        let stride = self.width as usize * 4;
        let data = self.canvas.data();
        for y in y0..y1 {
            let off = y * stride + x0 * 4;
            let len = (x1 - x0) * 4;
            frame_buffer[off..off + len].copy_from_slice(&data[off..off + len]);
        }
    }
}

fn blank_canvas(width: u32, height: u32) -> Result<(Pixmap, Vec<u8>)> {
    let mut canvas = Pixmap::new(width, height)
        .with_context(|| format!("cannot allocate a {width}x{height} canvas"))?;
    let clear: Vec<u8> = BACKGROUND
        .iter()
        .copied()
        .cycle()
        .take(width as usize * height as usize * 4)
        .collect();
    canvas.data_mut().copy_from_slice(&clear);
    Ok((canvas, clear))
}

/// Premultiplied source-over on packed little-endian RGBA
fn blend_over(s: u32, d: u32) -> u32 {
    let sa = s >> 24;
    if sa == 255 {
        return s;
    }
    if sa == 0 {
        return d;
    }
    let inv = 255 - sa;
    let channel = |shift: u32| {
        let sc = (s >> shift) & 0xFF;
        let dc = (d >> shift) & 0xFF;
        (sc + (dc * inv + 127) / 255).min(255) << shift
    };
    channel(0) | channel(8) | channel(16) | channel(24)
}

fn pixel_bounds(r: Rect, width: u32, height: u32) -> (usize, usize, usize, usize) {
    let (w, h) = (width as f32, height as f32);
    (
        r.x().floor().clamp(0.0, w) as usize,
        r.y().floor().clamp(0.0, h) as usize,
        (r.x() + r.width()).ceil().clamp(0.0, w) as usize,
        (r.y() + r.height()).ceil().clamp(0.0, h) as usize,
    )
}

/// Merges rectangles that share a row band and touch horizontally.
fn coalesce_dirty(rects: &mut Vec<Rect>) {
    rects.sort_by(|a, b| a.y().total_cmp(&b.y()).then(a.x().total_cmp(&b.x())));
    let mut out: Vec<Rect> = Vec::with_capacity(rects.len());
    for r in rects.drain(..) {
        if let Some(last) = out.last_mut() {
            let same_row =
                (r.y() - last.y()).abs() < 1.0 && (r.height() - last.height()).abs() < 1.0;
            let touching = r.x() <= last.x() + last.width() + 1.0;
            if same_row && touching {
                let left = last.x().min(r.x());
                let right = last.right().max(r.right());
                if let Some(merged) = Rect::from_ltrb(left, last.y(), right, last.bottom()) {
                    *last = merged;
                    continue;
                }
            }
        }
        out.push(r);
    }
    *rects = out;
}
