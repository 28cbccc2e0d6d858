use anyhow::{anyhow, Context, Result};
use causex_core::{Key, Screen};
use causex_experiment::{
    ExperimentConfig, ExperimentEvent, ExperimentPlan, ExperimentStateMachine, ExportOutcome,
    OrbitFactory, CSV_VALUE_ENCODING,
};
use causex_render::{load_font, FontVec, SkiaRenderer};
use causex_timing::{FramePacer, HighPrecisionTimer, Timer};
use pixels::{Pixels, SurfaceTexture};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key as WinitKey, NamedKey},
    window::{Fullscreen, Window, WindowId},
};

use crate::cli::Args;

type Session = ExperimentStateMachine<OrbitFactory<StdRng>, HighPrecisionTimer>;

pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<SkiaRenderer>,
    /// Handed to the renderer once the window exists
    font: Option<FontVec>,
    session: Session,
    pacer: FramePacer<HighPrecisionTimer>,
    output_dir: PathBuf,
    windowed: bool,
    scale_factor: f64,
    refresh_rate: Option<f64>,
    exported: bool,
    should_exit: bool,
}

impl App {
    pub fn new(args: &Args) -> Result<Self> {
        let config = match &args.config {
            Some(path) => ExperimentConfig::from_json_file(path)?,
            None => ExperimentConfig::default(),
        };
        config.validate()?;
        let seed = args.seed.or(config.seed);
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let plan = ExperimentPlan::generate(&config, &mut rng);
        let participant = args
            .participant
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        std::fs::create_dir_all(&args.output_dir).with_context(|| {
            format!("creating output directory {}", args.output_dir.display())
        })?;
        let font = load_font(args.font.as_deref())?;

        info!(
            %participant,
            ?seed,
            order = ?plan.block_order(),
            training = plan.training().len(),
            "session prepared"
        );

        let timer = HighPrecisionTimer::new();
        let pacer = FramePacer::new(timer.clone(), config.frame_rate_hz);
        let mut session =
            ExperimentStateMachine::new(config, plan, OrbitFactory::new(rng), timer, participant)?;
        if let Some(name) = &args.name {
            session = session.with_participant_name(name.clone());
        }

        Ok(Self {
            window: None,
            pixels: None,
            renderer: None,
            font: Some(font),
            session,
            pacer,
            output_dir: args.output_dir.clone(),
            windowed: args.windowed,
            scale_factor: 1.0,
            refresh_rate: None,
            exported: false,
            should_exit: false,
        })
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        info!(
            platform = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            "press SPACE to start or ESC to exit"
        );
        event_loop.run_app(&mut self)?;
        Ok(())
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let primary_monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow!("no monitor available"))?;

        self.refresh_rate = primary_monitor
            .refresh_rate_millihertz()
            .map(|rate| rate as f64 / 1000.0);

        let mut window_attributes = Window::default_attributes().with_title("Causex");
        window_attributes = if self.windowed {
            window_attributes.with_inner_size(LogicalSize::new(800.0, 600.0))
        } else {
            window_attributes
                .with_fullscreen(Some(Fullscreen::Borderless(Some(primary_monitor))))
                .with_resizable(false)
        };

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let physical_size = window.inner_size();
        self.scale_factor = window.scale_factor();

        info!(
            width = physical_size.width,
            height = physical_size.height,
            scale_factor = self.scale_factor,
            refresh_hz = ?self.refresh_rate,
            "display configured"
        );

        let surface_texture =
            SurfaceTexture::new(physical_size.width, physical_size.height, window.clone());
        self.pixels = Some(Pixels::new(
            physical_size.width,
            physical_size.height,
            surface_texture,
        )?);

        let font = self
            .font
            .take()
            .ok_or_else(|| anyhow!("renderer already created"))?;
        self.renderer = Some(SkiaRenderer::new(
            physical_size.width,
            physical_size.height,
            font,
        )?);

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    /// One tick: advance the session, draw it, then hold the frame rate.
    fn frame(&mut self) -> Result<()> {
        let events = self.session.update();
        log_events(&events);
        self.render()?;
        self.pacer.wait_next();
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let (Some(pixels), Some(renderer)) = (self.pixels.as_mut(), self.renderer.as_mut()) else {
            return Ok(());
        };

        let scene = self.session.scene();
        let status = self.session.status_line();
        let stats = renderer.render_frame(&scene, Some(&status), pixels.frame_mut())?;

        let t = self.session.timer.now();
        pixels.render()?;
        let present = self.session.timer.elapsed(t);

        trace!(
            present_ms = present.as_secs_f64() * 1e3,
            clear_ms = stats.clear.as_secs_f64() * 1e3,
            draw_ms = stats.draw.as_secs_f64() * 1e3,
            copy_ms = stats.copy.as_secs_f64() * 1e3,
            total_ms = stats.total.as_secs_f64() * 1e3,
            dirty = stats.dirty_count,
            "frame"
        );
        Ok(())
    }

    fn handle_key(&mut self, key: Key, event_loop: &ActiveEventLoop) {
        match key {
            Key::Escape => self.cleanup_and_exit(event_loop),
            Key::Enter if self.session.screen() == Screen::End => self.export(),
            key => {
                let events = self.session.handle_key(key);
                log_events(&events);
            }
        }
    }

    fn export(&mut self) {
        let results = self.session.results();
        let participant = self.session.participant_id();

        match results.export_csv(&self.output_dir, participant) {
            Ok(ExportOutcome::Written { path, rows }) => {
                info!(
                    path = %path.display(),
                    rows,
                    encoding = CSV_VALUE_ENCODING,
                    "results saved"
                );
                self.exported = true;
            }
            Ok(ExportOutcome::NothingToExport) => {
                warn!("no results to export");
                return;
            }
            Err(e) => {
                error!(error = %e, "csv export failed");
                return;
            }
        }
        if let Err(e) = results.export_json(&self.output_dir, participant) {
            error!(error = %e, "json export failed");
        }
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                error!(error = %e, "failed to resize surface");
            }
            if let Err(e) = pixels.resize_buffer(new_size.width, new_size.height) {
                error!(error = %e, "failed to resize buffer");
            }
        }
        if let Some(renderer) = &mut self.renderer {
            if let Err(e) = renderer.resize(new_size.width, new_size.height) {
                error!(error = %e, "failed to resize renderer");
            }
        }
        debug!(
            width = new_size.width,
            height = new_size.height,
            scale_factor = self.scale_factor,
            "display resized"
        );
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            return;
        }
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
        if !self.exported && !self.session.results().is_empty() {
            self.export();
        }

        let frames = self.pacer.timer().calibration_stats();
        info!(
            avg_frame_ms = frames.average_frame_time_ns / 1e6,
            jitter_ms = frames.jitter_ns / 1e6,
            max_frame_ms = frames.max_frame_time_ns / 1e6,
            fps = frames.effective_fps,
            "frame pacing"
        );
        if let Some(renderer) = &self.renderer {
            let draw = renderer.draw_stats();
            info!(
                avg_draw_ms = draw.average_frame_time_ns / 1e6,
                max_draw_ms = draw.max_frame_time_ns / 1e6,
                "draw timing"
            );
        }
        if let Some(e) = self.session.failure() {
            warn!(error = %e, "session ended early");
        }
        info!(
            records = self.session.results().len(),
            screen = self.session.screen().label(),
            "exiting"
        );

        self.should_exit = true;
        event_loop.exit();
    }
}

fn log_events(events: &[ExperimentEvent]) {
    for event in events {
        match event {
            ExperimentEvent::ScreenChanged { from, to } => {
                info!(from = from.label(), to = to.label(), "screen")
            }
            ExperimentEvent::Aborted(reason) => warn!(%reason, "session aborted"),
            other => trace!(event = ?other),
        }
    }
}

/// Maps a logical key to the session's key model.
pub fn map_key(key: &WinitKey) -> Key {
    match key {
        WinitKey::Named(NamedKey::Space) => Key::Space,
        WinitKey::Named(NamedKey::Enter) => Key::Enter,
        WinitKey::Named(NamedKey::Escape) => Key::Escape,
        WinitKey::Character(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(' '), None) => Key::Space,
                (Some(c), None) => Key::Char(c),
                _ => Key::Other,
            }
        }
        _ => Key::Other,
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                error!(error = %e, "failed to create window and surface");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.cleanup_and_exit(event_loop),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.frame() {
                    error!(error = %e, "frame failed");
                    self.cleanup_and_exit(event_loop);
                    return;
                }
                if let Some(win) = &self.window {
                    win.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() && !event.repeat => {
                let key = map_key(&event.logical_key);
                self.handle_key(key, event_loop);
            }
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.scale_factor = scale_factor;
                if let Some(window) = &self.window {
                    self.handle_resize(window.inner_size());
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
        }
    }
}
