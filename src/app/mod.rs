//! winit application shell: window lifecycle, event routing between egui and
//! the orbit controls, and frame pacing against the monitor refresh rate.

mod egui_host;
mod input;
mod timing;

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::config::{self, ViewerConfig};
use crate::ui::FlagPanel;
use crate::viewer::ViewerSession;
use egui_host::EguiHost;
use input::{OrbitGesture, PointerState};
use timing::FrameClock;

const WINDOW_TITLE: &str = "flagviz";
const CONFIG_FILE: &str = "flagviz.json";

pub struct App {
    config: ViewerConfig,
    window: Option<Arc<Window>>,
    session: Option<ViewerSession>,
    egui: Option<EguiHost>,
    ui: FlagPanel,
    pointer: PointerState,
    clock: FrameClock,
    target_frame_duration: Duration,
    next_frame_time: Instant,
}

impl App {
    fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            window: None,
            session: None,
            egui: None,
            ui: FlagPanel::default(),
            pointer: PointerState::default(),
            clock: FrameClock::new(WINDOW_TITLE.to_string()),
            target_frame_duration: Duration::from_millis(16),
            next_frame_time: Instant::now(),
        }
    }

    fn update_target_frame_duration(&mut self, window: &Window) {
        let mut target = Duration::from_millis(16);
        if let Some(monitor) = window.current_monitor() {
            if let Some(millihz) = monitor.refresh_rate_millihertz() {
                let hz = millihz as f32 / 1000.0;
                if hz > 1.0 {
                    target = Duration::from_secs_f32(1.0 / hz);
                }
            }
        }
        self.target_frame_duration = target;
        self.next_frame_time = Instant::now() + self.target_frame_duration;
    }

    fn apply_gesture(&mut self, gesture: OrbitGesture) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let controls = session.controls_mut();
        match gesture {
            OrbitGesture::Rotate { dx, dy } => controls.rotate(dx, dy),
            OrbitGesture::Pan { dx, dy } => controls.pan(dx, dy),
            OrbitGesture::Zoom { amount } => controls.zoom(amount),
        }
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(session) = self.session.as_mut() {
            session.dispose();
        }
        event_loop.exit();
    }

    fn redraw(&mut self) {
        let Self {
            window: Some(window),
            session: Some(session),
            egui: Some(egui),
            ui,
            clock,
            ..
        } = self
        else {
            return;
        };

        clock.update(Some(window.as_ref()), Instant::now());
        let dt = clock.frame_dt;

        let state = session.state();
        let mut picked = None;
        let ui_output = egui.run_ui(window, |ctx| {
            picked = ui.show(ctx, state);
        });
        if let Some(entry) = picked {
            session.on_flag_change(entry.file);
        }

        let mut ui_output = Some(ui_output);
        session.frame(dt, &mut |device, queue, encoder, view| {
            if let Some(frame) = ui_output.take() {
                egui.paint(device, queue, encoder, view, frame);
            }
        });
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = WindowAttributes::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size(PhysicalSize::new(1280u32, 720u32))
            .with_resizable(true);
        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("window creation failed: {err}");
                event_loop.exit();
                return;
            }
        };

        match ViewerSession::mount(window.clone(), self.config.clone()) {
            Ok(session) => {
                self.egui = Some(EguiHost::new(
                    &window,
                    session.device(),
                    session.surface_format(),
                ));
                self.session = Some(session);
            }
            Err(err) => {
                log::error!("viewer mount failed: {err}");
                event_loop.exit();
                return;
            }
        }

        self.update_target_frame_duration(&window);
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let consumed = match (&self.window, &mut self.egui) {
            (Some(window), Some(egui)) => egui.on_window_event(window, &event),
            _ => false,
        };

        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                    && event.state.is_pressed()
                {
                    self.shutdown(event_loop);
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.pointer.shift = modifiers.state().shift_key();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(session) = self.session.as_mut() {
                    session.resize(new_size.width, new_size.height);
                }
                if let Some(window) = self.window.clone() {
                    self.update_target_frame_duration(&window);
                }
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                if let (Some(window), Some(session)) = (&self.window, self.session.as_mut()) {
                    let size = window.inner_size();
                    session.resize(size.width, size.height);
                }
            }
            WindowEvent::Moved(_) => {
                if let Some(window) = self.window.clone() {
                    self.update_target_frame_duration(&window);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let gesture = self
                    .pointer
                    .on_cursor_moved(position.x as f32, position.y as f32);
                if !consumed {
                    if let Some(gesture) = gesture {
                        self.apply_gesture(gesture);
                    }
                }
            }
            WindowEvent::CursorLeft { .. } => self.pointer.on_cursor_left(),
            WindowEvent::MouseInput { state, button, .. } => {
                self.pointer.on_button(button, state);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if !consumed {
                    let gesture = self.pointer.on_scroll(delta);
                    self.apply_gesture(gesture);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        if now >= self.next_frame_time {
            let running = self.session.as_ref().is_some_and(|s| s.is_running());
            if let (Some(window), true) = (&self.window, running) {
                window.request_redraw();
            }
            self.next_frame_time = now + self.target_frame_duration;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame_time));
    }
}

pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config_path = Path::new(CONFIG_FILE);
    let config = match config::load_config(config_path) {
        Ok(config) => config,
        Err(config::ConfigError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            ViewerConfig::default()
        }
        Err(err) => {
            log::warn!("config load failed ({err}), using defaults");
            ViewerConfig::default()
        }
    };

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            log::error!("event loop creation failed: {err}");
            return;
        }
    };
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);
    if let Err(err) = event_loop.run_app(&mut app) {
        log::error!("event loop error: {err}");
    }
}
