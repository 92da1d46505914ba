use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::config::SimulationConfig;
use crate::error::Error;
use crate::gpu::wgpu_backend::WgpuBackend;
use crate::rendering::pipeline::GravityPipeline;
use crate::simulation::params::SimulationParams;
use crate::simulation::presets::PresetKind;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Action {
    SpeedUp,
    SlowDown,
    StrongerGravity,
    WeakerGravity,
    Freeze,
    NextPreset,
    Restart,
    Quit,
}

fn key_action(key_code: KeyCode) -> Option<Action> {
    match key_code {
        KeyCode::ArrowUp => Some(Action::SpeedUp),
        KeyCode::ArrowDown => Some(Action::SlowDown),
        KeyCode::BracketRight => Some(Action::StrongerGravity),
        KeyCode::BracketLeft => Some(Action::WeakerGravity),
        KeyCode::Digit0 | KeyCode::Numpad0 => Some(Action::Freeze),
        KeyCode::KeyN => Some(Action::NextPreset),
        KeyCode::KeyR => Some(Action::Restart),
        KeyCode::Escape => Some(Action::Quit),
        _ => None,
    }
}

/// New params for a parameter action, `None` for anything else.
fn adjust_params(action: Action, params: SimulationParams) -> Option<SimulationParams> {
    let mut params = params;
    match action {
        Action::SpeedUp => params.delta_t *= 2.0,
        Action::SlowDown => params.delta_t *= 0.5,
        Action::StrongerGravity => params.gravitational_constant *= 2.0,
        Action::WeakerGravity => params.gravitational_constant *= 0.5,
        Action::Freeze => params.delta_t = 0.0,
        Action::NextPreset | Action::Restart | Action::Quit => return None,
    }
    Some(params)
}

pub struct App {
    config: SimulationConfig,
    preset: PresetKind,
    window: Option<Arc<Window>>,
    pipeline: Option<GravityPipeline<WgpuBackend>>,
    fatal: Option<anyhow::Error>,
}

impl App {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            preset: config.preset,
            config,
            window: None,
            pipeline: None,
            fatal: None,
        }
    }

    /// Fresh device, buffers, bindings and scheduler for the current preset.
    fn rebuild(&mut self, window: &Arc<Window>) -> Result<(), Error> {
        // The old surface must be gone before a new one is created on the same window
        self.pipeline = None;

        let backend = pollster::block_on(WgpuBackend::for_window(window.clone(), self.config.vsync))?;
        let entities = self.config.entities(self.preset);
        let mut pipeline =
            GravityPipeline::new(backend, &entities, self.config.params, self.config.render_scale)?;
        pipeline.start();

        let preset = self.preset.preset();
        log::info!("Running preset {}: {}", preset.name(), preset.description());
        self.pipeline = Some(pipeline);
        self.update_title(window);
        Ok(())
    }

    fn update_title(&self, window: &Window) {
        window.set_title(&format!(
            "Gravity Sprites - {} - dt={} G={}",
            self.preset.preset().name(),
            self.config.params.delta_t,
            self.config.params.gravitational_constant
        ));
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: impl Into<anyhow::Error>) {
        let error = error.into();
        log::error!("{error:#}");
        self.fatal = Some(error);
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop, window: &Arc<Window>) {
        let Some(pipeline) = self.pipeline.as_mut() else {
            return;
        };

        match pipeline.tick() {
            Ok(()) => {}
            Err(error) if error.is_skipped_frame() => {
                log::warn!("Skipping frame: {error}");
            }
            Err(error) if error.is_device_lost() => {
                log::error!("{error}, rebuilding the pipeline");
                if let Err(error) = self.rebuild(window) {
                    self.fail(event_loop, error);
                    return;
                }
            }
            Err(error) => {
                self.fail(event_loop, error);
                return;
            }
        }

        window.request_redraw();
    }

    fn handle_action(&mut self, event_loop: &ActiveEventLoop, window: &Arc<Window>, action: Action) {
        if let Some(params) = adjust_params(action, self.config.params) {
            if let Some(pipeline) = self.pipeline.as_mut() {
                if let Err(error) = pipeline.update_params(params) {
                    log::warn!("Ignoring parameter change: {error}");
                    return;
                }
            }
            self.config.params = params;
            self.update_title(window);
            return;
        }

        let result = match action {
            Action::NextPreset => {
                self.preset = self.preset.next();
                self.rebuild(window)
            }
            Action::Restart => self.rebuild(window),
            Action::Quit => {
                event_loop.exit();
                Ok(())
            }
            _ => Ok(()),
        };
        if let Err(error) = result {
            self.fail(event_loop, error);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let [width, height] = self.config.window_size;
        let attributes = Window::default_attributes()
            .with_title("Gravity Sprites")
            .with_inner_size(PhysicalSize::new(width, height));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(error) => {
                self.fail(event_loop, anyhow::Error::new(error).context("creating window"));
                return;
            }
        };

        if let Err(error) = self.rebuild(&window) {
            self.fail(event_loop, error);
            return;
        }

        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.clone() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested; stopping");
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop, &window),
            WindowEvent::Resized(size) => {
                // Surface only; sprite geometry keeps the aspect ratio it was built with
                if let Some(pipeline) = self.pipeline.as_mut() {
                    pipeline.backend_mut().resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key_code),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                if let Some(action) = key_action(key_code) {
                    self.handle_action(event_loop, &window, action);
                }
            }
            _ => (),
        }
    }
}

pub fn run(config: SimulationConfig) -> anyhow::Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.fatal.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
