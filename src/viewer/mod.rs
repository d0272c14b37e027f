//! Viewer session: owns the render context, the loaded scene, and the
//! lifecycle around asynchronous asset loads and flag texture swaps.
//!
//! Flag selection is last-writer-wins. A selection made before the model
//! finishes importing is buffered (newest replaces older) and applied once
//! the flag mesh exists. Swaps already decoding are never cancelled; each
//! result is bound in arrival order, so the final state matches the final
//! request. After `dispose` the load channel receiver is gone and any straggler
//! results are dropped by the senders.

use std::path::Path;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;

use winit::window::Window;

use crate::assets::{self, LoadEvent, TextureImage};
use crate::config::ViewerConfig;
use crate::render::environment::{EnvironmentMap, EnvironmentPrefilter};
use crate::render::model::{GpuModel, GpuTexture};
use crate::render::{FrameParams, OrbitController, PerspectiveCamera, RenderContext, RenderError};
use crate::scene::animation::Mixer;
use crate::scene::Model;

/// Surface overrides applied with every flag texture: plain white tint so
/// the image shows unmodified, matte cloth response.
const FLAG_TINT: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
const FLAG_ROUGHNESS: f32 = 0.8;
const FLAG_METALNESS: f32 = 0.0;

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("renderer initialization failed: {0}")]
    Render(#[from] RenderError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerState {
    /// Model import still in flight; the loop renders the empty scene.
    Initializing,
    Ready,
    /// At least one flag texture swap is in flight.
    Mutating,
    Disposed,
}

/// Buffer for a flag chosen before the model is ready. Newest selection wins.
#[derive(Debug, Default)]
pub struct SelectionState {
    pending: Option<String>,
}

impl SelectionState {
    pub fn select(&mut self, file: &str) {
        self.pending = Some(file.to_string());
    }

    pub fn take(&mut self) -> Option<String> {
        self.pending.take()
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }
}

pub struct ViewerSession {
    config: ViewerConfig,
    render: RenderContext,
    camera: PerspectiveCamera,
    controls: OrbitController,
    model: Option<Model>,
    gpu_model: Option<GpuModel>,
    flag_mesh: Option<usize>,
    mixer: Mixer,
    environment: Option<EnvironmentMap>,
    selection: SelectionState,
    swaps_in_flight: u32,
    events_tx: Sender<LoadEvent>,
    events_rx: Option<Receiver<LoadEvent>>,
    disposed: bool,
}

impl ViewerSession {
    /// Create the GPU context and kick off the model and environment loads.
    pub fn mount(window: Arc<Window>, config: ViewerConfig) -> Result<Self, ViewerError> {
        let size = window.inner_size();
        let render = RenderContext::new(window)?;
        let mut camera =
            PerspectiveCamera::new(config.fov_y_deg, 1.0, config.z_near, config.z_far);
        camera.set_aspect(size.width, size.height);

        let (events_tx, events_rx) = assets::load_channel();
        assets::spawn_model_load(events_tx.clone(), config.model_path());
        assets::spawn_environment_load(events_tx.clone(), config.environment_path());

        Ok(Self {
            config,
            render,
            camera,
            controls: OrbitController::default(),
            model: None,
            gpu_model: None,
            flag_mesh: None,
            mixer: Mixer::default(),
            environment: None,
            selection: SelectionState::default(),
            swaps_in_flight: 0,
            events_tx,
            events_rx: Some(events_rx),
            disposed: false,
        })
    }

    pub fn state(&self) -> ViewerState {
        if self.disposed {
            ViewerState::Disposed
        } else if self.model.is_none() {
            ViewerState::Initializing
        } else if self.swaps_in_flight > 0 {
            ViewerState::Mutating
        } else {
            ViewerState::Ready
        }
    }

    pub fn is_running(&self) -> bool {
        !self.disposed
    }

    pub fn controls_mut(&mut self) -> &mut OrbitController {
        &mut self.controls
    }

    pub fn device(&self) -> &wgpu::Device {
        self.render.device()
    }

    pub fn queue(&self) -> &wgpu::Queue {
        self.render.queue()
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.render.surface_format()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if self.disposed {
            return;
        }
        self.camera.set_aspect(width, height);
        self.render.resize(width, height);
    }

    /// Request a flag texture by catalog file name. Buffered until the flag
    /// mesh exists; otherwise a decode worker is started immediately.
    pub fn on_flag_change(&mut self, file: &str) {
        if self.disposed {
            return;
        }
        if self.flag_mesh.is_none() {
            log::info!("flag '{file}' selected before model ready, buffering");
            self.selection.select(file);
            return;
        }
        self.swaps_in_flight += 1;
        assets::spawn_flag_texture_load(
            self.events_tx.clone(),
            file.to_string(),
            self.config.flag_texture_path(file),
        );
    }

    /// Advance one frame: drain finished loads, step camera inertia and
    /// animation, then draw. `overlay` paints the UI into the same encoder.
    pub fn frame(
        &mut self,
        dt: f32,
        overlay: &mut dyn FnMut(
            &wgpu::Device,
            &wgpu::Queue,
            &mut wgpu::CommandEncoder,
            &wgpu::TextureView,
        ),
    ) {
        if self.disposed {
            return;
        }
        self.pump_loads();
        self.controls.update(dt);
        if let Some(model) = self.model.as_mut() {
            if self.mixer.clip_count() > 0 {
                self.mixer.advance(model, dt);
                model.update_global_transforms();
            }
        }

        let params = FrameParams {
            view: self.controls.view_matrix(),
            projection: self.camera.projection(),
            camera_pos: self.controls.eye(),
            exposure: self.config.exposure,
        };
        let pair = match (self.model.as_ref(), self.gpu_model.as_mut()) {
            (Some(model), Some(gpu)) => Some((model, gpu)),
            _ => None,
        };
        self.render.render(&params, pair, overlay);
    }

    /// Release everything. Idempotent; results still in flight on worker
    /// threads are discarded because the channel receiver is dropped here.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.events_rx = None;
        if let Some(mut gpu) = self.gpu_model.take() {
            gpu.dispose();
        }
        if let Some(mut env) = self.environment.take() {
            env.dispose();
        }
        self.model = None;
        self.flag_mesh = None;
        self.render.dispose();
        log::info!("viewer session disposed");
    }

    fn pump_loads(&mut self) {
        let mut events = Vec::new();
        if let Some(rx) = &self.events_rx {
            while let Ok(event) = rx.try_recv() {
                events.push(event);
            }
        }
        for event in events {
            match event {
                LoadEvent::Model(Ok(model)) => self.on_model_loaded(model),
                LoadEvent::Model(Err(err)) => {
                    log::error!("model import failed: {err}");
                }
                LoadEvent::Environment(Ok(equirect)) => {
                    let prefilter = EnvironmentPrefilter::new(self.render.device());
                    let map =
                        prefilter.prefilter(self.render.device(), self.render.queue(), &equirect);
                    self.render
                        .set_environment(&map, self.config.show_background);
                    if let Some(mut previous) = self.environment.replace(map) {
                        previous.dispose();
                    }
                    log::info!("environment prefiltered");
                }
                LoadEvent::Environment(Err(err)) => {
                    log::error!("environment load failed: {err}");
                }
                LoadEvent::FlagTexture { file, result } => {
                    self.swaps_in_flight = self.swaps_in_flight.saturating_sub(1);
                    match result {
                        Ok(image) => self.apply_flag_texture(&file, &image),
                        Err(err) => log::error!("flag texture '{file}' failed: {err}"),
                    }
                }
            }
        }
    }

    fn on_model_loaded(&mut self, mut model: Model) {
        if let Some(mut previous) = self.gpu_model.take() {
            previous.dispose();
        }

        let offset = model.center_at_origin();
        log::info!(
            "model loaded: {} nodes, recentered by {offset}",
            model.nodes.len()
        );
        if let Some(bounds) = model.bounding_box() {
            self.controls.frame_size(bounds.size());
        }

        self.flag_mesh = model.find_mesh_by_name(&self.config.flag_mesh_name);
        match self.flag_mesh {
            Some(index) => log::info!(
                "flag mesh '{}' at node {index}",
                self.config.flag_mesh_name
            ),
            None => log::warn!(
                "flag mesh '{}' not found; flag selection disabled",
                self.config.flag_mesh_name
            ),
        }

        self.mixer = Mixer::new(std::mem::take(&mut model.clips));
        self.gpu_model = Some(GpuModel::upload(
            self.render.device(),
            self.render.queue(),
            &model,
            self.render.node_layout(),
        ));
        self.model = Some(model);

        if let Some(file) = self.selection.take() {
            self.on_flag_change(&file);
        }
    }

    /// Bind a decoded flag image: new texture first, surface overrides, then
    /// the previous texture is released inside the bind.
    fn apply_flag_texture(&mut self, file: &str, image: &TextureImage) {
        let Some(node) = self.flag_mesh else {
            return;
        };
        let Some(gpu) = self.gpu_model.as_mut() else {
            return;
        };
        let Some(material) = gpu.material_mut(node) else {
            log::warn!("flag mesh node {node} has no material");
            return;
        };
        let label = Path::new(file)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("flag");
        let texture = GpuTexture::from_image(self.render.device(), self.render.queue(), image, label);
        material.set_surface(FLAG_TINT, FLAG_ROUGHNESS, FLAG_METALNESS);
        material.bind_base_texture(texture);
        log::info!("flag texture '{file}' applied");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_pending_selection_wins() {
        let mut selection = SelectionState::default();
        selection.select("MexicoFlag.jpg");
        selection.select("SpainFlag.jpg");
        assert_eq!(selection.pending(), Some("SpainFlag.jpg"));
        assert_eq!(selection.take().as_deref(), Some("SpainFlag.jpg"));
        assert_eq!(selection.take(), None);
    }

    #[test]
    fn flag_surface_overrides_are_neutral_matte() {
        assert_eq!(FLAG_TINT, [1.0, 1.0, 1.0, 1.0]);
        assert!(FLAG_ROUGHNESS > 0.5 && FLAG_METALNESS == 0.0);
    }
}
