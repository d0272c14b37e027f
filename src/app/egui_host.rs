use std::sync::Arc;

use winit::event::WindowEvent;
use winit::window::Window;

pub struct EguiFrameOutput {
    pub clipped_primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
    pub screen_size_px: [u32; 2],
}

/// egui context, winit integration, and the wgpu paint backend in one place.
pub struct EguiHost {
    context: egui::Context,
    winit_state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
}

impl EguiHost {
    pub fn new(window: &Window, device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let context = egui::Context::default();
        let winit_state = egui_winit::State::new(
            context.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let renderer = egui_wgpu::Renderer::new(device, format, None, 1, false);
        Self {
            context,
            winit_state,
            renderer,
        }
    }

    /// Returns true when egui consumed the event (pointer over a panel etc.),
    /// in which case it must not reach the orbit controls.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.winit_state.on_window_event(window, event).consumed
    }

    pub fn run_ui<F>(&mut self, window: &Arc<Window>, run_ui: F) -> EguiFrameOutput
    where
        F: FnMut(&egui::Context),
    {
        let raw_input = self.winit_state.take_egui_input(window);
        let full_output = self.context.run(raw_input, run_ui);
        self.winit_state
            .handle_platform_output(window, full_output.platform_output);
        let pixels_per_point = self.context.pixels_per_point();
        let clipped_primitives = self.context.tessellate(full_output.shapes, pixels_per_point);
        let size = window.inner_size();

        EguiFrameOutput {
            clipped_primitives,
            textures_delta: full_output.textures_delta,
            pixels_per_point,
            screen_size_px: [size.width.max(1), size.height.max(1)],
        }
    }

    /// Encode the frame's UI on top of the scene, loading the existing color
    /// attachment contents.
    pub fn paint(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        frame: EguiFrameOutput,
    ) {
        for (id, delta) in &frame.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, delta);
        }
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: frame.screen_size_px,
            pixels_per_point: frame.pixels_per_point,
        };
        // No paint callbacks in this UI, so the returned command buffers are
        // always empty.
        let _ = self.renderer.update_buffers(
            device,
            queue,
            encoder,
            &frame.clipped_primitives,
            &screen,
        );
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("ui pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: target,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    occlusion_query_set: None,
                    timestamp_writes: None,
                })
                .forget_lifetime();
            self.renderer
                .render(&mut pass, &frame.clipped_primitives, &screen);
        }
        for id in &frame.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }
}
