use std::time::Instant;
use winit::window::Window;

/// Per-frame delta time plus an fps readout in the window title.
pub struct FrameClock {
    last_frame_time: Option<Instant>,
    last_fps_time: Instant,
    frame_count: u32,
    pub frame_dt: f32,
    base_title: String,
}

impl FrameClock {
    pub fn new(base_title: String) -> Self {
        Self {
            last_frame_time: None,
            last_fps_time: Instant::now(),
            frame_count: 0,
            frame_dt: 1.0 / 60.0,
            base_title,
        }
    }

    pub fn update(&mut self, window: Option<&Window>, now: Instant) {
        let dt_duration = if let Some(last) = self.last_frame_time {
            now.saturating_duration_since(last)
        } else {
            std::time::Duration::from_millis(16)
        };
        self.last_frame_time = Some(now);
        // Clamp so a debugger pause or long stall does not fast-forward the
        // flag animation.
        self.frame_dt = dt_duration.as_secs_f32().clamp(0.0, 0.25);

        self.frame_count = self.frame_count.saturating_add(1);
        let elapsed = now.saturating_duration_since(self.last_fps_time);
        if elapsed.as_secs_f32() >= 0.5 {
            let fps = self.frame_count as f32 / elapsed.as_secs_f32();
            let ms = (self.frame_dt * 1000.0).max(0.0);
            if let Some(window) = window {
                window.set_title(&format!(
                    "{} - {:.1} fps ({:.2} ms)",
                    self.base_title, fps, ms
                ));
            }
            self.frame_count = 0;
            self.last_fps_time = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn long_stalls_are_clamped() {
        let mut clock = FrameClock::new("test".to_string());
        let start = Instant::now();
        clock.update(None, start);
        clock.update(None, start + Duration::from_secs(10));
        assert!(clock.frame_dt <= 0.25);
    }

    #[test]
    fn steady_cadence_yields_frame_dt() {
        let mut clock = FrameClock::new("test".to_string());
        let start = Instant::now();
        clock.update(None, start);
        clock.update(None, start + Duration::from_millis(16));
        assert!((clock.frame_dt - 0.016).abs() < 1e-3);
    }
}
