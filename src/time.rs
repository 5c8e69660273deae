/// Largest delta handed to the simulation after a stall (tab hidden, breakpoint).
pub const MAX_FRAME_DELTA: f32 = 0.1;

const FPS_SMOOTHING: f32 = 0.1;

/// Frame timing driven by host timestamps in milliseconds (the XR frame callback's clock).
pub struct FrameClock {
    start_ms: Option<f64>,
    last_ms: Option<f64>,
    delta: f32,
    fps: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self { start_ms: None, last_ms: None, delta: 0.0, fps: 0.0 }
    }

    pub fn tick(&mut self, now_ms: f64) -> f32 {
        if self.start_ms.is_none() {
            self.start_ms = Some(now_ms);
        }
        self.delta = match self.last_ms {
            Some(last) => (((now_ms - last) / 1000.0) as f32).clamp(0.0, MAX_FRAME_DELTA),
            None => 0.0,
        };
        self.last_ms = Some(now_ms);
        if self.delta > 0.0 {
            let instant = 1.0 / self.delta;
            self.fps = if self.fps == 0.0 { instant } else { self.fps + (instant - self.fps) * FPS_SMOOTHING };
        }
        self.delta
    }

    pub fn delta_seconds(&self) -> f32 {
        self.delta
    }

    pub fn elapsed_seconds(&self) -> f32 {
        match (self.start_ms, self.last_ms) {
            (Some(start), Some(last)) => ((last - start) / 1000.0) as f32,
            _ => 0.0,
        }
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
