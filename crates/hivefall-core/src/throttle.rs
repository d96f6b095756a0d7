//! Update-frequency throttle driven by reported frame times.
//!
//! Under load the territory manager only updates every Nth frame, with N
//! between 1 and 4. Skipped frames are not lost: their `dt` accumulates
//! and is handed to the next frame that does update.

/// Largest update interval, in frames.
pub const MAX_UPDATE_INTERVAL: u32 = 4;

/// Frame counter and accumulated time for the territory update throttle.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateThrottle {
    thresholds_ms: Vec<f32>,
    interval: u32,
    frame: u32,
    pending_dt: f32,
}

impl UpdateThrottle {
    /// A throttle that updates every frame until told otherwise.
    ///
    /// `thresholds_ms` are ascending frame times; each one reached adds a
    /// frame to the interval.
    pub fn new(thresholds_ms: Vec<f32>) -> Self {
        Self {
            thresholds_ms,
            interval: 1,
            frame: 0,
            pending_dt: 0.0,
        }
    }

    /// Current interval in frames.
    pub const fn interval(&self) -> u32 {
        self.interval
    }

    /// Set the interval from the latest frame time.
    pub fn report_frame_time(&mut self, frame_ms: f32) -> u32 {
        let over = self
            .thresholds_ms
            .iter()
            .filter(|threshold| frame_ms >= **threshold)
            .count();
        let over = u32::try_from(over).unwrap_or(u32::MAX);
        self.interval = over.saturating_add(1).clamp(1, MAX_UPDATE_INTERVAL);
        self.interval
    }

    /// Account for one frame of `dt` seconds.
    ///
    /// Returns the accumulated time if this frame should update, or `None`
    /// if it is skipped.
    pub fn admit(&mut self, dt: f32) -> Option<f32> {
        self.pending_dt += dt.max(0.0);
        self.frame = self.frame.saturating_add(1);
        if self.frame < self.interval {
            return None;
        }
        self.frame = 0;
        Some(std::mem::take(&mut self.pending_dt))
    }
}

impl Default for UpdateThrottle {
    fn default() -> Self {
        Self::new(vec![20.0, 33.0, 50.0])
    }
}
