use super::*;

/// `1 - e^(-x)`, clamped where the result is indistinguishable from 1.
fn saturation(x: f64) -> f64 {
    -(-x.min(36.0)).exp_m1()
}

/// Exponentially decaying rate of a counter, smoothed over `window`.
#[derive(Debug, Clone)]
pub(crate) struct DecayingAverage {
    rate: f64,
    window: Duration,
    last_update: Instant,
    warmup: Duration,
}

impl DecayingAverage {
    pub(crate) fn new(window: Duration, start: Instant) -> Self {
        Self {
            rate: 0.0,
            window,
            last_update: start,
            warmup: Duration::ZERO,
        }
    }

    /// Folds in `count` events observed since the previous call.
    pub(crate) fn record(&mut self, count: u64, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_update);
        if elapsed.is_zero() {
            return;
        }

        let weight = saturation(elapsed.as_secs_f64() / self.window.as_secs_f64());
        let sample = count as f64 / elapsed.as_secs_f64();

        self.rate += (sample - self.rate) * weight;
        self.last_update = now;
        self.warmup += elapsed;
    }

    /// Rate corrected for the bias towards zero while less than a window has been observed.
    pub(crate) fn value(&self) -> f64 {
        let bias = saturation(self.warmup.as_secs_f64() / self.window.as_secs_f64());

        if bias == 0.0 { 0.0 } else { self.rate / bias }
    }
}
