//! Local share difficulty. A cheap threshold independent of the pool difficulty that gives the
//! operator a steady signal of hashing progress. Local shares are never submitted.

use {super::*, parking_lot::Mutex, std::sync::atomic::AtomicU8};

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 5;
pub const EVALUATION_INTERVAL: Duration = Duration::from_secs(30);

/// At level `L` the `L + 1` most significant bytes of the hash must be zero. The digest is
/// little-endian, so those are the trailing bytes.
pub fn meets_level(hash: &[u8; 32], level: u8) -> bool {
    let zeros = usize::from(level.clamp(MIN_LEVEL, MAX_LEVEL)) + 1;
    hash[32 - zeros..].iter().all(|byte| *byte == 0)
}

#[derive(Debug)]
struct Timing {
    last_share: Instant,
    last_evaluation: Instant,
}

#[derive(Debug)]
pub struct DifficultyController {
    level: AtomicU8,
    target_interval: Duration,
    timing: Mutex<Timing>,
}

impl DifficultyController {
    pub fn new(initial_level: u8, target_interval: Duration) -> Self {
        Self::starting_at(initial_level, target_interval, Instant::now())
    }

    pub fn starting_at(initial_level: u8, target_interval: Duration, start: Instant) -> Self {
        Self {
            level: AtomicU8::new(initial_level.clamp(MIN_LEVEL, MAX_LEVEL)),
            target_interval,
            timing: Mutex::new(Timing {
                last_share: start,
                last_evaluation: start,
            }),
        }
    }

    pub fn level(&self) -> u8 {
        self.level.load(Ordering::Relaxed)
    }

    pub fn is_met_by(&self, hash: &[u8; 32]) -> bool {
        meets_level(hash, self.level())
    }

    pub fn record_share(&self) {
        self.record_share_at(Instant::now());
    }

    pub fn record_share_at(&self, now: Instant) {
        self.timing.lock().last_share = now;
    }

    pub fn since_last_share(&self) -> Duration {
        self.timing.lock().last_share.elapsed()
    }

    pub fn evaluate(&self) -> Option<u8> {
        self.evaluate_at(Instant::now())
    }

    /// Adjusts the level at most once per evaluation interval. Returns the new level when it
    /// changed.
    pub fn evaluate_at(&self, now: Instant) -> Option<u8> {
        let mut timing = self.timing.lock();

        if now.saturating_duration_since(timing.last_evaluation) < EVALUATION_INTERVAL {
            return None;
        }

        timing.last_evaluation = now;

        let since = now.saturating_duration_since(timing.last_share);
        let level = self.level();

        let next = if since > self.target_interval * 2 && level > MIN_LEVEL {
            level - 1
        } else if since < self.target_interval / 3 && level < MAX_LEVEL {
            level + 1
        } else {
            return None;
        };

        self.level.store(next, Ordering::Relaxed);

        if next < level {
            info!(
                "No local share for {}s, lowering local difficulty to level {next}",
                since.as_secs()
            );
        } else {
            info!(
                "Local share {}s ago, raising local difficulty to level {next}",
                since.as_secs()
            );
        }

        Some(next)
    }
}
