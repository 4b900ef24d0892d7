use {super::*, parking_lot::Mutex};

const HASH_RATE_WINDOW: Duration = Duration::from_secs(30);

/// Counters shared by the workers, the session and the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stats {
    pub hashes: u64,
    pub shares: u64,
    pub half_shares: u64,
    pub valids: u64,
    pub accepted: u64,
    pub rejected: u64,
}

#[derive(Debug)]
struct RateSample {
    average: DecayingAverage,
    hashes: u64,
}

#[derive(Debug)]
pub struct Metrics {
    hashes: AtomicU64,
    shares: AtomicU64,
    half_shares: AtomicU64,
    valids: AtomicU64,
    accepted: AtomicU64,
    rejected: AtomicU64,
    started: Instant,
    rate: Mutex<RateSample>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let started = Instant::now();

        Self {
            hashes: AtomicU64::new(0),
            shares: AtomicU64::new(0),
            half_shares: AtomicU64::new(0),
            valids: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            started,
            rate: Mutex::new(RateSample {
                average: DecayingAverage::new(HASH_RATE_WINDOW, started),
                hashes: 0,
            }),
        }
    }

    pub fn add_hashes(&self, count: u64) {
        self.hashes.fetch_add(count, Ordering::Relaxed);
    }

    /// A pool share that was sent to the pool.
    pub fn record_share(&self) {
        self.shares.fetch_add(1, Ordering::Relaxed);
    }

    /// A local share, counted for liveness only.
    pub fn record_half_share(&self) {
        self.half_shares.fetch_add(1, Ordering::Relaxed);
    }

    /// A full block solution. Counts as a share as well.
    pub fn record_valid(&self) {
        self.valids.fetch_add(1, Ordering::Relaxed);
        self.shares.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> Stats {
        Stats {
            hashes: self.hashes.load(Ordering::Relaxed),
            shares: self.shares.load(Ordering::Relaxed),
            half_shares: self.half_shares.load(Ordering::Relaxed),
            valids: self.valids.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Lifetime hashes over uptime.
    pub fn average_hash_rate(&self) -> HashRate {
        HashRate::measure(self.hashes.load(Ordering::Relaxed), self.uptime())
    }

    /// Smoothed recent hash rate. Each call folds in the hashes counted since the previous one,
    /// so only the monitor should drive it.
    pub fn sample_hash_rate(&self, now: Instant) -> HashRate {
        let hashes = self.hashes.load(Ordering::Relaxed);
        let mut rate = self.rate.lock();

        let delta = hashes.saturating_sub(rate.hashes);
        rate.hashes = hashes;
        rate.average.record(delta, now);

        HashRate(rate.average.value())
    }
}
