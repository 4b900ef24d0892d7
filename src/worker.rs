use {super::*, local_difficulty::meets_level};

/// Nonces hashed between session polls.
pub const POLL_INTERVAL: u64 = 4096;

const POLL_WAIT: Duration = Duration::from_millis(10);
const IDLE_WAIT: Duration = Duration::from_millis(100);
const RETRY_DELAY: Duration = Duration::from_secs(1);
const HANDSHAKE_RETRY_DELAY: Duration = Duration::from_secs(5);

const NONCE_SPACE: u64 = 1 << 32;

/// Half-open slice `[start, end)` of the 32-bit nonce space owned by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonceRange {
    pub start: u64,
    pub end: u64,
}

impl NonceRange {
    pub fn for_worker(worker: usize, workers: usize) -> Self {
        let workers = workers.max(1) as u64;
        let worker = (worker as u64).min(workers - 1);
        let span = NONCE_SPACE / workers;

        Self {
            start: worker * span,
            end: if worker + 1 == workers {
                NONCE_SPACE
            } else {
                (worker + 1) * span
            },
        }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn nonces(&self) -> impl Iterator<Item = u32> {
        (self.start..self.end).map(|nonce| nonce as u32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Classification {
    #[display("valid block")]
    ValidBlock,
    #[display("pool share")]
    PoolShare,
    #[display("local share")]
    LocalShare,
}

/// `hash <= target`, both as little-endian 256-bit integers.
pub fn meets_target(hash: &[u8; 32], target: &[u8; 32]) -> bool {
    for (h, t) in hash.iter().rev().zip(target.iter().rev()) {
        if h != t {
            return h < t;
        }
    }

    true
}

pub fn check_stratum_target(hash: &[u8; 32], difficulty: Difficulty) -> bool {
    difficulty.is_met_by(BlockHash::from_byte_array(*hash))
}

/// Per-nonce hashing and classification for one header template.
#[derive(Debug, Clone)]
pub struct Scanner {
    hasher: HeaderHasher,
    network_target: [u8; 32],
    pool_target: [u8; 32],
}

impl Scanner {
    pub fn new(
        engine: HashEngine,
        header: &[u8; 80],
        network_target: Target,
        difficulty: Difficulty,
    ) -> Self {
        Self {
            hasher: HeaderHasher::new(engine, header),
            network_target: network_target.to_le_bytes(),
            pool_target: difficulty.to_target().to_le_bytes(),
        }
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.pool_target = difficulty.to_target().to_le_bytes();
    }

    pub fn hash(&mut self, nonce: u32) -> [u8; 32] {
        self.hasher.hash_with_nonce(nonce)
    }

    /// Rarest outcome first. The thresholds are nested, so the order only decides which
    /// label a hash meeting several of them gets.
    pub fn classify(&self, hash: &[u8; 32], local_level: u8) -> Option<Classification> {
        if meets_target(hash, &self.network_target) {
            Some(Classification::ValidBlock)
        } else if meets_target(hash, &self.pool_target) {
            Some(Classification::PoolShare)
        } else if meets_level(hash, local_level) {
            Some(Classification::LocalShare)
        } else {
            None
        }
    }

    pub fn check(&mut self, nonce: u32, local_level: u8) -> ([u8; 32], Option<Classification>) {
        let hash = self.hash(nonce);
        (hash, self.classify(&hash, local_level))
    }
}

/// How one pass over a worker's nonce range ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CycleOutcome {
    Exhausted,
    Superseded,
    BlockFound,
    Submitted,
    Cancelled,
}

/// One hashing thread. Session calls are driven on the runtime through `Handle::block_on`,
/// so a worker must not run on a runtime thread.
pub struct MiningWorker {
    pub index: usize,
    pub workers: usize,
    pub engine: HashEngine,
    pub session: Arc<StratumSession>,
    pub controller: Arc<DifficultyController>,
    pub metrics: Arc<Metrics>,
    pub cancel: CancellationToken,
    pub once: bool,
}

impl MiningWorker {
    pub fn run(self, handle: Handle) {
        let range = NonceRange::for_worker(self.index, self.workers);

        info!(
            "Worker {} mining nonces {:08x}..{:08x}",
            self.index,
            range.start,
            range.end - 1
        );

        let mut current: Option<JobId> = None;
        let mut finished: Option<JobId> = None;
        let mut roll = 0;

        while !self.cancel.is_cancelled() {
            if let Err(err) = handle.block_on(self.session.ensure_ready()) {
                let delay = match err.kind() {
                    ErrorKind::Handshake => HANDSHAKE_RETRY_DELAY,
                    _ => RETRY_DELAY,
                };

                debug!(
                    "Worker {} waiting {}s for pool: {err}",
                    self.index,
                    delay.as_secs()
                );

                self.sleep(&handle, delay);
                continue;
            }

            let Some(job) = self.session.job() else {
                self.idle(&handle);
                continue;
            };

            if finished.as_ref() == Some(&job.id) {
                self.idle(&handle);
                continue;
            }

            if current.as_ref() != Some(&job.id) {
                current = Some(job.id.clone());
                roll = 0;
            }

            let outcome = match self.mine(&handle, &job, range, roll) {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!("Worker {} cannot mine job {}: {err}", self.index, job.id);
                    finished = Some(job.id.clone());
                    continue;
                }
            };

            debug!(
                "Worker {} cycle on job {} roll {roll}: {outcome}",
                self.index, job.id
            );

            match outcome {
                CycleOutcome::Exhausted => roll += 1,
                CycleOutcome::Superseded => {}
                CycleOutcome::BlockFound => {
                    finished = Some(job.id.clone());
                    if self.once {
                        self.cancel.cancel();
                    }
                }
                CycleOutcome::Submitted => {
                    info!("Share submitted, stopping");
                    self.cancel.cancel();
                }
                CycleOutcome::Cancelled => break,
            }
        }

        info!("Worker {} stopped", self.index);
    }

    /// Scans `range` against a header built for `roll`. Pool shares are submitted as they are
    /// found; the session is polled every [`POLL_INTERVAL`] nonces. A new job or a stale link
    /// ends the cycle early.
    pub fn mine(
        &self,
        handle: &Handle,
        job: &Arc<Job>,
        range: NonceRange,
        roll: u64,
    ) -> Result<CycleOutcome, MinerError> {
        let extranonce2 = job.extranonce2(self.index, self.workers, roll);
        let header = BlockHeaderBuilder::new(self.engine).template(job, &extranonce2)?;

        let mut scanner = Scanner::new(
            self.engine,
            &header,
            job.network_target(),
            self.session.difficulty(),
        );

        let mut hashed = 0;

        for nonce in range.nonces() {
            let (hash, classification) = scanner.check(nonce, self.controller.level());
            hashed += 1;

            match classification {
                Some(Classification::ValidBlock) => {
                    self.metrics.add_hashes(hashed);
                    self.metrics.record_valid();

                    info!(
                        "Block solution for job {}: nonce={nonce:08x} hash={}",
                        job.id,
                        BlockHash::from_byte_array(hash)
                    );

                    self.submit(handle, job, &extranonce2, nonce);

                    return Ok(CycleOutcome::BlockFound);
                }
                Some(Classification::PoolShare) => {
                    info!(
                        "Share for job {}: nonce={nonce:08x} hash={}",
                        job.id,
                        BlockHash::from_byte_array(hash)
                    );

                    if self.submit(handle, job, &extranonce2, nonce) {
                        self.metrics.record_share();

                        if self.once {
                            self.metrics.add_hashes(hashed);
                            return Ok(CycleOutcome::Submitted);
                        }
                    }
                }
                Some(Classification::LocalShare) => {
                    self.metrics.record_half_share();
                    self.controller.record_share();
                }
                None => {}
            }

            if hashed == POLL_INTERVAL {
                self.metrics.add_hashes(hashed);
                hashed = 0;

                if self.cancel.is_cancelled() {
                    return Ok(CycleOutcome::Cancelled);
                }

                if let Err(err) = handle.block_on(self.session.poll(POLL_WAIT, Duration::ZERO)) {
                    debug!("Worker {} poll failed: {err}", self.index);
                }

                if self.session.current_job_id().as_ref() != Some(&job.id) {
                    return Ok(CycleOutcome::Superseded);
                }

                // ensure_ready replaces a stale connection.
                if self.session.link().is_stale() {
                    debug!("Worker {} leaving job {}, link is stale", self.index, job.id);
                    return Ok(CycleOutcome::Superseded);
                }

                scanner.set_difficulty(self.session.difficulty());
            }
        }

        self.metrics.add_hashes(hashed);

        Ok(CycleOutcome::Exhausted)
    }

    fn submit(&self, handle: &Handle, job: &Job, extranonce2: &Extranonce, nonce: u32) -> bool {
        match handle.block_on(self.session.submit(
            job,
            extranonce2,
            job.ntime,
            Nonce::from(nonce),
        )) {
            Ok(true) => true,
            Ok(false) => {
                debug!("Share for job {} not submitted, job is stale", job.id);
                false
            }
            Err(err) => {
                warn!("Failed to submit share for job {}: {err}", job.id);
                false
            }
        }
    }

    fn idle(&self, handle: &Handle) {
        match handle.block_on(self.session.poll(IDLE_WAIT, IDLE_WAIT)) {
            Ok(0) => self.sleep(handle, POLL_WAIT),
            Ok(_) => {}
            Err(err) => {
                debug!("Worker {} poll failed: {err}", self.index);
                self.sleep(handle, RETRY_DELAY);
            }
        }
    }

    fn sleep(&self, handle: &Handle, delay: Duration) {
        handle.block_on(async {
            tokio::select! {
                _ = self.cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {}
            }
        });
    }
}
