use {
    super::*,
    anyhow::Context,
    monitor::{Monitor, spawn_monitor},
};

/// Owns everything shared between the hashing threads: one pool link, one session on top of
/// it, and the counters.
pub struct Miner {
    session: Arc<StratumSession>,
    controller: Arc<DifficultyController>,
    metrics: Arc<Metrics>,
    engine: HashEngine,
    workers: usize,
    once: bool,
}

impl Miner {
    pub fn new(settings: &Settings) -> Result<Self> {
        Self::with_connector(settings, Arc::new(TcpConnector))
    }

    pub fn with_connector(settings: &Settings, connector: Arc<dyn Connector>) -> Result<Self> {
        let metrics = Arc::new(Metrics::new());

        let link = Arc::new(PoolLink::new(
            settings.pool_host(),
            settings.pool_port(),
            connector,
            settings.stale_after(),
        ));

        let session = Arc::new(StratumSession::new(
            link,
            settings.address()?,
            settings.password(),
            metrics.clone(),
        ));

        let engine = HashEngine::select(settings.hash_engine());

        Ok(Self {
            session,
            controller: Arc::new(DifficultyController::new(
                settings.initial_local_level(),
                settings.target_share_interval(),
            )),
            metrics,
            engine,
            workers: settings.workers(),
            once: settings.once(),
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn engine(&self) -> HashEngine {
        self.engine
    }

    pub fn status(&self) -> String {
        self.session.status()
    }

    pub fn current_job_id(&self) -> Option<JobId> {
        self.session.current_job_id()
    }

    pub fn current_difficulty(&self) -> Difficulty {
        self.session.difficulty()
    }

    pub fn local_level(&self) -> u8 {
        self.controller.level()
    }

    pub fn stats(&self) -> Stats {
        self.metrics.stats()
    }

    /// Mines until `cancel` fires, then joins every worker and closes the link. In `once` mode
    /// the first submitted share cancels the token.
    pub async fn run(&self, cancel: CancellationToken) -> Result<Stats> {
        info!(
            "Mining on {} with {} worker(s) using the {} hash engine",
            self.session.link().endpoint(),
            self.workers,
            self.engine
        );

        let mut tasks = JoinSet::new();

        spawn_monitor(
            Monitor::new(
                self.metrics.clone(),
                self.controller.clone(),
                self.session.clone(),
            ),
            cancel.clone(),
            &mut tasks,
        );

        let handle = Handle::current();
        let mut threads = Vec::with_capacity(self.workers);
        let mut spawn_error = None;

        for index in 0..self.workers {
            let worker = MiningWorker {
                index,
                workers: self.workers,
                engine: self.engine,
                session: self.session.clone(),
                controller: self.controller.clone(),
                metrics: self.metrics.clone(),
                cancel: cancel.clone(),
                once: self.once,
            };

            let handle = handle.clone();

            match thread::Builder::new()
                .name(format!("yamuna-worker-{index}"))
                .spawn(move || worker.run(handle))
            {
                Ok(thread) => threads.push(thread),
                Err(err) => {
                    error!("Failed to spawn worker {index}: {err}");
                    spawn_error =
                        Some(anyhow!(err).context(format!("failed to spawn worker {index}")));
                    cancel.cancel();
                    break;
                }
            }
        }

        cancel.cancelled().await;

        info!("Shutting down {} worker(s)", threads.len());

        tokio::task::spawn_blocking(move || {
            for thread in threads {
                if thread.join().is_err() {
                    error!("Worker thread panicked");
                }
            }
        })
        .await
        .context("failed to join worker threads")?;

        while tasks.join_next().await.is_some() {}

        if let Err(err) = self.session.link().disconnect().await {
            warn!("Failed to close pool connection: {err}");
        }

        if let Some(err) = spawn_error {
            return Err(err);
        }

        let stats = self.metrics.stats();

        info!(
            "Mined {} hashes, {} share(s), {} accepted, {} rejected",
            stats.hashes, stats.shares, stats.accepted, stats.rejected
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            pool_host: Some("127.0.0.1".into()),
            pool_port: Some(1),
            address: Some("bc1qexample.worker".into()),
            workers: Some(1),
            hash_engine: Some(EngineChoice::Software),
            initial_local_level: Some(4),
            ..Default::default()
        }
    }

    #[test]
    fn requires_address() {
        let settings = Settings {
            address: None,
            ..settings()
        };

        assert!(Miner::new(&settings).is_err());
    }

    #[test]
    fn initial_state() {
        let miner = Miner::new(&settings()).unwrap();

        assert_eq!(miner.workers(), 1);
        assert_eq!(miner.engine(), HashEngine::Software);
        assert_eq!(miner.local_level(), 4);
        assert_eq!(miner.current_job_id(), None);
        assert_eq!(miner.current_difficulty(), Difficulty::ONE);
        assert_eq!(miner.status(), "Disconnected");
        assert_eq!(miner.stats(), Stats::default());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cancelled_miner_returns_stats() {
        let miner = Miner::new(&settings()).unwrap();
        let cancel = CancellationToken::new();

        cancel.cancel();

        let stats = timeout(Duration::from_secs(10), miner.run(cancel))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(stats.shares, 0);
    }
}
