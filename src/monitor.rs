use super::*;

const REPORT_INTERVAL: Duration = Duration::from_secs(5);
const SUMMARY_INTERVAL: Duration = Duration::from_secs(30);

pub(crate) trait StatusLine: Send + Sync + 'static {
    fn status_line(&self) -> String;
}

/// Periodic progress logging. Also drives local difficulty evaluation, which needs a regular
/// tick independent of share arrivals.
pub(crate) struct Monitor {
    metrics: Arc<Metrics>,
    controller: Arc<DifficultyController>,
    session: Arc<StratumSession>,
}

impl Monitor {
    pub(crate) fn new(
        metrics: Arc<Metrics>,
        controller: Arc<DifficultyController>,
        session: Arc<StratumSession>,
    ) -> Self {
        Self {
            metrics,
            controller,
            session,
        }
    }

    fn report(&self) {
        info!("{}", self.status_line());
        self.controller.evaluate();
    }

    fn summary(&self) {
        let stats = self.metrics.stats();

        info!(
            "uptime={}s hashes={} average={} shares={} local={} blocks={} accepted={} rejected={} last_local_share={}s ago",
            self.metrics.uptime().as_secs(),
            stats.hashes,
            self.metrics.average_hash_rate(),
            stats.shares,
            stats.half_shares,
            stats.valids,
            stats.accepted,
            stats.rejected,
            self.controller.since_last_share().as_secs(),
        );

        info!("{}", self.session.link().status());
        info!("{}", self.session.status());
    }
}

impl StatusLine for Monitor {
    fn status_line(&self) -> String {
        let stats = self.metrics.stats();

        format!(
            "hashrate={}  average={}  shares={}  local={}  level={}  difficulty={}  job={}",
            self.metrics.sample_hash_rate(Instant::now()),
            self.metrics.average_hash_rate(),
            stats.shares,
            stats.half_shares,
            self.controller.level(),
            self.session.difficulty(),
            self.session
                .current_job_id()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "none".into()),
        )
    }
}

pub(crate) fn spawn_monitor(monitor: Monitor, cancel: CancellationToken, tasks: &mut JoinSet<()>) {
    tasks.spawn(async move {
        let mut report = interval(REPORT_INTERVAL);
        report.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut summary = interval(SUMMARY_INTERVAL);
        summary.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Both intervals fire immediately; skip that so the first report has data.
        report.tick().await;
        summary.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = report.tick() => monitor.report(),
                _ = summary.tick() => monitor.summary(),
            }
        }
    });
}
