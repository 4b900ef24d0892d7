use {super::*, parking_lot::Mutex, snafu::ResultExt};

const HANDSHAKE_LOCK_WAIT: Duration = Duration::from_secs(10);
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const SUBMIT_LOCK_WAIT: Duration = Duration::from_secs(5);
const SUBMIT_ACK_WAIT: Duration = Duration::from_millis(500);
const MAX_POLL_LINES: usize = 16;
const MAX_PENDING_SUBMITS: usize = 64;
const MAX_EXTRANONCE2_SIZE: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
pub enum SessionState {
    Disconnected,
    Subscribed,
    Authorized,
    HasJob,
}

#[derive(Debug, Clone)]
struct Subscription {
    extranonce1: Extranonce,
    extranonce2_size: usize,
}

#[derive(Debug)]
struct Inner {
    state: SessionState,
    epoch: u64,
    subscription: Option<Subscription>,
    job: Option<Arc<Job>>,
    difficulty: Difficulty,
    pending: BTreeMap<Id, JobId>,
    last_error: Option<String>,
}

impl Inner {
    fn reset(&mut self, epoch: u64) {
        self.state = SessionState::Disconnected;
        self.epoch = epoch;
        self.subscription = None;
        self.job = None;
        self.difficulty = Difficulty::ONE;
        self.pending.clear();
    }
}

/// Stratum V1 client state machine on top of the shared [`PoolLink`]. Jobs are published as
/// immutable `Arc<Job>` snapshots so workers never observe a partial update.
pub struct StratumSession {
    link: Arc<PoolLink>,
    address: String,
    password: String,
    user_agent: String,
    metrics: Arc<Metrics>,
    next_id: AtomicU64,
    inner: Mutex<Inner>,
}

impl StratumSession {
    pub fn new(
        link: Arc<PoolLink>,
        address: impl Into<String>,
        password: impl Into<String>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            link,
            address: address.into(),
            password: password.into(),
            user_agent: USER_AGENT.into(),
            metrics,
            next_id: AtomicU64::new(1),
            inner: Mutex::new(Inner {
                state: SessionState::Disconnected,
                epoch: 0,
                subscription: None,
                job: None,
                difficulty: Difficulty::ONE,
                pending: BTreeMap::new(),
                last_error: None,
            }),
        }
    }

    pub fn link(&self) -> &Arc<PoolLink> {
        &self.link
    }

    /// Effective state. A dropped or replaced connection invalidates everything learned on it.
    pub fn state(&self) -> SessionState {
        let inner = self.inner.lock();

        if !self.link.is_connected() || inner.epoch != self.link.epoch() {
            SessionState::Disconnected
        } else {
            inner.state
        }
    }

    pub fn job(&self) -> Option<Arc<Job>> {
        if self.state() != SessionState::HasJob {
            return None;
        }

        self.inner.lock().job.clone()
    }

    pub fn current_job_id(&self) -> Option<JobId> {
        self.job().map(|job| job.id.clone())
    }

    pub fn difficulty(&self) -> Difficulty {
        self.inner.lock().difficulty
    }

    pub fn status(&self) -> String {
        let state = self.state();
        let inner = self.inner.lock();

        match state {
            SessionState::Disconnected => match &inner.last_error {
                Some(err) => format!("Disconnected ({err})"),
                None => "Disconnected".into(),
            },
            SessionState::HasJob => format!(
                "Mining job {} at difficulty {} as {}",
                inner
                    .job
                    .as_ref()
                    .map(|job| job.id.as_str())
                    .unwrap_or_default(),
                inner.difficulty,
                self.address
            ),
            state => format!("{state} as {}, waiting for work", self.address),
        }
    }

    /// Connects and runs the subscribe/authorize handshake unless the current connection is
    /// already authorized.
    pub async fn ensure_ready(&self) -> Result<(), MinerError> {
        let mut link = self.link.lock(HANDSHAKE_LOCK_WAIT).await?;

        if let Err(err) = link.ensure_connection().await {
            self.record_error(&err);
            return Err(err);
        }

        let epoch = link.epoch();

        {
            let mut inner = self.inner.lock();

            if inner.epoch == epoch && inner.state >= SessionState::Authorized {
                return Ok(());
            }

            inner.reset(epoch);
        }

        match self.handshake(&mut link).await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!("Handshake with {} failed: {err}", self.link.endpoint());
                link.drop_connection();
                self.record_error(&err);
                Err(err)
            }
        }
    }

    async fn handshake(&self, link: &mut LinkGuard<'_>) -> Result<(), MinerError> {
        let mut deferred = Vec::new();

        let id = self.next_id();
        link.send(
            &Message::request(
                id,
                "mining.subscribe",
                Subscribe {
                    user_agent: self.user_agent.clone(),
                },
            )
            .context(SerializeSnafu)?,
        )
        .await?;

        let (result, error) = self
            .await_response(link, id, "mining.subscribe", &mut deferred)
            .await?;

        if let Some(error) = error {
            return Err(MinerError::SubscribeFailed {
                reason: error.to_string(),
            });
        }

        let subscribe = serde_json::from_value::<SubscribeResult>(result.unwrap_or(Value::Null))
            .map_err(|err| MinerError::SubscribeFailed {
                reason: format!("malformed result: {err}"),
            })?;

        if subscribe.extranonce2_size == 0 || subscribe.extranonce2_size > MAX_EXTRANONCE2_SIZE {
            return Err(MinerError::SubscribeFailed {
                reason: format!(
                    "unsupported extranonce2 size {}",
                    subscribe.extranonce2_size
                ),
            });
        }

        info!(
            "Subscribed: extranonce1={}, extranonce2_size={}",
            subscribe.extranonce1, subscribe.extranonce2_size
        );

        {
            let mut inner = self.inner.lock();
            inner.subscription = Some(Subscription {
                extranonce1: subscribe.extranonce1,
                extranonce2_size: subscribe.extranonce2_size as usize,
            });
            inner.state = SessionState::Subscribed;
        }

        let id = self.next_id();
        link.send(
            &Message::request(
                id,
                "mining.authorize",
                Authorize {
                    username: self.address.clone(),
                    password: Some(self.password.clone()),
                },
            )
            .context(SerializeSnafu)?,
        )
        .await?;

        let (result, error) = self
            .await_response(link, id, "mining.authorize", &mut deferred)
            .await?;

        if let Some(error) = error {
            return Err(MinerError::AuthorizationFailed {
                reason: error.to_string(),
            });
        }

        match result {
            Some(Value::Bool(true)) => {}
            Some(Value::Bool(false)) => {
                return Err(MinerError::AuthorizationFailed {
                    reason: format!("pool rejected worker {}", self.address),
                });
            }
            other => {
                return Err(MinerError::AuthorizationFailed {
                    reason: format!("unexpected result {}", other.unwrap_or(Value::Null)),
                });
            }
        }

        self.inner.lock().state = SessionState::Authorized;

        info!("Authorized as {}", self.address);

        for (method, params) in deferred {
            if let Err(err) = self.handle_notification(&method, params) {
                warn!("Dropped {method}: {err}");
                self.record_error(&err);
            }
        }

        Ok(())
    }

    /// Reads until the response to `id` arrives. Notifications seen meanwhile are deferred,
    /// late submit acknowledgements are processed.
    async fn await_response(
        &self,
        link: &mut LinkGuard<'_>,
        id: u64,
        method: &str,
        deferred: &mut Vec<(String, Value)>,
    ) -> Result<(Option<Value>, Option<stratum::JsonRpcError>), MinerError> {
        let deadline = Instant::now() + HANDSHAKE_TIMEOUT;
        let expected = Id::Number(id);

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());

            let Some(line) = link.read_line(remaining).await? else {
                return Err(MinerError::ResponseTimeout {
                    method: method.into(),
                });
            };

            let message = match serde_json::from_str::<Message>(&line) {
                Ok(message) => message,
                Err(err) => {
                    warn!("Dropped invalid message {line:?}: {err}");
                    continue;
                }
            };

            match message {
                Message::Response {
                    id, result, error, ..
                } if id == expected => return Ok((result, error)),
                Message::Notification { method, params } => {
                    debug!("Deferring {method} until authorized");
                    deferred.push((method, params));
                }
                message => {
                    if let Err(err) = self.handle_message(message) {
                        warn!("Dropped message during handshake: {err}");
                    }
                }
            }
        }
    }

    /// Drains up to a handful of inbound lines. Returns 0 without reading if another caller
    /// holds the link for longer than `lock_wait`.
    pub async fn poll(&self, wait: Duration, lock_wait: Duration) -> Result<usize, MinerError> {
        let mut link = match self.link.lock(lock_wait).await {
            Ok(link) => link,
            Err(MinerError::LinkBusy { .. }) => return Ok(0),
            Err(err) => return Err(err),
        };

        let mut handled = 0;
        let mut wait = wait;

        while handled < MAX_POLL_LINES {
            let line = match link.read_line(wait).await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    self.record_error(&err);
                    return Err(err);
                }
            };

            handled += 1;
            wait = Duration::ZERO;

            if let Err(err) = self.handle_line(&line) {
                warn!("Dropped message: {err}");
                self.record_error(&err);
            }
        }

        Ok(handled)
    }

    /// Applies one inbound line. Failures leave the session state as it was.
    pub fn handle_line(&self, line: &str) -> Result<(), MinerError> {
        let message = serde_json::from_str::<Message>(line)
            .map_err(|err| MinerError::protocol(format!("invalid message {line:?}: {err}")))?;

        self.handle_message(message)
    }

    fn handle_message(&self, message: Message) -> Result<(), MinerError> {
        match message {
            Message::Notification { method, params } => self.handle_notification(&method, params),
            Message::Response {
                id,
                result,
                error,
                reject_reason,
            } => {
                self.handle_response(id, result, error, reject_reason);
                Ok(())
            }
            Message::Request { method, .. } => Err(MinerError::protocol(format!(
                "unsupported request {method}"
            ))),
        }
    }

    fn handle_notification(&self, method: &str, params: Value) -> Result<(), MinerError> {
        let mut inner = self.inner.lock();

        if inner.state < SessionState::Authorized {
            return Err(MinerError::protocol(format!("{method} before authorization")));
        }

        match method {
            "mining.notify" => {
                let count = params.as_array().map(Vec::len).unwrap_or_default();

                let notify = serde_json::from_value::<Notify>(params).map_err(|err| {
                    if count >= 9 {
                        MinerError::MalformedField {
                            field: "mining.notify",
                            source: stratum::InternalError::Parse {
                                message: err.to_string(),
                            },
                        }
                    } else {
                        MinerError::protocol(format!(
                            "mining.notify with {count} params, need at least 9"
                        ))
                    }
                })?;

                let Some(subscription) = inner.subscription.clone() else {
                    return Err(MinerError::protocol("mining.notify without subscription"));
                };

                let job = Job::from_notify(
                    notify,
                    subscription.extranonce1,
                    subscription.extranonce2_size,
                )?;

                info!(
                    "New job {} (clean_jobs={}, ntime={})",
                    job.id, job.clean_jobs, job.ntime
                );

                inner.job = Some(Arc::new(job));
                inner.state = SessionState::HasJob;

                Ok(())
            }
            "mining.set_difficulty" => {
                let difficulty = serde_json::from_value::<SetDifficulty>(params)
                    .map_err(|err| {
                        MinerError::protocol(format!("invalid mining.set_difficulty: {err}"))
                    })?
                    .difficulty();

                if inner.difficulty != difficulty {
                    info!("Pool difficulty set to {difficulty}");
                }

                inner.difficulty = difficulty;

                Ok(())
            }
            method => Err(MinerError::protocol(format!(
                "unsupported notification {method}"
            ))),
        }
    }

    fn handle_response(
        &self,
        id: Id,
        result: Option<Value>,
        error: Option<stratum::JsonRpcError>,
        reject_reason: Option<String>,
    ) {
        let Some(job_id) = self.inner.lock().pending.remove(&id) else {
            debug!("Ignoring response to unknown request {id}");
            return;
        };

        if result == Some(Value::Bool(true)) {
            self.metrics.record_accepted();
            info!("Share for job {job_id} accepted");
        } else {
            self.metrics.record_rejected();
            let reason = reject_reason
                .or_else(|| error.map(|error| error.to_string()))
                .unwrap_or_else(|| "no reason given".into());
            warn!("Share for job {job_id} rejected: {reason}");
        }
    }

    /// Submits a share for `job`. Returns `Ok(false)` without sending when the session has
    /// moved on from that job. The acknowledgement is read on a best-effort basis.
    pub async fn submit(
        &self,
        job: &Job,
        extranonce2: &Extranonce,
        ntime: Ntime,
        nonce: Nonce,
    ) -> Result<bool, MinerError> {
        let mut link = self.link.lock(SUBMIT_LOCK_WAIT).await?;

        let id = {
            let mut inner = self.inner.lock();

            let current = inner.state == SessionState::HasJob
                && inner.epoch == link.epoch()
                && link.is_connected()
                && inner
                    .job
                    .as_ref()
                    .is_some_and(|active| active.id == job.id);

            if !current {
                debug!("Discarding share for stale job {}", job.id);
                return Ok(false);
            }

            let id = self.next_id();

            if inner.pending.len() >= MAX_PENDING_SUBMITS {
                inner.pending.pop_first();
            }

            inner.pending.insert(Id::Number(id), job.id.clone());

            id
        };

        let submit = Submit {
            username: self.address.clone(),
            job_id: job.id.clone(),
            extranonce2: extranonce2.clone(),
            ntime,
            nonce,
        };

        let message = Message::request(id, "mining.submit", &submit).context(SerializeSnafu)?;

        if let Err(err) = link.send(&message).await {
            self.inner.lock().pending.remove(&Id::Number(id));
            self.record_error(&err);
            return Err(err);
        }

        info!(
            "Submitted share for job {}: extranonce2={} ntime={} nonce={}",
            job.id, extranonce2, ntime, nonce
        );

        match link.read_line(SUBMIT_ACK_WAIT).await {
            Ok(Some(line)) => {
                if let Err(err) = self.handle_line(&line) {
                    warn!("Dropped message: {err}");
                }
            }
            Ok(None) => debug!("No acknowledgement yet for share {id}"),
            Err(err) => {
                warn!("Failed to read share acknowledgement: {err}");
                self.record_error(&err);
            }
        }

        Ok(true)
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn record_error(&self, err: &MinerError) {
        self.inner.lock().last_error = Some(err.to_string());
    }
}
