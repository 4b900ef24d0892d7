use {
    super::*,
    backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder},
    snafu::ResultExt,
    tokio::sync::{Mutex, MutexGuard},
};

const MAX_LINE_LENGTH: usize = 32 * 1024;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_LOCK_WAIT: Duration = Duration::from_secs(10);
const SEND_LOCK_WAIT: Duration = Duration::from_secs(5);
const SEND_TIMEOUT: Duration = Duration::from_secs(5);
const MIN_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Factory for the pool transport.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, host: &str, port: u16) -> io::Result<TcpStream>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        match tokio::net::lookup_host((host, port)).await {
            Ok(addresses) => {
                for address in addresses {
                    match TcpStream::connect(address).await {
                        Ok(stream) => return Ok(stream),
                        Err(err) => debug!("Failed to connect to {address}: {err}"),
                    }
                }
            }
            Err(err) => debug!("Failed to resolve {host}: {err}"),
        }

        TcpStream::connect((host, port)).await
    }
}

struct Connection {
    reader: FramedRead<OwnedReadHalf, LinesCodec>,
    writer: FramedWrite<OwnedWriteHalf, LinesCodec>,
}

impl Connection {
    fn new(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();

        Self {
            reader: FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH)),
            writer: FramedWrite::new(writer, LinesCodec::new()),
        }
    }
}

struct LinkState {
    connection: Option<Connection>,
    last_activity: Instant,
    reconnects: u64,
    backoff: ExponentialBackoff,
    retry_at: Option<Instant>,
}

/// The single shared connection to the pool. Every wire operation happens inside one
/// critical section whose acquisition is bounded.
pub struct PoolLink {
    host: String,
    port: u16,
    connector: Arc<dyn Connector>,
    stale_after: Duration,
    backoff: (Duration, Duration),
    state: Mutex<LinkState>,
    epoch: AtomicU64,
    connected: AtomicBool,
    last_activity: parking_lot::Mutex<Instant>,
}

fn backoff((min, max): (Duration, Duration)) -> ExponentialBackoff {
    ExponentialBuilder::default()
        .with_min_delay(min)
        .with_max_delay(max)
        .with_jitter()
        .without_max_times()
        .build()
}

impl PoolLink {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        connector: Arc<dyn Connector>,
        stale_after: Duration,
    ) -> Self {
        let now = Instant::now();

        Self {
            host: host.into(),
            port,
            connector,
            stale_after,
            backoff: (MIN_BACKOFF, MAX_BACKOFF),
            state: Mutex::new(LinkState {
                connection: None,
                last_activity: now,
                reconnects: 0,
                backoff: backoff((MIN_BACKOFF, MAX_BACKOFF)),
                retry_at: None,
            }),
            epoch: AtomicU64::new(0),
            connected: AtomicBool::new(false),
            last_activity: parking_lot::Mutex::new(now),
        }
    }

    pub fn with_backoff(mut self, min: Duration, max: Duration) -> Self {
        self.backoff = (min, max);
        self.state.get_mut().backoff = backoff(self.backoff);
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Acquires the critical section, waiting at most `wait`.
    pub async fn lock(&self, wait: Duration) -> Result<LinkGuard<'_>, MinerError> {
        let state = timeout(wait, self.state.lock())
            .await
            .map_err(|_| LinkBusySnafu { timeout: wait }.build())?;

        Ok(LinkGuard { link: self, state })
    }

    pub async fn ensure_connection(&self) -> Result<(), MinerError> {
        self.lock(CONNECT_LOCK_WAIT)
            .await?
            .ensure_connection()
            .await
    }

    pub async fn send_message(&self, message: &Message) -> Result<(), MinerError> {
        self.lock(SEND_LOCK_WAIT).await?.send(message).await
    }

    /// Reads one line. `Ok(None)` means nothing arrived within `wait`.
    pub async fn read_response(&self, wait: Duration) -> Result<Option<String>, MinerError> {
        self.lock(wait).await?.read_line(wait).await
    }

    pub async fn disconnect(&self) -> Result<(), MinerError> {
        self.lock(SEND_LOCK_WAIT).await?.drop_connection();
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Connected, but nothing sent or received for `stale_after`.
    pub fn is_stale(&self) -> bool {
        self.is_connected() && self.last_activity.lock().elapsed() >= self.stale_after
    }

    /// Incremented on every successful connect.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> String {
        if self.is_connected() {
            format!(
                "Connected to {} (last activity {}s ago)",
                self.endpoint(),
                self.last_activity.lock().elapsed().as_secs()
            )
        } else {
            "Disconnected".into()
        }
    }

    async fn connect(&self) -> Result<TcpStream, MinerError> {
        let endpoint = self.endpoint();

        timeout(CONNECT_TIMEOUT, self.connector.connect(&self.host, self.port))
            .await
            .map_err(|_| {
                ConnectTimeoutSnafu {
                    endpoint: &endpoint,
                }
                .build()
            })?
            .context(ConnectSnafu {
                endpoint: &endpoint,
            })
    }
}

/// Exclusive access to the link for the lifetime of the guard.
pub struct LinkGuard<'a> {
    link: &'a PoolLink,
    state: MutexGuard<'a, LinkState>,
}

impl LinkGuard<'_> {
    pub fn epoch(&self) -> u64 {
        self.link.epoch()
    }

    pub fn reconnects(&self) -> u64 {
        self.state.reconnects
    }

    pub fn is_connected(&self) -> bool {
        self.state.connection.is_some()
    }

    /// Connects unless a fresh connection is already up. Fails fast while a previous
    /// failure is backing off.
    pub async fn ensure_connection(&mut self) -> Result<(), MinerError> {
        if self.state.connection.is_some() {
            let idle = self.state.last_activity.elapsed();

            if idle < self.link.stale_after {
                return Ok(());
            }

            warn!(
                "No pool activity for {}s, reconnecting to {}",
                idle.as_secs(),
                self.link.endpoint()
            );

            self.drop_connection();
        }

        if let Some(retry_at) = self.state.retry_at {
            let now = Instant::now();
            if retry_at > now {
                return BackoffSnafu {
                    remaining: retry_at - now,
                }
                .fail();
            }
        }

        info!("Connecting to {}", self.link.endpoint());

        match self.link.connect().await {
            Ok(stream) => {
                if let Err(err) = stream.set_nodelay(true) {
                    debug!("Failed to set TCP_NODELAY: {err}");
                }

                self.state.connection = Some(Connection::new(stream));
                self.state.retry_at = None;
                self.state.backoff = backoff(self.link.backoff);

                if self.link.epoch.fetch_add(1, Ordering::SeqCst) > 0 {
                    self.state.reconnects += 1;
                }

                self.link.connected.store(true, Ordering::SeqCst);
                self.touch();

                info!("Connected to {}", self.link.endpoint());

                Ok(())
            }
            Err(err) => {
                let delay = self.state.backoff.next().unwrap_or(self.link.backoff.1);
                self.state.retry_at = Some(Instant::now() + delay);

                warn!("{err}, retrying in {}ms", delay.as_millis());

                Err(err)
            }
        }
    }

    pub async fn send(&mut self, message: &Message) -> Result<(), MinerError> {
        let line = serde_json::to_string(message).context(SerializeSnafu)?;

        let connection = self
            .state
            .connection
            .as_mut()
            .ok_or(MinerError::NotConnected)?;

        debug!("Sending: {line}");

        match timeout(SEND_TIMEOUT, connection.writer.send(line)).await {
            Err(_) => {
                self.drop_connection();
                Err(MinerError::SendTimeout)
            }
            Ok(Err(source)) => {
                self.drop_connection();
                Err(MinerError::Write { source })
            }
            Ok(Ok(())) => {
                self.touch();
                Ok(())
            }
        }
    }

    /// Next inbound line, `Ok(None)` if none arrives within `wait`. Lines already buffered
    /// are returned even with a zero wait.
    pub async fn read_line(&mut self, wait: Duration) -> Result<Option<String>, MinerError> {
        let connection = self
            .state
            .connection
            .as_mut()
            .ok_or(MinerError::NotConnected)?;

        match timeout(wait, connection.reader.next()).await {
            Err(_) => Ok(None),
            Ok(None) => {
                self.drop_connection();
                Err(MinerError::Closed)
            }
            Ok(Some(Err(source))) => {
                if let LinesCodecError::Io(_) = source {
                    self.drop_connection();
                }
                Err(MinerError::Read { source })
            }
            Ok(Some(Ok(line))) => {
                debug!("Received: {line}");
                self.touch();
                Ok(Some(line))
            }
        }
    }

    pub fn drop_connection(&mut self) {
        if self.state.connection.take().is_some() {
            info!("Disconnected from {}", self.link.endpoint());
        }
        self.link.connected.store(false, Ordering::SeqCst);
    }

    fn touch(&mut self) {
        let now = Instant::now();
        self.state.last_activity = now;
        *self.link.last_activity.lock() = now;
    }
}
