use super::*;

#[derive(Debug, Parser)]
pub(crate) struct MinerCommand {
    #[arg(long, help = "Connect to pool at <POOL_HOST>.")]
    pool_host: Option<String>,
    #[arg(long, help = "Connect to pool on <POOL_PORT>.")]
    pool_port: Option<u16>,
    #[arg(long, help = "Authorize as worker <ADDRESS>.")]
    address: Option<String>,
    #[arg(long, help = "Authorize with <PASSWORD>.")]
    password: Option<String>,
    #[arg(long, help = "Run <WORKERS> hashing threads. [default: all cores]")]
    workers: Option<usize>,
    #[arg(long, value_enum, help = "Hash with <HASH_ENGINE>. [default: auto]")]
    hash_engine: Option<EngineChoice>,
    #[arg(long, help = "Reconnect after <STALE_AFTER> seconds without pool traffic.")]
    stale_after: Option<u64>,
    #[arg(long, help = "Aim for one local share every <TARGET_SHARE_INTERVAL> seconds.")]
    target_share_interval: Option<u64>,
    #[arg(long, help = "Start local difficulty at <INITIAL_LOCAL_LEVEL>.")]
    initial_local_level: Option<u8>,
    #[arg(long, help = "Exit after the first submitted share.")]
    once: bool,
}

impl MinerCommand {
    pub(crate) fn overrides(&self) -> Settings {
        Settings {
            pool_host: self.pool_host.clone(),
            pool_port: self.pool_port,
            address: self.address.clone(),
            password: self.password.clone(),
            workers: self.workers,
            hash_engine: self.hash_engine,
            stale_after: self.stale_after,
            target_share_interval: self.target_share_interval,
            initial_local_level: self.initial_local_level,
            once: self.once,
            ..Default::default()
        }
    }

    pub(crate) async fn run(self, settings: Settings, cancel_token: CancellationToken) -> Result {
        info!(
            "Connecting to {}:{} as {}",
            settings.pool_host(),
            settings.pool_port(),
            settings.address()?
        );

        let miner = Miner::new(&settings)?;

        let stats = miner.run(cancel_token).await?;

        println!("{}", serde_json::to_string_pretty(&stats)?);

        Ok(())
    }
}
