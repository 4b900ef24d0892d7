use {super::*, anyhow::Context, options::Options, system_utils::get_cpu_count};

pub const DEFAULT_POOL_HOST: &str = "public-pool.io";
pub const DEFAULT_POOL_PORT: u16 = 21496;
pub const DEFAULT_PASSWORD: &str = "x";
pub const DEFAULT_STALE_AFTER: u64 = 300;
pub const DEFAULT_TARGET_SHARE_INTERVAL: u64 = 60;
pub const DEFAULT_INITIAL_LOCAL_LEVEL: u8 = 2;

const ENV_PREFIX: &str = "YAMUNA_";
const CONFIG_FILE: &str = "yamuna.toml";

/// TOML config file structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub miner: Option<MinerSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MinerSection {
    pub pool_host: Option<String>,
    pub pool_port: Option<u16>,
    pub address: Option<String>,
    pub password: Option<String>,
    pub workers: Option<usize>,
    pub hash_engine: Option<EngineChoice>,
    pub stale_after: Option<u64>,
    pub target_share_interval: Option<u64>,
    pub initial_local_level: Option<u8>,
    pub once: Option<bool>,
}

/// Resolved configuration. Every source produces one of these and they are merged with
/// [`Settings::or`], the receiver taking priority.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub config: Option<PathBuf>,
    pub config_dir: Option<PathBuf>,

    pub pool_host: Option<String>,
    pub pool_port: Option<u16>,
    pub address: Option<String>,
    pub password: Option<String>,
    pub workers: Option<usize>,
    pub hash_engine: Option<EngineChoice>,
    pub stale_after: Option<u64>,
    pub target_share_interval: Option<u64>,
    pub initial_local_level: Option<u8>,
    pub once: bool,
}

impl Settings {
    /// Load settings from all sources with proper priority
    pub fn load(options: Options, overrides: Settings) -> Result<Self> {
        let mut env = BTreeMap::<String, String>::new();

        for (var, value) in env::vars_os() {
            let Some(var) = var.to_str() else {
                continue;
            };

            let Some(key) = var.strip_prefix(ENV_PREFIX) else {
                continue;
            };

            env.insert(
                key.into(),
                value.into_string().map_err(|value| {
                    anyhow!(
                        "environment variable `{var}` not valid unicode: `{}`",
                        value.to_string_lossy()
                    )
                })?,
            );
        }

        Self::merge(options, overrides, env)
    }

    pub fn merge(
        options: Options,
        overrides: Settings,
        env: BTreeMap<String, String>,
    ) -> Result<Self> {
        let settings = Self::from_options(&options)
            .or(overrides)
            .or(Self::from_env(&env)?);

        let config = match Self::find_config_path(&settings) {
            Some(path) => toml::from_str(
                &fs::read_to_string(&path)
                    .with_context(|| format!("failed to open config file `{}`", path.display()))?,
            )
            .with_context(|| format!("failed to deserialize config file `{}`", path.display()))?,
            None => Config::default(),
        };

        let settings = settings.or(Self::from_config(&config)).or_defaults();

        settings.validate()?;

        Ok(settings)
    }

    fn find_config_path(settings: &Self) -> Option<PathBuf> {
        if let Some(path) = &settings.config {
            return Some(path.clone());
        }

        if let Some(dir) = &settings.config_dir {
            let path = dir.join(CONFIG_FILE);
            if path.exists() {
                return Some(path);
            }
        }

        let path = dirs::config_dir()?.join("yamuna").join(CONFIG_FILE);

        path.exists().then_some(path)
    }

    pub fn from_options(options: &Options) -> Self {
        Self {
            config: options.config.clone(),
            config_dir: options.config_dir.clone(),
            ..Default::default()
        }
    }

    pub fn from_env(env: &BTreeMap<String, String>) -> Result<Self> {
        fn parse<T>(env: &BTreeMap<String, String>, key: &str) -> Result<Option<T>>
        where
            T: FromStr,
            T::Err: std::error::Error + Send + Sync + 'static,
        {
            env.get(key)
                .map(|value| value.parse::<T>())
                .transpose()
                .with_context(|| format!("failed to parse environment variable {ENV_PREFIX}{key}"))
        }

        let get_bool = |key: &str| {
            env.get(key)
                .map(|value| !value.is_empty() && value != "0" && value.to_lowercase() != "false")
                .unwrap_or_default()
        };

        let hash_engine = env
            .get("HASH_ENGINE")
            .map(|value| value.parse::<EngineChoice>())
            .transpose()
            .with_context(|| {
                format!("failed to parse environment variable {ENV_PREFIX}HASH_ENGINE")
            })?;

        Ok(Self {
            config: env.get("CONFIG").map(PathBuf::from),
            config_dir: env.get("CONFIG_DIR").map(PathBuf::from),
            pool_host: env.get("POOL_HOST").cloned(),
            pool_port: parse(env, "POOL_PORT")?,
            address: env.get("ADDRESS").cloned(),
            password: env.get("PASSWORD").cloned(),
            workers: parse(env, "WORKERS")?,
            hash_engine,
            stale_after: parse(env, "STALE_AFTER")?,
            target_share_interval: parse(env, "TARGET_SHARE_INTERVAL")?,
            initial_local_level: parse(env, "INITIAL_LOCAL_LEVEL")?,
            once: get_bool("ONCE"),
        })
    }

    pub fn from_config(config: &Config) -> Self {
        let Some(miner) = &config.miner else {
            return Self::default();
        };

        Self {
            config: None,
            config_dir: None,
            pool_host: miner.pool_host.clone(),
            pool_port: miner.pool_port,
            address: miner.address.clone(),
            password: miner.password.clone(),
            workers: miner.workers,
            hash_engine: miner.hash_engine,
            stale_after: miner.stale_after,
            target_share_interval: miner.target_share_interval,
            initial_local_level: miner.initial_local_level,
            once: miner.once.unwrap_or_default(),
        }
    }

    /// Merge self with another Settings, self takes priority
    pub fn or(self, other: Self) -> Self {
        Self {
            config: self.config.or(other.config),
            config_dir: self.config_dir.or(other.config_dir),
            pool_host: self.pool_host.or(other.pool_host),
            pool_port: self.pool_port.or(other.pool_port),
            address: self.address.or(other.address),
            password: self.password.or(other.password),
            workers: self.workers.or(other.workers),
            hash_engine: self.hash_engine.or(other.hash_engine),
            stale_after: self.stale_after.or(other.stale_after),
            target_share_interval: self.target_share_interval.or(other.target_share_interval),
            initial_local_level: self.initial_local_level.or(other.initial_local_level),
            once: self.once || other.once,
        }
    }

    fn or_defaults(self) -> Self {
        Self {
            config: self.config,
            config_dir: self.config_dir,
            pool_host: Some(self.pool_host.unwrap_or_else(|| DEFAULT_POOL_HOST.into())),
            pool_port: Some(self.pool_port.unwrap_or(DEFAULT_POOL_PORT)),
            address: self.address,
            password: Some(self.password.unwrap_or_else(|| DEFAULT_PASSWORD.into())),
            workers: self.workers,
            hash_engine: Some(self.hash_engine.unwrap_or_default()),
            stale_after: Some(self.stale_after.unwrap_or(DEFAULT_STALE_AFTER)),
            target_share_interval: Some(
                self.target_share_interval
                    .unwrap_or(DEFAULT_TARGET_SHARE_INTERVAL),
            ),
            initial_local_level: Some(
                self.initial_local_level
                    .unwrap_or(DEFAULT_INITIAL_LOCAL_LEVEL),
            ),
            once: self.once,
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(address) = &self.address {
            ensure!(!address.trim().is_empty(), "worker address must not be empty");
        }

        ensure!(self.pool_port != Some(0), "pool port must not be 0");
        ensure!(self.workers != Some(0), "worker count must be at least 1");

        if let Some(level) = self.initial_local_level {
            ensure!(
                (local_difficulty::MIN_LEVEL..=local_difficulty::MAX_LEVEL).contains(&level),
                "initial local level {level} outside {}..={}",
                local_difficulty::MIN_LEVEL,
                local_difficulty::MAX_LEVEL
            );
        }

        Ok(())
    }

    pub fn pool_host(&self) -> &str {
        self.pool_host.as_deref().unwrap_or(DEFAULT_POOL_HOST)
    }

    pub fn pool_port(&self) -> u16 {
        self.pool_port.unwrap_or(DEFAULT_POOL_PORT)
    }

    pub fn address(&self) -> Result<&str> {
        self.address.as_deref().ok_or_else(|| {
            anyhow!("no worker address configured, pass --address or set {ENV_PREFIX}ADDRESS")
        })
    }

    pub fn password(&self) -> &str {
        self.password.as_deref().unwrap_or(DEFAULT_PASSWORD)
    }

    /// Requested workers clamped to the available cores.
    pub fn workers(&self) -> usize {
        let cores = get_cpu_count();
        self.workers.unwrap_or(cores).clamp(1, cores)
    }

    pub fn hash_engine(&self) -> EngineChoice {
        self.hash_engine.unwrap_or_default()
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after.unwrap_or(DEFAULT_STALE_AFTER))
    }

    pub fn target_share_interval(&self) -> Duration {
        Duration::from_secs(
            self.target_share_interval
                .unwrap_or(DEFAULT_TARGET_SHARE_INTERVAL),
        )
    }

    pub fn initial_local_level(&self) -> u8 {
        self.initial_local_level
            .unwrap_or(DEFAULT_INITIAL_LOCAL_LEVEL)
    }

    pub fn once(&self) -> bool {
        self.once
    }
}

#[cfg(test)]
mod tests {
    use {super::*, pretty_assertions::assert_eq};

    fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    fn config_dir(contents: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), contents).unwrap();
        dir
    }

    fn options_with_config_dir(dir: &tempfile::TempDir) -> Options {
        Options {
            config_dir: Some(dir.path().into()),
            ..Default::default()
        }
    }

    #[test]
    fn settings_from_empty_env() {
        assert_eq!(Settings::from_env(&BTreeMap::new()).unwrap(), Settings::default());
    }

    #[test]
    fn settings_from_env() {
        let settings = Settings::from_env(&env(&[
            ("POOL_HOST", "pool.example.com"),
            ("POOL_PORT", "3333"),
            ("ADDRESS", "bc1qexample.worker"),
            ("WORKERS", "2"),
            ("HASH_ENGINE", "software"),
            ("INITIAL_LOCAL_LEVEL", "4"),
            ("ONCE", "true"),
        ]))
        .unwrap();

        assert_eq!(settings.pool_host.as_deref(), Some("pool.example.com"));
        assert_eq!(settings.pool_port, Some(3333));
        assert_eq!(settings.address.as_deref(), Some("bc1qexample.worker"));
        assert_eq!(settings.workers, Some(2));
        assert_eq!(settings.hash_engine, Some(EngineChoice::Software));
        assert_eq!(settings.initial_local_level, Some(4));
        assert!(settings.once);
    }

    #[test]
    fn bad_env_value() {
        let err = Settings::from_env(&env(&[("POOL_PORT", "huge")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to parse environment variable YAMUNA_POOL_PORT"
        );

        assert!(Settings::from_env(&env(&[("HASH_ENGINE", "gpu")])).is_err());
    }

    #[test]
    fn once_false_values() {
        for value in ["", "0", "false", "FALSE"] {
            assert!(!Settings::from_env(&env(&[("ONCE", value)])).unwrap().once);
        }
    }

    #[test]
    fn merge_priority() {
        let dir = config_dir(
            r#"
            [miner]
            pool_host = "file.example.com"
            pool_port = 1111
            address = "file-address"
            stale_after = 120
            "#,
        );

        let overrides = Settings {
            address: Some("cli-address".into()),
            ..Default::default()
        };

        let settings = Settings::merge(
            options_with_config_dir(&dir),
            overrides,
            env(&[("POOL_PORT", "2222"), ("ADDRESS", "env-address")]),
        )
        .unwrap();

        assert_eq!(settings.address().unwrap(), "cli-address");
        assert_eq!(settings.pool_port(), 2222);
        assert_eq!(settings.pool_host(), "file.example.com");
        assert_eq!(settings.stale_after(), Duration::from_secs(120));
        assert_eq!(settings.password(), "x");
    }

    #[test]
    fn defaults() {
        let dir = tempfile::tempdir().unwrap();

        let settings =
            Settings::merge(options_with_config_dir(&dir), Settings::default(), BTreeMap::new())
                .unwrap();

        assert_eq!(settings.pool_host(), DEFAULT_POOL_HOST);
        assert_eq!(settings.pool_port(), DEFAULT_POOL_PORT);
        assert_eq!(settings.password(), DEFAULT_PASSWORD);
        assert_eq!(settings.hash_engine(), EngineChoice::Auto);
        assert_eq!(settings.stale_after(), Duration::from_secs(300));
        assert_eq!(settings.target_share_interval(), Duration::from_secs(60));
        assert_eq!(settings.initial_local_level(), 2);
        assert!(!settings.once());
        assert!(settings.address().is_err());
        assert!(settings.workers() >= 1);
    }

    #[test]
    fn explicit_config_path() {
        let dir = config_dir("[miner]\naddress = \"from-file\"\nhash_engine = \"accelerated\"\n");

        let settings = Settings::merge(
            Options {
                config: Some(dir.path().join(CONFIG_FILE)),
                ..Default::default()
            },
            Settings::default(),
            BTreeMap::new(),
        )
        .unwrap();

        assert_eq!(settings.address().unwrap(), "from-file");
        assert_eq!(settings.hash_engine(), EngineChoice::Accelerated);
    }

    #[test]
    fn missing_explicit_config_fails() {
        let dir = tempfile::tempdir().unwrap();

        let err = Settings::merge(
            Options {
                config: Some(dir.path().join("missing.toml")),
                ..Default::default()
            },
            Settings::default(),
            BTreeMap::new(),
        )
        .unwrap_err();

        assert!(err.to_string().starts_with("failed to open config file"), "{err}");
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        let dir = config_dir("[miner]\nthrottle = \"1M\"\n");

        assert!(
            Settings::merge(
                options_with_config_dir(&dir),
                Settings::default(),
                BTreeMap::new()
            )
            .is_err()
        );
    }

    #[test]
    fn validation() {
        #[track_caller]
        fn invalid(settings: Settings, message: &str) {
            assert_eq!(settings.validate().unwrap_err().to_string(), message);
        }

        invalid(
            Settings {
                address: Some("  ".into()),
                ..Default::default()
            },
            "worker address must not be empty",
        );

        invalid(
            Settings {
                pool_port: Some(0),
                ..Default::default()
            },
            "pool port must not be 0",
        );

        invalid(
            Settings {
                workers: Some(0),
                ..Default::default()
            },
            "worker count must be at least 1",
        );

        invalid(
            Settings {
                initial_local_level: Some(6),
                ..Default::default()
            },
            "initial local level 6 outside 1..=5",
        );

        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn workers_are_clamped() {
        let settings = Settings {
            workers: Some(usize::MAX),
            ..Default::default()
        };

        assert_eq!(settings.workers(), get_cpu_count());

        let settings = Settings {
            workers: Some(1),
            ..Default::default()
        };

        assert_eq!(settings.workers(), 1);
    }
}
