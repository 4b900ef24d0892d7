use {
    anyhow::{Error, anyhow, bail, ensure},
    arguments::Arguments,
    async_trait::async_trait,
    bitcoin::{BlockHash, Target, hashes::Hash},
    byteorder::{BigEndian, ByteOrder},
    clap::{Parser, ValueEnum},
    decay::DecayingAverage,
    derive_more::Display,
    error::{
        BackoffSnafu, ConnectSnafu, ConnectTimeoutSnafu, LinkBusySnafu, MalformedFieldSnafu,
        SerializeSnafu,
    },
    futures::{sink::SinkExt, stream::StreamExt},
    hashrate::HashRate,
    serde::{Deserialize, Serialize},
    serde_json::Value,
    snafu::Snafu,
    std::{
        collections::BTreeMap,
        env,
        fmt::{self, Formatter},
        fs, io,
        path::PathBuf,
        process,
        str::FromStr,
        sync::{
            Arc,
            atomic::{AtomicBool, AtomicU64, Ordering},
        },
        thread,
        time::{Duration, Instant},
    },
    stratum::{
        Authorize, Difficulty, Extranonce, Id, JobId, MerkleNode, Message, Nbits, Nonce, Notify,
        Ntime, PrevHash, SetDifficulty, Submit, Subscribe, SubscribeResult, Version, hex_codec,
    },
    tokio::{
        net::{
            TcpStream,
            tcp::{OwnedReadHalf, OwnedWriteHalf},
        },
        runtime::{Handle, Runtime},
        task::JoinSet,
        time::{MissedTickBehavior, interval, timeout},
    },
    tokio_util::{
        codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError},
        sync::CancellationToken,
    },
    tracing::{debug, error, info, warn},
};

pub use {
    error::{ErrorKind, MinerError},
    hash_engine::{EngineChoice, HashEngine, HeaderHasher},
    header::BlockHeaderBuilder,
    job::Job,
    local_difficulty::DifficultyController,
    metrics::{Metrics, Stats},
    miner::Miner,
    pool_link::{Connector, LinkGuard, PoolLink, TcpConnector},
    session::{SessionState, StratumSession},
    settings::Settings,
    worker::{Classification, CycleOutcome, MiningWorker, NonceRange, Scanner},
};

mod arguments;
mod decay;
mod error;
pub mod hash_engine;
pub mod hashrate;
mod header;
mod job;
pub mod local_difficulty;
mod logs;
mod metrics;
mod miner;
mod monitor;
mod options;
mod pool_link;
mod session;
pub mod settings;
mod signal;
mod subcommand;
mod system_utils;
pub mod worker;

pub const USER_AGENT: &str = concat!("yamuna/", env!("CARGO_PKG_VERSION"));

type Result<T = (), E = Error> = std::result::Result<T, E>;

pub fn main() {
    let guard = logs::init();

    let args = Arguments::parse();

    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: failed to create tokio runtime: {err}");
            process::exit(1);
        }
    };

    let code = runtime.block_on(async {
        let cancel_token = signal::setup_signal_handler();

        match args.run(cancel_token).await {
            Err(err) => {
                eprintln!("error: {err}");

                for (i, cause) in err.chain().skip(1).enumerate() {
                    if i == 0 {
                        eprintln!();
                        eprintln!("because:");
                    }
                    eprintln!("- {cause}");
                }

                if env::var_os("RUST_BACKTRACE")
                    .map(|val| val == "1")
                    .unwrap_or_default()
                {
                    eprintln!();
                    eprintln!("{}", err.backtrace());
                }

                1
            }
            Ok(()) => 0,
        }
    });

    drop(runtime);
    drop(guard);

    process::exit(code);
}
