use {
    command_builder::CommandBuilder,
    futures::{sink::SinkExt, stream::StreamExt},
    pretty_assertions::assert_eq as pretty_assert_eq,
    serde_json::{Value, json},
    std::{
        process::{Child, Command, Stdio},
        sync::Arc,
        time::Duration,
    },
    stratum::Message,
    tempfile::TempDir,
    test_pool::TestPool,
    to_args::ToArgs,
    tokio::{
        net::TcpListener,
        sync::mpsc,
        task::JoinHandle,
        time::timeout,
    },
    tokio_util::{
        codec::{FramedRead, FramedWrite, LinesCodec},
        sync::CancellationToken,
    },
    yamuna::{EngineChoice, Miner, Settings, Stats},
};


mod miner;

const ADDRESS: &str = "bc1q8jx6g9ujlqmdx3jnt3ap6ll2fdwqjdkdgs959m.worker1";

/// 2^-16, low enough that the first share on the sample job is at nonce 0x71bf.
const EASY_DIFFICULTY: f64 = 0.0000152587890625;
