use super::*;

mod bench;
mod miner;

#[derive(Debug, Parser)]
pub(crate) enum Subcommand {
    #[command(about = "Mine on a Stratum V1 pool")]
    Miner(miner::MinerCommand),
    #[command(about = "Measure hash engine throughput")]
    Bench(bench::Bench),
}

impl Subcommand {
    /// Settings given as flags on the subcommand. These outrank every other source.
    pub(crate) fn overrides(&self) -> Settings {
        match self {
            Self::Miner(miner) => miner.overrides(),
            Self::Bench(_) => Settings::default(),
        }
    }

    pub(crate) async fn run(self, settings: Settings, cancel_token: CancellationToken) -> Result {
        match self {
            Self::Miner(miner) => miner.run(settings, cancel_token).await,
            Self::Bench(bench) => bench.run(cancel_token).await,
        }
    }
}
