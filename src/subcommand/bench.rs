use {super::*, anyhow::Context};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Measurement {
    pub engine: String,
    pub hashes: u64,
    pub seconds: f64,
    pub hash_rate: f64,
}

#[derive(Debug, Parser)]
pub(crate) struct Bench {
    #[arg(
        long,
        default_value_t = 1_000_000,
        help = "Hash <HASHES> block headers per engine."
    )]
    hashes: u64,
}

impl Bench {
    pub(crate) async fn run(self, cancel_token: CancellationToken) -> Result {
        let mut measurements = Vec::new();

        for engine in [HashEngine::Software, HashEngine::Accelerated] {
            if cancel_token.is_cancelled() {
                break;
            }

            let hashes = self.hashes;

            let measurement = tokio::task::spawn_blocking(move || measure(engine, hashes))
                .await
                .context("benchmark thread failed")?;

            info!(
                "{} engine: {} over {} hashes",
                measurement.engine,
                HashRate(measurement.hash_rate),
                measurement.hashes
            );

            measurements.push(measurement);
        }

        println!("{}", serde_json::to_string_pretty(&measurements)?);

        Ok(())
    }
}

/// Double SHA-256 of an all-zero header, varying the nonce, as the workers do.
fn measure(engine: HashEngine, hashes: u64) -> Measurement {
    let mut hasher = HeaderHasher::new(engine, &[0; 80]);

    let start = Instant::now();

    let mut nonce = 0u32;
    for _ in 0..hashes {
        std::hint::black_box(hasher.hash_with_nonce(nonce));
        nonce = nonce.wrapping_add(1);
    }

    let elapsed = start.elapsed();

    Measurement {
        engine: engine.to_string(),
        hashes,
        seconds: elapsed.as_secs_f64(),
        hash_rate: HashRate::measure(hashes, elapsed).0,
    }
}
