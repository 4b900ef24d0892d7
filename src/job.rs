use {super::*, snafu::ResultExt};

/// A decoded `mining.notify` bound to the subscription it arrived on. Never mutated; the
/// session swaps in a fresh `Arc<Job>` for every accepted notify.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub prevhash: PrevHash,
    pub coinb1: Vec<u8>,
    pub coinb2: Vec<u8>,
    pub merkle_branches: Vec<MerkleNode>,
    pub version: Version,
    pub nbits: Nbits,
    pub ntime: Ntime,
    pub clean_jobs: bool,
    pub extranonce1: Extranonce,
    pub extranonce2_size: usize,
}

impl Job {
    pub fn from_notify(
        notify: Notify,
        extranonce1: Extranonce,
        extranonce2_size: usize,
    ) -> Result<Self, MinerError> {
        let coinb1 =
            hex_codec::decode(&notify.coinb1).context(MalformedFieldSnafu { field: "coinb1" })?;
        let coinb2 =
            hex_codec::decode(&notify.coinb2).context(MalformedFieldSnafu { field: "coinb2" })?;

        Ok(Self {
            id: notify.job_id,
            prevhash: notify.prevhash,
            coinb1,
            coinb2,
            merkle_branches: notify.merkle_branches,
            version: notify.version,
            nbits: notify.nbits,
            ntime: notify.ntime,
            clean_jobs: notify.clean_jobs,
            extranonce1,
            extranonce2_size,
        })
    }

    pub fn network_target(&self) -> Target {
        self.nbits.network_target()
    }

    pub fn extranonce2(&self, worker: usize, workers: usize, roll: u64) -> Extranonce {
        Extranonce::for_worker(worker, workers, roll, self.extranonce2_size)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use {super::*, serde_json::json};

    pub(crate) fn notify_params() -> Value {
        json!([
            "bf",
            "4d16b6f85af6e2198f44ae2a6de67f78487ae5611b77c6c0440b921e00000000",
            "01000000010000000000000000000000000000000000000000000000000000000000000000ffffffff20020862062f503253482f04b8864e5008",
            "072f736c7573682f000000000100f2052a010000001976a914d23fcdf86f7e756a64a7a9688ef9903327048ed988ac00000000",
            [],
            "00000002",
            "1c2ac4af",
            "504e86b9",
            false
        ])
    }

    pub(crate) fn sample_job() -> Job {
        Job::from_notify(
            serde_json::from_value(notify_params()).unwrap(),
            "08000002".parse().unwrap(),
            4,
        )
        .unwrap()
    }

    #[test]
    fn decodes_coinbase_parts() {
        let job = sample_job();
        assert_eq!(job.id.as_str(), "bf");
        assert_eq!(job.coinb1.len(), 58);
        assert_eq!(job.coinb2.len(), 51);
        assert_eq!(job.extranonce1.as_bytes(), &[0x08, 0x00, 0x00, 0x02]);
        assert!(!job.clean_jobs);
    }

    #[test]
    fn odd_coinbase_is_rejected() {
        let mut notify: Notify = serde_json::from_value(notify_params()).unwrap();
        notify.coinb2.push('0');

        let err = Job::from_notify(notify, "08000002".parse().unwrap(), 4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FieldDecode);
        assert!(err.to_string().starts_with("malformed coinb2"), "{err}");
    }

    #[test]
    fn network_target_from_bits() {
        let job = sample_job();
        let be = job.network_target().to_be_bytes();
        assert_eq!(&be[..7], &[0, 0, 0, 0, 0x2a, 0xc4, 0xaf]);
    }

    #[test]
    fn worker_extranonce2_has_subscription_size() {
        let job = sample_job();
        assert_eq!(job.extranonce2(0, 2, 0).to_hex(), "00000000");
        assert_eq!(job.extranonce2(1, 2, 3).to_hex(), "00000007");
    }
}
