use super::*;

/// Assembles the 80-byte block header for a job and a worker's extranonce2.
#[derive(Debug, Clone, Copy)]
pub struct BlockHeaderBuilder {
    engine: HashEngine,
}

impl BlockHeaderBuilder {
    pub fn new(engine: HashEngine) -> Self {
        Self { engine }
    }

    /// `coinb1 || extranonce1 || extranonce2 || coinb2`
    pub fn coinbase(&self, job: &Job, extranonce2: &Extranonce) -> Result<Vec<u8>, MinerError> {
        if extranonce2.len() != job.extranonce2_size {
            return Err(MinerError::MalformedField {
                field: "extranonce2",
                source: stratum::InternalError::InvalidLength {
                    expected: job.extranonce2_size,
                    actual: extranonce2.len(),
                },
            });
        }

        let mut coinbase = Vec::with_capacity(
            job.coinb1.len() + job.extranonce1.len() + extranonce2.len() + job.coinb2.len(),
        );

        coinbase.extend_from_slice(&job.coinb1);
        coinbase.extend_from_slice(job.extranonce1.as_bytes());
        coinbase.extend_from_slice(extranonce2.as_bytes());
        coinbase.extend_from_slice(&job.coinb2);

        Ok(coinbase)
    }

    /// Folds the coinbase hash up the branch. The result is in internal byte order, which is
    /// the order the header stores it in.
    pub fn merkle_root(&self, job: &Job, extranonce2: &Extranonce) -> Result<[u8; 32], MinerError> {
        let mut root = self.engine.double_hash(&self.coinbase(job, extranonce2)?);

        let mut concat = [0u8; 64];
        for node in &job.merkle_branches {
            concat[..32].copy_from_slice(&root);
            concat[32..].copy_from_slice(node.as_bytes());
            root = self.engine.double_hash(&concat);
        }

        Ok(root)
    }

    /// Header with the nonce field zeroed, for patching bytes 76..80 per candidate.
    pub fn template(&self, job: &Job, extranonce2: &Extranonce) -> Result<[u8; 80], MinerError> {
        let merkle_root = self.merkle_root(job, extranonce2)?;

        let mut header = [0u8; 80];
        header[0..4].copy_from_slice(&job.version.to_header_bytes());
        header[4..36].copy_from_slice(&job.prevhash.to_header_bytes());
        header[36..68].copy_from_slice(&merkle_root);
        header[68..72].copy_from_slice(&u32::from(job.ntime).to_le_bytes());
        header[72..76].copy_from_slice(&job.nbits.to_compact().to_consensus().to_le_bytes());

        Ok(header)
    }

    pub fn build(
        &self,
        job: Option<&Job>,
        extranonce2: &Extranonce,
        nonce: u32,
    ) -> Result<[u8; 80], MinerError> {
        let job = job.ok_or(MinerError::IncompleteJob)?;

        let mut header = self.template(job, extranonce2)?;
        header[76..80].copy_from_slice(&nonce.to_le_bytes());

        Ok(header)
    }
}
