use super::*;

#[derive(Debug, PartialEq, Clone)]
pub struct Notify {
    pub job_id: JobId,
    pub prevhash: PrevHash,
    pub coinb1: String,
    pub coinb2: String,
    pub merkle_branches: Vec<MerkleNode>,
    pub version: Version,
    pub nbits: Nbits,
    pub ntime: Ntime,
    pub clean_jobs: bool,
}

impl Serialize for Notify {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(9))?;
        seq.serialize_element(&self.job_id)?;
        seq.serialize_element(&self.prevhash)?;
        seq.serialize_element(&self.coinb1)?;
        seq.serialize_element(&self.coinb2)?;
        seq.serialize_element(&self.merkle_branches)?;
        seq.serialize_element(&self.version)?;
        seq.serialize_element(&self.nbits)?;
        seq.serialize_element(&self.ntime)?;
        seq.serialize_element(&self.clean_jobs)?;
        seq.end()
    }
}

/// Pools occasionally append extra parameters after `clean_jobs`; those are ignored.
impl<'de> Deserialize<'de> for Notify {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let params = Vec::<Value>::deserialize(deserializer)?;

        if params.len() < 9 {
            return Err(de::Error::invalid_length(
                params.len(),
                &"at least 9 notify parameters",
            ));
        }

        let mut params = params.into_iter();

        Ok(Notify {
            job_id: field(params.next(), "job_id").map_err(de::Error::custom)?,
            prevhash: field(params.next(), "prevhash").map_err(de::Error::custom)?,
            coinb1: field(params.next(), "coinb1").map_err(de::Error::custom)?,
            coinb2: field(params.next(), "coinb2").map_err(de::Error::custom)?,
            merkle_branches: field(params.next(), "merkle_branches").map_err(de::Error::custom)?,
            version: field(params.next(), "version").map_err(de::Error::custom)?,
            nbits: field(params.next(), "nbits").map_err(de::Error::custom)?,
            ntime: field(params.next(), "ntime").map_err(de::Error::custom)?,
            clean_jobs: field(params.next(), "clean_jobs").map_err(de::Error::custom)?,
        })
    }
}

fn field<T: de::DeserializeOwned>(value: Option<Value>, name: &str) -> Result<T, String> {
    let value = value.ok_or_else(|| format!("missing {name}"))?;
    serde_json::from_value(value).map_err(|err| format!("invalid {name}: {err}"))
}
