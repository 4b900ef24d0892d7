use super::*;

/// Pool-assigned job identifier. Opaque to the miner, echoed back on submit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, DeserializeFromStr, SerializeDisplay)]
pub struct JobId(String);

impl JobId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for JobId {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(InternalError::InvalidValue {
                reason: "job id must not be empty".into(),
            });
        }

        Ok(JobId(s.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_is_opaque() {
        for id in ["bf", "0", "662ede", "job-1/a"] {
            let job_id = id.parse::<JobId>().unwrap();
            assert_eq!(job_id.to_string(), id);
            assert_eq!(job_id.as_str(), id);
        }
    }

    #[test]
    fn empty_job_id_is_rejected() {
        assert!("".parse::<JobId>().is_err());
        assert!(serde_json::from_str::<JobId>(r#""""#).is_err());
    }

    #[test]
    fn job_id_serde_json() {
        let id = "deadbeef".parse::<JobId>().unwrap();
        let s = serde_json::to_string(&id).unwrap();
        assert_eq!(s, "\"deadbeef\"");
        let back: JobId = serde_json::from_str(&s).unwrap();
        assert_eq!(back, id);
    }
}
