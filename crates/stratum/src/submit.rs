use super::*;

/// `mining.submit` parameters: `[worker, job_id, extranonce2, ntime, nonce]`.
#[derive(Debug, PartialEq, Clone)]
pub struct Submit {
    pub username: String,
    pub job_id: JobId,
    pub extranonce2: Extranonce,
    pub ntime: Ntime,
    pub nonce: Nonce,
}

impl Serialize for Submit {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(5))?;
        seq.serialize_element(&self.username)?;
        seq.serialize_element(&self.job_id)?;
        seq.serialize_element(&self.extranonce2)?;
        seq.serialize_element(&self.ntime)?;
        seq.serialize_element(&self.nonce)?;
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Submit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (username, job_id, extranonce2, ntime, nonce) =
            <(String, JobId, Extranonce, Ntime, Nonce)>::deserialize(deserializer)?;

        Ok(Submit {
            username,
            job_id,
            extranonce2,
            ntime,
            nonce,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn case(json: &str, expected: Submit) {
        let parsed: Submit = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, expected, "deserialize equality");

        let ser = serde_json::to_string(&parsed).unwrap();
        let lhs: Value = serde_json::from_str(json).unwrap();
        let rhs: Value = serde_json::from_str(&ser).unwrap();
        assert_eq!(lhs, rhs, "semantic JSON equality");
    }

    #[test]
    fn submit_roundtrip() {
        case(
            r#"["slush.miner1","bf","00000001","504e86ed","b2957c02"]"#,
            Submit {
                username: "slush.miner1".into(),
                job_id: "bf".parse().unwrap(),
                extranonce2: "00000001".parse().unwrap(),
                ntime: Ntime::from_str("504e86ed").unwrap(),
                nonce: Nonce::from_str("b2957c02").unwrap(),
            },
        );
    }

    #[test]
    fn submit_serialize_shape() {
        let submit = Submit {
            username: "u".into(),
            job_id: "j".parse().unwrap(),
            extranonce2: "01".parse().unwrap(),
            ntime: Ntime::from(0),
            nonce: Nonce::from(0x98a4),
        };

        assert_eq!(
            serde_json::to_value(&submit).unwrap(),
            serde_json::json!(["u", "j", "01", "00000000", "000098a4"])
        );
    }

    #[test]
    fn submit_reject_bad_arity() {
        assert!(serde_json::from_str::<Submit>(r#"["u","j","01","00000000"]"#).is_err());
        assert!(
            serde_json::from_str::<Submit>(r#"["u","j","01","00000000","00000000","ffffffff"]"#)
                .is_err()
        );
    }
}
