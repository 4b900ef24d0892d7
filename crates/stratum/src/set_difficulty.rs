use super::*;

#[derive(Debug, PartialEq, Clone, Copy)]
pub struct SetDifficulty(pub Difficulty);

impl SetDifficulty {
    pub fn difficulty(&self) -> Difficulty {
        self.0
    }
}

impl Serialize for SetDifficulty {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(1))?;
        seq.serialize_element(&self.0)?;
        seq.end()
    }
}

impl<'de> Deserialize<'de> for SetDifficulty {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let params = Vec::<Value>::deserialize(deserializer)?;

        let first = params
            .into_iter()
            .next()
            .ok_or_else(|| de::Error::invalid_length(0, &"a difficulty"))?;

        serde_json::from_value(first)
            .map(SetDifficulty)
            .map_err(de::Error::custom)
    }
}
