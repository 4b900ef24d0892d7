use super::*;

#[derive(Debug, PartialEq, Clone)]
pub struct Subscribe {
    pub user_agent: String,
}

impl Serialize for Subscribe {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(1))?;
        seq.serialize_element(&self.user_agent)?;
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Subscribe {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let params = Vec::<Value>::deserialize(deserializer)?;

        let user_agent = match params.first() {
            Some(Value::String(user_agent)) => user_agent.clone(),
            Some(other) => {
                return Err(de::Error::custom(format!(
                    "user agent must be a string, got {other}"
                )));
            }
            None => String::new(),
        };

        Ok(Subscribe { user_agent })
    }
}

/// `[subscriptions, extranonce1, extranonce2_size]`. Pools disagree on the shape of the
/// subscription list, so it is kept as raw JSON.
#[derive(Debug, PartialEq, Clone)]
pub struct SubscribeResult {
    pub subscriptions: Value,
    pub extranonce1: Extranonce,
    pub extranonce2_size: u32,
}

impl Serialize for SubscribeResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(3))?;
        seq.serialize_element(&self.subscriptions)?;
        seq.serialize_element(&self.extranonce1)?;
        seq.serialize_element(&self.extranonce2_size)?;
        seq.end()
    }
}

impl<'de> Deserialize<'de> for SubscribeResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (subscriptions, extranonce1, extranonce2_size) =
            <(Value, Extranonce, u32)>::deserialize(deserializer)?;

        Ok(SubscribeResult {
            subscriptions,
            extranonce1,
            extranonce2_size,
        })
    }
}
