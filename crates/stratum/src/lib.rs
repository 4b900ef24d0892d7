use {
    bitcoin::{
        BlockHash, CompactTarget, Target, block,
        hashes::Hash,
    },
    byteorder::{BigEndian, ByteOrder, LittleEndian},
    derive_more::Display,
    serde::{
        Deserialize, Serialize, Serializer,
        de::{self, Deserializer},
        ser::SerializeSeq,
    },
    serde_json::Value,
    serde_with::{DeserializeFromStr, SerializeDisplay},
    snafu::{ResultExt, Snafu},
    std::{
        fmt::{self, Formatter},
        str::FromStr,
        sync::LazyLock,
    },
};

pub use {
    authorize::Authorize,
    difficulty::Difficulty,
    error::{InternalError, JsonRpcError, Result},
    extranonce::Extranonce,
    job_id::JobId,
    merkle::MerkleNode,
    message::{Id, Message},
    nbits::Nbits,
    nonce::Nonce,
    notify::Notify,
    ntime::Ntime,
    prevhash::PrevHash,
    set_difficulty::SetDifficulty,
    submit::Submit,
    subscribe::{Subscribe, SubscribeResult},
    version::Version,
};

pub const MAX_MESSAGE_SIZE: usize = 32 * 1024;

pub mod hex_codec;

mod authorize;
mod difficulty;
mod error;
mod extranonce;
mod job_id;
mod merkle;
mod message;
mod nbits;
mod nonce;
mod notify;
mod ntime;
mod prevhash;
mod set_difficulty;
mod submit;
mod subscribe;
mod version;

/// Header words travel as exactly eight hex digits, most significant first.
fn parse_word(s: &str) -> Result<u32> {
    hex_codec::decode_array::<4>(s).map(u32::from_be_bytes)
}
