//! SHA-256 with two interchangeable compression backends. `Software` is a portable
//! implementation, `Accelerated` goes through `sha2`, which dispatches to the CPU's SHA
//! extensions when present. Both must produce identical digests.

use {
    super::*,
    sha2::{
        compress256,
        digest::generic_array::{GenericArray, typenum::U64},
    },
};

const INITIAL_STATE: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

const ROUND_CONSTANTS: [u32; 64] = [
    0x428a2f98, 0x71374491, 0xb5c0fbcf, 0xe9b5dba5, 0x3956c25b, 0x59f111f1, 0x923f82a4, 0xab1c5ed5,
    0xd807aa98, 0x12835b01, 0x243185be, 0x550c7dc3, 0x72be5d74, 0x80deb1fe, 0x9bdc06a7, 0xc19bf174,
    0xe49b69c1, 0xefbe4786, 0x0fc19dc6, 0x240ca1cc, 0x2de92c6f, 0x4a7484aa, 0x5cb0a9dc, 0x76f988da,
    0x983e5152, 0xa831c66d, 0xb00327c8, 0xbf597fc7, 0xc6e00bf3, 0xd5a79147, 0x06ca6351, 0x14292967,
    0x27b70a85, 0x2e1b2138, 0x4d2c6dfc, 0x53380d13, 0x650a7354, 0x766a0abb, 0x81c2c92e, 0x92722c85,
    0xa2bfe8a1, 0xa81a664b, 0xc24b8b70, 0xc76c51a3, 0xd192e819, 0xd6990624, 0xf40e3585, 0x106aa070,
    0x19a4c116, 0x1e376c08, 0x2748774c, 0x34b0bcb5, 0x391c0cb3, 0x4ed8aa4a, 0x5b9cca4f, 0x682e6ff3,
    0x748f82ee, 0x78a5636f, 0x84c87814, 0x8cc70208, 0x90befffa, 0xa4506ceb, 0xbef9a3f7, 0xc67178f2,
];

const BLOCK_LEN: usize = 64;

/// Engine selection as written in configuration.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum EngineChoice {
    #[default]
    #[display("auto")]
    Auto,
    #[display("software")]
    Software,
    #[display("accelerated")]
    Accelerated,
}

impl FromStr for EngineChoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "software" => Ok(Self::Software),
            "accelerated" => Ok(Self::Accelerated),
            other => bail!("unknown hash engine `{other}`, expected auto, software or accelerated"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum HashEngine {
    #[display("software")]
    Software,
    #[display("accelerated")]
    Accelerated,
}

impl HashEngine {
    /// Accelerated when the CPU advertises SHA instructions.
    pub fn detect() -> Self {
        if sha_extensions_available() {
            Self::Accelerated
        } else {
            Self::Software
        }
    }

    pub fn select(choice: EngineChoice) -> Self {
        match choice {
            EngineChoice::Auto => Self::detect(),
            EngineChoice::Software => Self::Software,
            EngineChoice::Accelerated => Self::Accelerated,
        }
    }

    /// One SHA-256 compression of a 64-byte block into `state`.
    pub fn compress(self, state: &mut [u32; 8], block: &[u8]) {
        debug_assert_eq!(block.len(), BLOCK_LEN);

        match self {
            Self::Software => software_compress(state, block),
            Self::Accelerated => {
                let block: &GenericArray<u8, U64> = GenericArray::from_slice(block);
                compress256(state, std::slice::from_ref(block));
            }
        }
    }

    pub fn hash(self, data: &[u8]) -> [u8; 32] {
        let mut state = INITIAL_STATE;

        let mut blocks = data.chunks_exact(BLOCK_LEN);

        for block in &mut blocks {
            self.compress(&mut state, block);
        }

        let remainder = blocks.remainder();

        let mut tail = [0u8; 2 * BLOCK_LEN];
        tail[..remainder.len()].copy_from_slice(remainder);
        tail[remainder.len()] = 0x80;

        let tail_len = if remainder.len() < BLOCK_LEN - 8 {
            BLOCK_LEN
        } else {
            2 * BLOCK_LEN
        };

        let bit_len = (data.len() as u64).wrapping_mul(8);
        BigEndian::write_u64(&mut tail[tail_len - 8..tail_len], bit_len);

        for block in tail[..tail_len].chunks_exact(BLOCK_LEN) {
            self.compress(&mut state, block);
        }

        state_to_bytes(&state)
    }

    pub fn double_hash(self, data: &[u8]) -> [u8; 32] {
        self.hash(&self.hash(data))
    }

    /// Proof-of-work hash of a serialized header, in internal byte order.
    pub fn bitcoin_header_hash(self, header: &[u8; 80]) -> [u8; 32] {
        self.double_hash(header)
    }
}

/// Double SHA-256 of an 80-byte header where only the nonce changes between calls. The first
/// 64 bytes are compressed once up front.
#[derive(Debug, Clone)]
pub struct HeaderHasher {
    engine: HashEngine,
    midstate: [u32; 8],
    tail: [u8; BLOCK_LEN],
    second: [u8; BLOCK_LEN],
}

impl HeaderHasher {
    pub fn new(engine: HashEngine, header: &[u8; 80]) -> Self {
        let mut midstate = INITIAL_STATE;
        engine.compress(&mut midstate, &header[..BLOCK_LEN]);

        let mut tail = [0u8; BLOCK_LEN];
        tail[..16].copy_from_slice(&header[BLOCK_LEN..]);
        tail[16] = 0x80;
        BigEndian::write_u64(&mut tail[56..], 640);

        let mut second = [0u8; BLOCK_LEN];
        second[32] = 0x80;
        BigEndian::write_u64(&mut second[56..], 256);

        Self {
            engine,
            midstate,
            tail,
            second,
        }
    }

    pub fn hash_with_nonce(&mut self, nonce: u32) -> [u8; 32] {
        self.tail[12..16].copy_from_slice(&nonce.to_le_bytes());

        let mut state = self.midstate;
        self.engine.compress(&mut state, &self.tail);

        for (chunk, word) in self.second[..32].chunks_exact_mut(4).zip(state) {
            BigEndian::write_u32(chunk, word);
        }

        let mut state = INITIAL_STATE;
        self.engine.compress(&mut state, &self.second);

        state_to_bytes(&state)
    }
}

fn state_to_bytes(state: &[u32; 8]) -> [u8; 32] {
    let mut digest = [0u8; 32];
    BigEndian::write_u32_into(state, &mut digest);
    digest
}

fn software_compress(state: &mut [u32; 8], block: &[u8]) {
    let mut w = [0u32; 64];
    BigEndian::read_u32_into(block, &mut w[..16]);

    for i in 16..64 {
        let s0 = w[i - 15].rotate_right(7) ^ w[i - 15].rotate_right(18) ^ (w[i - 15] >> 3);
        let s1 = w[i - 2].rotate_right(17) ^ w[i - 2].rotate_right(19) ^ (w[i - 2] >> 10);
        w[i] = w[i - 16]
            .wrapping_add(s0)
            .wrapping_add(w[i - 7])
            .wrapping_add(s1);
    }

    let [mut a, mut b, mut c, mut d, mut e, mut f, mut g, mut h] = *state;

    for (k, w) in ROUND_CONSTANTS.iter().zip(w) {
        let s1 = e.rotate_right(6) ^ e.rotate_right(11) ^ e.rotate_right(25);
        let ch = (e & f) ^ (!e & g);
        let t1 = h
            .wrapping_add(s1)
            .wrapping_add(ch)
            .wrapping_add(*k)
            .wrapping_add(w);
        let s0 = a.rotate_right(2) ^ a.rotate_right(13) ^ a.rotate_right(22);
        let maj = (a & b) ^ (a & c) ^ (b & c);
        let t2 = s0.wrapping_add(maj);

        h = g;
        g = f;
        f = e;
        e = d.wrapping_add(t1);
        d = c;
        c = b;
        b = a;
        a = t1.wrapping_add(t2);
    }

    for (word, value) in state.iter_mut().zip([a, b, c, d, e, f, g, h]) {
        *word = word.wrapping_add(value);
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn sha_extensions_available() -> bool {
    is_x86_feature_detected!("sha") && is_x86_feature_detected!("sse4.1")
}

#[cfg(target_arch = "aarch64")]
fn sha_extensions_available() -> bool {
    std::arch::is_aarch64_feature_detected!("sha2")
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
fn sha_extensions_available() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use {super::*, sha2::Digest};

    const ENGINES: [HashEngine; 2] = [HashEngine::Software, HashEngine::Accelerated];

    #[track_caller]
    fn case(input: &[u8], expected: &str) {
        for engine in ENGINES {
            assert_eq!(
                hex::encode(engine.hash(input)),
                expected,
                "{engine} engine, {} byte input",
                input.len()
            );
        }
    }

    #[test]
    fn sha256_vectors() {
        case(
            b"",
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        );
        case(
            b"abc",
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
        );
        case(
            b"abcdbcdecdefdefgefghfghighijhijkijkljklmklmnlmnomnopnopq",
            "248d6a61d20638b8e5c026930c3e6039a33ce45964ff2167f6ecedd419db06c1",
        );
        case(
            b"abcdefghbcdefghicdefghijdefghijkefghijklfghijklmghijklmnhijklmnoijklmnopjklmnopqklmnopqrlmnopqrsmnopqrstnopqrstu",
            "cf5b16a778af8380036ce59e7b0492370b249b11e8f07a51afac45037afee9d1",
        );
    }

    #[test]
    fn sha256_million_a() {
        case(
            &vec![b'a'; 1_000_000],
            "cdc76e5c9914fb9281a1c7e284d73e67f1809a48a497200e046d39ccc7112cd0",
        );
    }

    #[test]
    fn double_hash_vectors() {
        for engine in ENGINES {
            assert_eq!(
                hex::encode(engine.double_hash(b"abc")),
                "4f8b42c22dd3729b519ba6f68d2da7cc5b2d606d05daed5ad5128cc03e6c6358"
            );
            assert_eq!(
                hex::encode(engine.double_hash(b"")),
                "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
            );
        }
    }

    #[test]
    fn zero_header_hash() {
        for engine in ENGINES {
            assert_eq!(
                hex::encode(engine.bitcoin_header_hash(&[0; 80])),
                "4be7570e8f70eb093640c8468274ba759745a7aa2b7d25ab1e0421b259845014"
            );
        }
    }

    #[test]
    fn double_hash_is_hash_of_hash() {
        for len in [0, 1, 55, 56, 63, 64, 65, 80, 119, 120, 128, 200] {
            let data = (0..len).map(|i| (i * 7 + 3) as u8).collect::<Vec<u8>>();

            for engine in ENGINES {
                assert_eq!(engine.double_hash(&data), engine.hash(&engine.hash(&data)));
            }
        }
    }

    #[test]
    fn engines_agree_with_reference() {
        for len in 0..300 {
            let data = (0..len).map(|i| (i * 31 + 11) as u8).collect::<Vec<u8>>();
            let reference: [u8; 32] = sha2::Sha256::digest(&data).into();

            assert_eq!(HashEngine::Software.hash(&data), reference, "len {len}");
            assert_eq!(HashEngine::Accelerated.hash(&data), reference, "len {len}");
        }
    }

    #[test]
    fn midstate_matches_full_hash() {
        let mut header = [0u8; 80];
        for (i, byte) in header.iter_mut().enumerate() {
            *byte = (i as u8).wrapping_mul(13);
        }

        for engine in ENGINES {
            let mut hasher = HeaderHasher::new(engine, &header);

            for nonce in [0, 1, 0x1234, 0x98a4, 0xb2957c02, u32::MAX] {
                let mut full = header;
                full[76..].copy_from_slice(&nonce.to_le_bytes());

                assert_eq!(
                    hasher.hash_with_nonce(nonce),
                    engine.bitcoin_header_hash(&full),
                    "{engine} nonce {nonce:#x}"
                );
            }
        }
    }

    #[test]
    fn select_honors_choice() {
        assert_eq!(
            HashEngine::select(EngineChoice::Software),
            HashEngine::Software
        );
        assert_eq!(
            HashEngine::select(EngineChoice::Accelerated),
            HashEngine::Accelerated
        );
        assert_eq!(HashEngine::select(EngineChoice::Auto), HashEngine::detect());
    }

    #[test]
    fn engine_choice_from_str() {
        assert_eq!(
            "Software".parse::<EngineChoice>().unwrap(),
            EngineChoice::Software
        );
        assert_eq!("auto".parse::<EngineChoice>().unwrap(), EngineChoice::Auto);
        assert!("gpu".parse::<EngineChoice>().is_err());
        assert_eq!(EngineChoice::Accelerated.to_string(), "accelerated");
    }
}
