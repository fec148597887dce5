//! Test fixtures and helpers.
//!
//! A known-good envelope minted by an external log, plus helpers for
//! standing up an in-memory log with a signer and a matching verifier.

use std::sync::Arc;

use spicy::{Policy, RecordFormat, Signer, SignerConfig, SpicySignature, Verifier, VerifierConfig};
use spicy_core::{KeyAlgorithm, NoteSigner, NoteVerifier};
use spicy_log::{MemoryLog, MemoryLogConfig};

macro_rules! fixture_envelope {
    () => {
        "c2sp.org/spicy-signature@v1\n\
index 100252\n\
+4IF875THRSj6IOZo2SRpgL6buVI/cawB2iLGFLgWDQ=\n\
nBeqO1BayYMNXX05jMGGtCfprprlSVASVTUUwA0OC9E=\n\
zpUmeEe94VcV/jft8wYlUcDx9yr2kff2jq9QW295vhw=\n\
DTWvScrZyztZdQo5YhJ2Sioo6xDCRDgnoxJJJhN5vl0=\n\
550NhxNMkqzfWFptIePTfVic0rHovJMectLfzaLgh5U=\n\
aoGmNLa5zDVavVfeWhrAxU3duQ0m2TB489dVEGmquO8=\n\
Sbbxxj/8zvCs1q23zn+3wxE9OfJyqVtajvLlvg4FOaI=\n\
WuiUqI+eMKiZ4OUa9CORDO64u91gs7kbTzQYw/e/Khg=\n\
nxkvRAG/1vChJgwuphcHSaCBWcBXebV52Nd3sGxP2kI=\n\
8xVjSf6ZkYSabrgN8m3ePiWgQSpafmz8FXTCfv7guck=\n\
uIkQsFgLVnAeDt5KgZP6l3eJ6YzFz2p92KwlA50Ea5Q=\n\
8SliMOQ4QRiNiRzAt4iEDvrOC0ETwRssbnOdutGqPhA=\n\
\n\
example.com/log/testdata\n\
100270\n\
GRV1O0dCqmjjPvYi7CtOT79zb/fPwLNsMFWsynwU8Ac=\n\
\n\
\u{2014} example.com/log/testdata M9e0lkcvy5bAe7rrC8tCyAP+my+CLzswA91zOpBNWVU7qCojkUOHnfdQzDImoYeYH8G8PJSwOqsx0RkSa261OmKVwwM=\n"
    };
}

/// Envelope for record 100252 of `example.com/log/testdata`, no hint.
pub const FIXTURE_ENVELOPE: &str = fixture_envelope!();

/// The same envelope with context hint `"hello there\n"`.
pub const FIXTURE_ENVELOPE_WITH_HINT: &str =
    concat!(fixture_envelope!(), "\ncontexthint\nhello there\n");

/// Body logged at the fixture index. The fixture log stored bodies bare.
pub const FIXTURE_BODY: &[u8] = b"entry-100252-data-f8e847551052084e98";

pub const FIXTURE_INDEX: u64 = 100252;
pub const FIXTURE_TREE_SIZE: u64 = 100270;
pub const FIXTURE_ORIGIN: &str = "example.com/log/testdata";

/// Verifier key of the fixture log.
pub const FIXTURE_VKEY: &str =
    "example.com/log/testdata+33d7b496+AeHTu4Q3hEIMHNqc6fASMsq3rKNx280NI+oO5xCFkkSx";

/// Signer key of the fixture log.
pub const FIXTURE_SKEY: &str =
    "PRIVATE+KEY+example.com/log/testdata+33d7b496+AeymY/SZAX0jZcJ8enZ5FY1Dz+wTML2yWSkK+9DSF3eg";

/// The fixture log's verifier.
pub fn fixture_log_verifier() -> NoteVerifier {
    NoteVerifier::parse(FIXTURE_VKEY).expect("fixture verifier key should parse")
}

/// Signed by the fixture log and carrying its origin.
pub fn fixture_policy() -> Policy {
    Policy::All(vec![
        Policy::SignedBy(fixture_log_verifier()),
        Policy::Origin(FIXTURE_ORIGIN.to_string()),
    ])
}

/// A verifier able to check the fixture envelopes.
pub fn fixture_verifier() -> Verifier {
    Verifier::new(
        fixture_policy(),
        VerifierConfig {
            record_format: RecordFormat::Bare,
        },
    )
}

/// An in-memory log with a signer and verifier wired to it.
pub struct TestLog {
    pub log: Arc<MemoryLog>,
    pub signer: Signer<MemoryLog, MemoryLog, MemoryLog>,
}

impl TestLog {
    /// A log named `log.example` with a deterministic key.
    pub fn new() -> Self {
        Self::with_config("log.example", [0x42; 32], MemoryLogConfig::default(), SignerConfig::default())
    }

    /// Fully configurable constructor.
    pub fn with_config(
        origin: &str,
        seed: [u8; 32],
        log_config: MemoryLogConfig,
        signer_config: SignerConfig,
    ) -> Self {
        Self::from_log(MemoryLog::new(log_key(origin, seed), log_config), signer_config)
    }

    /// Wrap an already built log.
    pub fn from_log(log: MemoryLog, signer_config: SignerConfig) -> Self {
        let log = Arc::new(log);
        let signer = Signer::from_log(log.clone(), signer_config);
        Self { log, signer }
    }

    /// Signed by this log and carrying its origin.
    pub fn policy(&self) -> Policy {
        Policy::All(vec![
            Policy::SignedBy(self.log.verifier()),
            Policy::Origin(self.log.origin().to_string()),
        ])
    }

    pub fn verifier(&self) -> Verifier {
        Verifier::new(self.policy(), VerifierConfig::default())
    }

    /// Append `n` filler records so later signatures carry non-trivial proofs.
    pub async fn fill(&self, n: usize) {
        use spicy_log::LogAppender;
        for i in 0..n {
            self.log
                .append(format!("filler {i}").into_bytes().into())
                .await
                .expect("filler append should succeed");
        }
    }
}

impl Default for TestLog {
    fn default() -> Self {
        Self::new()
    }
}

/// An Ed25519 log key derived from `seed`.
pub fn log_key(origin: &str, seed: [u8; 32]) -> NoteSigner {
    NoteSigner::from_seed(origin, KeyAlgorithm::Ed25519, seed).expect("log key name should be valid")
}

/// A witness cosigning key derived from `seed`.
pub fn witness_key(name: &str, seed: [u8; 32]) -> NoteSigner {
    NoteSigner::from_seed(name, KeyAlgorithm::Cosignature, seed)
        .expect("witness key name should be valid")
        .with_timestamp(1_700_000_000)
}

/// Decode an envelope, panicking on failure.
pub fn decode(raw: &[u8]) -> SpicySignature {
    SpicySignature::decode(raw).expect("envelope should decode")
}

/// Install a tracing subscriber writing to the test harness. Safe to call
/// more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .with_test_writer()
        .try_init();
}
