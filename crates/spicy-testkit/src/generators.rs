//! Proptest generators for property-based testing.

use proptest::prelude::*;

use spicy_core::checkpoint::Checkpoint;
use spicy_core::note;
use spicy_core::{CheckpointCapsule, KeyAlgorithm, NoteSigner, Sha256Hash, SpicySignature};

/// Generate a random Sha256Hash.
pub fn sha256_hash() -> impl Strategy<Value = Sha256Hash> {
    any::<[u8; 32]>().prop_map(Sha256Hash::from_bytes)
}

/// Generate body bytes of up to `max_len` bytes.
pub fn body(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a context hint of up to `max_len` bytes.
pub fn context_hint(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a note key name.
pub fn key_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}(\\.[a-z]{2,6}){1,2}".prop_map(String::from)
}

/// Generate an Ed25519 note signer.
pub fn log_signer() -> impl Strategy<Value = NoteSigner> {
    (key_name(), any::<[u8; 32]>()).prop_filter_map("valid key", |(name, seed)| {
        NoteSigner::from_seed(&name, KeyAlgorithm::Ed25519, seed).ok()
    })
}

/// Parameters for generating an envelope.
///
/// The proof is random, so envelopes built from these parameters are well
/// formed but never verify.
#[derive(Debug, Clone)]
pub struct EnvelopeParams {
    pub signer: NoteSigner,
    pub index: u64,
    pub tree_size: u64,
    pub root: Sha256Hash,
    pub proof: Vec<Sha256Hash>,
    pub context_hint: Vec<u8>,
}

impl Arbitrary for EnvelopeParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            log_signer(),
            0u64..=u64::MAX - 1,
            1u64..=1_000_000u64, // extra leaves past the index
            sha256_hash(),
            prop::collection::vec(sha256_hash(), 0..=64),
            context_hint(512),
        )
            .prop_map(|(signer, index, extra, root, proof, hint)| EnvelopeParams {
                signer,
                index,
                tree_size: index.saturating_add(extra),
                root,
                proof,
                context_hint: hint,
            })
            .boxed()
    }
}

/// Build a signed checkpoint capsule.
pub fn capsule_for(signer: &NoteSigner, size: u64, root: Sha256Hash) -> CheckpointCapsule {
    let checkpoint = Checkpoint {
        origin: signer.name().to_string(),
        size,
        root,
        extension: String::new(),
    };
    let signed = note::sign(&checkpoint.to_text(), &[signer]).expect("generated checkpoint should sign");
    CheckpointCapsule::open_unverified(signed).expect("generated checkpoint should open")
}

/// Generate an envelope from parameters.
pub fn envelope_from_params(params: &EnvelopeParams) -> SpicySignature {
    SpicySignature::new(
        params.index,
        params.proof.clone(),
        capsule_for(&params.signer, params.tree_size, params.root),
        params.context_hint.clone(),
    )
}
