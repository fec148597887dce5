//! Verification of an envelope minted by an external log.
//!
//! The fixture log stored raw bodies as records, so these checks use the
//! bare record format.

use std::io::{self, Read};

use spicy::core::policy::CANARY_ORIGIN;
use spicy::core::{PolicyError, RecordFormat};
use spicy::{ErrorKind, Policy, SpicyError, Verifier, VerifierConfig};
use spicy_testkit::fixtures::{
    fixture_log_verifier, fixture_policy, fixture_verifier, init_tracing, FIXTURE_BODY,
    FIXTURE_ENVELOPE, FIXTURE_ENVELOPE_WITH_HINT, FIXTURE_INDEX, FIXTURE_ORIGIN,
    FIXTURE_TREE_SIZE,
};

/// A body that must never be read.
struct Unreadable;

impl Read for Unreadable {
    fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "body was read"))
    }
}

fn bare(policy: Policy) -> Verifier {
    Verifier::new(
        policy,
        VerifierConfig {
            record_format: RecordFormat::Bare,
        },
    )
}

#[test]
fn test_fixture_verifies() {
    init_tracing();
    let verified = fixture_verifier()
        .verify(FIXTURE_ENVELOPE.as_bytes(), FIXTURE_BODY, None)
        .unwrap();
    assert_eq!(verified.index, FIXTURE_INDEX);
    assert_eq!(verified.checkpoint.origin(), FIXTURE_ORIGIN);
    assert_eq!(verified.checkpoint.size(), FIXTURE_TREE_SIZE);
    assert!(verified.context_hint.is_empty());
}

#[test]
fn test_fixture_with_empty_expected_hint() {
    fixture_verifier()
        .verify(FIXTURE_ENVELOPE.as_bytes(), FIXTURE_BODY, Some(b""))
        .unwrap();
}

#[test]
fn test_fixture_rejects_other_content() {
    let err = fixture_verifier()
        .verify(FIXTURE_ENVELOPE.as_bytes(), &b"not it"[..], None)
        .unwrap_err();
    assert!(matches!(err, SpicyError::ProofMismatch(_)), "{err}");
    assert_eq!(err.kind(), ErrorKind::Trust);
}

#[test]
fn test_fixture_rejects_other_hint_before_reading_body() {
    let err = fixture_verifier()
        .verify(FIXTURE_ENVELOPE.as_bytes(), Unreadable, Some(b"also not it"))
        .unwrap_err();
    assert!(matches!(err, SpicyError::HintMismatch), "{err}");
}

#[test]
fn test_unreadable_body_is_transport_error() {
    let err = fixture_verifier()
        .verify(FIXTURE_ENVELOPE.as_bytes(), Unreadable, None)
        .unwrap_err();
    assert!(matches!(err, SpicyError::Record(_)), "{err}");
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[test]
fn test_hinted_fixture_hint_is_checked() {
    let verifier = fixture_verifier();
    let raw = FIXTURE_ENVELOPE_WITH_HINT.as_bytes();

    let err = verifier
        .verify(raw, Unreadable, Some(b"hello there"))
        .unwrap_err();
    assert!(matches!(err, SpicyError::HintMismatch), "{err}");

    // The bare format cannot carry a hint at all.
    let err = verifier
        .verify(raw, FIXTURE_BODY, Some(b"hello there\n"))
        .unwrap_err();
    assert!(matches!(err, SpicyError::Record(_)), "{err}");
    assert_eq!(err.kind(), ErrorKind::Input);
}

#[test]
fn test_fixture_rejects_spicy_record_format() {
    let verifier = Verifier::new(fixture_policy(), VerifierConfig::default());
    let err = verifier
        .verify(FIXTURE_ENVELOPE.as_bytes(), FIXTURE_BODY, None)
        .unwrap_err();
    assert!(matches!(err, SpicyError::ProofMismatch(_)), "{err}");
}

#[test]
fn test_threshold_of_key_and_origin() {
    let policy = Policy::Threshold {
        k: 2,
        members: vec![
            Policy::SignedBy(fixture_log_verifier()),
            Policy::Origin(FIXTURE_ORIGIN.to_string()),
        ],
    };
    bare(policy)
        .verify(FIXTURE_ENVELOPE.as_bytes(), FIXTURE_BODY, None)
        .unwrap();
}

#[test]
fn test_policy_ignoring_origin_is_rejected() {
    let loose = Policy::Threshold {
        k: 1,
        members: vec![
            Policy::SignedBy(fixture_log_verifier()),
            Policy::Origin(FIXTURE_ORIGIN.to_string()),
        ],
    };
    let err = bare(loose)
        .verify(FIXTURE_ENVELOPE.as_bytes(), FIXTURE_BODY, None)
        .unwrap_err();
    assert!(
        matches!(err, SpicyError::PolicyNotSatisfied(PolicyError::OriginUnconstrained)),
        "{err}"
    );

    let key_only = Policy::SignedBy(fixture_log_verifier());
    let err = bare(key_only)
        .verify(FIXTURE_ENVELOPE.as_bytes(), FIXTURE_BODY, None)
        .unwrap_err();
    assert!(
        matches!(err, SpicyError::PolicyNotSatisfied(PolicyError::OriginUnconstrained)),
        "{err}"
    );
}

#[test]
fn test_wrong_origin_not_satisfied() {
    let policy = Policy::All(vec![
        Policy::SignedBy(fixture_log_verifier()),
        Policy::Origin(CANARY_ORIGIN.to_string()),
    ]);
    let err = bare(policy)
        .verify(FIXTURE_ENVELOPE.as_bytes(), FIXTURE_BODY, None)
        .unwrap_err();
    assert!(
        matches!(err, SpicyError::PolicyNotSatisfied(PolicyError::NotSatisfied { .. })),
        "{err}"
    );
}

#[test]
fn test_policy_file_for_fixture_log() {
    let text = format!(
        "# fixture log, no witnesses\nlog {}\nquorum none\n",
        spicy_testkit::fixtures::FIXTURE_VKEY
    );
    let policy = Policy::parse(&text).unwrap();
    bare(policy)
        .verify(FIXTURE_ENVELOPE.as_bytes(), FIXTURE_BODY, None)
        .unwrap();
}

#[test]
fn test_truncated_fixture_is_structural() {
    let raw = FIXTURE_ENVELOPE.as_bytes();
    for cut in [10, 40, raw.len() / 2, raw.len() - 2] {
        let err = fixture_verifier()
            .verify(&raw[..cut], FIXTURE_BODY, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural, "cut at {cut}: {err}");
    }
}
