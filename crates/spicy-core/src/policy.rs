//! Checkpoint trust policies.
//!
//! A [`Policy`] is a predicate tree over two leaves, "signed by this key" and
//! "origin equals this name", combined with `All`, `Any` and `Threshold`
//! nodes. Evaluation opens the checkpoint with every key the policy names and
//! then walks the tree.
//!
//! A threshold over signers can be met without ever looking at the origin,
//! so [`Policy::evaluate`] also runs the policy against the reserved origin
//! `check.invalid`. A policy that would accept that origin is rejected with
//! [`PolicyError::OriginUnconstrained`].
//!
//! # Text format
//!
//! ```text
//! # comment
//! log <vkey>
//! witness <name> <vkey>
//! group <name> <all|any|k> <member>...
//! quorum <name|none>
//! ```
//!
//! Each `log` line contributes `All(SignedBy(key), Origin(key name))`; several
//! logs are alternatives. The result is `All(logs, quorum)`.

use std::collections::HashMap;

use crate::checkpoint::CheckpointCapsule;
use crate::crypto::{NoteVerifier, NoteVerifiers};
use crate::error::{CheckpointError, NoteError, PolicyError};
use crate::note::SignedNote;

/// Origin no legitimate log uses; a policy accepting it ignores origins.
pub const CANARY_ORIGIN: &str = "check.invalid";

/// A composable checkpoint trust predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Policy {
    /// The checkpoint carries a valid signature by this key.
    SignedBy(NoteVerifier),
    /// The checkpoint origin equals this name.
    Origin(String),
    /// Every member holds. Empty is true.
    All(Vec<Policy>),
    /// At least one member holds. Empty is false.
    Any(Vec<Policy>),
    /// At least `k` members hold.
    Threshold { k: usize, members: Vec<Policy> },
}

impl Policy {
    /// All keys named anywhere in the tree.
    pub fn verifiers(&self) -> NoteVerifiers {
        let mut set = NoteVerifiers::default();
        self.collect_verifiers(&mut set);
        set
    }

    fn collect_verifiers(&self, set: &mut NoteVerifiers) {
        match self {
            Self::SignedBy(v) => set.insert(v.clone()),
            Self::Origin(_) => {}
            Self::All(members) | Self::Any(members) | Self::Threshold { members, .. } => {
                for m in members {
                    m.collect_verifiers(set);
                }
            }
        }
    }

    /// Evaluate against a note whose signatures were already verified, with
    /// the given origin.
    pub fn check(&self, note: &SignedNote, origin: &str) -> bool {
        match self {
            Self::SignedBy(v) => note.is_signed_by(v.name(), v.key_hash()),
            Self::Origin(want) => want == origin,
            Self::All(members) => members.iter().all(|m| m.check(note, origin)),
            Self::Any(members) => members.iter().any(|m| m.check(note, origin)),
            Self::Threshold { k, members } => {
                members.iter().filter(|m| m.check(note, origin)).count() >= *k
            }
        }
    }

    /// Open `checkpoint` with this policy's keys and evaluate it.
    ///
    /// Returns the opened checkpoint on success.
    pub fn evaluate(&self, checkpoint: &[u8]) -> Result<CheckpointCapsule, PolicyError> {
        let bytes = bytes::Bytes::copy_from_slice(checkpoint);
        let capsule = match CheckpointCapsule::open(bytes.clone(), &self.verifiers()) {
            Ok(capsule) => capsule,
            // No signature from a known key: structure is still usable and
            // every SignedBy leaf evaluates false.
            Err(CheckpointError::Note(NoteError::Unverified(_))) => {
                CheckpointCapsule::open_unverified(bytes)?
            }
            Err(e) => return Err(e.into()),
        };

        if !self.check(capsule.note(), capsule.origin()) {
            return Err(PolicyError::NotSatisfied {
                origin: capsule.origin().to_string(),
            });
        }
        if self.check(capsule.note(), CANARY_ORIGIN) {
            return Err(PolicyError::OriginUnconstrained);
        }
        Ok(capsule)
    }

    /// Parse a policy file.
    pub fn parse(text: &str) -> Result<Self, PolicyError> {
        let mut logs = Vec::new();
        let mut named: HashMap<String, Policy> = HashMap::new();
        let mut quorum: Option<Policy> = None;

        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            let err = |reason: String| PolicyError::Parse { line, reason };
            let content = raw.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }
            let fields: Vec<&str> = content.split_whitespace().collect();
            match fields.as_slice() {
                ["log", vkey] => {
                    let v = NoteVerifier::parse(vkey)
                        .map_err(|source| PolicyError::Key { line, source })?;
                    let origin = v.name().to_string();
                    logs.push(Policy::All(vec![Policy::SignedBy(v), Policy::Origin(origin)]));
                }
                ["witness", name, vkey] => {
                    let v = NoteVerifier::parse(vkey)
                        .map_err(|source| PolicyError::Key { line, source })?;
                    if named.contains_key(*name) {
                        return Err(err(format!("duplicate name {name:?}")));
                    }
                    named.insert(name.to_string(), Policy::SignedBy(v));
                }
                ["group", name, kind, members @ ..] if !members.is_empty() => {
                    if named.contains_key(*name) {
                        return Err(err(format!("duplicate name {name:?}")));
                    }
                    let members = members
                        .iter()
                        .map(|m| {
                            named
                                .get(*m)
                                .cloned()
                                .ok_or_else(|| err(format!("unknown member {m:?}")))
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    let group = match *kind {
                        "all" => Policy::All(members),
                        "any" => Policy::Any(members),
                        k => {
                            let k: usize = k
                                .parse()
                                .map_err(|_| err(format!("bad threshold {k:?}")))?;
                            if k == 0 || k > members.len() {
                                return Err(err(format!(
                                    "threshold {k} out of range for {} members",
                                    members.len()
                                )));
                            }
                            Policy::Threshold { k, members }
                        }
                    };
                    named.insert(name.to_string(), group);
                }
                ["quorum", name] => {
                    if quorum.is_some() {
                        return Err(err("duplicate quorum".to_string()));
                    }
                    quorum = Some(if *name == "none" {
                        Policy::All(Vec::new())
                    } else {
                        named
                            .get(*name)
                            .cloned()
                            .ok_or_else(|| err(format!("unknown quorum {name:?}")))?
                    });
                }
                _ => return Err(err(format!("unrecognized line {content:?}"))),
            }
        }

        let last = text.lines().count();
        let quorum = quorum.ok_or(PolicyError::Parse {
            line: last,
            reason: "missing quorum".to_string(),
        })?;
        let logs = match logs.len() {
            0 => {
                return Err(PolicyError::Parse {
                    line: last,
                    reason: "no log keys".to_string(),
                })
            }
            1 => logs.remove(0),
            _ => Policy::Any(logs),
        };
        Ok(Policy::All(vec![logs, quorum]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{KeyAlgorithm, NoteSigner, Sha256Hash};
    use crate::note;

    fn log_signer() -> NoteSigner {
        NoteSigner::from_seed("log.example", KeyAlgorithm::Ed25519, [1; 32]).unwrap()
    }

    fn witness(name: &str, seed: u8) -> NoteSigner {
        NoteSigner::from_seed(name, KeyAlgorithm::Cosignature, [seed; 32])
            .unwrap()
            .with_timestamp(1_700_000_000)
    }

    fn checkpoint(origin: &str, signers: &[&NoteSigner]) -> Vec<u8> {
        let text = format!("{origin}\n10\n{}\n", Sha256Hash::digest(b"r").to_base64());
        note::sign(&text, signers).unwrap()
    }

    #[test]
    fn test_log_and_origin() {
        let log = log_signer();
        let policy = Policy::All(vec![
            Policy::SignedBy(log.verifier()),
            Policy::Origin("log.example".to_string()),
        ]);
        let capsule = policy.evaluate(&checkpoint("log.example", &[&log])).unwrap();
        assert_eq!(capsule.size(), 10);

        assert!(matches!(
            policy.evaluate(&checkpoint("other.example", &[&log])),
            Err(PolicyError::NotSatisfied { .. })
        ));
    }

    #[test]
    fn test_unsigned_checkpoint_not_satisfied() {
        let log = log_signer();
        let stranger = NoteSigner::from_seed("stranger", KeyAlgorithm::Ed25519, [8; 32]).unwrap();
        let policy = Policy::All(vec![
            Policy::SignedBy(log.verifier()),
            Policy::Origin("log.example".to_string()),
        ]);
        assert!(matches!(
            policy.evaluate(&checkpoint("log.example", &[&stranger])),
            Err(PolicyError::NotSatisfied { .. })
        ));
    }

    #[test]
    fn test_threshold_rejects_canary_origin() {
        let log = log_signer();
        let policy = Policy::Threshold {
            k: 2,
            members: vec![
                Policy::SignedBy(log.verifier()),
                Policy::Origin("log.example".to_string()),
            ],
        };
        assert!(policy.evaluate(&checkpoint("check.invalid", &[&log])).is_err());
    }

    #[test]
    fn test_origin_unconstrained_policy_rejected() {
        let log = log_signer();
        let policy = Policy::Threshold {
            k: 1,
            members: vec![
                Policy::SignedBy(log.verifier()),
                Policy::Origin("log.example".to_string()),
            ],
        };
        assert!(matches!(
            policy.evaluate(&checkpoint("log.example", &[&log])),
            Err(PolicyError::OriginUnconstrained)
        ));
    }

    #[test]
    fn test_witness_threshold() {
        let log = log_signer();
        let w1 = witness("w1.example", 2);
        let w2 = witness("w2.example", 3);
        let w3 = witness("w3.example", 4);
        let policy = Policy::All(vec![
            Policy::SignedBy(log.verifier()),
            Policy::Origin("log.example".to_string()),
            Policy::Threshold {
                k: 2,
                members: [&w1, &w2, &w3]
                    .iter()
                    .map(|w| Policy::SignedBy(w.verifier()))
                    .collect(),
            },
        ]);

        let one = checkpoint("log.example", &[&log, &w1]);
        assert!(policy.evaluate(&one).is_err());
        let two = note::add_signatures(&one, &[&w3]).unwrap();
        policy.evaluate(&two).unwrap();
    }

    #[test]
    fn test_parse_policy_file() {
        let log = log_signer();
        let w1 = witness("w1.example", 2);
        let w2 = witness("w2.example", 3);
        let text = format!(
            "# production policy\n\
             log {}\n\
             \n\
             witness w1 {}\n\
             witness w2 {}  # second\n\
             group both all w1 w2\n\
             group either 1 w1 w2\n\
             quorum either\n",
            log.verifier().to_vkey(),
            w1.verifier().to_vkey(),
            w2.verifier().to_vkey(),
        );
        let policy = Policy::parse(&text).unwrap();
        assert_eq!(policy.verifiers().len(), 3);

        policy
            .evaluate(&checkpoint("log.example", &[&log, &w2]))
            .unwrap();
        assert!(policy.evaluate(&checkpoint("log.example", &[&log])).is_err());
    }

    #[test]
    fn test_parse_quorum_none() {
        let log = log_signer();
        let text = format!("log {}\nquorum none\n", log.verifier().to_vkey());
        let policy = Policy::parse(&text).unwrap();
        policy.evaluate(&checkpoint("log.example", &[&log])).unwrap();
    }

    #[test]
    fn test_parse_errors() {
        let log = log_signer().verifier().to_vkey();
        let cases = [
            format!("log {log}\n"),
            "quorum none\n".to_string(),
            format!("log {log}\nquorum missing\n"),
            format!("log {log}\ngroup g 3 a\nquorum none\n"),
            format!("log {log}\nfrobnicate\nquorum none\n"),
            format!("log {log}\nquorum none\nquorum none\n"),
        ];
        for text in &cases {
            assert!(
                matches!(Policy::parse(text), Err(PolicyError::Parse { .. })),
                "{text:?}"
            );
        }
        assert!(matches!(
            Policy::parse("log not-a-key\nquorum none\n"),
            Err(PolicyError::Key { line: 1, .. })
        ));
    }
}
