//! Merkle tree math for RFC 6962 style transparency logs.
//!
//! Hashes are addressed by their *stored hash index*: the position at which
//! a log appending records one by one would write that hash to a flat array.
//! Record `n` appends its leaf hash followed by one interior hash for every
//! subtree it completes.

use sha2::{Digest, Sha256};

use crate::crypto::Sha256Hash;
use crate::error::TlogError;

/// Result type for tree operations.
pub type Result<T> = std::result::Result<T, TlogError>;

/// Leaf hash of a record: `SHA-256(0x00 || data)`.
pub fn record_hash(data: &[u8]) -> Sha256Hash {
    let mut h = Sha256::new();
    h.update([0x00]);
    h.update(data);
    Sha256Hash(h.finalize().into())
}

/// Interior node hash: `SHA-256(0x01 || left || right)`.
pub fn node_hash(left: &Sha256Hash, right: &Sha256Hash) -> Sha256Hash {
    let mut h = Sha256::new();
    h.update([0x01]);
    h.update(left.0);
    h.update(right.0);
    Sha256Hash(h.finalize().into())
}

/// Stored hash index of the hash at `level` covering records
/// `n << level .. (n + 1) << level`.
pub fn stored_hash_index(level: u32, n: u64) -> u64 {
    let mut n = n;
    for _ in 0..level {
        n = 2 * n + 1;
    }
    let mut i = 0u64;
    while n > 0 {
        i += n;
        n >>= 1;
    }
    i + level as u64
}

/// Inverse of [`stored_hash_index`].
pub fn split_stored_hash_index(index: u64) -> (u32, u64) {
    // The record that wrote `index` lies in [index/2, index/2 + log2(index)].
    let mut n = index / 2;
    let mut index_n = stored_hash_index(0, n);
    debug_assert!(index_n <= index);
    loop {
        let x = index_n + 1 + (n + 1).trailing_zeros() as u64;
        if x > index {
            break;
        }
        n += 1;
        index_n = x;
    }
    let level = (index - index_n) as u32;
    (level, n >> level)
}

/// Number of stored hashes in a tree with `n` records.
pub fn stored_hash_count(n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    let mut count = stored_hash_index(0, n - 1) + 1;
    let mut i = n - 1;
    while i & 1 != 0 {
        count += 1;
        i >>= 1;
    }
    count
}

/// Source of stored hashes by index.
pub trait HashReader {
    /// Return the hashes at `indexes`, in the same order.
    fn read_hashes(&self, indexes: &[u64]) -> Result<Vec<Sha256Hash>>;
}

/// A flat stored-hash array, as kept by an in-memory log.
impl HashReader for [Sha256Hash] {
    fn read_hashes(&self, indexes: &[u64]) -> Result<Vec<Sha256Hash>> {
        indexes
            .iter()
            .map(|&i| {
                usize::try_from(i)
                    .ok()
                    .and_then(|i| self.get(i).copied())
                    .ok_or(TlogError::MissingHash(i))
            })
            .collect()
    }
}

impl HashReader for Vec<Sha256Hash> {
    fn read_hashes(&self, indexes: &[u64]) -> Result<Vec<Sha256Hash>> {
        self.as_slice().read_hashes(indexes)
    }
}

fn read_exact<R: HashReader + ?Sized>(reader: &R, indexes: &[u64]) -> Result<Vec<Sha256Hash>> {
    let hashes = reader.read_hashes(indexes)?;
    if hashes.len() != indexes.len() {
        return Err(TlogError::HashCount {
            expected: indexes.len(),
            got: hashes.len(),
        });
    }
    Ok(hashes)
}

/// The hashes appended to storage when adding record `n` with leaf hash `h`.
///
/// The first element is `h`; each following one closes a completed subtree.
pub fn stored_hashes_for_record_hash<R: HashReader + ?Sized>(
    n: u64,
    h: Sha256Hash,
    reader: &R,
) -> Result<Vec<Sha256Hash>> {
    let m = (n + 1).trailing_zeros();
    let mut indexes = vec![0u64; m as usize];
    for i in 0..m {
        indexes[(m - 1 - i) as usize] = stored_hash_index(i, (n >> i) - 1);
    }
    let old = read_exact(reader, &indexes)?;

    let mut hashes = Vec::with_capacity(1 + m as usize);
    hashes.push(h);
    let mut h = h;
    for i in 0..m {
        h = node_hash(&old[(m - 1 - i) as usize], &h);
        hashes.push(h);
    }
    Ok(hashes)
}

/// Largest power of two strictly below `n` (for `n > 1`), with its log2.
fn maxpow2(n: u64) -> (u64, u32) {
    let mut l = 0u32;
    while l + 1 < 64 && (1u64 << (l + 1)) < n {
        l += 1;
    }
    (1u64 << l, l)
}

fn sub_tree_index(mut lo: u64, hi: u64, need: &mut Vec<u64>) {
    while lo < hi {
        let (k, level) = maxpow2(hi - lo + 1);
        debug_assert_eq!(lo & (k - 1), 0);
        need.push(stored_hash_index(level, lo >> level));
        lo += k;
    }
}

fn sub_tree_hash(mut lo: u64, hi: u64, hashes: &[Sha256Hash]) -> Result<(Sha256Hash, &[Sha256Hash])> {
    let mut num_tree = 0usize;
    while lo < hi {
        let (k, _) = maxpow2(hi - lo + 1);
        num_tree += 1;
        lo += k;
    }
    if num_tree == 0 || hashes.len() < num_tree {
        return Err(TlogError::HashCount {
            expected: num_tree,
            got: hashes.len(),
        });
    }
    let mut h = hashes[num_tree - 1];
    for i in (0..num_tree - 1).rev() {
        h = node_hash(&hashes[i], &h);
    }
    Ok((h, &hashes[num_tree..]))
}

/// Stored hash indexes needed to compute the root of a tree of size `n`.
pub fn tree_hash_indexes(n: u64) -> Vec<u64> {
    let mut need = Vec::new();
    sub_tree_index(0, n, &mut need);
    need
}

/// Compute the root of a tree of size `n` from the hashes at
/// [`tree_hash_indexes`]`(n)`.
pub fn tree_hash_from_hashes(n: u64, hashes: &[Sha256Hash]) -> Result<Sha256Hash> {
    if n == 0 {
        return Ok(Sha256Hash::digest(b""));
    }
    let (h, rest) = sub_tree_hash(0, n, hashes)?;
    if !rest.is_empty() {
        return Err(TlogError::HashCount {
            expected: hashes.len() - rest.len(),
            got: hashes.len(),
        });
    }
    Ok(h)
}

/// Root hash of the tree of size `n`.
pub fn tree_hash<R: HashReader + ?Sized>(n: u64, reader: &R) -> Result<Sha256Hash> {
    let indexes = tree_hash_indexes(n);
    let hashes = read_exact(reader, &indexes)?;
    tree_hash_from_hashes(n, &hashes)
}

fn leaf_proof_index(lo: u64, hi: u64, n: u64, need: &mut Vec<u64>) {
    debug_assert!(lo <= n && n < hi);
    if lo + 1 == hi {
        return;
    }
    let (k, _) = maxpow2(hi - lo);
    if n < lo + k {
        leaf_proof_index(lo, lo + k, n, need);
        sub_tree_index(lo + k, hi, need);
    } else {
        sub_tree_index(lo, lo + k, need);
        leaf_proof_index(lo + k, hi, n, need);
    }
}

fn leaf_proof<'a>(
    lo: u64,
    hi: u64,
    n: u64,
    hashes: &'a [Sha256Hash],
    proof: &mut Vec<Sha256Hash>,
) -> Result<&'a [Sha256Hash]> {
    if lo + 1 == hi {
        return Ok(hashes);
    }
    let (k, _) = maxpow2(hi - lo);
    let (th, rest) = if n < lo + k {
        let rest = leaf_proof(lo, lo + k, n, hashes, proof)?;
        sub_tree_hash(lo + k, hi, rest)?
    } else {
        let (th, rest) = sub_tree_hash(lo, lo + k, hashes)?;
        (th, leaf_proof(lo + k, hi, n, rest, proof)?)
    };
    proof.push(th);
    Ok(rest)
}

fn check_inputs(t: u64, n: u64) -> Result<()> {
    if n >= t {
        return Err(TlogError::IndexOutOfRange {
            index: n,
            tree_size: t,
        });
    }
    Ok(())
}

/// Stored hash indexes needed to prove record `n` in a tree of size `t`.
pub fn record_proof_indexes(t: u64, n: u64) -> Result<Vec<u64>> {
    check_inputs(t, n)?;
    let mut need = Vec::new();
    leaf_proof_index(0, t, n, &mut need);
    Ok(need)
}

/// Assemble the inclusion proof for record `n` from the hashes at
/// [`record_proof_indexes`]`(t, n)`. The proof is ordered leaf to root.
pub fn record_proof_from_hashes(t: u64, n: u64, hashes: &[Sha256Hash]) -> Result<Vec<Sha256Hash>> {
    check_inputs(t, n)?;
    let mut proof = Vec::new();
    let rest = leaf_proof(0, t, n, hashes, &mut proof)?;
    if !rest.is_empty() {
        return Err(TlogError::HashCount {
            expected: hashes.len() - rest.len(),
            got: hashes.len(),
        });
    }
    Ok(proof)
}

/// Inclusion proof for record `n` in a tree of size `t`.
pub fn prove_record<R: HashReader + ?Sized>(t: u64, n: u64, reader: &R) -> Result<Vec<Sha256Hash>> {
    let indexes = record_proof_indexes(t, n)?;
    if indexes.is_empty() {
        return Ok(Vec::new());
    }
    let hashes = read_exact(reader, &indexes)?;
    record_proof_from_hashes(t, n, &hashes)
}

fn run_record_proof(
    p: &[Sha256Hash],
    lo: u64,
    hi: u64,
    n: u64,
    leaf: Sha256Hash,
) -> Result<Sha256Hash> {
    if lo + 1 == hi {
        if !p.is_empty() {
            return Err(TlogError::ProofFailed);
        }
        return Ok(leaf);
    }
    let Some((last, rest)) = p.split_last() else {
        return Err(TlogError::ProofFailed);
    };
    let (k, _) = maxpow2(hi - lo);
    if n < lo + k {
        let th = run_record_proof(rest, lo, lo + k, n, leaf)?;
        Ok(node_hash(&th, last))
    } else {
        let th = run_record_proof(rest, lo + k, hi, n, leaf)?;
        Ok(node_hash(last, &th))
    }
}

/// Check that `proof` shows the record with leaf hash `h` at index `n` is in
/// the tree of size `t` with root `th`.
pub fn check_record(
    proof: &[Sha256Hash],
    t: u64,
    th: &Sha256Hash,
    n: u64,
    h: &Sha256Hash,
) -> Result<()> {
    check_inputs(t, n)?;
    let root = run_record_proof(proof, 0, t, n, *h)?;
    if root == *th {
        Ok(())
    } else {
        Err(TlogError::ProofFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build the flat stored-hash array for `n` records named `leaf-i`.
    fn build(n: u64) -> Vec<Sha256Hash> {
        let mut stored = Vec::new();
        for i in 0..n {
            let h = record_hash(format!("leaf-{i}").as_bytes());
            let new = stored_hashes_for_record_hash(i, h, &stored).unwrap();
            assert_eq!(stored.len() as u64, stored_hash_index(0, i));
            stored.extend(new);
        }
        stored
    }

    /// Straightforward recursive root over leaf hashes.
    fn naive_root(leaves: &[Sha256Hash]) -> Sha256Hash {
        if leaves.len() == 1 {
            return leaves[0];
        }
        let (k, _) = maxpow2(leaves.len() as u64);
        let k = k as usize;
        node_hash(&naive_root(&leaves[..k]), &naive_root(&leaves[k..]))
    }

    #[test]
    fn test_stored_hash_index_layout() {
        assert_eq!(stored_hash_index(0, 0), 0);
        assert_eq!(stored_hash_index(0, 1), 1);
        assert_eq!(stored_hash_index(1, 0), 2);
        assert_eq!(stored_hash_index(0, 2), 3);
        assert_eq!(stored_hash_index(0, 3), 4);
        assert_eq!(stored_hash_index(1, 1), 5);
        assert_eq!(stored_hash_index(2, 0), 6);
    }

    #[test]
    fn test_split_stored_hash_index_inverts() {
        for level in 0..6u32 {
            for n in 0..200u64 {
                let index = stored_hash_index(level, n);
                assert_eq!(split_stored_hash_index(index), (level, n));
            }
        }
    }

    #[test]
    fn test_stored_hash_count_matches_build() {
        for n in 0..64u64 {
            assert_eq!(build(n).len() as u64, stored_hash_count(n));
        }
    }

    #[test]
    fn test_tree_hash_matches_naive() {
        let stored = build(37);
        let leaves: Vec<_> = (0..37)
            .map(|i| record_hash(format!("leaf-{i}").as_bytes()))
            .collect();
        for n in 1..=37u64 {
            assert_eq!(
                tree_hash(n, &stored).unwrap(),
                naive_root(&leaves[..n as usize])
            );
        }
        assert_eq!(tree_hash(0, &stored).unwrap(), Sha256Hash::digest(b""));
    }

    #[test]
    fn test_prove_and_check_every_leaf() {
        let stored = build(21);
        for t in 1..=21u64 {
            let root = tree_hash(t, &stored).unwrap();
            for n in 0..t {
                let leaf = record_hash(format!("leaf-{n}").as_bytes());
                let proof = prove_record(t, n, &stored).unwrap();
                check_record(&proof, t, &root, n, &leaf).unwrap();
            }
        }
    }

    #[test]
    fn test_single_leaf_tree_has_empty_proof() {
        let stored = build(1);
        let root = tree_hash(1, &stored).unwrap();
        let proof = prove_record(1, 0, &stored).unwrap();
        assert!(proof.is_empty());
        assert_eq!(root, record_hash(b"leaf-0"));
        check_record(&[], 1, &root, 0, &root).unwrap();
    }

    #[test]
    fn test_check_record_rejects_tampering() {
        let stored = build(10);
        let root = tree_hash(10, &stored).unwrap();
        let leaf = record_hash(b"leaf-3");
        let proof = prove_record(10, 3, &stored).unwrap();

        assert_eq!(
            check_record(&proof, 10, &root, 4, &leaf),
            Err(TlogError::ProofFailed)
        );
        assert_eq!(
            check_record(&proof, 10, &root, 3, &record_hash(b"leaf-4")),
            Err(TlogError::ProofFailed)
        );

        let mut extra = proof.clone();
        extra.push(Sha256Hash::ZERO);
        assert_eq!(
            check_record(&extra, 10, &root, 3, &leaf),
            Err(TlogError::ProofFailed)
        );
        assert_eq!(
            check_record(&proof[..proof.len() - 1], 10, &root, 3, &leaf),
            Err(TlogError::ProofFailed)
        );
    }

    #[test]
    fn test_out_of_range_index() {
        let stored = build(4);
        assert!(matches!(
            prove_record(4, 4, &stored),
            Err(TlogError::IndexOutOfRange { index: 4, tree_size: 4 })
        ));
        assert!(matches!(
            check_record(&[], 0, &Sha256Hash::ZERO, 0, &Sha256Hash::ZERO),
            Err(TlogError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_missing_hash_reported() {
        let stored = build(3);
        assert_eq!(
            prove_record(8, 1, &stored),
            Err(TlogError::MissingHash(5))
        );
    }

    proptest::proptest! {
        #[test]
        fn test_random_proofs_check(t in 1u64..400, pick in proptest::prelude::any::<u64>()) {
            let n = pick % t;
            let stored = build(t);
            let root = tree_hash(t, &stored).unwrap();
            let leaf = record_hash(format!("leaf-{n}").as_bytes());
            let proof = prove_record(t, n, &stored).unwrap();
            proptest::prop_assert!(check_record(&proof, t, &root, n, &leaf).is_ok());
            if n + 1 < t {
                proptest::prop_assert!(check_record(&proof, t, &root, n + 1, &leaf).is_err());
            }
        }
    }
}
