//! Fixed vectors over the 8-leaf SHA-256 reference tree.
//!
//! ```text
//! |                4a                |
//! |       13               6c        |
//! |    9d      fe      3d      6b    |
//! |  00  01  02  03  04  05  06  07  |
//! ```
//!
//! Leaves are `leaf_from_u64(i)` (8-byte little-endian), parents are
//! `SHA-256(left ‖ right)`.

use mstream_merkle::hash::{leaf_from_hex, leaf_from_u64, sha256_parent};
use mstream_merkle::{verify, MerkleError, TreeBuilder, TreeOutput};

const ROOT: &str = "4a2ca61d1fd537170785a8575d424634713c82e7392e67795a807653e498cfd0";
const NODE_1_1: &str = "fe6d3d3bb5dd778af1128cc7b2b33668d51b9a52dfc8f2342be37ddc06a0072d";
const NODE_1_3: &str = "6b2e10cb2111114ce942174c38e7ea38864cc364a8fe95c66869c85888d812da";
const NODE_2_0: &str = "13c04a6157aa640f711d230a4f04bc2b19e75df1127dfc899f025f3aa282912d";

fn h(s: &str) -> Vec<u8> {
    leaf_from_hex(s).unwrap()
}

fn build(positions: &[u64]) -> TreeOutput {
    let mut t = TreeBuilder::proving(sha256_parent, positions.to_vec()).unwrap();
    for i in 0..8 {
        t.insert(leaf_from_u64(i)).unwrap();
    }
    t.finish().unwrap()
}

fn leaves(positions: &[u64]) -> Vec<Vec<u8>> {
    positions.iter().map(|&p| leaf_from_u64(p)).collect()
}

#[test]
fn plain_root() {
    let mut t = TreeBuilder::new(sha256_parent);
    for i in 0..8 {
        t.insert(leaf_from_u64(i)).unwrap();
    }
    assert_eq!(hex::encode(t.root().unwrap()), ROOT);
    assert_eq!(t.root().unwrap(), t.root().unwrap());
    assert!(t.proof().unwrap().is_empty());
}

#[test]
fn prove_single_leaf() {
    let out = build(&[4]);
    assert_eq!(hex::encode(&out.root), ROOT);
    assert_eq!(out.proof, vec![leaf_from_u64(5), h(NODE_1_3), h(NODE_2_0)]);
    assert!(verify(&[4], &leaves(&[4]), &out.proof, &out.root, sha256_parent).unwrap());
}

#[test]
fn prove_two_leaves_in_emission_order() {
    let out = build(&[1, 4]);
    assert_eq!(
        out.proof,
        vec![leaf_from_u64(0), h(NODE_1_1), leaf_from_u64(5), h(NODE_1_3)]
    );
    assert!(verify(&[1, 4], &leaves(&[1, 4]), &out.proof, &out.root, sha256_parent).unwrap());
}

#[test]
fn proving_the_sibling_drops_it_from_the_proof() {
    let out = build(&[0, 1, 4]);
    assert_eq!(out.proof, vec![h(NODE_1_1), leaf_from_u64(5), h(NODE_1_3)]);
    assert!(build(&[1, 4]).proof.len() > out.proof.len());
    assert!(!out.proof.contains(&leaf_from_u64(0)));
    assert!(
        verify(&[0, 1, 4], &leaves(&[0, 1, 4]), &out.proof, &out.root, sha256_parent).unwrap()
    );
}

#[test]
fn short_proof_is_an_error_not_a_rejection() {
    let cases: [&[u64]; 3] = [&[4], &[1, 4], &[0, 1, 4]];
    for positions in cases {
        let out = build(positions);
        let short = &out.proof[..out.proof.len() - 1];
        assert!(
            matches!(
                verify(positions, &leaves(positions), short, &out.root, sha256_parent),
                Err(MerkleError::ProofExhausted { .. })
            ),
            "positions {positions:?}"
        );
    }
}

#[test]
fn wrong_root_is_a_rejection() {
    let out = build(&[4]);
    let mut root = out.root.clone();
    root[31] ^= 0x80;
    assert_eq!(
        verify(&[4], &leaves(&[4]), &out.proof, &root, sha256_parent),
        Ok(false)
    );
}

#[test]
fn fixed_zero_proof_vector() {
    let zero = leaf_from_u64(0);
    let proof = vec![zero.clone(), zero.clone(), zero];
    let root = h("62b525ec807e21a1fd12d06905d85c4b7bc1feacfa57789d95702f6b69ce129f");
    assert!(verify(&[3], &[leaf_from_u64(3)], &proof, &root, sha256_parent).unwrap());
}
