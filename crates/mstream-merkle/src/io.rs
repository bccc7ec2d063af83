//! Proof bundle envelope and its JSON/CBOR I/O.
//!
//! The proof itself is just ordered digests. A [`ProofBundle`] carries what a
//! verifier needs next to it: hash kind, width, root, positions and leaves.
//! Reads auto-detect `.json` / `.cbor` by extension (case-insensitive) and
//! reject anything else; writes default to JSON.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::hash::HashKind;
use crate::tree::TreeOutput;
use crate::verify::verify_with_leaf_count;

/// Format version for [`ProofBundle`].
pub const BUNDLE_VERSION: u32 = 1;

/// Self-contained membership proof.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProofBundle {
    /// Schema version.
    pub version: u32,
    /// Parent hash used by the tree.
    pub hash: HashKind,
    /// Number of leaves in the tree.
    pub leaf_count: u64,
    /// Root digest.
    pub root: Vec<u8>,
    /// Proven positions, strictly ascending.
    pub positions: Vec<u64>,
    /// Proven leaf values, same order as `positions`.
    pub leaves: Vec<Vec<u8>>,
    /// Proof elements in emission order.
    pub proof: Vec<Vec<u8>>,
}

impl ProofBundle {
    /// Package a finished tree with the leaves it proves.
    #[must_use]
    pub fn new(
        hash: HashKind,
        output: TreeOutput,
        positions: Vec<u64>,
        leaves: Vec<Vec<u8>>,
    ) -> Self {
        Self {
            version: BUNDLE_VERSION,
            hash,
            leaf_count: output.leaf_count,
            root: output.root,
            positions,
            leaves,
            proof: output.proof,
        }
    }

    /// Verify the bundle against its own root and width.
    ///
    /// `Ok(false)` is a rejected proof; `Err` means the bundle is malformed.
    pub fn verify(&self) -> Result<bool> {
        if self.version != BUNDLE_VERSION {
            bail!(
                "unsupported bundle version {} (expected {BUNDLE_VERSION})",
                self.version
            );
        }
        let ok = verify_with_leaf_count(
            self.leaf_count,
            &self.positions,
            &self.leaves,
            &self.proof,
            &self.root,
            self.hash.parent_fn(),
        )
        .context("malformed proof bundle")?;
        Ok(ok)
    }
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    Ok(BufReader::new(f))
}

/// Create `path` (and any missing parent directories) for buffered writing.
fn create(path: &Path) -> Result<BufWriter<File>> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)
            .with_context(|| format!("mkdir -p {}", dir.display()))?,
        _ => {}
    }
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    Ok(BufWriter::new(f))
}

/// Read a bundle from **JSON**.
pub fn read_bundle_json<P: AsRef<Path>>(path: P) -> Result<ProofBundle> {
    serde_json::from_reader(open(path.as_ref())?).context("decode JSON proof bundle")
}

/// Write a bundle to **JSON** (pretty).
pub fn write_bundle_json<P: AsRef<Path>>(path: P, bundle: &ProofBundle) -> Result<()> {
    let mut out = create(path.as_ref())?;
    serde_json::to_writer_pretty(&mut out, bundle).context("encode JSON proof bundle")?;
    out.flush().context("flush JSON proof bundle")
}

/// Read a bundle from **CBOR**.
pub fn read_bundle_cbor<P: AsRef<Path>>(path: P) -> Result<ProofBundle> {
    ciborium::de::from_reader(open(path.as_ref())?).context("decode CBOR proof bundle")
}

/// Write a bundle to **CBOR**.
pub fn write_bundle_cbor<P: AsRef<Path>>(path: P, bundle: &ProofBundle) -> Result<()> {
    let mut out = create(path.as_ref())?;
    ciborium::ser::into_writer(bundle, &mut out).context("encode CBOR proof bundle")?;
    out.flush().context("flush CBOR proof bundle")
}

/// Read a bundle, picking the codec from the `.json` / `.cbor` extension.
pub fn read_bundle_auto<P: AsRef<Path>>(path: P) -> Result<ProofBundle> {
    let path = path.as_ref();
    match Codec::of(path) {
        Some(Codec::Json) => read_bundle_json(path),
        Some(Codec::Cbor) => read_bundle_cbor(path),
        None => bail!(
            "cannot infer bundle format of {} (expected .json or .cbor)",
            path.display()
        ),
    }
}

/// Write a bundle as CBOR for `.cbor` paths and JSON otherwise.
pub fn write_bundle_auto<P: AsRef<Path>>(path: P, bundle: &ProofBundle) -> Result<()> {
    let path = path.as_ref();
    match Codec::of(path) {
        Some(Codec::Cbor) => write_bundle_cbor(path, bundle),
        _ => write_bundle_json(path, bundle),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Codec {
    Json,
    Cbor,
}

impl Codec {
    /// Case-insensitive match on the file extension.
    fn of(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else if ext.eq_ignore_ascii_case("cbor") {
            Some(Self::Cbor)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::leaf_from_u64;
    use crate::TreeBuilder;

    fn tmp_path(name: &str, ext: &str) -> std::path::PathBuf {
        let stamp = std::time::UNIX_EPOCH.elapsed().unwrap().as_nanos();
        std::env::temp_dir().join(format!("mstream_merkle_io_{name}_{stamp}.{ext}"))
    }

    fn bundle(kind: HashKind) -> ProofBundle {
        let positions = vec![2, 3, 12];
        let mut t = TreeBuilder::proving(kind.parent_fn(), positions.clone()).unwrap();
        for i in 0..16 {
            t.insert(leaf_from_u64(i)).unwrap();
        }
        let leaves = positions.iter().map(|&p| leaf_from_u64(p)).collect();
        ProofBundle::new(kind, t.finish().unwrap(), positions, leaves)
    }

    #[test]
    fn json_and_cbor_bundles_survive_disk() {
        for (kind, ext) in [(HashKind::Sha256, "json"), (HashKind::Blake3, "cbor")] {
            let path = tmp_path("bundle", ext);
            let b = bundle(kind);
            write_bundle_auto(&path, &b).unwrap();
            let got = read_bundle_auto(&path).unwrap();
            assert_eq!(got, b);
            assert!(got.verify().unwrap());
            let _ = std::fs::remove_file(path);
        }
    }

    #[test]
    fn tampered_bundle_is_rejected_not_malformed() {
        let mut b = bundle(HashKind::Sha256);
        b.leaves[1][0] ^= 1;
        assert!(!b.verify().unwrap());
    }

    #[test]
    fn wrong_version_and_extension_fail() {
        let mut b = bundle(HashKind::Sha256);
        b.version = 99;
        assert!(b.verify().is_err());
        assert!(read_bundle_auto(tmp_path("bundle", "toml")).is_err());
        assert_eq!(Codec::of(Path::new("a/B.CBOR")), Some(Codec::Cbor));
        assert_eq!(Codec::of(Path::new("noext")), None);
    }
}
