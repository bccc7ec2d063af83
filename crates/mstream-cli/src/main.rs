// crates/mstream-cli/src/main.rs

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use mstream_merkle::hash::{leaf_from_hex, leaf_from_u64};
use mstream_merkle::io::{read_bundle_auto, write_bundle_auto};
use mstream_merkle::{HashFn, HashKind, ProofBundle, TreeBuilder, TreeOutput, WriterSink};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Positions are `u64`, so no tree is taller than this.
const MAX_HEIGHT: u32 = 64;

#[derive(Parser, Debug)]
#[command(
    name = "mstream",
    about = "Streaming Merkle roots and multi-leaf proofs",
    long_about = "Streaming Merkle roots and multi-leaf proofs.\n\nLeaves are folded into the tree one at a time in O(log n) memory. Proofs for positions declared up front are collected on the way and can be verified without the full leaf set.",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    /// TOML file with defaults (hash, cache_dir, cache_heights)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Parent hash (overrides the config file)
    #[arg(long, value_enum, global = true)]
    hash: Option<HashOpt>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Stream leaves into a tree and print its root
    Root {
        #[command(flatten)]
        source: LeafSource,

        #[command(flatten)]
        cache: CacheOpts,
    },

    /// Stream leaves, collect a proof for the given positions and write a bundle
    Prove {
        #[command(flatten)]
        source: LeafSource,

        #[command(flatten)]
        cache: CacheOpts,

        /// Strictly ascending leaf positions to prove, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        positions: Vec<u64>,

        /// Output path for the proof bundle (CBOR/JSON)
        #[arg(long, default_value = "bundle.json")]
        out: PathBuf,
    },

    /// Verify a proof bundle against its root
    Verify {
        /// Input path to a proof bundle (CBOR/JSON)
        #[arg(long)]
        bundle: PathBuf,
    },
}

#[derive(Args, Debug)]
struct LeafSource {
    /// Text file with one hex-encoded leaf per line (blank lines skipped)
    #[arg(long, conflicts_with = "synthetic", required_unless_present = "synthetic")]
    leaves: Option<PathBuf>,

    /// Use N synthetic leaves: 8-byte little-endian encodings of 0..N
    #[arg(long)]
    synthetic: Option<u64>,
}

#[derive(Args, Debug)]
struct CacheOpts {
    /// Directory receiving one `layer-<h>.bin` file per cached height
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Heights to cache, comma separated (default: every height)
    #[arg(long, value_delimiter = ',')]
    cache_heights: Vec<u32>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
enum HashOpt {
    /// SHA-256 over left ‖ right
    Sha256,
    /// BLAKE3 over left ‖ right
    Blake3,
}

impl From<HashOpt> for HashKind {
    fn from(h: HashOpt) -> Self {
        match h {
            HashOpt::Sha256 => Self::Sha256,
            HashOpt::Blake3 => Self::Blake3,
        }
    }
}

/// Config file merged with command-line overrides.
#[derive(Debug)]
struct Settings {
    hash: HashKind,
    cache_dir: Option<PathBuf>,
    cache_heights: Vec<u32>,
}

impl Settings {
    fn resolve(cfg: Config, hash: Option<HashOpt>, cache: CacheOpts) -> Self {
        Self {
            hash: hash.map_or(cfg.hash, HashKind::from),
            cache_dir: cache.cache_dir.or(cfg.cache_dir),
            cache_heights: if cache.cache_heights.is_empty() {
                cfg.cache_heights
            } else {
                cache.cache_heights
            },
        }
    }
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let cfg = Config::load(cli.config.as_deref())?;
    match cli.cmd {
        Cmd::Root { source, cache } => {
            root(&source, &Settings::resolve(cfg, cli.hash, cache))
        }
        Cmd::Prove {
            source,
            cache,
            positions,
            out,
        } => prove(
            &source,
            &Settings::resolve(cfg, cli.hash, cache),
            positions,
            &out,
        ),
        Cmd::Verify { bundle } => verify(&bundle),
    }
}

/// Initialize tracing with an env-driven filter (default INFO).
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_writer(io::stderr)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// Ensure a directory exists.
fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating directory {}", dir.display()))
}

/// Leaves as a boxed iterator so file and synthetic sources share one path.
fn open_leaves(source: &LeafSource) -> Result<Box<dyn Iterator<Item = Result<Vec<u8>>>>> {
    if let Some(n) = source.synthetic {
        return Ok(Box::new((0..n).map(|i| Ok(leaf_from_u64(i)))));
    }
    let Some(path) = source.leaves.as_deref() else {
        bail!("no leaf source: pass --leaves FILE or --synthetic N");
    };
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let iter = BufReader::new(f)
        .lines()
        .enumerate()
        .filter(|(_, line)| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
        .map(|(i, line)| {
            let line = line.with_context(|| format!("read line {}", i + 1))?;
            leaf_from_hex(&line).with_context(|| format!("parse hex leaf on line {}", i + 1))
        });
    Ok(Box::new(iter))
}

/// File that is only created once the first node reaches its height.
struct LazyFile {
    path: PathBuf,
    inner: Option<BufWriter<File>>,
}

impl LazyFile {
    const fn new(path: PathBuf) -> Self {
        Self { path, inner: None }
    }
}

impl Write for LazyFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let w = match &mut self.inner {
            Some(w) => w,
            slot @ None => slot.insert(BufWriter::new(File::create(&self.path)?)),
        };
        w.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.as_mut().map_or(Ok(()), |w| w.flush())
    }
}

/// Stream every leaf through a tree, returning its output and the values of
/// the proven leaves.
fn build(
    source: &LeafSource,
    settings: &Settings,
    positions: Vec<u64>,
) -> Result<(TreeOutput, Vec<Vec<u8>>)> {
    let hash: HashFn = settings.hash.parent_fn();
    let mut tree = TreeBuilder::proving(hash, positions.clone()).context("invalid positions")?;

    if let Some(dir) = settings.cache_dir.as_deref() {
        ensure_dir(dir)?;
        let heights: Vec<u32> = if settings.cache_heights.is_empty() {
            (0..=MAX_HEIGHT).collect()
        } else {
            settings.cache_heights.clone()
        };
        for h in heights {
            let sink = WriterSink::new(LazyFile::new(dir.join(format!("layer-{h}.bin"))));
            tree = tree.with_sink(h, sink);
        }
    }

    let mut proven = Vec::with_capacity(positions.len());
    let mut wanted = positions.iter().peekable();
    let mut cache_failures = 0u64;
    for (i, leaf) in open_leaves(source)?.enumerate() {
        let leaf = leaf?;
        if wanted.next_if_eq(&&(i as u64)).is_some() {
            proven.push(leaf.clone());
        }
        if tree.insert(leaf).is_err() {
            cache_failures += 1;
        }
    }
    if let Err(e) = tree.flush_sinks() {
        warn!(error = %e, "cache flush failed");
        cache_failures += 1;
    }
    if cache_failures > 0 {
        warn!(cache_failures, "node cache is incomplete; root and proof are unaffected");
    }

    let leaves = tree.leaf_count();
    let out = tree
        .finish()
        .with_context(|| format!("building tree over {leaves} leaves"))?;
    Ok((out, proven))
}

fn root(source: &LeafSource, settings: &Settings) -> Result<()> {
    info!(hash = settings.hash.as_str(), "computing root");
    let (out, _) = build(source, settings, Vec::new())?;
    println!("{}", hex::encode(&out.root));
    info!(leaves = out.leaf_count, "root computed");
    Ok(())
}

fn prove(source: &LeafSource, settings: &Settings, positions: Vec<u64>, out: &Path) -> Result<()> {
    info!(hash = settings.hash.as_str(), n_positions = positions.len(), out=%out.display(), "proving");
    let (tree, leaves) = build(source, settings, positions.clone())?;
    let bundle = ProofBundle::new(settings.hash, tree, positions, leaves);
    write_bundle_auto(out, &bundle)
        .with_context(|| format!("writing proof bundle to {}", out.display()))?;

    println!(
        "Proved {} of {} leaves, root={}, {} proof elements → {}",
        bundle.positions.len(),
        bundle.leaf_count,
        hex::encode(&bundle.root),
        bundle.proof.len(),
        out.display()
    );
    Ok(())
}

fn verify(path: &Path) -> Result<()> {
    info!(bundle=%path.display(), "verifying bundle");
    let bundle = read_bundle_auto(path)
        .with_context(|| format!("reading proof bundle from {}", path.display()))?;
    if !bundle.verify()? {
        bail!(
            "proof rejected: leaves do not reconstruct root {}",
            hex::encode(&bundle.root)
        );
    }
    println!(
        "OK: {} leaves proven against root {}",
        bundle.positions.len(),
        hex::encode(&bundle.root)
    );
    Ok(())
}
