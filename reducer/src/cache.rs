// cache.rs — Candidate fingerprinting and the single-flight result cache
//
// A fingerprint is a SHA-256 over every candidate file (name, length,
// bytes), so two byte-identical candidate states always collide. The cache
// maps fingerprints to prior verdicts with an at-most-once guarantee: the
// first submitter marks the entry Pending and runs the predicate; later
// submitters of the same fingerprint wait for the Ready verdict instead of
// launching a duplicate worker. Purely an optimization — disabling it must
// not change the search result.

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::runner::Verdict;

// ── Fingerprint ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Hash the given files in order. Callers pass the sandbox copies of all
/// test cases, sorted by name, so the digest is stable across workers.
pub fn fingerprint_files<P: AsRef<Path>>(paths: &[P]) -> std::io::Result<Fingerprint> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];

    for path in paths {
        let path = path.as_ref();
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        let name = name.unwrap_or_default();
        let mut file = std::fs::File::open(path)?;
        let len = file.metadata()?.len();

        hasher.update(name.as_bytes());
        hasher.update(len.to_le_bytes());
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
    }

    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Ok(Fingerprint(out))
}

// ── Result cache ─────────────────────────────────────────────────────────

enum CacheEntry {
    /// A worker is evaluating this fingerprint right now.
    Pending,
    Ready(Verdict),
}

/// What a submitter learns when registering a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Verdict already known.
    Ready(Verdict),
    /// Another worker is evaluating it; wait instead of spawning.
    InFlight,
    /// First submitter; the entry is now Pending and the caller must
    /// eventually `fulfill` or `abandon` it.
    Vacant,
}

/// Fingerprint → verdict map, scoped to one reducer run. Unbounded: the
/// engine is short-lived.
#[derive(Default)]
pub struct ResultCache {
    entries: HashMap<Fingerprint, CacheEntry>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in a fingerprint.
    pub fn begin(&mut self, fp: Fingerprint) -> Lookup {
        match self.entries.get(&fp) {
            Some(CacheEntry::Ready(v)) => Lookup::Ready(*v),
            Some(CacheEntry::Pending) => Lookup::InFlight,
            None => {
                self.entries.insert(fp, CacheEntry::Pending);
                Lookup::Vacant
            }
        }
    }

    /// Record the verdict for a fingerprint whose evaluation completed.
    pub fn fulfill(&mut self, fp: Fingerprint, verdict: Verdict) {
        self.entries.insert(fp, CacheEntry::Ready(verdict));
    }

    /// Drop a Pending entry whose evaluation was cancelled, so a later
    /// submitter can evaluate it afresh. Ready entries are kept.
    pub fn abandon(&mut self, fp: Fingerprint) {
        if let Some(CacheEntry::Pending) = self.entries.get(&fp) {
            self.entries.remove(&fp);
        }
    }

    /// Non-registering read, used to resolve waiters.
    pub fn peek(&self, fp: Fingerprint) -> Option<Verdict> {
        match self.entries.get(&fp) {
            Some(CacheEntry::Ready(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────
