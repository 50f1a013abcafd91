// manager.rs — The parallel speculative search
//
// Runs one pass over one test case to a local fixed point: candidates are
// seeded into a bounded FIFO of sandboxed workers, the earliest
// interesting candidate (in submission order, for the conservative pair)
// is committed atomically onto the real test case, stragglers are killed,
// and the cursor restarts from the committed state.
//
// Preconditions: test cases validated by the reducer; the pass honors the
//   DeltaPass contract.
// Postconditions: the real test case only ever holds the original bytes or
//   a committed variant.
// Failure modes: sanity-check failure, pass bugs (fatal only under
//   die_on_pass_bug), worker spawn failures (read as NotInteresting).
// Side effects: test-case rewrites, `.orig` backups, also-interesting side
//   saves under `tcr-extras/`.

use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};

use crate::cache::{fingerprint_files, Fingerprint, Lookup, ResultCache};
use crate::pass::{DeltaPass, PassState, TransformResult};
use crate::runner::{TestRunner, Verdict};
use crate::sandbox::{commit_file, Sandbox};
use crate::stats::PassStatistic;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

// ── Strategy ─────────────────────────────────────────────────────────────

/// How speculative results are committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Reap in submission order, blocking on the head of the queue. The
    /// committed sequence equals a single-threaded run of the same pass.
    #[default]
    Conservative,
    /// Same ordering guarantee; later verdicts are retained while the head
    /// is still running, trimming head-of-line latency.
    FastConservative,
    /// Commit the first interesting result regardless of submission order.
    NonDeterministic,
}

impl Strategy {
    /// Consecutive rejected candidates tolerated before a pass is declared
    /// exhausted for the test case.
    pub fn give_up_threshold(self) -> usize {
        match self {
            Strategy::Conservative | Strategy::FastConservative => 50_000,
            Strategy::NonDeterministic => 10_000,
        }
    }
}

// ── Configuration ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub parallel_tests: usize,
    pub strategy: Strategy,
    pub no_cache: bool,
    pub shaddap: bool,
    pub die_on_pass_bug: bool,
    pub print_diff: bool,
    pub save_temps: bool,
    pub no_kill: bool,
    pub no_give_up: bool,
    /// Override of the strategy's give-up constant.
    pub give_up_threshold: Option<usize>,
    pub max_improvement: Option<u64>,
    pub also_interesting: Option<i32>,
    pub skip_key_off: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            parallel_tests: 1,
            strategy: Strategy::default(),
            no_cache: false,
            shaddap: false,
            die_on_pass_bug: false,
            print_diff: false,
            save_temps: false,
            no_kill: false,
            no_give_up: false,
            give_up_threshold: None,
            max_improvement: None,
            also_interesting: None,
            skip_key_off: false,
        }
    }
}

// ── Errors ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ManagerError {
    SanityCheckFailed,
    PassBug { pass: String, arg: String },
    Io { path: PathBuf, source: std::io::Error },
    Runner(crate::runner::RunnerError),
}

impl fmt::Display for ManagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagerError::SanityCheckFailed => {
                write!(f, "sanity check failed: the unmodified test cases are not interesting")
            }
            ManagerError::PassBug { pass, arg } => {
                write!(f, "pass bug in {} :: {}", pass, arg)
            }
            ManagerError::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            ManagerError::Runner(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ManagerError {}

// ── Variants ─────────────────────────────────────────────────────────────

enum Probe {
    /// A worker is evaluating this candidate.
    Running(crate::runner::TestHandle),
    /// Another in-flight variant with the same fingerprint is evaluating;
    /// resolve from the cache once it lands.
    Waiting,
    Resolved(Verdict),
}

struct Variant {
    sandbox: Sandbox,
    /// Sandboxed path of the test case the pass rewrote.
    candidate: PathBuf,
    /// Cursor state describing this candidate.
    state: PassState,
    fingerprint: Option<Fingerprint>,
    /// Total candidate size across all sandboxed test cases.
    size: u64,
    probe: Probe,
}

enum Seeded {
    Variant(Box<Variant>),
    Stop,
    Bug,
}

enum Outcome {
    Committed,
    Rejected,
}

// ── Skip key ─────────────────────────────────────────────────────────────

/// Watches the controlling terminal for an `s` keypress. Best-effort UX:
/// only armed when stdin is a TTY.
struct SkipRequest {
    flag: Arc<AtomicBool>,
}

impl SkipRequest {
    fn monitor() -> Option<SkipRequest> {
        if !stdin_is_tty() {
            return None;
        }
        let flag = Arc::new(AtomicBool::new(false));
        let watcher = Arc::clone(&flag);
        std::thread::Builder::new()
            .name("skip-key".into())
            .spawn(move || {
                use std::io::Read;
                let mut byte = [0u8; 1];
                let mut stdin = std::io::stdin();
                while let Ok(n) = stdin.read(&mut byte) {
                    if n == 0 {
                        break;
                    }
                    if byte[0] == b's' {
                        watcher.store(true, Ordering::SeqCst);
                    }
                }
            })
            .ok()?;
        Some(SkipRequest { flag })
    }

    fn take(&self) -> bool {
        self.flag.swap(false, Ordering::SeqCst)
    }
}

#[cfg(unix)]
fn stdin_is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) == 1 }
}

#[cfg(not(unix))]
fn stdin_is_tty() -> bool {
    false
}

// ── Test manager ─────────────────────────────────────────────────────────

pub struct TestManager {
    runner: Box<dyn TestRunner>,
    stats: PassStatistic,
    test_cases: Vec<PathBuf>,
    cfg: ManagerConfig,
    cache: ResultCache,
    skip: Option<SkipRequest>,
    extra_counter: usize,
}

impl TestManager {
    pub fn new(runner: Box<dyn TestRunner>, test_cases: Vec<PathBuf>, cfg: ManagerConfig) -> Self {
        let skip = if cfg.skip_key_off {
            None
        } else {
            SkipRequest::monitor()
        };
        Self {
            runner,
            stats: PassStatistic::new(),
            test_cases,
            cfg,
            cache: ResultCache::new(),
            skip,
            extra_counter: 0,
        }
    }

    pub fn test_cases(&self) -> &[PathBuf] {
        &self.test_cases
    }

    /// Test cases in stable name order, for the final report.
    pub fn sorted_test_cases(&self) -> Vec<PathBuf> {
        let mut cases = self.test_cases.clone();
        cases.sort();
        cases
    }

    pub fn parallel_tests(&self) -> usize {
        self.cfg.parallel_tests
    }

    pub fn statistics(&self) -> &PassStatistic {
        &self.stats
    }

    pub fn total_file_size(&self) -> u64 {
        self.test_cases
            .iter()
            .map(|c| std::fs::metadata(c).map(|m| m.len()).unwrap_or(0))
            .sum()
    }

    /// The unmodified test cases must satisfy the predicate.
    pub fn check_sanity(&mut self) -> Result<(), ManagerError> {
        debug!("sanity check");
        let sandbox =
            Sandbox::create(&self.test_cases, self.cfg.save_temps).map_err(|e| ManagerError::Io {
                path: self.test_cases.first().cloned().unwrap_or_default(),
                source: e,
            })?;
        let mut handle = self.runner.start(sandbox.dir()).map_err(ManagerError::Runner)?;
        match handle.wait() {
            Verdict::Interesting => Ok(()),
            _ => Err(ManagerError::SanityCheckFailed),
        }
    }

    /// Write `<name>.orig` next to each test case, once, only if absent.
    pub fn backup_test_cases(&self) -> Result<(), ManagerError> {
        for case in &self.test_cases {
            let mut name = case.file_name().unwrap_or_default().to_os_string();
            name.push(".orig");
            let backup = case.with_file_name(name);
            if !backup.exists() {
                std::fs::copy(case, &backup).map_err(|e| ManagerError::Io {
                    path: backup.clone(),
                    source: e,
                })?;
                debug!("backed up {}", backup.display());
            }
        }
        Ok(())
    }

    /// Run one (pass, arg) over every test case to a local fixed point.
    pub fn run_pass(&mut self, pass: &dyn DeltaPass, arg: &str) -> Result<(), ManagerError> {
        let cases = self.test_cases.clone();
        for case in cases {
            self.run_pass_on(pass, arg, &case)?;
        }
        Ok(())
    }

    fn effective_give_up(&self) -> Option<usize> {
        if self.cfg.no_give_up {
            return None;
        }
        Some(
            self.cfg
                .give_up_threshold
                .unwrap_or_else(|| self.cfg.strategy.give_up_threshold()),
        )
    }

    fn run_pass_on(
        &mut self,
        pass: &dyn DeltaPass,
        arg: &str,
        test_case: &Path,
    ) -> Result<(), ManagerError> {
        debug!(
            "===< {} :: {} >=== {}",
            pass.name(),
            arg,
            test_case.display()
        );

        let mut cursor = pass.new(test_case, arg);
        let mut variants: VecDeque<Variant> = VecDeque::new();
        let mut stopped = false;
        let mut rejected = 0usize;
        let mut current_size = self.total_file_size();
        let give_up_at = self.effective_give_up();

        'search: loop {
            if self.skip.as_ref().is_some_and(|s| s.take()) {
                info!("skipping the rest of {} :: {}", pass.name(), arg);
                self.discard_variants(&mut variants);
                break 'search;
            }

            // Seed the queue up to the worker bound.
            while !stopped && variants.len() < self.cfg.parallel_tests {
                match self.seed_variant(pass, arg, test_case, &mut cursor)? {
                    Seeded::Variant(v) => variants.push_back(*v),
                    Seeded::Stop => stopped = true,
                    Seeded::Bug => {
                        stopped = true;
                        if self.cfg.die_on_pass_bug {
                            self.discard_variants(&mut variants);
                            return Err(ManagerError::PassBug {
                                pass: pass.name().to_string(),
                                arg: arg.to_string(),
                            });
                        }
                    }
                }
            }

            if variants.is_empty() {
                // Stopped and drained: exhausted.
                break 'search;
            }

            match self.cfg.strategy {
                Strategy::Conservative => {
                    let mut head = variants.pop_front().expect("queue is non-empty");
                    let verdict = self.wait_variant(&mut head);
                    match self.settle(pass, arg, test_case, head, verdict, &mut cursor, &mut current_size)? {
                        Outcome::Committed => {
                            self.discard_variants(&mut variants);
                            stopped = false;
                            rejected = 0;
                        }
                        Outcome::Rejected => {
                            rejected += 1;
                            if give_up_at.is_some_and(|t| rejected >= t) {
                                self.give_up(pass, arg, rejected, &mut variants);
                                break 'search;
                            }
                        }
                    }
                }
                Strategy::FastConservative => {
                    // Collect whatever landed, then settle resolved heads in
                    // submission order.
                    for v in variants.iter_mut() {
                        let _ = self.poll_variant(v);
                    }
                    let mut progressed = false;
                    while variants
                        .front_mut()
                        .map_or(false, |v| matches!(v.probe, Probe::Resolved(_)))
                    {
                        let head = variants.pop_front().expect("checked non-empty");
                        let Probe::Resolved(verdict) = &head.probe else {
                            unreachable!()
                        };
                        let verdict = *verdict;
                        progressed = true;
                        match self.settle(pass, arg, test_case, head, verdict, &mut cursor, &mut current_size)? {
                            Outcome::Committed => {
                                self.discard_variants(&mut variants);
                                stopped = false;
                                rejected = 0;
                                break;
                            }
                            Outcome::Rejected => {
                                rejected += 1;
                                if give_up_at.is_some_and(|t| rejected >= t) {
                                    self.give_up(pass, arg, rejected, &mut variants);
                                    break 'search;
                                }
                            }
                        }
                    }
                    if !progressed {
                        std::thread::sleep(POLL_INTERVAL);
                    }
                }
                Strategy::NonDeterministic => {
                    let mut progressed = false;
                    let mut idx = 0;
                    while idx < variants.len() {
                        if self.poll_variant(&mut variants[idx]).is_none() {
                            idx += 1;
                            continue;
                        }
                        let v = variants.remove(idx).expect("index checked");
                        let Probe::Resolved(verdict) = &v.probe else {
                            unreachable!()
                        };
                        let verdict = *verdict;
                        progressed = true;
                        match self.settle(pass, arg, test_case, v, verdict, &mut cursor, &mut current_size)? {
                            Outcome::Committed => {
                                self.discard_variants(&mut variants);
                                stopped = false;
                                rejected = 0;
                                break;
                            }
                            Outcome::Rejected => {
                                rejected += 1;
                                if give_up_at.is_some_and(|t| rejected >= t) {
                                    self.give_up(pass, arg, rejected, &mut variants);
                                    break 'search;
                                }
                            }
                        }
                    }
                    if !progressed {
                        std::thread::sleep(POLL_INTERVAL);
                    }
                }
            }
        }
        Ok(())
    }

    /// Create a sandbox, ask the pass for the next candidate, and launch
    /// (or cache-resolve) its evaluation.
    fn seed_variant(
        &mut self,
        pass: &dyn DeltaPass,
        arg: &str,
        test_case: &Path,
        cursor: &mut PassState,
    ) -> Result<Seeded, ManagerError> {
        let sandbox =
            Sandbox::create(&self.test_cases, self.cfg.save_temps).map_err(|e| ManagerError::Io {
                path: test_case.to_path_buf(),
                source: e,
            })?;
        let candidate = sandbox.path_of(test_case);

        let (result, state) = pass.transform(&candidate, arg, cursor);
        match result {
            TransformResult::Stop => Ok(Seeded::Stop),
            TransformResult::Error => {
                self.stats.add_failed(pass.name(), arg);
                if !self.cfg.shaddap {
                    warn!("pass bug in {} :: {}", pass.name(), arg);
                }
                Ok(Seeded::Bug)
            }
            TransformResult::Ok => {
                *cursor = pass.advance(&candidate, arg, &state);

                let mut paths: Vec<PathBuf> =
                    self.test_cases.iter().map(|c| sandbox.path_of(c)).collect();
                paths.sort();
                let size = paths
                    .iter()
                    .map(|p| std::fs::metadata(p).map(|m| m.len()).unwrap_or(0))
                    .sum();

                let mut fingerprint = None;
                let probe = if self.cfg.no_cache {
                    self.start_worker(&sandbox)
                } else {
                    match fingerprint_files(&paths) {
                        Ok(fp) => {
                            fingerprint = Some(fp);
                            match self.cache.begin(fp) {
                                Lookup::Ready(verdict) => {
                                    debug!("cache hit: {}", fp);
                                    Probe::Resolved(verdict)
                                }
                                Lookup::InFlight => Probe::Waiting,
                                Lookup::Vacant => self.start_worker(&sandbox),
                            }
                        }
                        Err(e) => {
                            warn!("fingerprinting failed: {}", e);
                            self.start_worker(&sandbox)
                        }
                    }
                };

                Ok(Seeded::Variant(Box::new(Variant {
                    sandbox,
                    candidate,
                    state,
                    fingerprint,
                    size,
                    probe,
                })))
            }
        }
    }

    fn start_worker(&self, sandbox: &Sandbox) -> Probe {
        match self.runner.start(sandbox.dir()) {
            Ok(handle) => Probe::Running(handle),
            Err(e) => {
                // Spawn failure reads as NotInteresting; the search goes on.
                warn!("{}", e);
                Probe::Resolved(Verdict::NotInteresting)
            }
        }
    }

    /// Non-blocking resolve; fulfills the cache when a worker lands.
    fn poll_variant(&mut self, v: &mut Variant) -> Option<Verdict> {
        match &mut v.probe {
            Probe::Resolved(verdict) => Some(*verdict),
            Probe::Waiting => {
                let verdict = v.fingerprint.and_then(|fp| self.cache.peek(fp))?;
                v.probe = Probe::Resolved(verdict);
                Some(verdict)
            }
            Probe::Running(handle) => {
                let verdict = handle.poll()?;
                if let Some(fp) = v.fingerprint {
                    self.cache.fulfill(fp, verdict);
                }
                v.probe = Probe::Resolved(verdict);
                Some(verdict)
            }
        }
    }

    /// Blocking resolve, used on the head of the conservative queue.
    fn wait_variant(&mut self, v: &mut Variant) -> Verdict {
        loop {
            match &mut v.probe {
                Probe::Resolved(verdict) => return *verdict,
                Probe::Running(handle) => {
                    let verdict = handle.wait();
                    if let Some(fp) = v.fingerprint {
                        self.cache.fulfill(fp, verdict);
                    }
                    v.probe = Probe::Resolved(verdict);
                    return verdict;
                }
                Probe::Waiting => {
                    // The evaluating variant was submitted earlier, so under
                    // conservative reaping its verdict is already in the
                    // cache; the sleep only covers scheduling races.
                    if let Some(verdict) = v.fingerprint.and_then(|fp| self.cache.peek(fp)) {
                        v.probe = Probe::Resolved(verdict);
                        return verdict;
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
            }
        }
    }

    /// Apply a verdict: commit the variant or account the rejection.
    #[allow(clippy::too_many_arguments)]
    fn settle(
        &mut self,
        pass: &dyn DeltaPass,
        arg: &str,
        test_case: &Path,
        variant: Variant,
        verdict: Verdict,
        cursor: &mut PassState,
        current_size: &mut u64,
    ) -> Result<Outcome, ManagerError> {
        match verdict {
            Verdict::Interesting => {
                let delta = current_size.saturating_sub(variant.size);
                if self.cfg.max_improvement.is_some_and(|max| delta > max) {
                    debug!(
                        "rejecting improvement of {} bytes (max {})",
                        delta,
                        self.cfg.max_improvement.unwrap_or(0)
                    );
                    self.stats.add_failed(pass.name(), arg);
                    return Ok(Outcome::Rejected);
                }

                if self.cfg.print_diff {
                    let old = std::fs::read_to_string(test_case).unwrap_or_default();
                    let new = std::fs::read_to_string(&variant.candidate).unwrap_or_default();
                    info!(
                        "{} :: {}\n{}",
                        pass.name(),
                        arg,
                        prettydiff::diff_lines(&old, &new)
                    );
                }

                commit_file(&variant.candidate, test_case).map_err(|e| ManagerError::Io {
                    path: test_case.to_path_buf(),
                    source: e,
                })?;
                *cursor = pass.advance_on_success(&variant.candidate, arg, &variant.state);
                *current_size = self.total_file_size();
                self.stats.add_worked(pass.name(), arg);
                debug!(
                    "committed {} :: {} ({} bytes)",
                    pass.name(),
                    arg,
                    current_size
                );
                Ok(Outcome::Committed)
            }
            Verdict::AlsoInteresting(code) => {
                self.save_extra_variant(&variant, code);
                self.stats.add_failed(pass.name(), arg);
                Ok(Outcome::Rejected)
            }
            Verdict::NotInteresting => {
                self.stats.add_failed(pass.name(), arg);
                Ok(Outcome::Rejected)
            }
        }
    }

    fn give_up(
        &mut self,
        pass: &dyn DeltaPass,
        arg: &str,
        rejected: usize,
        variants: &mut VecDeque<Variant>,
    ) {
        info!(
            "giving up on {} :: {} after {} rejected variants",
            pass.name(),
            arg,
            rejected
        );
        self.discard_variants(variants);
    }

    /// Kill every in-flight worker and drop its sandbox. Any verdict a
    /// killed worker produced is discarded along with it; Pending cache
    /// entries are abandoned so later submitters can re-evaluate.
    fn discard_variants(&mut self, variants: &mut VecDeque<Variant>) {
        for mut v in variants.drain(..) {
            if let Probe::Running(ref mut handle) = v.probe {
                handle.kill(self.cfg.no_kill);
            }
            if let Some(fp) = v.fingerprint {
                self.cache.abandon(fp);
            }
        }
    }

    /// Timestamped copy of an also-interesting sandbox, next to the
    /// working directory.
    fn save_extra_variant(&mut self, variant: &Variant, code: i32) {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        self.extra_counter += 1;
        let dest = PathBuf::from("tcr-extras").join(format!(
            "exit{}-{}-{}",
            code, millis, self.extra_counter
        ));
        match variant.sandbox.save_to(&dest) {
            Ok(()) => info!("saved also-interesting variant to {}", dest.display()),
            Err(e) => warn!("failed to save also-interesting variant: {}", e),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::lines::LinesPass;
    use crate::runner::{FastTestRunner, GrepSpec};

    fn grep_runner(pattern: &str) -> Box<dyn TestRunner> {
        Box::new(FastTestRunner::new(GrepSpec {
            pattern: pattern.to_string(),
            file: "case.c".to_string(),
        }))
    }

    fn manager_for(
        dir: &Path,
        content: &str,
        pattern: &str,
        cfg: ManagerConfig,
    ) -> (TestManager, PathBuf) {
        let case = dir.join("case.c");
        std::fs::write(&case, content).unwrap();
        let manager = TestManager::new(grep_runner(pattern), vec![case.clone()], cfg);
        (manager, case)
    }

    #[test]
    fn lines_pass_reduces_to_the_matching_line() {
        for parallel in [1, 4] {
            let dir = tempfile::tempdir().unwrap();
            let cfg = ManagerConfig {
                parallel_tests: parallel,
                ..Default::default()
            };
            let (mut manager, case) =
                manager_for(dir.path(), "a;\nKEEP;\nb;\n", "KEEP", cfg);
            manager.run_pass(&LinesPass, "0").unwrap();
            assert_eq!(std::fs::read_to_string(&case).unwrap(), "KEEP;\n");
            assert!(manager.statistics().get("lines", "0").worked >= 2);
        }
    }

    #[test]
    fn strategies_agree_on_the_result() {
        for strategy in [
            Strategy::Conservative,
            Strategy::FastConservative,
            Strategy::NonDeterministic,
        ] {
            let dir = tempfile::tempdir().unwrap();
            let cfg = ManagerConfig {
                parallel_tests: 3,
                strategy,
                ..Default::default()
            };
            let (mut manager, case) =
                manager_for(dir.path(), "a;\nKEEP;\nb;\nc;\n", "KEEP", cfg);
            manager.run_pass(&LinesPass, "0").unwrap();
            assert_eq!(
                std::fs::read_to_string(&case).unwrap(),
                "KEEP;\n",
                "strategy {:?}",
                strategy
            );
        }
    }

    #[test]
    fn cache_does_not_change_the_outcome() {
        let mut outputs = Vec::new();
        for no_cache in [false, true] {
            let dir = tempfile::tempdir().unwrap();
            let cfg = ManagerConfig {
                parallel_tests: 2,
                no_cache,
                ..Default::default()
            };
            let (mut manager, case) =
                manager_for(dir.path(), "x;\nKEEP;\ny;\nz;\n", "KEEP", cfg);
            manager.run_pass(&LinesPass, "0").unwrap();
            outputs.push(std::fs::read_to_string(&case).unwrap());
        }
        assert_eq!(outputs[0], outputs[1]);
    }

    #[test]
    fn give_up_bounds_the_rejections() {
        let dir = tempfile::tempdir().unwrap();
        let body: String = (0..40).map(|i| format!("line{};\n", i)).collect();
        // The predicate never matches a candidate (every candidate drops at
        // least one line, and all lines are required by the pattern below
        // being absent) — the whole space would be explored without give-up.
        let cfg = ManagerConfig {
            parallel_tests: 1,
            give_up_threshold: Some(5),
            ..Default::default()
        };
        let (mut manager, case) = manager_for(dir.path(), &body, "NEVER-PRESENT", cfg);
        manager.run_pass(&LinesPass, "0").unwrap();
        assert_eq!(std::fs::read_to_string(&case).unwrap(), body);
        assert_eq!(manager.statistics().get("lines", "0").failed, 5);
    }

    #[test]
    fn no_give_up_explores_the_whole_space() {
        let dir = tempfile::tempdir().unwrap();
        let body = "a;\nb;\nc;\nd;\n";
        let cfg = ManagerConfig {
            parallel_tests: 1,
            give_up_threshold: Some(2),
            no_give_up: true,
            ..Default::default()
        };
        let (mut manager, case) = manager_for(dir.path(), body, "NEVER-PRESENT", cfg);
        manager.run_pass(&LinesPass, "0").unwrap();
        assert_eq!(std::fs::read_to_string(&case).unwrap(), body);
        // 4-line file: windows of 4, 2+2, and 1×4 all get evaluated.
        assert_eq!(manager.statistics().get("lines", "0").failed, 7);
    }

    #[test]
    fn max_improvement_rejects_big_jumps() {
        // Every single-line removal improves by exactly 4 bytes.
        let body = "aa;\nKEEP;\nbb;\n";

        let dir = tempfile::tempdir().unwrap();
        let cfg = ManagerConfig {
            parallel_tests: 1,
            max_improvement: Some(3),
            ..Default::default()
        };
        let (mut manager, case) = manager_for(dir.path(), body, "KEEP", cfg);
        manager.run_pass(&LinesPass, "0").unwrap();
        assert_eq!(std::fs::read_to_string(&case).unwrap(), body);

        let dir = tempfile::tempdir().unwrap();
        let cfg = ManagerConfig {
            parallel_tests: 1,
            max_improvement: Some(4),
            ..Default::default()
        };
        let (mut manager, case) = manager_for(dir.path(), body, "KEEP", cfg);
        manager.run_pass(&LinesPass, "0").unwrap();
        assert_eq!(std::fs::read_to_string(&case).unwrap(), "KEEP;\n");
    }

    #[test]
    fn sanity_check_accepts_and_rejects() {
        let dir = tempfile::tempdir().unwrap();
        let (mut manager, _case) =
            manager_for(dir.path(), "KEEP;\n", "KEEP", ManagerConfig::default());
        assert!(manager.check_sanity().is_ok());

        let dir = tempfile::tempdir().unwrap();
        let (mut manager, _case) =
            manager_for(dir.path(), "nothing\n", "KEEP", ManagerConfig::default());
        assert!(matches!(
            manager.check_sanity(),
            Err(ManagerError::SanityCheckFailed)
        ));
    }

    #[test]
    fn backups_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, case) =
            manager_for(dir.path(), "KEEP;\n", "KEEP", ManagerConfig::default());
        manager.backup_test_cases().unwrap();
        let backup = dir.path().join("case.c.orig");
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "KEEP;\n");

        // A later commit must not refresh the backup.
        std::fs::write(&case, "smaller\n").unwrap();
        manager.backup_test_cases().unwrap();
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "KEEP;\n");
    }
}
