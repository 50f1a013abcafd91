// runner.rs — Interestingness-test execution
//
// Two runners share one contract: start the user predicate against a
// sandbox directory and hand back a pollable/waitable/killable handle.
// The general runner forks the predicate as a subprocess in its own
// process group. The fast runner is used when the predicate is statically
// recognized as a one-command grep script; it computes the same verdict
// in-process on a thread. The choice is a pure optimization — both must
// yield identical verdicts.
//
// Failure modes: spawn failures are fatal to the variant (reported as
//   `RunnerError`); wait failures are logged and read as NotInteresting.
// Side effects: the predicate runs with the sandbox as working directory
//   and must not be able to outlive its worker (process-group kill).

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use log::warn;

// ── Verdict ──────────────────────────────────────────────────────────────

/// Predicate verdict for one candidate. Exit 0 is Interesting, the
/// configured also-interesting code triggers a side save, anything else
/// (including a crash) is NotInteresting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Interesting,
    NotInteresting,
    AlsoInteresting(i32),
}

fn map_verdict(code: Option<i32>, also_interesting: Option<i32>) -> Verdict {
    match code {
        Some(0) => Verdict::Interesting,
        Some(c) if Some(c) == also_interesting => Verdict::AlsoInteresting(c),
        _ => Verdict::NotInteresting,
    }
}

// ── Errors ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum RunnerError {
    Spawn {
        predicate: PathBuf,
        source: std::io::Error,
    },
}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerError::Spawn { predicate, source } => {
                write!(f, "failed to spawn {}: {}", predicate.display(), source)
            }
        }
    }
}

impl std::error::Error for RunnerError {}

// ── Worker handle ────────────────────────────────────────────────────────

enum HandleKind {
    Process(Child),
    Thread(Option<JoinHandle<bool>>),
}

/// A running predicate evaluation. Owned by exactly one variant.
pub struct TestHandle {
    kind: HandleKind,
    also_interesting: Option<i32>,
}

impl TestHandle {
    /// Non-blocking completion check.
    pub fn poll(&mut self) -> Option<Verdict> {
        let also = self.also_interesting;
        match &mut self.kind {
            HandleKind::Process(child) => match child.try_wait() {
                Ok(Some(status)) => Some(map_verdict(status.code(), also)),
                Ok(None) => None,
                Err(e) => {
                    warn!("failed to poll worker: {}", e);
                    Some(Verdict::NotInteresting)
                }
            },
            HandleKind::Thread(handle) => {
                if handle.as_ref().map_or(true, |h| h.is_finished()) {
                    Some(Self::join_thread(handle))
                } else {
                    None
                }
            }
        }
    }

    /// Blocking wait for the verdict.
    pub fn wait(&mut self) -> Verdict {
        let also = self.also_interesting;
        match &mut self.kind {
            HandleKind::Process(child) => match child.wait() {
                Ok(status) => map_verdict(status.code(), also),
                Err(e) => {
                    warn!("failed to wait on worker: {}", e);
                    Verdict::NotInteresting
                }
            },
            HandleKind::Thread(handle) => Self::join_thread(handle),
        }
    }

    /// Terminate the worker and reap it. Sends SIGTERM to the whole process
    /// group, escalating to SIGKILL after a short grace period. With
    /// `no_kill` the worker is waited for instead (debug aid).
    pub fn kill(&mut self, no_kill: bool) {
        match &mut self.kind {
            HandleKind::Process(child) => {
                if no_kill {
                    let _ = child.wait();
                    return;
                }
                signal_group(child, false);
                for _ in 0..20 {
                    if let Ok(Some(_)) = child.try_wait() {
                        return;
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
                signal_group(child, true);
                let _ = child.wait();
            }
            HandleKind::Thread(handle) => {
                Self::join_thread(handle);
            }
        }
    }

    fn join_thread(handle: &mut Option<JoinHandle<bool>>) -> Verdict {
        match handle.take().map(|h| h.join()) {
            Some(Ok(true)) => Verdict::Interesting,
            _ => Verdict::NotInteresting,
        }
    }
}

#[cfg(unix)]
fn signal_group(child: &mut Child, force: bool) {
    let sig = if force { libc::SIGKILL } else { libc::SIGTERM };
    unsafe {
        libc::killpg(child.id() as libc::pid_t, sig);
    }
}

#[cfg(not(unix))]
fn signal_group(child: &mut Child, _force: bool) {
    let _ = child.kill();
}

// ── Runner contract ──────────────────────────────────────────────────────

pub trait TestRunner: Send + Sync {
    fn start(&self, sandbox: &Path) -> Result<TestHandle, RunnerError>;
}

// ── General subprocess runner ────────────────────────────────────────────

/// Runs the predicate executable with the sandbox as working directory.
pub struct GeneralTestRunner {
    predicate: PathBuf,
    also_interesting: Option<i32>,
}

impl GeneralTestRunner {
    /// `predicate` must be an absolute path: the child's working directory
    /// is the sandbox, so a relative predicate would no longer resolve.
    pub fn new(predicate: PathBuf, also_interesting: Option<i32>) -> Self {
        Self {
            predicate,
            also_interesting,
        }
    }
}

impl TestRunner for GeneralTestRunner {
    fn start(&self, sandbox: &Path) -> Result<TestHandle, RunnerError> {
        let mut cmd = Command::new(&self.predicate);
        cmd.current_dir(sandbox)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own process group, so killing the worker also reaps any
            // grandchildren the predicate spawned.
            cmd.process_group(0);
        }
        let child = cmd.spawn().map_err(|e| RunnerError::Spawn {
            predicate: self.predicate.clone(),
            source: e,
        })?;
        Ok(TestHandle {
            kind: HandleKind::Process(child),
            also_interesting: self.also_interesting,
        })
    }
}

// ── Fast in-process runner ───────────────────────────────────────────────

/// The recognized predicate shape: a shell script whose body is a single
/// `grep [flags] PATTERN FILE` command over a file in the sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrepSpec {
    pub pattern: String,
    pub file: String,
}

/// Evaluates a recognized grep predicate in-process. grep can never exit
/// with a code in the also-interesting range, so that knob is ignored here.
pub struct FastTestRunner {
    spec: GrepSpec,
}

impl FastTestRunner {
    pub fn new(spec: GrepSpec) -> Self {
        Self { spec }
    }

    /// Statically recognize a predicate script this runner can replace:
    /// one shebang line, one grep command, no shell metacharacters, and a
    /// pattern that plain substring search matches exactly (fixed-string
    /// via -F, or free of regex metacharacters).
    pub fn recognize(predicate: &Path) -> Option<GrepSpec> {
        let text = std::fs::read_to_string(predicate).ok()?;
        let mut lines = text.lines();
        let shebang = lines.next()?;
        if !shebang.starts_with("#!") || !shebang.contains("sh") {
            return None;
        }
        let body: Vec<&str> = lines
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .collect();
        if body.len() != 1 {
            return None;
        }
        parse_grep_command(body[0])
    }
}

impl TestRunner for FastTestRunner {
    fn start(&self, sandbox: &Path) -> Result<TestHandle, RunnerError> {
        let spec = self.spec.clone();
        let target = sandbox.join(&spec.file);
        let handle = std::thread::spawn(move || match std::fs::read_to_string(&target) {
            Ok(content) => content.contains(&spec.pattern),
            Err(_) => false,
        });
        Ok(TestHandle {
            kind: HandleKind::Thread(Some(handle)),
            also_interesting: None,
        })
    }
}

fn parse_grep_command(line: &str) -> Option<GrepSpec> {
    let tokens = shell_tokens(line)?;
    let mut iter = tokens.into_iter();
    if iter.next()?.as_str() != "grep" {
        return None;
    }

    let mut fixed = false;
    let mut pattern: Option<String> = None;
    let mut file: Option<String> = None;
    for token in iter {
        if token.starts_with('-') && pattern.is_none() {
            for flag in token.chars().skip(1) {
                match flag {
                    'F' => fixed = true,
                    'q' | 's' => {}
                    _ => return None,
                }
            }
        } else if pattern.is_none() {
            pattern = Some(token);
        } else if file.is_none() {
            file = Some(token);
        } else {
            return None;
        }
    }

    let pattern = pattern?;
    let file = file?;
    if pattern.is_empty() || file.is_empty() || file.starts_with('-') || file.contains('/') {
        return None;
    }
    if !fixed && pattern.chars().any(|c| r".*[]^$\+?{}|()".contains(c)) {
        return None;
    }
    Some(GrepSpec { pattern, file })
}

/// Whitespace tokenizer with single/double-quote handling. Returns None on
/// any metacharacter the in-process evaluation could not reproduce.
fn shell_tokens(line: &str) -> Option<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                let quote = c;
                in_token = true;
                loop {
                    match chars.next() {
                        Some(q) if q == quote => break,
                        Some('$') | Some('`') | Some('\\') if quote == '"' => return None,
                        Some(inner) => current.push(inner),
                        None => return None,
                    }
                }
            }
            ' ' | '\t' => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            '$' | '`' | '\\' | '|' | ';' | '&' | '<' | '>' | '(' | ')' | '*' | '~' | '#' => {
                return None
            }
            other => {
                in_token = true;
                current.push(other);
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    Some(tokens)
}

// ── Tests ────────────────────────────────────────────────────────────────
