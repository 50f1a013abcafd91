// reducer.rs — Top-level reduction: validate, sanity-check, then run the
// first / main / last phases over the pass group
//
// The main phase loops to a fixed point on total test-case size; the
// first and last phases run once. Pass prerequisites are checked before
// anything touches the test cases.

use std::fmt;
use std::path::PathBuf;

use log::info;

use crate::group::PassGroup;
use crate::manager::{ManagerError, TestManager};

// ── Errors ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ReduceError {
    InvalidTestCase {
        path: PathBuf,
        reason: &'static str,
    },
    PrerequisitesMissing {
        passes: Vec<String>,
    },
    Manager(ManagerError),
}

impl fmt::Display for ReduceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReduceError::InvalidTestCase { path, reason } => {
                write!(f, "invalid test case {}: {}", path.display(), reason)
            }
            ReduceError::PrerequisitesMissing { passes } => {
                write!(f, "missing prerequisites for: {}", passes.join(", "))
            }
            ReduceError::Manager(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ReduceError {}

impl From<ManagerError> for ReduceError {
    fn from(e: ManagerError) -> Self {
        ReduceError::Manager(e)
    }
}

// ── Reducer ──────────────────────────────────────────────────────────────

pub struct Reducer {
    manager: TestManager,
    pub tidy: bool,
    pub skip_initial: bool,
}

impl Reducer {
    pub fn new(manager: TestManager) -> Self {
        Self {
            manager,
            tidy: false,
            skip_initial: false,
        }
    }

    pub fn manager(&self) -> &TestManager {
        &self.manager
    }

    /// Run the whole reduction. On success the test cases on disk hold the
    /// reduced contents.
    pub fn reduce(&mut self, group: &PassGroup) -> Result<(), ReduceError> {
        self.validate_test_cases()?;
        Self::check_prerequisites(group)?;
        self.manager.check_sanity()?;

        info!("===< {} >===", std::process::id());
        let workers = self.manager.parallel_tests();
        info!(
            "running {} interestingness test{} in parallel",
            workers,
            if workers == 1 { "" } else { "s" }
        );

        if !self.tidy {
            self.manager.backup_test_cases()?;
        }

        if !self.skip_initial {
            info!("INITIAL PASSES");
            self.run_phase(&group.first)?;
        }

        info!("MAIN PASSES");
        loop {
            let size_before = self.manager.total_file_size();
            self.run_phase(&group.main)?;
            let size_after = self.manager.total_file_size();
            info!(
                "Termination check: size was {}; now {}",
                size_before, size_after
            );
            if size_after >= size_before {
                break;
            }
        }

        info!("CLEANUP PASS");
        self.run_phase(&group.last)?;

        info!("===================== done ====================");
        Ok(())
    }

    fn run_phase(&mut self, phase: &[crate::group::PassInstance]) -> Result<(), ReduceError> {
        for instance in phase {
            self.manager.run_pass(instance.pass.as_ref(), &instance.arg)?;
        }
        Ok(())
    }

    fn validate_test_cases(&self) -> Result<(), ReduceError> {
        for case in self.manager.test_cases() {
            let metadata = std::fs::metadata(case).map_err(|_| ReduceError::InvalidTestCase {
                path: case.clone(),
                reason: "file not found",
            })?;
            if !metadata.is_file() {
                return Err(ReduceError::InvalidTestCase {
                    path: case.clone(),
                    reason: "not a regular file",
                });
            }
            if metadata.permissions().readonly() {
                return Err(ReduceError::InvalidTestCase {
                    path: case.clone(),
                    reason: "not writable",
                });
            }
            // Readability check; the engine rereads this file constantly.
            std::fs::File::open(case).map_err(|_| ReduceError::InvalidTestCase {
                path: case.clone(),
                reason: "not readable",
            })?;
        }
        Ok(())
    }

    /// A missing external tool removes a run before it starts; the error
    /// lists every affected pass.
    fn check_prerequisites(group: &PassGroup) -> Result<(), ReduceError> {
        let mut missing: Vec<String> = Vec::new();
        for instance in group.all() {
            if !instance.pass.check_prerequisites() {
                let name = instance.pass.name().to_string();
                if !missing.contains(&name) {
                    missing.push(name);
                }
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ReduceError::PrerequisitesMissing { passes: missing })
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────
