use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;

use tcr::catalogue;
use tcr::group::{self, PassGroup, PassOption};
use tcr::manager::{ManagerConfig, ManagerError, Strategy, TestManager};
use tcr::reducer::{ReduceError, Reducer};
use tcr::runner::{FastTestRunner, GeneralTestRunner, TestRunner};

const EXIT_OK: i32 = 0;
const EXIT_REDUCE_ERROR: i32 = 1;
const EXIT_USAGE_ERROR: i32 = 2;
const EXIT_SYSTEM_ERROR: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum StrategyArg {
    Conservative,
    FastConservative,
    NonDeterministic,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Strategy {
        match arg {
            StrategyArg::Conservative => Strategy::Conservative,
            StrategyArg::FastConservative => Strategy::FastConservative,
            StrategyArg::NonDeterministic => Strategy::NonDeterministic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum LogLevel {
    Info,
    Debug,
    Warning,
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> log::LevelFilter {
        match level {
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Warning => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "tcr",
    version,
    about = "tcr — Test Case Reducer: shrinks inputs that trigger a bug to minimal reproducers"
)]
struct Cli {
    /// Number of interestingness tests to run in parallel
    #[arg(short = 'n', long = "n", default_value_t = num_cpus::get())]
    parallel: usize,

    /// Do not back up test cases as <name>.orig
    #[arg(long)]
    tidy: bool,

    /// Suppress output about non-fatal internal errors
    #[arg(long)]
    shaddap: bool,

    /// Terminate if a pass encounters an otherwise non-fatal problem
    #[arg(long)]
    die_on_pass_bug: bool,

    /// Attempt to obscure details from the original input
    #[arg(long)]
    sanitize: bool,

    /// Try harder to reduce, but perhaps take a long time to do so
    #[arg(long)]
    sllooww: bool,

    /// Predicate exit code (usually in 64-113) that saves a copy of the
    /// variant without committing it
    #[arg(long, value_name = "EXIT_CODE")]
    also_interesting: Option<i32>,

    /// Print debug information
    #[arg(long)]
    debug: bool,

    /// Verbosity of the logged events
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Append log events to FILE instead of stderr
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Wait for parallel instances to terminate on their own instead of
    /// killing them (debugging only)
    #[arg(long)]
    no_kill: bool,

    /// Don't give up on a pass that hasn't made progress
    #[arg(long)]
    no_give_up: bool,

    /// Show changes made by transformations, for debugging
    #[arg(long)]
    print_diff: bool,

    /// Don't delete temporary sandbox directories
    #[arg(long)]
    save_temps: bool,

    /// Skip initial passes (useful if the input is already partially reduced)
    #[arg(long)]
    skip_initial_passes: bool,

    /// Print timestamps about reduction progress
    #[arg(long)]
    timing: bool,

    /// Don't cache behavior of passes
    #[arg(long)]
    no_cache: bool,

    /// Disable skipping the rest of the current pass when "s" is pressed
    #[arg(long)]
    skip_key_off: bool,

    /// Largest accepted per-commit improvement in bytes (slows the search;
    /// debugging only)
    #[arg(long, value_name = "BYTES")]
    max_improvement: Option<u64>,

    /// Built-in set of passes used during the reduction
    #[arg(long, default_value = "all", conflicts_with = "pass_group_file")]
    pass_group: String,

    /// JSON file defining a custom pass group
    #[arg(long, value_name = "PATH")]
    pass_group_file: Option<PathBuf>,

    /// Strategy for the parallel reduction process
    #[arg(long, value_enum, default_value_t = StrategyArg::Conservative)]
    test_manager: StrategyArg,

    /// Use the general test runner even if a faster implementation is
    /// available
    #[arg(long)]
    no_fast_test: bool,

    /// Executable checking interestingness of candidate variants
    #[arg(value_name = "INTERESTINGNESS_TEST")]
    interestingness_test: PathBuf,

    /// Files to reduce
    #[arg(value_name = "TEST_CASE", required = true)]
    test_cases: Vec<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    init_logging(&cli);

    // ── Resolve the predicate and test cases to absolute paths: workers
    //    run with the sandbox as working directory ──
    let predicate = match std::fs::canonicalize(&cli.interestingness_test) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {}: {}", cli.interestingness_test.display(), e);
            std::process::exit(EXIT_USAGE_ERROR);
        }
    };
    let mut test_cases = Vec::with_capacity(cli.test_cases.len());
    for case in &cli.test_cases {
        match std::fs::canonicalize(case) {
            Ok(p) => test_cases.push(p),
            Err(e) => {
                eprintln!("error: {}: {}", case.display(), e);
                std::process::exit(EXIT_USAGE_ERROR);
            }
        }
    }

    // ── Pass options ──
    let mut options: HashSet<PassOption> = HashSet::new();
    if cli.sanitize {
        options.insert(PassOption::Sanitize);
    }
    if cli.sllooww {
        options.insert(PassOption::Slow);
    }
    if cfg!(windows) {
        options.insert(PassOption::Windows);
    }

    // ── Pass group ──
    let pass_group = load_pass_group(&cli, &options);

    // ── Test runner ──
    let runner: Box<dyn TestRunner> = match FastTestRunner::recognize(&predicate) {
        Some(spec) if !cli.no_fast_test && cli.also_interesting.is_none() => {
            log::debug!("using the in-process runner for {}", predicate.display());
            Box::new(FastTestRunner::new(spec))
        }
        _ => Box::new(GeneralTestRunner::new(
            predicate.clone(),
            cli.also_interesting,
        )),
    };

    let cfg = ManagerConfig {
        parallel_tests: cli.parallel.max(1),
        strategy: cli.test_manager.into(),
        no_cache: cli.no_cache,
        shaddap: cli.shaddap,
        die_on_pass_bug: cli.die_on_pass_bug,
        print_diff: cli.print_diff,
        save_temps: cli.save_temps,
        no_kill: cli.no_kill,
        no_give_up: cli.no_give_up,
        give_up_threshold: None,
        max_improvement: cli.max_improvement,
        also_interesting: cli.also_interesting,
        skip_key_off: cli.skip_key_off,
    };

    let manager = TestManager::new(runner, test_cases, cfg);
    let mut reducer = Reducer::new(manager);
    reducer.tidy = cli.tidy;
    reducer.skip_initial = cli.skip_initial_passes;

    let started = Instant::now();

    if let Err(e) = reducer.reduce(&pass_group) {
        eprintln!("error: {}", e);
        std::process::exit(exit_code_for(&e));
    }

    // ── Final report: statistics, then the reduced contents ──
    println!("pass statistics:");
    for (pass, arg, counts) in reducer.manager().statistics().sorted_results() {
        println!(
            "method {} :: {} worked {} times and failed {} times",
            pass, arg, counts.worked, counts.failed
        );
    }

    for case in reducer.manager().sorted_test_cases() {
        match std::fs::read_to_string(&case) {
            Ok(contents) => print!("{}", contents),
            Err(e) => {
                eprintln!("error: failed to read {}: {}", case.display(), e);
                std::process::exit(EXIT_SYSTEM_ERROR);
            }
        }
    }

    if cli.timing {
        println!("Runtime: {} seconds", started.elapsed().as_secs());
    }

    std::process::exit(EXIT_OK);
}

fn init_logging(cli: &Cli) {
    let level = if cli.debug {
        log::LevelFilter::Debug
    } else {
        cli.log_level.into()
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if !cli.timing {
        builder.format_timestamp(None);
    }
    if let Some(ref path) = cli.log_file {
        match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!("error: failed to open log file {}: {}", path.display(), e);
                std::process::exit(EXIT_USAGE_ERROR);
            }
        }
    }
    builder.init();
}

fn load_pass_group(cli: &Cli, options: &HashSet<PassOption>) -> PassGroup {
    if let Some(ref path) = cli.pass_group_file {
        match group::load_group_file(path, options) {
            Ok(group) => group,
            Err(e) => {
                eprintln!("error: {}", e);
                std::process::exit(EXIT_USAGE_ERROR);
            }
        }
    } else {
        match catalogue::built_in_group(&cli.pass_group, options) {
            Some(group) => group,
            None => {
                eprintln!(
                    "error: unknown pass group '{}' (available: {})",
                    cli.pass_group,
                    catalogue::group_names().join(", ")
                );
                std::process::exit(EXIT_USAGE_ERROR);
            }
        }
    }
}

fn exit_code_for(error: &ReduceError) -> i32 {
    match error {
        ReduceError::InvalidTestCase { .. } => EXIT_USAGE_ERROR,
        ReduceError::PrerequisitesMissing { .. } => EXIT_REDUCE_ERROR,
        ReduceError::Manager(ManagerError::SanityCheckFailed)
        | ReduceError::Manager(ManagerError::PassBug { .. }) => EXIT_REDUCE_ERROR,
        ReduceError::Manager(ManagerError::Io { .. })
        | ReduceError::Manager(ManagerError::Runner(_)) => EXIT_SYSTEM_ERROR,
    }
}
