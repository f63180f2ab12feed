//! Command-line interface for sortify.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing for the batch sorter and the watcher
//! - Interactive prompts for anything the flags leave open
//! - Running a batch pass and printing its report
//! - Running the watch loop until Ctrl-C

use crate::batch::{BatchOrchestrator, BatchReport};
use crate::config::RoutingConfig;
use crate::error::SortResult;
use crate::notification::{DesktopNotifier, Notifier, SilentNotifier};
use crate::output::OutputFormatter;
use crate::watcher::{DEFAULT_SETTLE, NotifySource, WatchLoop, WatchReport};
use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// How a batch pass routes the target's entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Move entries to the paths in the configuration.
    Default,
    /// Move entries into category folders under one chosen directory.
    Custom,
    /// Pull every file back out of the sorted tree into one directory.
    Revert,
}

/// Sort a directory once by the routing rules.
#[derive(Debug, Parser)]
#[command(name = "sortify", version, long_about = None)]
pub struct SortArgs {
    /// Directory to sort
    #[arg(default_value = ".")]
    pub directory: PathBuf,

    /// Routing configuration file (JSON, or TOML by extension)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Re-route files already in category folders after a rule change
    #[arg(long, conflicts_with_all = ["strategy", "destination", "flatten", "no_flatten"])]
    pub sync: bool,

    /// Show where items would go without moving anything
    #[arg(long)]
    pub dry_run: bool,

    /// Routing strategy; asked interactively when omitted
    #[arg(long, value_enum)]
    pub strategy: Option<Strategy>,

    /// Custom target root, or where revert collects files
    #[arg(long)]
    pub destination: Option<PathBuf>,

    /// Sort files inside subdirectories one by one and remove the emptied folders
    #[arg(long)]
    pub flatten: bool,

    /// Move subdirectories intact without asking
    #[arg(long, conflicts_with = "flatten")]
    pub no_flatten: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Watch the configured sources and sort files as they arrive.
#[derive(Debug, Parser)]
#[command(name = "sortify-watch", version, long_about = None)]
pub struct WatchArgs {
    /// Routing configuration file (JSON, or TOML by extension)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Milliseconds to wait before handling a new file
    #[arg(long, default_value_t = DEFAULT_SETTLE.as_millis() as u64)]
    pub settle_ms: u64,

    /// Do not send desktop notifications
    #[arg(long)]
    pub no_notify: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Installs the stderr log subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("sortify=debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// A fully decided batch pass.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchPlan {
    Default { flatten: bool },
    Custom { root: PathBuf, flatten: bool },
    Revert { destination: PathBuf },
    Sync,
}

/// Asks the interactive questions on any reader/writer pair.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// `None` once input is exhausted.
    fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Strategy menu. An empty answer picks the custom target.
    pub fn strategy(&mut self) -> io::Result<Strategy> {
        writeln!(self.output, "  [1] Use default routing (configured paths)")?;
        writeln!(self.output, "  [2] Custom target (category folders under one directory)")?;
        writeln!(self.output, "  [3] Revert (collect all files into one directory)")?;

        loop {
            let Some(answer) = self.ask("  Your choice (1/2/3) [default=2]: ")? else {
                return Ok(Strategy::Custom);
            };
            match answer.to_lowercase().as_str() {
                "1" | "default" => return Ok(Strategy::Default),
                "" | "2" | "custom" => return Ok(Strategy::Custom),
                "3" | "revert" => return Ok(Strategy::Revert),
                _ => writeln!(self.output, "  Please answer 1, 2 or 3.")?,
            }
        }
    }

    /// Asks until a non-empty path is given.
    pub fn path(&mut self, question: &str) -> io::Result<PathBuf> {
        loop {
            match self.ask(question)? {
                Some(answer) if !answer.is_empty() => return Ok(PathBuf::from(answer)),
                Some(_) => continue,
                None => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "input closed before a path was given",
                    ));
                }
            }
        }
    }

    /// Yes/no question; anything but `y`/`yes` means no.
    pub fn confirm(&mut self, question: &str) -> io::Result<bool> {
        let answer = self.ask(question)?.unwrap_or_default().to_lowercase();
        Ok(answer == "y" || answer == "yes")
    }
}

impl SortArgs {
    /// Turns flags plus prompted answers into a plan.
    pub fn plan<R: BufRead, W: Write>(&self, prompter: &mut Prompter<R, W>) -> io::Result<BatchPlan> {
        if self.sync {
            return Ok(BatchPlan::Sync);
        }

        let strategy = match self.strategy {
            Some(strategy) => strategy,
            None => prompter.strategy()?,
        };

        let destination = |prompter: &mut Prompter<R, W>, question: &str| match &self.destination {
            Some(path) => Ok(path.clone()),
            None => prompter.path(question),
        };
        let flatten = |prompter: &mut Prompter<R, W>| {
            if self.flatten || self.no_flatten {
                Ok(self.flatten)
            } else {
                prompter.confirm("  Flatten subfolders? (y/n): ")
            }
        };

        Ok(match strategy {
            Strategy::Default => BatchPlan::Default {
                flatten: flatten(prompter)?,
            },
            Strategy::Custom => {
                let root = destination(prompter, "  Enter the custom destination path: ")?;
                BatchPlan::Custom {
                    root,
                    flatten: flatten(prompter)?,
                }
            }
            Strategy::Revert => BatchPlan::Revert {
                destination: destination(
                    prompter,
                    "  Enter the destination path to revert all files into: ",
                )?,
            },
        })
    }
}

/// Runs the batch sorter.
///
/// # Errors
///
/// Fails if the target is not a directory, the configuration cannot be
/// loaded, or the pass cannot start. Failures on single items are printed
/// and do not make the run fail.
pub fn run_sort(args: &SortArgs) -> Result<()> {
    let target = &args.directory;
    if !target.is_dir() {
        bail!("Not a valid directory: {}", target.display());
    }

    let config = RoutingConfig::load(args.config.as_deref())
        .context("Failed to load routing configuration")?;

    let plan = if args.sync {
        BatchPlan::Sync
    } else {
        OutputFormatter::header("SORTIFY");
        println!("  Target directory: {}\n", target.display());
        let stdin = io::stdin();
        let mut prompter = Prompter::new(stdin.lock(), io::stdout());
        args.plan(&mut prompter)
            .context("Failed to read interactive answers")?
    };

    if args.dry_run {
        OutputFormatter::dry_run_notice("Nothing will be moved.");
    }

    let progress = OutputFormatter::create_progress_bar();
    let orchestrator = BatchOrchestrator::new(&config)
        .dry_run(args.dry_run)
        .with_progress(progress.clone());

    let report = execute(&orchestrator, target, &plan)
        .with_context(|| format!("Failed to process {}", target.display()))?;
    progress.finish_and_clear();

    print_report(&report, &plan, args.dry_run);
    Ok(())
}

/// Runs one planned pass.
pub fn execute(
    orchestrator: &BatchOrchestrator<'_>,
    target: &Path,
    plan: &BatchPlan,
) -> SortResult<BatchReport> {
    match plan {
        BatchPlan::Default { flatten } => orchestrator.sort_default(target, *flatten),
        BatchPlan::Custom { root, flatten } => orchestrator.sort_custom(target, root, *flatten),
        BatchPlan::Revert { destination } => orchestrator.revert(target, destination),
        BatchPlan::Sync => orchestrator.sync(target),
    }
}

fn print_report(report: &BatchReport, plan: &BatchPlan, dry_run: bool) {
    if !report.moved.is_empty() {
        OutputFormatter::summary_table(&report.category_counts(), report.moved.len());
    }

    if *plan == BatchPlan::Sync {
        println!("\n  {} file(s) already in place.", report.unchanged.len());
    }

    if !report.pruned.is_empty() {
        OutputFormatter::info(&format!(
            "\n  Removed {} empty folder(s).",
            report.pruned.len()
        ));
    }

    if !report.failed.is_empty() {
        OutputFormatter::warning(&format!("{} item(s) failed:", report.failed.len()));
        for (path, reason) in &report.failed {
            eprintln!("{}", OutputFormatter::format_failure(path, reason));
        }
    }

    let verb = match (plan, dry_run) {
        (_, true) => "would be moved",
        (BatchPlan::Revert { .. }, false) => "reverted",
        (BatchPlan::Sync, false) => "re-routed",
        _ => "routed",
    };
    OutputFormatter::success(&format!("Done! {} item(s) {}.", report.moved.len(), verb));
}

/// Runs the watcher until Ctrl-C.
///
/// # Errors
///
/// Fails if the configuration cannot be loaded, no monitored sources are
/// configured, or none of them can be watched.
pub async fn run_watch(args: &WatchArgs) -> Result<()> {
    let config = RoutingConfig::load(args.config.as_deref())
        .context("Failed to load routing configuration")?;
    if config.monitored_sources.is_empty() {
        bail!("No monitored_sources defined in the configuration");
    }

    let source = NotifySource::new(&config.monitored_sources)
        .context("Failed to start watching")?;

    OutputFormatter::header("SORTIFY AUTO");
    for dir in source.watched() {
        OutputFormatter::info(&format!("  Watching: {}", dir.display()));
    }
    println!("  Press Ctrl+C to stop.\n");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let notifier: Box<dyn Notifier> = if args.no_notify {
        Box::new(SilentNotifier)
    } else {
        Box::new(DesktopNotifier)
    };

    let settle = Duration::from_millis(args.settle_ms);
    let (watch_loop, mut reports) = WatchLoop::new(Arc::new(config), settle, shutdown_rx);
    let reporter = tokio::spawn(async move {
        while let Some(report) = reports.recv().await {
            print_watch_report(&report, notifier.as_ref());
        }
    });

    watch_loop.run(source).await;
    drop(watch_loop);
    reporter.await.context("Report printer stopped unexpectedly")?;

    OutputFormatter::success("Watcher stopped.");
    Ok(())
}

fn print_watch_report(report: &WatchReport, notifier: &dyn Notifier) {
    match report {
        WatchReport::Sorted(item) => {
            println!("{}", OutputFormatter::format_moved(item, false));
            let name = item
                .source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let category = item.category.as_deref().unwrap_or_default();
            notifier.notify("Sortify - File Sorted", &format!("{} → [{}]", name, category));
        }
        WatchReport::Failed { path, reason } => {
            eprintln!("{}", OutputFormatter::format_failure(path, reason));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn args(extra: &[&str]) -> SortArgs {
        let mut argv = vec!["sortify", "/tmp"];
        argv.extend_from_slice(extra);
        SortArgs::parse_from(argv)
    }

    fn plan_with_answers(args: &SortArgs, answers: &str) -> io::Result<BatchPlan> {
        let mut prompter = Prompter::new(Cursor::new(answers.as_bytes().to_vec()), Vec::new());
        args.plan(&mut prompter)
    }

    #[test]
    fn test_empty_strategy_answer_selects_custom() {
        let plan = plan_with_answers(&args(&[]), "\n/out\nn\n").unwrap();
        assert_eq!(
            plan,
            BatchPlan::Custom {
                root: PathBuf::from("/out"),
                flatten: false
            }
        );
    }

    #[test]
    fn test_default_strategy_asks_flatten() {
        let plan = plan_with_answers(&args(&[]), "1\ny\n").unwrap();
        assert_eq!(plan, BatchPlan::Default { flatten: true });
    }

    #[test]
    fn test_revert_never_asks_flatten() {
        let plan = plan_with_answers(&args(&[]), "3\n/restore\n").unwrap();
        assert_eq!(
            plan,
            BatchPlan::Revert {
                destination: PathBuf::from("/restore")
            }
        );
    }

    #[test]
    fn test_invalid_choice_is_asked_again() {
        let plan = plan_with_answers(&args(&["--no-flatten"]), "7\n1\n").unwrap();
        assert_eq!(plan, BatchPlan::Default { flatten: false });
    }

    #[test]
    fn test_flags_skip_prompts() {
        let plan = plan_with_answers(
            &args(&["--strategy", "custom", "--destination", "/out", "--flatten"]),
            "",
        )
        .unwrap();
        assert_eq!(
            plan,
            BatchPlan::Custom {
                root: PathBuf::from("/out"),
                flatten: true
            }
        );
    }

    #[test]
    fn test_sync_flag() {
        assert_eq!(plan_with_answers(&args(&["--sync"]), "").unwrap(), BatchPlan::Sync);
    }

    #[test]
    fn test_closed_input_without_destination_fails() {
        let err = plan_with_answers(&args(&["--strategy", "revert"]), "").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_watch_args_defaults() {
        let args = WatchArgs::parse_from(["sortify-watch"]);
        assert_eq!(args.settle_ms, 1000);
        assert!(args.config.is_none());
        assert!(!args.no_notify);
    }
}
