//! Watch monitored directories and sort files as they arrive.
//!
//! Each monitored source is watched non-recursively. A file that is created
//! in, or moved into, a source goes through a fixed settle delay, is checked
//! again, and is then routed with the same pipeline the batch modes use.
//! Relative category paths resolve against the source directory the file
//! arrived in.
//!
//! The OS notification backend is hidden behind [`EventSource`]; the loop
//! itself only sees `{kind, path}` pairs.

use crate::config::RoutingConfig;
use crate::file_organizer::{FileOrganizer, SortedItem};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};

/// Default pause between seeing a file and acting on it.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(1000);

/// Errors that stop the watcher from starting.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("No monitored sources configured")]
    NoMonitoredSources,

    #[error("None of the monitored sources could be watched")]
    NothingToWatch,

    #[error("File watcher backend failed: {0}")]
    Notify(#[from] notify::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    Created,
    MovedIn,
}

/// A path that appeared in a watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub path: PathBuf,
}

/// What happened to a file the loop picked up.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchReport {
    Sorted(SortedItem),
    Failed { path: PathBuf, reason: String },
}

/// A stream of appearance events. `None` means the stream has ended.
pub trait EventSource {
    fn next_event(&mut self) -> impl Future<Output = Option<WatchEvent>> + Send;
}

impl EventSource for mpsc::UnboundedReceiver<WatchEvent> {
    async fn next_event(&mut self) -> Option<WatchEvent> {
        self.recv().await
    }
}

/// Maps a backend event to the events the loop acts on.
///
/// Creations and the arriving half of a rename count; removals, content
/// changes and the departing half of a rename are ignored.
pub fn translate(event: &Event) -> Vec<WatchEvent> {
    let kind = match event.kind {
        EventKind::Create(_) => WatchEventKind::Created,
        EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Any)) => {
            WatchEventKind::MovedIn
        }
        _ => return Vec::new(),
    };

    event
        .paths
        .iter()
        .map(|path| WatchEvent {
            kind,
            path: path.clone(),
        })
        .collect()
}

/// [`EventSource`] backed by the platform's recommended `notify` watcher.
pub struct NotifySource {
    _watcher: RecommendedWatcher,
    events: mpsc::UnboundedReceiver<WatchEvent>,
    watched: Vec<PathBuf>,
}

impl NotifySource {
    /// Starts watching every source that exists as a directory.
    ///
    /// Missing sources are skipped with a warning. Fails if `sources` is
    /// empty or none of them could be watched.
    pub fn new(sources: &[PathBuf]) -> Result<Self, WatchError> {
        if sources.is_empty() {
            return Err(WatchError::NoMonitoredSources);
        }

        let (tx, events) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) => {
                    for event in translate(&event) {
                        // Receiver gone means the loop is shutting down.
                        let _ = tx.send(event);
                    }
                }
                Err(e) => tracing::warn!(error = %e, "watcher backend error"),
            }
        })?;

        let mut watched = Vec::new();
        for source in sources {
            if !source.is_dir() {
                tracing::warn!(path = %source.display(), "monitored source is not a directory, skipping");
                continue;
            }
            match watcher.watch(source, RecursiveMode::NonRecursive) {
                Ok(()) => watched.push(source.clone()),
                Err(e) => {
                    tracing::warn!(path = %source.display(), error = %e, "cannot watch source")
                }
            }
        }

        if watched.is_empty() {
            return Err(WatchError::NothingToWatch);
        }

        Ok(Self {
            _watcher: watcher,
            events,
            watched,
        })
    }

    /// The sources actually being watched.
    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }
}

impl EventSource for NotifySource {
    async fn next_event(&mut self) -> Option<WatchEvent> {
        self.events.recv().await
    }
}

/// Dispatches one task per observed event and reports the results.
pub struct WatchLoop {
    config: Arc<RoutingConfig>,
    settle: Duration,
    shutdown: watch::Receiver<bool>,
    reports: mpsc::UnboundedSender<WatchReport>,
}

impl WatchLoop {
    /// Creates the loop and the channel its reports are delivered on.
    ///
    /// Setting `shutdown` to `true` stops the loop: events still settling
    /// are dropped, moves already under way finish first.
    pub fn new(
        config: Arc<RoutingConfig>,
        settle: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> (Self, mpsc::UnboundedReceiver<WatchReport>) {
        let (reports, rx) = mpsc::unbounded_channel();
        let watch_loop = Self {
            config,
            settle,
            shutdown,
            reports,
        };
        (watch_loop, rx)
    }

    /// Runs until the source ends or shutdown is requested.
    pub async fn run<S: EventSource>(&self, mut source: S) {
        let mut shutdown = self.shutdown.clone();
        let mut tasks = JoinSet::new();

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            tokio::select! {
                event = source.next_event() => match event {
                    Some(event) => {
                        tracing::debug!(kind = ?event.kind, path = %event.path.display(), "event observed");
                        tasks.spawn(handle_event(
                            Arc::clone(&self.config),
                            event,
                            self.settle,
                            self.shutdown.clone(),
                        ));
                    }
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                Some(result) = tasks.join_next(), if !tasks.is_empty() => self.deliver(result),
            }
        }

        while let Some(result) = tasks.join_next().await {
            self.deliver(result);
        }
    }

    fn deliver(&self, result: Result<Option<WatchReport>, JoinError>) {
        match result {
            Ok(Some(report)) => {
                // Nobody listening is not an error for the loop.
                let _ = self.reports.send(report);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "event task failed"),
        }
    }
}

/// Settle, verify, then classify and move one file.
async fn handle_event(
    config: Arc<RoutingConfig>,
    event: WatchEvent,
    settle: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> Option<WatchReport> {
    let path = event.path;
    if is_hidden_or_temp(&path) {
        tracing::debug!(path = %path.display(), "ignoring hidden or temporary file");
        return None;
    }
    if *shutdown.borrow() {
        return None;
    }

    tokio::select! {
        _ = tokio::time::sleep(settle) => {}
        Ok(()) = shutdown.changed() => {
            tracing::debug!(path = %path.display(), "shutdown while settling");
            return None;
        }
    }

    match tokio::fs::metadata(&path).await {
        Ok(metadata) if metadata.is_file() => {}
        _ => {
            tracing::debug!(path = %path.display(), "no longer a regular file, dropping");
            return None;
        }
    }

    let source = path.clone();
    let routed = tokio::task::spawn_blocking(move || {
        FileOrganizer::route_file(&source, &config, source.parent())
    })
    .await;

    match routed {
        Ok(Ok(item)) => Some(WatchReport::Sorted(item)),
        Ok(Err(e)) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to sort file");
            Some(WatchReport::Failed {
                path,
                reason: e.to_string(),
            })
        }
        Err(e) => Some(WatchReport::Failed {
            path,
            reason: e.to_string(),
        }),
    }
}

fn is_hidden_or_temp(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .is_some_and(|name| name.starts_with('.') || name.starts_with('~'))
}
