//! Development-mode watcher for the fragment shader file.
//!
//! ```text
//!   notify thread ──classify──▶ channel ──▶ debounce thread ──settled──▶ on_settled()
//!                                                                  (host posts an event
//!                                                                   to its own loop)
//! ```
//!
//! Editors produce several raw events per save. Only creates, modifications,
//! removals and the close-after-write hint count; reads are dropped so the
//! reload's own file access never re-triggers it. The [`Debouncer`] folds a
//! burst into a single settled event.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use notify::event::{AccessKind, AccessMode, ModifyKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, trace, warn};

use crate::types::DebounceConfig;

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("{} does not name a file", path.display())]
    InvalidPath { path: PathBuf },
    #[error("failed to watch {}: {source}", path.display())]
    Notify {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    #[error("failed to spawn watcher thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Raw filesystem event after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawChange {
    /// The writer closed the file; the burst is almost certainly over.
    ChangesDone,
    /// Content or directory entry changed; more events may follow.
    Changed,
}

/// Maps a notify event kind onto the two kinds the debouncer cares about.
pub fn classify(kind: &EventKind) -> Option<RawChange> {
    match kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => Some(RawChange::ChangesDone),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {
            Some(RawChange::Changed)
        }
        _ => None,
    }
}

/// Bookkeeping for the burst currently in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchState {
    pub last_event: Option<RawChange>,
    pub pending_rebuild: bool,
    last_at: Option<Instant>,
    hinted: bool,
}

/// Collapses bursts of raw changes into single settled events.
///
/// A burst settles once it has been quiet for `hint_grace` after a
/// [`RawChange::ChangesDone`] hint, or for `quiet` when no hint arrived.
/// Every raw change pushes the deadline back, so one burst settles at most
/// once.
#[derive(Debug, Clone)]
pub struct Debouncer {
    config: DebounceConfig,
    state: WatchState,
}

impl Debouncer {
    pub fn new(config: DebounceConfig) -> Self {
        Self {
            config,
            state: WatchState::default(),
        }
    }

    pub fn observe(&mut self, change: RawChange, now: Instant) {
        self.state.last_event = Some(change);
        self.state.pending_rebuild = true;
        self.state.last_at = Some(now);
        if change == RawChange::ChangesDone {
            self.state.hinted = true;
        }
    }

    /// When the pending burst will count as settled, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        if !self.state.pending_rebuild {
            return None;
        }
        let wait = if self.state.hinted {
            self.config.hint_grace
        } else {
            self.config.quiet
        };
        self.state.last_at.map(|last| last + wait)
    }

    /// Returns `true` exactly once per burst, when its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline() {
            Some(deadline) if now >= deadline => {
                self.state = WatchState {
                    last_event: self.state.last_event,
                    ..WatchState::default()
                };
                true
            }
            _ => false,
        }
    }

    pub fn state(&self) -> &WatchState {
        &self.state
    }
}

enum Message {
    Change(RawChange),
    Stop,
}

/// Watches one shader file and calls back once per settled edit.
///
/// Dropping the watcher stops both the notify subscription and the debounce
/// thread.
pub struct ReloadWatcher {
    path: PathBuf,
    watcher: Option<RecommendedWatcher>,
    control: Sender<Message>,
    worker: Option<JoinHandle<()>>,
}

impl ReloadWatcher {
    /// Starts watching `path`. `on_settled` runs on the debounce thread, so it
    /// should only hand the news to the thread that owns the GL context.
    pub fn start<F>(path: &Path, config: DebounceConfig, on_settled: F) -> Result<Self, WatchError>
    where
        F: FnMut() + Send + 'static,
    {
        let file_name: OsString = path
            .file_name()
            .ok_or_else(|| WatchError::InvalidPath {
                path: path.to_path_buf(),
            })?
            .to_os_string();
        // The directory is watched rather than the file so atomic saves that
        // replace the inode keep being observed.
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (sender, receiver) = unbounded();
        let events = sender.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let names_file = event
                    .paths
                    .iter()
                    .any(|candidate| candidate.file_name() == Some(file_name.as_os_str()));
                if !names_file {
                    return;
                }
                trace!(kind = ?event.kind, "shader file event");
                if let Some(change) = classify(&event.kind) {
                    let _ = events.send(Message::Change(change));
                }
            }
            Err(err) => warn!("shader watch error: {err}"),
        })
        .map_err(|source| WatchError::Notify {
            path: path.to_path_buf(),
            source,
        })?;
        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Notify {
                path: directory.clone(),
                source,
            })?;

        let worker = spawn_debouncer(receiver, config, on_settled)?;
        debug!(path = %path.display(), dir = %directory.display(), "watching fragment shader");

        Ok(Self {
            path: path.to_path_buf(),
            watcher: Some(watcher),
            control: sender,
            worker: Some(worker),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ReloadWatcher {
    fn drop(&mut self) {
        drop(self.watcher.take());
        let _ = self.control.send(Message::Stop);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn spawn_debouncer<F>(
    receiver: Receiver<Message>,
    config: DebounceConfig,
    mut on_settled: F,
) -> Result<JoinHandle<()>, WatchError>
where
    F: FnMut() + Send + 'static,
{
    thread::Builder::new()
        .name("fragview-watch".into())
        .spawn(move || {
            let mut debouncer = Debouncer::new(config);
            loop {
                let received = match debouncer.deadline() {
                    Some(deadline) => receiver.recv_deadline(deadline),
                    None => receiver
                        .recv()
                        .map_err(|_| RecvTimeoutError::Disconnected),
                };
                match received {
                    Ok(Message::Change(change)) => debouncer.observe(change, Instant::now()),
                    Ok(Message::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {}
                }
                if debouncer.poll(Instant::now()) {
                    debug!("shader change settled");
                    on_settled();
                }
            }
        })
        .map_err(WatchError::Spawn)
}
