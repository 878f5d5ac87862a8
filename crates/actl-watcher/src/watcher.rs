//! Directory watch wiring: `notify` feeds raw filesystem events into the
//! pure diff logic in [`crate::session`], enriched onto the event bus.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;

use actl_events::EventBus;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::WatcherError;
use crate::session::{diff_session, Correlation, SessionFile};

/// Watches a directory of `*.json` session-state files and translates
/// observed transitions into hub events.
pub struct SessionWatcher {
    dir: PathBuf,
    bus: Arc<EventBus>,
    baseline: HashMap<String, SessionFile>,
    correlation: Correlation,
}

impl SessionWatcher {
    /// Creates a watcher over `dir`, publishing to `bus`. Call
    /// [`load_baseline`](Self::load_baseline) before starting the watch.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, bus: Arc<EventBus>) -> Self {
        Self {
            dir: dir.into(),
            bus,
            baseline: HashMap::new(),
            correlation: Correlation::default(),
        }
    }

    /// Records that `session_id` belongs to `task_id`, optionally with a
    /// known expected file count for file-ratio-based checkpoint percents.
    pub fn correlate(&mut self, session_id: &str, task_id: &str, expected_files: Option<usize>) {
        self.correlation.set(session_id, task_id, expected_files);
    }

    /// Reads every `*.json` file in the watched directory (skipping
    /// `*.tmp`) as the starting baseline. No events are emitted for this
    /// initial read — only later changes produce transitions.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::Io`] if the directory cannot be listed.
    pub fn load_baseline(&mut self) -> Result<(), WatcherError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(io_err(&self.dir, e)),
        };
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&self.dir, e))?;
            let path = entry.path();
            if is_session_file(&path) {
                if let Some(session) = read_session_file(&path) {
                    self.baseline.insert(session.session_id.clone(), session);
                }
            }
        }
        Ok(())
    }

    /// Processes a single file-change notification: reads the file,
    /// tolerating a partial or unparsable write by simply skipping until
    /// the next change, diffs it against the stored baseline, emits the
    /// resulting events, and updates the baseline.
    pub fn on_file_changed(&mut self, path: &Path) {
        if !is_session_file(path) {
            return;
        }
        let Some(current) = read_session_file(path) else {
            return;
        };
        let previous = self.baseline.get(&current.session_id);
        for event in diff_session(previous, &current, &self.correlation) {
            self.bus.emit(event);
        }
        self.baseline.insert(current.session_id.clone(), current);
    }

    /// Starts the `notify` watch and runs the event-consuming loop until
    /// `stop` resolves. Intended to be spawned as its own task; exits
    /// promptly once `stop` completes, matching the daemon's stoppable
    /// background-loop contract.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::Notify`] if the filesystem watch cannot be
    /// established.
    pub async fn run(&mut self, mut stop: tokio::sync::oneshot::Receiver<()>) -> Result<(), WatcherError> {
        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher.watch(&self.dir, RecursiveMode::NonRecursive)?;

        let (async_tx, mut async_rx) = tokio::sync::mpsc::unbounded_channel::<notify::Result<Event>>();
        std::thread::spawn(move || {
            while let Ok(event) = rx.recv() {
                if async_tx.send(event).is_err() {
                    break;
                }
            }
        });

        loop {
            tokio::select! {
                _ = &mut stop => {
                    tracing::info!("session watcher stopping");
                    return Ok(());
                }
                event = async_rx.recv() => {
                    let Some(event) = event else {
                        return Ok(());
                    };
                    if let Ok(event) = event {
                        if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                            for path in &event.paths {
                                self.on_file_changed(path);
                            }
                        }
                    }
                }
            }
        }
    }
}

fn is_session_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".json") && !name.ends_with(".tmp.json") && !name.contains(".tmp.")
}

fn read_session_file(path: &Path) -> Option<SessionFile> {
    let bytes = std::fs::read(path).ok()?;
    if bytes.is_empty() {
        return None;
    }
    serde_json::from_slice(&bytes).ok()
}

fn io_err(dir: &Path, source: std::io::Error) -> WatcherError {
    WatcherError::Io {
        path: dir.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actl_events::HubEvent;

    fn write_session(dir: &Path, id: &str, phase: &str) {
        std::fs::write(
            dir.join(format!("{id}.json")),
            format!(r#"{{"session_id":"{id}","phase":"{phase}"}}"#),
        )
        .unwrap();
    }

    #[test]
    fn load_baseline_reads_existing_json_files() {
        let dir = tempfile::tempdir().unwrap();
        write_session(dir.path(), "s1", "active");
        let bus = Arc::new(EventBus::new());
        let mut watcher = SessionWatcher::new(dir.path(), bus);
        watcher.load_baseline().unwrap();
        assert!(watcher.baseline.contains_key("s1"));
    }

    #[test]
    fn baseline_ignores_tmp_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("s1.json.tmp.123"), b"{}").unwrap();
        let bus = Arc::new(EventBus::new());
        let mut watcher = SessionWatcher::new(dir.path(), bus);
        watcher.load_baseline().unwrap();
        assert!(watcher.baseline.is_empty());
    }

    #[test]
    fn on_file_changed_emits_and_updates_baseline() {
        let dir = tempfile::tempdir().unwrap();
        write_session(dir.path(), "s1", "idle");
        let bus = Arc::new(EventBus::new());
        let mut watcher = SessionWatcher::new(dir.path(), Arc::clone(&bus));
        watcher.load_baseline().unwrap();

        write_session(dir.path(), "s1", "active");
        watcher.on_file_changed(&dir.path().join("s1.json"));

        let recent = bus.recent(Some("TASK_STARTED"), None);
        assert_eq!(recent.len(), 1);
        assert!(matches!(recent[0].event, HubEvent::TaskStarted { .. }));
    }

    #[test]
    fn on_file_changed_tolerates_unparsable_content() {
        let dir = tempfile::tempdir().unwrap();
        write_session(dir.path(), "s1", "idle");
        let bus = Arc::new(EventBus::new());
        let mut watcher = SessionWatcher::new(dir.path(), bus);
        watcher.load_baseline().unwrap();

        std::fs::write(dir.path().join("s1.json"), b"{not json").unwrap();
        watcher.on_file_changed(&dir.path().join("s1.json"));
        assert_eq!(watcher.baseline.get("s1").unwrap().phase, crate::session::SessionPhase::Idle);
    }
}
