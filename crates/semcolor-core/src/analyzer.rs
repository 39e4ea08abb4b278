//! Incremental per-line analysis.
//!
//! An [`IncrementalAnalyzer`] subscribes to a [`TextBuffer`] and re-tokenizes only the lines
//! each change notification names. Passes run on a dedicated worker thread, so an edit call
//! returns as soon as its snapshot is committed.
//!
//! # Passes and cancellation
//!
//! Every notification trips the [`CancellationFlag`] of the pass that may be running and
//! installs a fresh one. A running pass checks its flag between lines; once tripped it drops
//! its private copy of the token table and its lines are carried into the next pass, which
//! analyses them against the newer snapshot. Readers therefore see either the table of the
//! last completed pass or the next one, never a mix.
//!
//! # Results
//!
//! A completed pass publishes an [`AnalysisResult`] (token table + version) and replaces the
//! [`PendingPatch`] with one entry per line it processed. The patch is drained by
//! [`IncrementalAnalyzer::take_patch`]; a patch nobody drained before the next pass is
//! dropped.

use crate::text_buffer::{BufferChange, Snapshot, TextBuffer};
use crate::token::{LineTokenTable, Token};
use crate::tokenizer::LineTokenizer;
use arc_swap::{ArcSwap, ArcSwapOption};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Shared flag used to stop a pass between two lines.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Create an untripped flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `true` once [`CancellationFlag::cancel`] was called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Analyzer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyzerOptions {
    /// Prefix of each document's worker thread name; a sequence number is appended.
    pub thread_name_prefix: String,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            thread_name_prefix: "semcolor-analyzer".to_string(),
        }
    }
}

/// Errors raised while wiring an analyzer.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// The worker thread could not be started.
    #[error("failed to start analysis worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Token table published by the last completed pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisResult {
    /// Number of completed passes.
    pub version: u64,
    /// Version of the snapshot the pass analysed.
    pub snapshot_version: u64,
    /// One slot per line of that snapshot.
    pub tokens: LineTokenTable,
}

/// Token changes of one line produced by a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchEntry {
    /// Line the entry applies to.
    pub line: usize,
    /// `1` if the line already had a slot, `0` if the pass appended it.
    pub replaced_lines: usize,
    /// The line's new tokens (empty if the line lost its token).
    pub tokens: Vec<Token>,
}

/// Table changes of the last completed pass, tagged with its version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingPatch {
    /// Analysis version the entries lead to.
    pub version: u64,
    /// Entries in ascending line order.
    pub entries: Vec<PatchEntry>,
}

impl PendingPatch {
    /// Returns `true` if there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

enum PassOutcome {
    Completed {
        result: AnalysisResult,
        patch: PendingPatch,
    },
    Superseded,
}

/// Tokenize `lines` of `snapshot` on top of `base`.
fn run_pass(
    tokenizer: &dyn LineTokenizer,
    base: &AnalysisResult,
    snapshot: &Snapshot,
    lines: &BTreeSet<usize>,
    cancel: &CancellationFlag,
) -> PassOutcome {
    let mut tokens = base.tokens.clone();
    let previous_len = tokens.len();
    tokens.ensure_lines(snapshot.line_count());

    let mut entries = Vec::with_capacity(lines.len());
    for &line in lines {
        if cancel.is_cancelled() {
            return PassOutcome::Superseded;
        }
        let Some(text) = snapshot.line(line) else {
            continue;
        };

        let token = tokenizer.tokenize_line(line, &text);
        if token.is_none() {
            trace!(line, "no token for line");
        }
        tokens.set(line, token);
        entries.push(PatchEntry {
            line,
            replaced_lines: usize::from(line < previous_len),
            tokens: token.into_iter().collect(),
        });
    }

    if cancel.is_cancelled() {
        return PassOutcome::Superseded;
    }

    let version = base.version + 1;
    PassOutcome::Completed {
        result: AnalysisResult {
            version,
            snapshot_version: snapshot.version(),
            tokens,
        },
        patch: PendingPatch { version, entries },
    }
}

struct AnalysisRequest {
    snapshot: Arc<Snapshot>,
    lines: BTreeSet<usize>,
}

#[derive(Debug, Default)]
struct Progress {
    submitted: u64,
    settled: u64,
}

struct Shared {
    tokenizer: Arc<dyn LineTokenizer>,
    result: ArcSwap<AnalysisResult>,
    patch: ArcSwapOption<PendingPatch>,
    active_cancel: ArcSwap<CancellationFlag>,
    progress: Mutex<Progress>,
    settled: Condvar,
}

impl Shared {
    fn submit(&self) {
        self.progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .submitted += 1;
    }

    fn settle(&self, count: u64) {
        let mut progress = self.progress.lock().unwrap_or_else(PoisonError::into_inner);
        progress.settled += count;
        self.settled.notify_all();
    }

    /// Supersede whatever pass is running and hand the change to the worker.
    fn on_change(&self, requests: &mpsc::Sender<AnalysisRequest>, change: &BufferChange) {
        let previous = self.active_cancel.swap(Arc::new(CancellationFlag::new()));
        previous.cancel();

        self.submit();
        let request = AnalysisRequest {
            snapshot: Arc::clone(&change.snapshot),
            lines: change.changed_lines.clone(),
        };
        if requests.send(request).is_err() {
            warn!("analysis worker is gone; dropping change notification");
            self.settle(1);
        }
    }
}

fn worker_loop(shared: Arc<Shared>, requests: mpsc::Receiver<AnalysisRequest>) {
    debug!("analysis worker started");
    let mut carried: BTreeSet<usize> = BTreeSet::new();
    let mut newest: Option<Arc<Snapshot>> = None;

    while let Ok(first) = requests.recv() {
        let mut consumed = 0u64;
        let queued = std::iter::from_fn(|| requests.try_recv().ok());
        for AnalysisRequest { snapshot, lines } in std::iter::once(first).chain(queued) {
            consumed += 1;
            carried.extend(lines);
            newest = match newest.take() {
                Some(seen) if seen.version() >= snapshot.version() => Some(seen),
                _ => Some(snapshot),
            };
        }
        let Some(snapshot) = newest.clone() else {
            shared.settle(consumed);
            continue;
        };

        let cancel = shared.active_cancel.load_full();
        let base = shared.result.load_full();
        match run_pass(&*shared.tokenizer, &base, &snapshot, &carried, &cancel) {
            PassOutcome::Completed { result, patch } => {
                debug!(
                    version = result.version,
                    snapshot_version = result.snapshot_version,
                    lines = patch.entries.len(),
                    "analysis pass completed"
                );
                shared.patch.store(Some(Arc::new(patch)));
                shared.result.store(Arc::new(result));
                carried.clear();
            }
            PassOutcome::Superseded => {
                debug!(
                    snapshot_version = snapshot.version(),
                    carried = carried.len(),
                    "analysis pass superseded"
                );
            }
        }
        shared.settle(consumed);
    }

    debug!("analysis worker stopped");
}

/// Keeps the token table of one document in sync with its [`TextBuffer`].
pub struct IncrementalAnalyzer {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for IncrementalAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let result = self.shared.result.load();
        f.debug_struct("IncrementalAnalyzer")
            .field("version", &result.version)
            .field("snapshot_version", &result.snapshot_version)
            .field("line_count", &result.tokens.len())
            .finish()
    }
}

impl IncrementalAnalyzer {
    /// Start a worker for `buffer` and subscribe it to the buffer's changes.
    ///
    /// The worker exits once the buffer (and with it the subscription) is dropped.
    pub fn attach(
        buffer: &mut TextBuffer,
        tokenizer: Arc<dyn LineTokenizer>,
        options: &AnalyzerOptions,
    ) -> Result<Self, AnalyzerError> {
        let shared = Arc::new(Shared {
            tokenizer,
            result: ArcSwap::from_pointee(AnalysisResult::default()),
            patch: ArcSwapOption::empty(),
            active_cancel: ArcSwap::from_pointee(CancellationFlag::new()),
            progress: Mutex::new(Progress::default()),
            settled: Condvar::new(),
        });

        static WORKER_SEQ: AtomicU64 = AtomicU64::new(0);
        let name = format!(
            "{}-{}",
            options.thread_name_prefix,
            WORKER_SEQ.fetch_add(1, Ordering::Relaxed)
        );

        let (tx, rx) = mpsc::channel::<AnalysisRequest>();
        {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name(name)
                .spawn(move || worker_loop(shared, rx))?;
        }

        let observer_shared = Arc::clone(&shared);
        buffer.subscribe(move |change| observer_shared.on_change(&tx, change));

        Ok(Self { shared })
    }

    /// The table published by the last completed pass.
    pub fn current(&self) -> Arc<AnalysisResult> {
        self.shared.result.load_full()
    }

    /// Number of completed passes.
    pub fn version(&self) -> u64 {
        self.shared.result.load().version
    }

    /// Drain the pending patch.
    ///
    /// Returns an empty patch tagged with the current version if the last pass was already
    /// drained.
    pub fn take_patch(&self) -> PendingPatch {
        match self.shared.patch.swap(None) {
            Some(patch) => Arc::try_unwrap(patch).unwrap_or_else(|shared| (*shared).clone()),
            None => PendingPatch {
                version: self.version(),
                entries: Vec::new(),
            },
        }
    }

    /// Returns `true` if every change notification has been settled.
    pub fn is_idle(&self) -> bool {
        let progress = self
            .shared
            .progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        progress.settled >= progress.submitted
    }

    /// Block the caller until every submitted change has been analysed or `timeout` elapses.
    ///
    /// Returns `true` if the analyzer became idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut progress = self
            .shared
            .progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while progress.settled < progress.submitted {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            progress = self
                .shared
                .settled
                .wait_timeout(progress, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}
