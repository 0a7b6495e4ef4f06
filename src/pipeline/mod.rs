//! Batch orchestrator
//!
//! Runs one batch of files through the analyzer:
//! 1. Unsupported files are marked `Skip` immediately
//! 2. Each remaining file is fingerprinted and looked up in the result store
//! 3. Misses are queued to a fixed pool of worker threads
//! 4. Results are collected until every job finishes or the batch deadline
//!    passes, whichever comes first
//!
//! The deadline is batch-wide. When it passes the batch's cancellation token
//! fires, unfinished files are left out of the result mapping and listed in
//! [`BatchOutcome::timed_out`], and the coordinator returns without joining the
//! stragglers. A worker that finishes after cancellation discards its result
//! and does not write the cache, so re-running a timed-out batch is safe.

mod analyzer;

pub use analyzer::{analyze_content, Analyzer, RuleAnalyzer};

use crate::cache::{CacheKey, ResultStore};
use crate::config::Config;
use crate::models::{AnalysisResult, FileCategory, Status};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Progress callback: (files resolved, files in batch)
pub type Progress<'a> = &'a (dyn Fn(usize, usize) + Sync);

/// Everything one batch produced
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Resolved files. Files dropped at the deadline are absent.
    pub results: HashMap<PathBuf, AnalysisResult>,
    /// Files still pending when the deadline passed
    pub timed_out: Vec<PathBuf>,
    /// Results served from the store without running the analyzer
    pub cache_hits: usize,
    pub elapsed: Duration,
}

impl BatchOutcome {
    /// True when every submitted file has a result
    pub fn is_complete(&self) -> bool {
        self.timed_out.is_empty()
    }
}

struct Job {
    path: PathBuf,
    key: Option<CacheKey>,
}

/// Bounded worker pool with a result store and a batch deadline
pub struct Orchestrator {
    config: Arc<Config>,
    analyzer: Arc<dyn Analyzer>,
    store: Option<Arc<dyn ResultStore>>,
    timeout: Duration,
}

impl Orchestrator {
    /// Orchestrator running the built-in rules, without a result store
    pub fn new(config: Config) -> Self {
        let timeout = config.timeout();
        Self {
            config: Arc::new(config),
            analyzer: Arc::new(RuleAnalyzer::new()),
            store: None,
            timeout,
        }
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Override the batch deadline from the config (sub-second budgets)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Analyze `paths` as one batch
    pub fn run(&self, paths: &[PathBuf], progress: Option<Progress<'_>>) -> BatchOutcome {
        let start = Instant::now();
        let deadline = start + self.timeout;
        let mut outcome = BatchOutcome::default();
        let mut seen = HashSet::new();
        let mut jobs = Vec::new();

        for path in paths {
            if !seen.insert(path.as_path()) {
                continue;
            }
            if !FileCategory::from_path(path).is_supported() {
                debug!("Skipping unsupported file {}", path.display());
                outcome
                    .results
                    .insert(path.clone(), AnalysisResult::skipped(path));
                continue;
            }

            let key = self.fingerprint(path);
            if let (Some(store), Some(key)) = (&self.store, &key) {
                if let Some(mut cached) = store.lookup(key) {
                    debug!("{} cache hit for {}", store.name(), path.display());
                    // Keys are canonical; report the path this batch was given
                    cached.file_path = path.clone();
                    outcome.cache_hits += 1;
                    outcome.results.insert(path.clone(), cached);
                    continue;
                }
                debug!("{} cache miss for {}", store.name(), path.display());
            }
            jobs.push(Job {
                path: path.clone(),
                key,
            });
        }

        let total = outcome.results.len() + jobs.len();
        info!(
            "Analyzing {} file(s): {} resolved up front, {} dispatched",
            total,
            outcome.results.len(),
            jobs.len()
        );
        if let Some(cb) = progress {
            cb(outcome.results.len(), total);
        }

        if !jobs.is_empty() {
            self.dispatch(jobs, deadline, total, &mut outcome, progress);
        }

        outcome.elapsed = start.elapsed();
        info!(
            "Batch finished in {:.2?}: {} result(s), {} cache hit(s), {} timed out",
            outcome.elapsed,
            outcome.results.len(),
            outcome.cache_hits,
            outcome.timed_out.len()
        );
        outcome
    }

    fn fingerprint(&self, path: &Path) -> Option<CacheKey> {
        self.store.as_ref()?;
        match CacheKey::for_path(path, self.config.cache.verify_content) {
            Ok(key) => Some(key),
            Err(e) => {
                debug!("Cannot fingerprint {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Run `jobs` on the worker pool and collect until done or `deadline`
    fn dispatch(
        &self,
        jobs: Vec<Job>,
        deadline: Instant,
        total: usize,
        outcome: &mut BatchOutcome,
        progress: Option<Progress<'_>>,
    ) {
        let mut pending: HashSet<PathBuf> = jobs.iter().map(|j| j.path.clone()).collect();
        let num_workers = self.config.parallelism.clamp(1, jobs.len());

        let (job_tx, job_rx) = unbounded::<Job>();
        let (result_tx, result_rx) = unbounded::<(PathBuf, AnalysisResult)>();
        for job in jobs {
            // Receiver is alive, cannot fail
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        let cancel = CancellationToken::new();
        let mut handles = Vec::with_capacity(num_workers);
        for i in 0..num_workers {
            let worker = Worker {
                jobs: job_rx.clone(),
                results: result_tx.clone(),
                analyzer: Arc::clone(&self.analyzer),
                config: Arc::clone(&self.config),
                store: self.store.clone(),
                cancel: cancel.clone(),
            };
            match thread::Builder::new()
                .name(format!("commitgate-worker-{}", i))
                .spawn(move || worker.run())
            {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    error!("Failed to spawn worker thread: {}", e);
                    break;
                }
            }
        }
        drop(result_tx);

        if handles.is_empty() {
            warn!("No worker threads available; analyzing on the calling thread");
            let (tx, rx) = unbounded();
            Worker {
                jobs: job_rx,
                results: tx,
                analyzer: Arc::clone(&self.analyzer),
                config: Arc::clone(&self.config),
                store: self.store.clone(),
                cancel: cancel.clone(),
            }
            .run();
            for (path, result) in rx.try_iter() {
                if pending.remove(&path) {
                    outcome.results.insert(path, result);
                }
            }
        } else {
            drop(job_rx);
            let mut done = outcome.results.len();
            while !pending.is_empty() {
                match result_rx.recv_deadline(deadline) {
                    Ok((path, result)) => {
                        if pending.remove(&path) {
                            outcome.results.insert(path, result);
                            done += 1;
                            if let Some(cb) = progress {
                                cb(done, total);
                            }
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        warn!(
                            "Batch deadline reached with {} file(s) unfinished; cancelling",
                            pending.len()
                        );
                        break;
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        warn!("All workers exited with {} file(s) unfinished", pending.len());
                        break;
                    }
                }
            }
        }

        cancel.cancel();
        if pending.is_empty() {
            for handle in handles {
                if handle.join().is_err() {
                    warn!("Worker thread panicked");
                }
            }
        } else {
            // Stragglers notice the token when their current file finishes
            drop(handles);
        }

        let mut timed_out: Vec<PathBuf> = pending.into_iter().collect();
        timed_out.sort();
        outcome.timed_out = timed_out;
    }
}

/// One pool thread: pulls jobs until the queue drains or the batch is cancelled
struct Worker {
    jobs: Receiver<Job>,
    results: Sender<(PathBuf, AnalysisResult)>,
    analyzer: Arc<dyn Analyzer>,
    config: Arc<Config>,
    store: Option<Arc<dyn ResultStore>>,
    cancel: CancellationToken,
}

impl Worker {
    fn run(self) {
        for job in self.jobs.iter() {
            if self.cancel.is_cancelled() {
                break;
            }

            let result = self.analyze(&job.path);

            if self.cancel.is_cancelled() {
                debug!("Discarding result for {} after cancellation", job.path.display());
                break;
            }
            if let (Some(store), Some(key)) = (&self.store, &job.key) {
                if result.status != Status::Error {
                    store.store(key, &result);
                }
            }
            if self.results.send((job.path, result)).is_err() {
                break;
            }
        }
    }

    /// Analyzer call with panics contained to the file
    fn analyze(&self, path: &Path) -> AnalysisResult {
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.analyzer.analyze(path, &self.config)
        }));
        match outcome {
            Ok(result) => result,
            Err(panic_info) => {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                error!("Analyzer panicked on {}: {}", path.display(), panic_msg);
                AnalysisResult::read_error(
                    path,
                    FileCategory::from_path(path),
                    &format!("analysis panicked: {}", panic_msg),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct MemoryStore {
        entries: Mutex<HashMap<CacheKey, AnalysisResult>>,
        writes: AtomicUsize,
    }

    impl ResultStore for MemoryStore {
        fn name(&self) -> &str {
            "memory"
        }

        fn lookup(&self, key: &CacheKey) -> Option<AnalysisResult> {
            self.entries.lock().unwrap().get(key).cloned()
        }

        fn store(&self, key: &CacheKey, result: &AnalysisResult) {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.entries.lock().unwrap().insert(key.clone(), result.clone());
        }
    }

    /// Sleeps on files whose name starts with "slow"
    struct SlowAnalyzer {
        delay: Duration,
    }

    impl Analyzer for SlowAnalyzer {
        fn analyze(&self, path: &Path, config: &Config) -> AnalysisResult {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name.starts_with("slow") {
                thread::sleep(self.delay);
            }
            RuleAnalyzer::new().analyze(path, config)
        }
    }

    struct PanickingAnalyzer;

    impl Analyzer for PanickingAnalyzer {
        fn analyze(&self, _path: &Path, _config: &Config) -> AnalysisResult {
            panic!("analyzer blew up")
        }
    }

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn config() -> Config {
        Config::default().with_parallelism(2)
    }

    #[test]
    fn test_every_file_resolved() {
        let tmp = TempDir::new().unwrap();
        let paths = vec![
            write(tmp.path(), "a.css", ".a { color: red; }"),
            write(tmp.path(), "b.js", "const x = 1;\nconsole.log(x);"),
            write(tmp.path(), "c.html", "<p>hi</p>"),
            write(tmp.path(), "d.txt", "notes"),
        ];

        let outcome = Orchestrator::new(config()).run(&paths, None);

        assert_eq!(outcome.results.len(), 4);
        assert!(outcome.is_complete());
        assert_eq!(outcome.results[&paths[3]].status, Status::Skip);
        assert_eq!(outcome.results[&paths[0]].status, Status::Pass);
    }

    #[test]
    fn test_duplicate_paths_analyzed_once() {
        let tmp = TempDir::new().unwrap();
        let a = write(tmp.path(), "a.css", ".a { color: red; }");
        let outcome = Orchestrator::new(config()).run(&[a.clone(), a.clone()], None);
        assert_eq!(outcome.results.len(), 1);
    }

    #[test]
    fn test_missing_file_is_error_not_dropped() {
        let tmp = TempDir::new().unwrap();
        let gone = tmp.path().join("gone.js");
        let outcome = Orchestrator::new(config()).run(&[gone.clone()], None);
        assert_eq!(outcome.results[&gone].status, Status::Error);
    }

    #[test]
    fn test_deadline_drops_slow_files() {
        let tmp = TempDir::new().unwrap();
        let fast = write(tmp.path(), "fast.css", ".a { color: red; }");
        let slow = write(tmp.path(), "slow.css", ".b { color: blue; }");
        let store = Arc::new(MemoryStore::default());

        let outcome = Orchestrator::new(config())
            .with_analyzer(Arc::new(SlowAnalyzer {
                delay: Duration::from_secs(2),
            }))
            .with_store(store.clone())
            .with_timeout(Duration::from_millis(300))
            .run(&[fast.clone(), slow.clone()], None);

        assert!(outcome.results.contains_key(&fast));
        assert!(!outcome.results.contains_key(&slow));
        assert_eq!(outcome.timed_out, vec![slow]);
        assert!(outcome.elapsed < Duration::from_secs(2));
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancelled_worker_does_not_write_cache() {
        let tmp = TempDir::new().unwrap();
        let slow = write(tmp.path(), "slow.js", "let a = 1;\nuse(a);");
        let store = Arc::new(MemoryStore::default());

        let outcome = Orchestrator::new(config())
            .with_analyzer(Arc::new(SlowAnalyzer {
                delay: Duration::from_millis(400),
            }))
            .with_store(store.clone())
            .with_timeout(Duration::from_millis(50))
            .run(&[slow], None);
        assert!(outcome.results.is_empty());

        // Let the straggler finish and observe the cancelled token
        thread::sleep(Duration::from_millis(700));
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cache_hits_skip_analysis() {
        let tmp = TempDir::new().unwrap();
        let paths = vec![
            write(tmp.path(), "a.css", ".a { color: red; }"),
            write(tmp.path(), "b.js", "if (a && b) { go(); }"),
        ];
        let store = Arc::new(MemoryStore::default());
        let orchestrator = Orchestrator::new(config()).with_store(store.clone());

        let first = orchestrator.run(&paths, None);
        assert_eq!(first.cache_hits, 0);
        assert_eq!(store.writes.load(Ordering::SeqCst), 2);

        let second = orchestrator.run(&paths, None);
        assert_eq!(second.cache_hits, 2);
        assert_eq!(store.writes.load(Ordering::SeqCst), 2);
        assert_eq!(first.results, second.results);
    }

    #[test]
    fn test_cache_hit_reports_requested_path() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        let real = write(&tmp.path().join("sub"), "a.css", ".a { color: red; }");
        let dotted = tmp.path().join("sub").join("..").join("sub").join(".").join("a.css");
        let store = Arc::new(MemoryStore::default());
        let orchestrator = Orchestrator::new(config()).with_store(store);

        let first = orchestrator.run(&[dotted.clone()], None);
        assert_eq!(first.results[&dotted].file_path, dotted);

        let second = orchestrator.run(&[real.clone()], None);
        assert_eq!(second.cache_hits, 1);
        assert_eq!(second.results[&real].file_path, real);
    }

    #[test]
    fn test_error_results_not_cached() {
        let tmp = TempDir::new().unwrap();
        let empty = write(tmp.path(), "empty.css", "");
        let store = Arc::new(MemoryStore::default());
        let outcome = Orchestrator::new(config())
            .with_store(store.clone())
            .run(&[empty.clone()], None);
        assert_eq!(outcome.results[&empty].status, Status::Error);
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_analyzer_panic_contained() {
        let tmp = TempDir::new().unwrap();
        let a = write(tmp.path(), "a.js", "x();");
        let outcome = Orchestrator::new(config())
            .with_analyzer(Arc::new(PanickingAnalyzer))
            .run(&[a.clone()], None);
        let result = &outcome.results[&a];
        assert_eq!(result.status, Status::Error);
        assert!(result.issues[0].message.contains("analyzer blew up"));
    }

    #[test]
    fn test_progress_reaches_total() {
        let tmp = TempDir::new().unwrap();
        let paths: Vec<PathBuf> = (0..6)
            .map(|i| write(tmp.path(), &format!("f{}.css", i), ".a { color: red; }"))
            .collect();
        let last = Mutex::new((0, 0));
        let cb = |done: usize, total: usize| {
            *last.lock().unwrap() = (done, total);
        };

        Orchestrator::new(config()).run(&paths, Some(&cb));
        assert_eq!(*last.lock().unwrap(), (6, 6));
    }

    #[test]
    fn test_empty_batch() {
        let outcome = Orchestrator::new(config()).run(&[], None);
        assert!(outcome.results.is_empty());
        assert!(outcome.is_complete());
    }
}
