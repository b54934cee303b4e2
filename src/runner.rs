// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scan Runner
 * Rate-limited, bounded fan-out of host probes into a shared result store
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use ipnetwork::IpNetwork;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch, AcquireError, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cdn_detector::{BuiltinCdnDatabase, CdnClassifier, CdnDatabase};
use crate::config::ScanOptions;
use crate::dns_cache::{CachedResolver, DnsResolver};
use crate::errors::{ReconError, ReconResult};
use crate::fingerprint::{FaviconSignatureEngine, FingerprintDispatcher, FingerprintEngine};
use crate::http_client::{HttpClient, Transport};
use crate::prober::ProtocolProber;
use crate::rate_limiter::DispatchRateLimiter;
use crate::reporting::console_line;
use crate::result_store::ResultStore;
use crate::types::{Phase, ScanOutcome};

/// Collaborators a runner drives. Swapped for mocks in tests.
pub struct RunnerComponents {
    pub transport: Arc<dyn Transport>,
    pub resolver: Arc<dyn DnsResolver>,
    pub cdn_database: Arc<dyn CdnDatabase>,
    pub engine: Arc<dyn FingerprintEngine>,
    pub fingerprint_timeout: Option<Duration>,
    pub multi_ip_heuristic: bool,
}

impl RunnerComponents {
    /// Production stack: reqwest transport, hickory resolver, built-in CDN table
    /// and the favicon signature engine
    pub fn from_options(options: &ScanOptions) -> ReconResult<Self> {
        Ok(Self {
            transport: Arc::new(HttpClient::from_options(options)?),
            resolver: Arc::new(CachedResolver::from_options(options)?),
            cdn_database: Arc::new(BuiltinCdnDatabase::new()),
            engine: Arc::new(FaviconSignatureEngine),
            fingerprint_timeout: None,
            multi_ip_heuristic: true,
        })
    }
}

/// One scan run over a host list
pub struct Runner {
    options: ScanOptions,
    prober: Arc<ProtocolProber>,
    limiter: DispatchRateLimiter,
    store: Arc<ResultStore>,
    phase: watch::Sender<Phase>,
    shutdown: CancellationToken,
    console: bool,
    host_list: Mutex<Option<PathBuf>>,
}

impl Runner {
    pub fn new(options: ScanOptions) -> ReconResult<Self> {
        options.validate_options()?;
        let components = RunnerComponents::from_options(&options)?;
        Self::with_components(options, components)
    }

    pub fn with_components(options: ScanOptions, components: RunnerComponents) -> ReconResult<Self> {
        options.validate_options()?;

        let rate_limit = options.effective_rate_limit();

        let classifier = Arc::new(
            CdnClassifier::new(components.resolver, components.cdn_database)
                .with_multi_ip_heuristic(components.multi_ip_heuristic),
        );

        let mut dispatcher = FingerprintDispatcher::for_rate(components.engine, rate_limit);
        if let Some(timeout) = components.fingerprint_timeout {
            dispatcher = dispatcher.with_timeout(timeout);
        }

        let prober = Arc::new(ProtocolProber::new(
            components.transport,
            classifier,
            Arc::new(dispatcher),
        ));

        let (phase, _) = watch::channel(Phase::Idle);

        Ok(Self {
            options,
            prober,
            limiter: DispatchRateLimiter::new(rate_limit),
            store: Arc::new(ResultStore::new()),
            phase,
            shutdown: CancellationToken::new(),
            console: false,
            host_list: Mutex::new(None),
        })
    }

    /// Print one line per outcome as it lands
    pub fn with_console_output(mut self, enabled: bool) -> Self {
        self.console = enabled;
        self
    }

    pub fn rate_limit(&self) -> u32 {
        self.limiter.rate()
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    pub fn results(&self) -> Arc<ResultStore> {
        Arc::clone(&self.store)
    }

    /// Token that stops host intake when cancelled. In-flight scans still finish.
    /// Signal handling belongs to the caller.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Where the last run spooled its host list. The file is gone once `run` returns.
    pub fn host_list_path(&self) -> Option<PathBuf> {
        self.host_list.lock().clone()
    }

    /// Phase only moves forward
    fn advance_phase(&self, next: Phase) {
        advance(&self.phase, next);
    }

    /// Scan every input host and return the filled store.
    ///
    /// Only startup errors are returned; per-host failures land in the store as
    /// failed outcomes.
    pub async fn run(&self) -> ReconResult<Arc<ResultStore>> {
        if self.phase() != Phase::Idle {
            return Err(ReconError::Configuration(
                "runner has already been started".to_string(),
            ));
        }

        let started = Instant::now();

        // Removed on drop, whichever way this function returns
        let host_list = preprocess_hosts(&self.options).await?;
        *self.host_list.lock() = Some(host_list.path().to_path_buf());

        let (host_tx, host_rx) = mpsc::channel::<String>(self.rate_limit() as usize);
        let feeder = tokio::spawn(feed_hosts(
            host_list.path().to_path_buf(),
            host_tx,
            self.shutdown.clone(),
        ));

        let (result_tx, result_rx) = mpsc::unbounded_channel::<ScanOutcome>();
        let listener = tokio::spawn(listen(
            result_rx,
            Arc::clone(&self.store),
            self.phase.clone(),
            self.console.then_some(self.options.clear),
        ));

        self.advance_phase(Phase::Scanning);
        self.dispatch(host_rx, result_tx).await;

        match feeder.await {
            Ok(Ok(count)) => debug!("Queued {} hosts", count),
            Ok(Err(e)) => warn!("Reading the host list failed: {}", e),
            Err(e) => warn!("Host feeder task failed: {}", e),
        }

        if let Err(e) = listener.await {
            warn!("Result listener failed: {}", e);
            self.advance_phase(Phase::Done);
        }
        self.wait_for_done().await;

        drop(host_list);

        info!(
            "Scan finished: {} results, {} failed, {} hosts dispatched at {}/s in {:.2}s",
            self.store.success_count(),
            self.store.failed_count(),
            self.limiter.dispatched(),
            self.limiter.rate(),
            started.elapsed().as_secs_f64()
        );

        Ok(Arc::clone(&self.store))
    }

    /// Block until the listener has drained every outcome
    pub async fn wait_for_done(&self) {
        let mut rx = self.phase.subscribe();
        let _ = rx.wait_for(|phase| *phase == Phase::Done).await;
    }

    /// Pull hosts, pace them through the limiter and run each in its own task,
    /// never more than `rate_limit` at once
    async fn dispatch(&self, mut hosts: mpsc::Receiver<String>, results: mpsc::UnboundedSender<ScanOutcome>) {
        let pool = Arc::new(Semaphore::new(self.rate_limit() as usize));
        let mut tasks = JoinSet::new();
        let cdn_only = self.options.cdn_only;

        loop {
            let host = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                next = hosts.recv() => match next {
                    Some(host) => host,
                    None => break,
                },
            };

            let permit = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                slot = self.next_slot(&pool) => match slot {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let prober = Arc::clone(&self.prober);
            let results = results.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let outcome = scan_host(&prober, &host, cdn_only).await;
                let _ = results.send(outcome);
            });

            while let Some(finished) = tasks.try_join_next() {
                if let Err(e) = finished {
                    warn!("Scan task failed: {}", e);
                }
            }
        }

        if self.shutdown.is_cancelled() {
            info!("Shutdown requested, waiting for {} in-flight hosts", tasks.len());
        }

        while let Some(finished) = tasks.join_next().await {
            if let Err(e) = finished {
                warn!("Scan task failed: {}", e);
            }
        }
        // last sender drops here, which lets the listener finish
    }

    /// Paced dispatch slot plus a concurrency permit
    async fn next_slot(&self, pool: &Arc<Semaphore>) -> Result<OwnedSemaphorePermit, AcquireError> {
        self.limiter.wait_for_slot().await;
        Arc::clone(pool).acquire_owned().await
    }
}

fn advance(phase: &watch::Sender<Phase>, next: Phase) {
    phase.send_if_modified(|current| {
        if next > *current {
            *current = next;
            true
        } else {
            false
        }
    });
}

async fn scan_host(prober: &ProtocolProber, host: &str, cdn_only: bool) -> ScanOutcome {
    let result = if cdn_only {
        prober.probe_cdn_only(host).await
    } else {
        prober.probe(host).await
    };

    match result {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(host = %host, error = %e, "Host scan failed");
            ScanOutcome::failed(host)
        }
    }
}

/// Drain outcomes into the store, then flip the phase to `Done`.
/// `console` is `Some(clear)` when lines should be printed.
async fn listen(
    mut results: mpsc::UnboundedReceiver<ScanOutcome>,
    store: Arc<ResultStore>,
    phase: watch::Sender<Phase>,
    console: Option<bool>,
) {
    while let Some(outcome) = results.recv().await {
        if let Some(clear) = console {
            if let Some(line) = console_line(&outcome, clear) {
                println!("{}", line);
            }
        }
        store.insert(outcome);
    }
    advance(&phase, Phase::Done);
}

/// Inline hosts followed by the hosts file, spooled into a temporary file
pub async fn preprocess_hosts(options: &ScanOptions) -> ReconResult<NamedTempFile> {
    let file_contents = match &options.hosts_file {
        Some(path) => Some(tokio::fs::read(path).await.map_err(|e| {
            ReconError::Configuration(format!("cannot read hosts file {}: {}", path.display(), e))
        })?),
        None => None,
    };

    let hosts = options.hosts.clone();
    let spooled = tokio::task::spawn_blocking(move || -> std::io::Result<NamedTempFile> {
        let mut file = tempfile::Builder::new().prefix("lonkero-recon-hosts-").tempfile()?;
        for host in &hosts {
            writeln!(file, "{}", host)?;
        }
        if let Some(contents) = file_contents {
            file.write_all(&contents)?;
            if !contents.ends_with(b"\n") {
                file.write_all(b"\n")?;
            }
        }
        file.flush()?;
        Ok(file)
    })
    .await
    .map_err(|e| ReconError::Io(std::io::Error::other(e)))??;

    debug!("Host list spooled to {}", spooled.path().display());
    Ok(spooled)
}

/// Normalize one input line. `None` for blanks, comments, CIDR ranges.
/// Comma-separated lines are split by the CLI, not here.
pub fn normalize_target(line: &str) -> Option<&str> {
    let target = line.trim();
    if target.is_empty() || target.starts_with('#') || is_cidr(target) {
        return None;
    }
    Some(target)
}

fn is_cidr(target: &str) -> bool {
    target.contains('/') && target.parse::<IpNetwork>().is_ok()
}

async fn feed_hosts(
    path: std::path::PathBuf,
    hosts: mpsc::Sender<String>,
    shutdown: CancellationToken,
) -> std::io::Result<usize> {
    let file = tokio::fs::File::open(&path).await?;
    let mut lines = BufReader::new(file).lines();
    let mut seen = HashSet::new();
    let mut count = 0;

    while let Some(line) = lines.next_line().await? {
        if shutdown.is_cancelled() {
            break;
        }

        let Some(target) = normalize_target(&line) else {
            continue;
        };
        if !seen.insert(target.to_string()) {
            continue;
        }

        if hosts.send(target.to_string()).await.is_err() {
            break;
        }
        count += 1;
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_target() {
        assert_eq!(normalize_target("  example.com  "), Some("example.com"));
        assert_eq!(normalize_target("https://example.com/a/b"), Some("https://example.com/a/b"));
        assert_eq!(normalize_target(""), None);
        assert_eq!(normalize_target("# comment"), None);
        assert_eq!(normalize_target("10.0.0.0/24"), None);
        assert_eq!(normalize_target("2001:db8::/32"), None);
        assert_eq!(normalize_target("10.0.0.1"), Some("10.0.0.1"));
    }

    #[tokio::test]
    async fn test_preprocess_merges_inline_and_file() {
        let mut hosts_file = NamedTempFile::new().unwrap();
        write!(hosts_file, "b.test\n10.0.0.0/8\nc.test").unwrap();

        let options = ScanOptions {
            hosts_file: Some(hosts_file.path().to_path_buf()),
            ..ScanOptions::with_hosts(["a.test"])
        };

        let spooled = preprocess_hosts(&options).await.unwrap();
        let contents = std::fs::read_to_string(spooled.path()).unwrap();
        assert_eq!(contents, "a.test\nb.test\n10.0.0.0/8\nc.test\n");
    }

    #[tokio::test]
    async fn test_spooled_file_removed_on_drop() {
        let spooled = preprocess_hosts(&ScanOptions::with_hosts(["a.test"]))
            .await
            .unwrap();
        let path = spooled.path().to_path_buf();
        assert!(path.exists());

        drop(spooled);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_missing_hosts_file_is_error() {
        let options = ScanOptions {
            hosts_file: Some("/nonexistent/hosts.txt".into()),
            ..Default::default()
        };
        assert!(preprocess_hosts(&options).await.is_err());
    }

    #[tokio::test]
    async fn test_feed_dedupes_and_skips() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "a.test\n\n# skip\na.test\n192.168.0.0/16\nb.test\n").unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let count = feed_hosts(file.path().to_path_buf(), tx, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(count, 2);

        let mut got = Vec::new();
        while let Some(host) = rx.recv().await {
            got.push(host);
        }
        assert_eq!(got, vec!["a.test".to_string(), "b.test".to_string()]);
    }

    #[test]
    fn test_phase_only_advances() {
        let (tx, _) = watch::channel(Phase::Idle);
        advance(&tx, Phase::Done);
        advance(&tx, Phase::Scanning);
        assert_eq!(*tx.borrow(), Phase::Done);
    }
}
