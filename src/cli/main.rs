// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Lonkero Recon - Host Reconnaissance CLI
 * Probes hosts for HTTP/HTTPS, classifies CDN fronting, hashes favicons
 * and tags technologies
 *
 * (c) 2026 Bountyy Oy
 */

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use lonkero_recon::config::{ScanOptions, DEFAULT_RETRIES, DEFAULT_TIMEOUT_SECS};
use lonkero_recon::reporting::write_results;
use lonkero_recon::Runner;

/// Lonkero Recon - host reconnaissance
#[derive(Parser, Debug)]
#[command(name = "lonkero-recon")]
#[command(author = "Bountyy Oy <info@bountyy.fi>")]
#[command(version)]
#[command(about = "Find out what answers on your hosts, and what sits in front of it.", long_about = None)]
struct Cli {
    /// Target host, host:port or URL (repeatable, comma-separated)
    #[arg(short = 't', long = "target", value_delimiter = ',')]
    targets: Vec<String>,

    /// File with one target per line
    #[arg(short = 'T', long)]
    target_file: Option<PathBuf>,

    /// Output file (.txt, .csv or .json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Extra attempts per request
    #[arg(long, default_value_t = DEFAULT_RETRIES)]
    retries: u32,

    /// Request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Requests per second, also the concurrency ceiling (default: by CPU count)
    #[arg(long)]
    rate: Option<u32>,

    /// HTTP or SOCKS5 proxy, e.g. socks5://127.0.0.1:1080
    #[arg(long, env = "LONKERO_RECON_PROXY")]
    proxy: Option<String>,

    /// Only resolve and classify CDN, no HTTP
    #[arg(long = "cdn")]
    cdn_only: bool,

    /// No banner, no progress logging
    #[arg(long)]
    silent: bool,

    /// Only show and save successful results
    #[arg(long)]
    clear: bool,

    /// Verify TLS certificates
    #[arg(long)]
    strict_tls: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

impl Cli {
    fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            hosts: self
                .targets
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            hosts_file: self.target_file.clone(),
            retries: self.retries,
            timeout_secs: self.timeout,
            rate_limit: self.rate,
            proxy: self.proxy.clone(),
            cdn_only: self.cdn_only,
            insecure_tls: !self.strict_tls,
            output: self.output.clone(),
            silent: self.silent,
            clear: self.clear,
        }
    }

    fn log_level(&self) -> Level {
        if self.debug {
            Level::DEBUG
        } else if self.verbose {
            Level::INFO
        } else if self.silent {
            Level::ERROR
        } else {
            Level::WARN
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::builder()
        .with_default_directive(cli.log_level().into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();

    if !cli.silent {
        print_banner();
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .thread_name("lonkero-recon")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    let options = cli.scan_options();
    let started = Instant::now();

    let runner = match Runner::new(options.clone()) {
        Ok(runner) => runner.with_console_output(true),
        Err(e) => {
            error!("Invalid options: {}", e);
            return Err(e).context("Could not start scan");
        }
    };

    info!(
        "Starting scan at {} requests/s{}",
        runner.rate_limit(),
        if options.cdn_only { " (CDN only)" } else { "" }
    );

    let interrupt = tokio::spawn(watch_interrupts(runner.shutdown_token()));

    let result = runner.run().await;
    interrupt.abort();
    let store = result.context("Scan failed")?;

    if let Some(path) = &options.output {
        write_results(&store, path, !options.clear).await?;
    }

    info!(
        "Done: {} hosts answered, {} failed, {:.2}s",
        store.success_count(),
        store.failed_count(),
        started.elapsed().as_secs_f64()
    );

    Ok(())
}

/// First Ctrl-C stops new hosts from starting, a second one exits right away
async fn watch_interrupts(shutdown: CancellationToken) {
    while tokio::signal::ctrl_c().await.is_ok() {
        if shutdown.is_cancelled() {
            warn!("Second interrupt, exiting without waiting for in-flight hosts");
            std::process::exit(130);
        }
        warn!("Interrupt received, finishing in-flight hosts (Ctrl-C again to quit)");
        shutdown.cancel();
    }
}

fn print_banner() {
    eprint!("\x1b[92m");
    eprintln!("   __                __");
    eprintln!("  / /   ____  ____  / /_____  _________");
    eprintln!(" / /   / __ \\/ __ \\/ //_/ _ \\/ ___/ __ \\");
    eprintln!(" / /___/ /_/ / / / / ,< /  __/ /  / /_/ /");
    eprintln!("/_____/\\____/_/ /_/_/|_|\\___/_/   \\____/  recon");
    eprint!("\x1b[0m");
    eprintln!();
    eprint!("\x1b[1m\x1b[97m");
    eprintln!("    What answers, and what sits in front of it");
    eprint!("\x1b[0m");
    eprintln!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_are_comma_split() {
        let cli = Cli::parse_from([
            "lonkero-recon",
            "-t",
            "a.test,b.test",
            "--target",
            "c.test:8443",
        ]);
        assert_eq!(cli.scan_options().hosts, vec!["a.test", "b.test", "c.test:8443"]);
    }

    #[test]
    fn test_flags_map_to_options() {
        let cli = Cli::parse_from([
            "lonkero-recon",
            "-T",
            "hosts.txt",
            "--cdn",
            "--strict-tls",
            "--rate",
            "25",
            "--clear",
        ]);
        let opts = cli.scan_options();
        assert!(opts.cdn_only);
        assert!(!opts.insecure_tls);
        assert!(opts.clear);
        assert_eq!(opts.rate_limit, Some(25));
        assert_eq!(opts.hosts_file, Some(PathBuf::from("hosts.txt")));
        assert_eq!(opts.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }
}
