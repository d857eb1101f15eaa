use super::open_store;
use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use github_client::{GitHubClient, DEFAULT_BASE_URL};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use watchcat_core::{
    ConfigLocation, ConsoleNotifier, FanOut, LocationLoader, PoolConfig, SlackNotifier, Watcher,
    WatcherOptions,
};

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum NotifierKind {
    /// One line per event on stdout
    Std,
    /// Slack incoming webhook
    Slack,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Watch list: file://path, a bare path, or an http(s):// URL
    #[arg(long, env = "WATCHCAT_CONF")]
    conf: String,

    /// GitHub API token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Time between checks (e.g. 30s, 10m, 1h)
    #[arg(long, default_value = "10m")]
    interval: humantime::Duration,

    /// Notification sinks, comma separated
    #[arg(long, value_enum, value_delimiter = ',', default_value = "std")]
    notifiers: Vec<NotifierKind>,

    /// Webhook URL for the slack notifier
    #[arg(long, env = "WATCHCAT_SLACK_WEBHOOK_URL", hide_env_values = true)]
    slack_webhook_url: Option<String>,

    /// Concurrent checks
    #[arg(long, default_value_t = 10)]
    workers: usize,

    /// Checks that may wait for a worker before the scheduler blocks
    #[arg(long, default_value_t = 1000)]
    queue_size: usize,

    /// GitHub API base URL (for GitHub Enterprise)
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_BASE_URL)]
    api_url: String,

    /// Issue list pages scanned when looking for the latest issue or pull request
    #[arg(long, default_value_t = 10)]
    max_pages: u32,
}

impl WatchArgs {
    fn options(&self) -> Result<WatcherOptions> {
        let interval: Duration = *self.interval;
        if interval.is_zero() {
            bail!("--interval must be greater than zero");
        }
        if self.workers == 0 || self.queue_size == 0 {
            bail!("--workers and --queue-size must be at least 1");
        }
        Ok(WatcherOptions {
            interval,
            pool: PoolConfig {
                workers: self.workers,
                queue_size: self.queue_size,
            },
        })
    }

    fn fan_out(&self) -> Result<FanOut> {
        let mut fan_out = FanOut::new();
        let mut seen = Vec::new();
        for kind in &self.notifiers {
            if seen.contains(kind) {
                continue;
            }
            seen.push(*kind);
            match kind {
                NotifierKind::Std => fan_out.push(ConsoleNotifier::stdout()),
                NotifierKind::Slack => {
                    let Some(url) = self.slack_webhook_url.as_deref() else {
                        bail!("the slack notifier needs --slack-webhook-url");
                    };
                    fan_out.push(SlackNotifier::new(url)?);
                }
            }
        }
        Ok(fan_out)
    }
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn build_watcher(db: Option<&Path>, args: WatchArgs) -> Result<Watcher> {
    let options = args.options()?;
    let fan_out = args.fan_out()?;
    let store = open_store(db)?;

    let location: ConfigLocation = args
        .conf
        .parse()
        .with_context(|| format!("invalid --conf '{}'", args.conf))?;
    let loader = LocationLoader::new(location)?;
    tracing::debug!(conf = %loader.location(), "watch list location");

    let client = GitHubClient::new(args.token)?
        .with_base_url(args.api_url)
        .with_max_pages(args.max_pages);

    Ok(Watcher::new(
        Arc::new(loader),
        Arc::new(client),
        Arc::new(store),
        Arc::new(fan_out),
        options,
    ))
}

// ---------------------------------------------------------------------------
// watch / check
// ---------------------------------------------------------------------------

pub fn run_watch(db: Option<&Path>, args: WatchArgs) -> Result<()> {
    let watcher = build_watcher(db, args)?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let shutdown = shutdown_signal()?;
        watcher.watch(shutdown).await?;
        tracing::info!("stopped");
        Ok::<(), anyhow::Error>(())
    })
}

pub fn run_check(db: Option<&Path>, args: WatchArgs) -> Result<()> {
    let watcher = build_watcher(db, args)?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        watcher.check_once().await?;
        Ok::<(), anyhow::Error>(())
    })
}

/// Resolves on SIGINT or SIGTERM (Ctrl-C elsewhere). Handlers are
/// installed before returning so a signal arriving during the first check
/// is not lost.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigint = signal(SignalKind::interrupt()).context("installing SIGINT handler")?;
    let mut sigterm = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;

    Ok(async move {
        tokio::select! {
            _ = sigint.recv() => tracing::warn!("SIGINT received"),
            _ = sigterm.recv() => tracing::warn!("SIGTERM received"),
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
        }
        tracing::warn!("interrupt received");
    })
}
