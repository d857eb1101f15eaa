//! The re-check loop.
//!
//! Every tick reloads the configuration, resolves owner avatars, builds one
//! [`Checker`] per (repository, kind) pair and hands them to the
//! [`Dispatcher`]. The stop signal is only observed between ticks.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::avatar;
use crate::checker::Checker;
use crate::config::{Config, ConfigLoader};
use crate::dispatcher::{Dispatcher, PoolConfig};
use crate::error::{Result, WatchcatError};
use crate::notify::FanOut;
use crate::source::ActivitySource;
use crate::store::StateStore;

// ---------------------------------------------------------------------------
// Options / state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherOptions {
    pub interval: Duration,
    pub pool: PoolConfig,
}

impl Default for WatcherOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(600),
            pool: PoolConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Checking,
    Stopped,
}

// ---------------------------------------------------------------------------
// InFlight
// ---------------------------------------------------------------------------

/// Keys whose checker is queued or running.
#[derive(Debug, Clone, Default)]
pub struct InFlight(Arc<Mutex<HashSet<String>>>);

/// Held by a submitted task; releases the key when dropped, whether the
/// task ran to completion or was discarded.
#[derive(Debug)]
pub struct InFlightGuard {
    keys: InFlight,
    key: String,
}

impl InFlight {
    /// Claim `key`, or `None` if a run for it is still outstanding.
    pub fn claim(&self, key: String) -> Option<InFlightGuard> {
        let mut keys = self.0.lock().unwrap_or_else(|e| e.into_inner());
        if !keys.insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard {
            keys: self.clone(),
            key,
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(key)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.keys
            .0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}

// ---------------------------------------------------------------------------
// Watcher
// ---------------------------------------------------------------------------

pub struct Watcher {
    loader: Arc<dyn ConfigLoader>,
    source: Arc<dyn ActivitySource>,
    store: Arc<StateStore>,
    fan_out: Arc<FanOut>,
    options: WatcherOptions,
    dispatcher: Dispatcher,
    in_flight: InFlight,
    state: Mutex<WatchState>,
}

impl Watcher {
    pub fn new(
        loader: Arc<dyn ConfigLoader>,
        source: Arc<dyn ActivitySource>,
        store: Arc<StateStore>,
        fan_out: Arc<FanOut>,
        options: WatcherOptions,
    ) -> Self {
        Self {
            loader,
            source,
            store,
            fan_out,
            dispatcher: Dispatcher::new(options.pool),
            options,
            in_flight: InFlight::default(),
            state: Mutex::new(WatchState::Idle),
        }
    }

    pub fn state(&self) -> WatchState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: WatchState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Run until `shutdown` resolves. The first check runs immediately.
    ///
    /// A zero interval or a configuration failure on the first check is
    /// returned as an error; later failures skip the tick.
    pub async fn watch(&self, shutdown: impl Future<Output = ()>) -> Result<()> {
        if self.options.interval.is_zero() {
            self.set_state(WatchState::Stopped);
            return Err(WatchcatError::ZeroInterval);
        }
        self.dispatcher.start();

        let config = self.load_initial().await?;
        self.set_state(WatchState::Checking);
        self.dispatch(config).await;
        self.set_state(WatchState::Idle);

        let interval = self.options.interval;
        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(interval = ?interval, "watching");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => self.tick().await,
            }
        }

        tracing::info!("stopping, waiting for running checks");
        self.dispatcher.stop_immediately().await;
        self.set_state(WatchState::Stopped);
        Ok(())
    }

    /// One tick, then wait for every submitted checker to finish.
    pub async fn check_once(&self) -> Result<()> {
        self.dispatcher.start();
        let config = self.load_initial().await?;
        self.set_state(WatchState::Checking);
        self.dispatch(config).await;
        self.dispatcher.stop().await;
        self.set_state(WatchState::Stopped);
        Ok(())
    }

    async fn load_initial(&self) -> Result<Config> {
        match self.loader.load().await {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::error!(error = %e, "failed to load config");
                self.dispatcher.stop_immediately().await;
                self.set_state(WatchState::Stopped);
                Err(e)
            }
        }
    }

    async fn tick(&self) {
        self.set_state(WatchState::Checking);
        match self.loader.load().await {
            Ok(config) => self.dispatch(config).await,
            Err(e) => tracing::error!(error = %e, "failed to reload config, skipping this tick"),
        }
        self.set_state(WatchState::Idle);
    }

    async fn owner_avatars(&self, config: &Config) -> HashMap<String, Option<String>> {
        let mut avatars = HashMap::new();
        for repo in &config.repos {
            if avatars.contains_key(&repo.owner) {
                continue;
            }
            let url = match avatar::owner_avatar(&self.store, self.source.as_ref(), &repo.owner)
                .await
            {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!(owner = %repo.owner, error = %e, "failed to resolve owner avatar");
                    None
                }
            };
            avatars.insert(repo.owner.clone(), url);
        }
        avatars
    }

    async fn dispatch(&self, config: Config) {
        let targets = config.targets();
        let avatars = self.owner_avatars(&config).await;
        tracing::debug!(targets = targets.len(), "dispatching checks");

        for target in targets {
            let Some(guard) = self.in_flight.claim(target.key()) else {
                tracing::debug!(key = %target.key(), "previous check still in flight, skipping");
                continue;
            };
            let avatar = avatars.get(&target.owner).cloned().flatten();
            let checker = Checker::new(
                target,
                self.source.clone(),
                self.store.clone(),
                self.fan_out.clone(),
            )
            .with_owner_avatar(avatar);

            let task = Box::pin(async move {
                let _guard = guard;
                // Failures are logged and reported by the checker itself.
                let _ = checker.run().await;
            });
            if let Err(WatchcatError::DispatcherStopped) = self.dispatcher.submit(task).await {
                tracing::warn!("dispatcher stopped mid-tick, dropping remaining checks");
                return;
            }
        }
    }
}
