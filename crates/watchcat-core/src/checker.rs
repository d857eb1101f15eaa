//! One fetch → compare → persist → notify run for a single target.

use std::sync::Arc;

use crate::error::CheckError;
use crate::notify::{FanOut, NotificationEvent};
use crate::source::{ActivitySource, SourceError};
use crate::store::{blocking, MarkerStore};
use crate::types::RepositoryTarget;

/// Result of a run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Unchanged,
    Updated { previous: String, current: String },
}

/// Checker for one (repository, kind) pair.
///
/// Holds no state between runs; everything it needs is bound at
/// construction and the last-seen value lives in the store.
pub struct Checker {
    target: RepositoryTarget,
    source: Arc<dyn ActivitySource>,
    store: Arc<dyn MarkerStore>,
    fan_out: Arc<FanOut>,
    owner_avatar: Option<String>,
}

impl Checker {
    pub fn new(
        target: RepositoryTarget,
        source: Arc<dyn ActivitySource>,
        store: Arc<dyn MarkerStore>,
        fan_out: Arc<FanOut>,
    ) -> Self {
        Self {
            target,
            source,
            store,
            fan_out,
            owner_avatar: None,
        }
    }

    /// Owner avatar to attach to notifications. Takes precedence over the
    /// activity author's avatar.
    pub fn with_owner_avatar(mut self, avatar_url: Option<String>) -> Self {
        self.owner_avatar = avatar_url;
        self
    }

    pub async fn run(&self) -> Result<Outcome, CheckError> {
        let target = &self.target;

        let store = self.store.clone();
        let key = target.clone();
        let previous = match blocking(move || store.read(&key)).await {
            Ok(v) => v,
            Err(source) => {
                return Err(self
                    .fail(CheckError::Read {
                        target: target.clone(),
                        source,
                    })
                    .await)
            }
        };

        let activity = match self
            .source
            .latest(target.kind, &target.owner, &target.name)
            .await
        {
            Ok(a) => a,
            Err(SourceError::NotFound) => {
                tracing::debug!(repo = %target, kind = %target.kind, "nothing published yet");
                return Err(CheckError::NotFound {
                    target: target.clone(),
                });
            }
            Err(source) => {
                return Err(self
                    .fail(CheckError::Fetch {
                        target: target.clone(),
                        source,
                    })
                    .await)
            }
        };

        if !activity.marker.supersedes(&previous) {
            tracing::debug!(repo = %target, kind = %target.kind, marker = %previous, "no change");
            return Ok(Outcome::Unchanged);
        }

        let current = activity.marker.encode();
        let store = self.store.clone();
        let (key, value) = (target.clone(), current.clone());
        if let Err(source) = blocking(move || store.write(&key, &value)).await {
            return Err(self
                .fail(CheckError::Persist {
                    target: target.clone(),
                    source,
                })
                .await);
        }

        tracing::info!(
            repo = %target,
            kind = %target.kind,
            previous = %previous,
            current = %current,
            "new activity"
        );

        let event = NotificationEvent {
            owner: target.owner.clone(),
            repo_name: target.name.clone(),
            kind: target.kind,
            current: current.clone(),
            previous: previous.clone(),
            link: activity.link,
            title: activity.title,
            body: activity.body,
            avatar_url: self.owner_avatar.clone().or(activity.author_avatar),
        };
        self.fan_out.notify(&event).await;

        Ok(Outcome::Updated { previous, current })
    }

    async fn fail(&self, err: CheckError) -> CheckError {
        tracing::error!(repo = %err.target(), error = %err, "check failed");
        self.fan_out.report_error(&err).await;
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, WatchcatError};
    use crate::notify::testing::RecordingNotifier;
    use crate::source::{Activity, Marker};
    use crate::store::StateStore;
    use crate::types::TargetKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Returns the same response for every kind. No activity and no error
    /// means not-found.
    struct FixedSource {
        activity: Option<Activity>,
        error: Option<String>,
    }

    impl FixedSource {
        fn returning(activity: Activity) -> Arc<Self> {
            Arc::new(Self {
                activity: Some(activity),
                error: None,
            })
        }

        fn failing(error: &str) -> Arc<Self> {
            Arc::new(Self {
                activity: None,
                error: Some(error.to_string()),
            })
        }

        fn empty() -> Arc<Self> {
            Arc::new(Self {
                activity: None,
                error: None,
            })
        }
    }

    #[async_trait]
    impl ActivitySource for FixedSource {
        async fn latest(
            &self,
            _: TargetKind,
            _: &str,
            _: &str,
        ) -> std::result::Result<Activity, SourceError> {
            match (&self.activity, &self.error) {
                (Some(a), _) => Ok(a.clone()),
                (None, Some(e)) => Err(SourceError::Other(e.clone())),
                (None, None) => Err(SourceError::NotFound),
            }
        }

        async fn owner_avatar(&self, _: &str) -> std::result::Result<String, SourceError> {
            Err(SourceError::NotFound)
        }
    }

    /// Store whose reads or writes always fail.
    struct BrokenStore {
        fail_reads: bool,
    }

    impl MarkerStore for BrokenStore {
        fn get(&self, _: &RepositoryTarget) -> Result<Option<String>> {
            if self.fail_reads {
                return Err(WatchcatError::Store("disk on fire".into()));
            }
            Ok(None)
        }

        fn write(&self, _: &RepositoryTarget, _: &str) -> Result<()> {
            Err(WatchcatError::Store("disk full".into()))
        }
    }

    /// Real store that counts the writes made through it.
    struct CountingStore {
        inner: StateStore,
        writes: AtomicUsize,
    }

    impl MarkerStore for CountingStore {
        fn get(&self, target: &RepositoryTarget) -> Result<Option<String>> {
            self.inner.get(target)
        }

        fn write(&self, target: &RepositoryTarget, value: &str) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.write(target, value)
        }
    }

    fn activity(marker: Marker) -> Activity {
        Activity {
            marker,
            link: "https://github.com/o/r/x".into(),
            title: "title".into(),
            body: "body".into(),
            author_avatar: Some("https://avatars/author".into()),
        }
    }

    struct Harness {
        _dir: TempDir,
        store: Arc<CountingStore>,
        sink: RecordingNotifier,
        fan_out: Arc<FanOut>,
    }

    fn harness() -> Harness {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(CountingStore {
            inner: StateStore::open(&dir.path().join("w.db")).unwrap(),
            writes: AtomicUsize::new(0),
        });
        let sink = RecordingNotifier::default();
        let fan_out = Arc::new(FanOut::new().with(sink.clone()));
        Harness {
            _dir: dir,
            store,
            sink,
            fan_out,
        }
    }

    impl Harness {
        fn checker(&self, kind: TargetKind, source: Arc<dyn ActivitySource>) -> Checker {
            Checker::new(
                RepositoryTarget::new("o", "r", kind),
                source,
                self.store.clone(),
                self.fan_out.clone(),
            )
        }

        /// Write straight to the backing store, bypassing the counter.
        fn seed(&self, kind: TargetKind, value: &str) {
            self.store
                .inner
                .write(&RepositoryTarget::new("o", "r", kind), value)
                .unwrap();
        }

        fn stored(&self, kind: TargetKind) -> Option<String> {
            self.store
                .inner
                .get(&RepositoryTarget::new("o", "r", kind))
                .unwrap()
        }

        fn writes(&self) -> usize {
            self.store.writes.load(Ordering::SeqCst)
        }
    }

    fn marker_for(kind: TargetKind, value: &str) -> Marker {
        match kind {
            TargetKind::Release | TargetKind::Tag => Marker::Version(value.into()),
            TargetKind::Commit => Marker::Hash(value.into()),
            TargetKind::Issue | TargetKind::PullRequest => Marker::Id(value.parse().unwrap()),
        }
    }

    #[tokio::test]
    async fn unchanged_marker_has_no_side_effects_for_every_kind() {
        let h = harness();
        for (kind, value) in [
            (TargetKind::Release, "1.2.0"),
            (TargetKind::Tag, "v3"),
            (TargetKind::Commit, "abc123"),
            (TargetKind::Issue, "42"),
            (TargetKind::PullRequest, "7"),
        ] {
            h.seed(kind, value);
            let checker = h.checker(kind, FixedSource::returning(activity(marker_for(kind, value))));

            assert_eq!(checker.run().await.unwrap(), Outcome::Unchanged);
            assert_eq!(h.stored(kind).as_deref(), Some(value));
        }
        assert_eq!(h.writes(), 0);
        assert!(h.sink.events().is_empty());
        assert!(h.sink.errors().is_empty());
    }

    #[tokio::test]
    async fn newer_value_writes_exactly_once_for_every_kind() {
        let h = harness();
        let cases = [
            (TargetKind::Release, "1.1.9", "1.2.0"),
            (TargetKind::Tag, "v1.0", "v1.1"),
            (TargetKind::Commit, "ffff", "0000"),
            (TargetKind::Issue, "41", "42"),
            (TargetKind::PullRequest, "6", "7"),
        ];
        for (n, (kind, old, new)) in cases.into_iter().enumerate() {
            h.seed(kind, old);
            let checker = h.checker(kind, FixedSource::returning(activity(marker_for(kind, new))));

            assert_eq!(
                checker.run().await.unwrap(),
                Outcome::Updated {
                    previous: old.into(),
                    current: new.into()
                }
            );
            assert_eq!(h.writes(), n + 1, "{kind} wrote more than once");
            assert_eq!(h.stored(kind).as_deref(), Some(new));
            assert_eq!(h.sink.events().len(), n + 1, "{kind} notified more than once");
        }
        assert!(h.sink.errors().is_empty());
    }

    #[tokio::test]
    async fn newer_release_writes_once_and_notifies_once() {
        let h = harness();
        h.seed(TargetKind::Release, "1.1.9");
        let checker = h.checker(
            TargetKind::Release,
            FixedSource::returning(activity(Marker::Version("1.2.0".into()))),
        );

        let outcome = checker.run().await.unwrap();

        assert_eq!(
            outcome,
            Outcome::Updated {
                previous: "1.1.9".into(),
                current: "1.2.0".into()
            }
        );
        assert_eq!(h.stored(TargetKind::Release).as_deref(), Some("1.2.0"));
        assert_eq!(h.writes(), 1);
        let events = h.sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].previous, "1.1.9");
        assert_eq!(events[0].current, "1.2.0");
        assert_eq!(events[0].kind, TargetKind::Release);
        assert_eq!(events[0].link, "https://github.com/o/r/x");
    }

    #[tokio::test]
    async fn older_release_is_not_a_change() {
        let h = harness();
        h.seed(TargetKind::Release, "1.2.0");
        let checker = h.checker(
            TargetKind::Release,
            FixedSource::returning(activity(Marker::Version("1.1.9".into()))),
        );

        assert_eq!(checker.run().await.unwrap(), Outcome::Unchanged);
        assert_eq!(h.stored(TargetKind::Release).as_deref(), Some("1.2.0"));
        assert_eq!(h.writes(), 0);
    }

    #[tokio::test]
    async fn any_different_commit_hash_is_a_change() {
        let h = harness();
        h.seed(TargetKind::Commit, "ffff");
        let checker = h.checker(
            TargetKind::Commit,
            FixedSource::returning(activity(Marker::Hash("0000".into()))),
        );

        assert!(matches!(checker.run().await.unwrap(), Outcome::Updated { .. }));
        assert_eq!(h.stored(TargetKind::Commit).as_deref(), Some("0000"));
    }

    #[tokio::test]
    async fn issue_ids_compare_numerically() {
        let h = harness();
        h.seed(TargetKind::Issue, "41");
        let checker = h.checker(TargetKind::Issue, FixedSource::returning(activity(Marker::Id(42))));
        assert!(matches!(checker.run().await.unwrap(), Outcome::Updated { .. }));
        assert_eq!(h.stored(TargetKind::Issue).as_deref(), Some("42"));

        let first = h.checker(
            TargetKind::PullRequest,
            FixedSource::returning(activity(Marker::Id(1))),
        );
        assert_eq!(
            first.run().await.unwrap(),
            Outcome::Updated {
                previous: String::new(),
                current: "1".into()
            }
        );
    }

    #[tokio::test]
    async fn not_found_is_silent_and_leaves_store_alone() {
        let h = harness();
        h.seed(TargetKind::Release, "1.0.0");
        let checker = h.checker(TargetKind::Release, FixedSource::empty());

        let err = checker.run().await.unwrap_err();

        assert!(err.is_not_found());
        assert!(h.sink.errors().is_empty());
        assert!(h.sink.events().is_empty());
        assert_eq!(h.writes(), 0);
        assert_eq!(h.stored(TargetKind::Release).as_deref(), Some("1.0.0"));
    }

    #[tokio::test]
    async fn empty_repository_commit_check_is_silent() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/o/r/commits")
            .match_query(mockito::Matcher::Any)
            .with_status(409)
            .with_body(r#"{"message":"Git Repository is empty."}"#)
            .create_async()
            .await;
        let client = github_client::GitHubClient::new(None)
            .unwrap()
            .with_base_url(server.url());

        let h = harness();
        let err = h
            .checker(TargetKind::Commit, Arc::new(client))
            .run()
            .await
            .unwrap_err();

        assert!(err.is_not_found(), "expected NotFound, got {err:?}");
        assert!(h.sink.errors().is_empty());
        assert_eq!(h.writes(), 0);
    }

    #[tokio::test]
    async fn fetch_error_is_reported_and_state_untouched() {
        let h = harness();
        h.seed(TargetKind::Tag, "v1");
        let checker = h.checker(
            TargetKind::Tag,
            FixedSource::failing("rate limited"),
        );

        let err = checker.run().await.unwrap_err();

        assert!(matches!(err, CheckError::Fetch { .. }));
        assert_eq!(
            h.sink.errors(),
            vec!["o/r: failed to fetch latest tag: rate limited".to_string()]
        );
        assert_eq!(h.stored(TargetKind::Tag).as_deref(), Some("v1"));
        assert_eq!(h.writes(), 0);
    }

    #[tokio::test]
    async fn persist_failure_is_reported_without_notification() {
        let sink = RecordingNotifier::default();
        let checker = Checker::new(
            RepositoryTarget::new("o", "r", TargetKind::Release),
            FixedSource::returning(activity(Marker::Version("2.0.0".into()))),
            Arc::new(BrokenStore { fail_reads: false }),
            Arc::new(FanOut::new().with(sink.clone())),
        );

        let err = checker.run().await.unwrap_err();

        assert!(matches!(err, CheckError::Persist { .. }));
        assert!(sink.events().is_empty());
        assert_eq!(sink.errors().len(), 1);
    }

    #[tokio::test]
    async fn read_failure_is_reported_before_fetching() {
        let sink = RecordingNotifier::default();
        let checker = Checker::new(
            RepositoryTarget::new("o", "r", TargetKind::Commit),
            FixedSource::returning(activity(Marker::Hash("abc".into()))),
            Arc::new(BrokenStore { fail_reads: true }),
            Arc::new(FanOut::new().with(sink.clone())),
        );

        let err = checker.run().await.unwrap_err();

        assert!(matches!(err, CheckError::Read { .. }));
        assert_eq!(
            sink.errors(),
            vec!["o/r: failed to read stored commit: store error: disk on fire".to_string()]
        );
    }

    #[tokio::test]
    async fn owner_avatar_takes_precedence_over_author() {
        let h = harness();
        let with_owner = h
            .checker(TargetKind::Issue, FixedSource::returning(activity(Marker::Id(5))))
            .with_owner_avatar(Some("https://avatars/owner".into()));
        with_owner.run().await.unwrap();

        let without_owner = h.checker(
            TargetKind::PullRequest,
            FixedSource::returning(activity(Marker::Id(5))),
        );
        without_owner.run().await.unwrap();

        let events = h.sink.events();
        assert_eq!(events[0].avatar_url.as_deref(), Some("https://avatars/owner"));
        assert_eq!(events[1].avatar_url.as_deref(), Some("https://avatars/author"));
    }
}
