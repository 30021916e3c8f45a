use std::sync::Arc;

use arbor_browser::Fetch;
use arbor_fs::OutputsSource;
use arbor_store::OutputsAction;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Runs fetches against a source and reports back as store actions.
///
/// Each fetch gets its own task. Nothing waits on it: the outcome arrives
/// later on the action channel, as a received or failed action.
#[derive(Clone)]
pub struct Fetcher {
    source: Arc<dyn OutputsSource>,
    actions: UnboundedSender<OutputsAction>,
}

impl Fetcher {
    pub fn new(source: Arc<dyn OutputsSource>, actions: UnboundedSender<OutputsAction>) -> Self {
        Self { source, actions }
    }

    /// The requested action is sent before spawning, so requests reach the
    /// store in dispatch order even when their responses do not.
    pub fn dispatch(&self, fetch: Fetch) {
        let requested = match &fetch {
            Fetch::Tree { path } => OutputsAction::TreeRequested { path: path.clone() },
            Fetch::Files { path } => OutputsAction::FileRequested { path: path.clone() },
        };
        if self.actions.send(requested).is_err() {
            debug!("action channel closed, dropping fetch");
            return;
        }

        let source = Arc::clone(&self.source);
        let actions = self.actions.clone();

        tokio::spawn(async move {
            let action = match fetch {
                Fetch::Tree { path } => match source.list(&path).await {
                    Ok(listing) => OutputsAction::TreeReceived { path, listing },
                    Err(error) => OutputsAction::FetchFailed {
                        path,
                        error: error.to_string(),
                    },
                },
                Fetch::Files { path } => match source.read(&path).await {
                    Ok(content) => OutputsAction::FileReceived { path, content },
                    Err(error) => OutputsAction::FetchFailed {
                        path,
                        error: error.to_string(),
                    },
                },
            };

            if actions.send(action).is_err() {
                debug!("action channel closed, dropping fetch result");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_fs::SourceError;
    use arbor_tree::OutputsListing;
    use async_trait::async_trait;
    use tokio::sync::mpsc::unbounded_channel;

    struct FakeSource;

    #[async_trait]
    impl OutputsSource for FakeSource {
        async fn list(&self, path: &str) -> Result<OutputsListing, SourceError> {
            if path == "missing" {
                return Err(SourceError::InvalidPath { path: path.into() });
            }
            Ok(OutputsListing {
                dirs: vec!["logs".into()],
                files: vec![],
            })
        }

        async fn read(&self, path: &str) -> Result<String, SourceError> {
            Ok(format!("contents of {path}"))
        }
    }

    #[tokio::test]
    async fn tree_fetch_reports_request_then_listing() {
        let (tx, mut rx) = unbounded_channel();
        let fetcher = Fetcher::new(Arc::new(FakeSource), tx);

        fetcher.dispatch(Fetch::Tree {
            path: String::new(),
        });

        assert_eq!(
            rx.recv().await,
            Some(OutputsAction::TreeRequested {
                path: String::new()
            })
        );
        assert_eq!(
            rx.recv().await,
            Some(OutputsAction::TreeReceived {
                path: String::new(),
                listing: OutputsListing {
                    dirs: vec!["logs".into()],
                    files: vec![],
                },
            })
        );
    }

    #[tokio::test]
    async fn file_fetch_reports_content() {
        let (tx, mut rx) = unbounded_channel();
        let fetcher = Fetcher::new(Arc::new(FakeSource), tx);

        fetcher.dispatch(Fetch::Files {
            path: "a.txt".into(),
        });

        rx.recv().await;
        assert_eq!(
            rx.recv().await,
            Some(OutputsAction::FileReceived {
                path: "a.txt".into(),
                content: "contents of a.txt".into(),
            })
        );
    }

    #[tokio::test]
    async fn source_errors_become_failed_actions() {
        let (tx, mut rx) = unbounded_channel();
        let fetcher = Fetcher::new(Arc::new(FakeSource), tx);

        fetcher.dispatch(Fetch::Tree {
            path: "missing".into(),
        });

        rx.recv().await;
        match rx.recv().await {
            Some(OutputsAction::FetchFailed { path, error }) => {
                assert_eq!(path, "missing");
                assert!(error.contains("missing"));
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[tokio::test]
    async fn requests_are_reported_in_dispatch_order() {
        let (tx, mut rx) = unbounded_channel();
        let fetcher = Fetcher::new(Arc::new(FakeSource), tx);

        fetcher.dispatch(Fetch::Files { path: "a.txt".into() });
        fetcher.dispatch(Fetch::Files { path: "b.txt".into() });

        assert_eq!(
            rx.recv().await,
            Some(OutputsAction::FileRequested { path: "a.txt".into() })
        );
        assert_eq!(
            rx.recv().await,
            Some(OutputsAction::FileRequested { path: "b.txt".into() })
        );
    }
}
