use futures::future::join_all;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::feed::fetcher::{build_client, fetch_feed, FeedError, FetchOptions, TransportError};
use crate::feed::parser::ParsedFeed;
use crate::feed::types::{Diagnostic, Post};

/// A feed that contributed no posts, with the error text that explains why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFailure {
    pub url: String,
    pub error: String,
}

/// An item-level fallback, tagged with the feed it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDiagnostic {
    pub url: String,
    pub diagnostic: Diagnostic,
}

/// Everything one aggregation run produced.
///
/// `posts` is what [`Aggregator::fetch_all`] returns; the other fields let
/// callers tell "every feed failed" apart from "no feed had posts".
#[derive(Debug, Clone, Default)]
pub struct AggregateReport {
    /// All posts, newest first
    pub posts: Vec<Post>,
    pub failures: Vec<FeedFailure>,
    pub diagnostics: Vec<ItemDiagnostic>,
}

/// What a feed task sends back to the collector.
enum FeedOutcome {
    Parsed { url: String, feed: ParsedFeed },
    Failed(FeedFailure),
}

/// Fetches many feeds at once and merges their posts.
///
/// Cloning is cheap: the underlying `reqwest::Client` is reference counted.
#[derive(Debug, Clone)]
pub struct Aggregator {
    client: reqwest::Client,
    options: FetchOptions,
}

impl Aggregator {
    /// Creates an aggregator with its own HTTP client.
    pub fn new(options: FetchOptions) -> Result<Self, TransportError> {
        Ok(Self::with_client(
            build_client(crate::feed::DEFAULT_USER_AGENT)?,
            options,
        ))
    }

    /// Creates an aggregator using the limits and user agent from `config`.
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        Ok(Self::with_client(
            build_client(&config.user_agent)?,
            config.fetch_options(),
        ))
    }

    /// Creates an aggregator around an existing client (allows custom configuration).
    pub fn with_client(client: reqwest::Client, options: FetchOptions) -> Self {
        Self { client, options }
    }

    /// Retrieves and parses one feed, returning posts in document order.
    pub async fn fetch_one(&self, url: &str) -> Result<ParsedFeed, FeedError> {
        fetch_feed(&self.client, url, &self.options).await
    }

    /// Fetches every feed concurrently and returns all posts, newest first.
    ///
    /// Never fails: feeds that cannot be fetched or parsed are logged and
    /// skipped. Use [`fetch_all_with_report`](Self::fetch_all_with_report)
    /// to see which ones.
    pub async fn fetch_all<S: AsRef<str>>(&self, urls: &[S]) -> Vec<Post> {
        self.fetch_all_with_report(urls).await.posts
    }

    /// Fetches every feed concurrently and reports posts, failures and
    /// item-level diagnostics.
    ///
    /// # Behavior
    ///
    /// - One task per URL, all started immediately with no concurrency cap
    /// - A failing task never affects its siblings
    /// - Results are collected only after every task has finished
    /// - Posts are stably sorted by date, newest first; posts with equal
    ///   dates keep the order in which their feeds finished
    pub async fn fetch_all_with_report<S: AsRef<str>>(&self, urls: &[S]) -> AggregateReport {
        let (tx, mut rx) = mpsc::unbounded_channel::<FeedOutcome>();

        let (task_urls, handles): (Vec<String>, Vec<_>) = urls
            .iter()
            .map(|url| {
                let url = url.as_ref().to_string();
                let client = self.client.clone();
                let options = self.options.clone();
                let tx = tx.clone();
                let task_url = url.clone();

                let handle = tokio::spawn(async move {
                    let outcome = match fetch_feed(&client, &task_url, &options).await {
                        Ok(feed) => FeedOutcome::Parsed {
                            url: task_url,
                            feed,
                        },
                        Err(e) => {
                            tracing::warn!(url = %task_url, error = %e, "Failed to fetch feed");
                            FeedOutcome::Failed(FeedFailure {
                                url: task_url,
                                error: e.to_string(),
                            })
                        }
                    };
                    // The receiver outlives every task, so this cannot fail
                    let _ = tx.send(outcome);
                });

                (url, handle)
            })
            .unzip();

        // Only task-held senders remain; the channel closes once they finish
        drop(tx);

        let mut report = AggregateReport::default();

        for (url, joined) in task_urls.into_iter().zip(join_all(handles).await) {
            if let Err(e) = joined {
                tracing::error!(url = %url, error = %e, "Feed task did not complete");
                report.failures.push(FeedFailure {
                    url,
                    error: e.to_string(),
                });
            }
        }

        let mut batches = Vec::new();
        while let Some(outcome) = rx.recv().await {
            match outcome {
                FeedOutcome::Parsed { url, feed } => {
                    for diagnostic in feed.diagnostics {
                        tracing::warn!(url = %url, "{}", diagnostic);
                        report.diagnostics.push(ItemDiagnostic {
                            url: url.clone(),
                            diagnostic,
                        });
                    }
                    batches.push(feed.posts);
                }
                FeedOutcome::Failed(failure) => report.failures.push(failure),
            }
        }

        report.posts = merge_newest_first(batches);

        tracing::debug!(
            feeds = urls.len(),
            failed = report.failures.len(),
            posts = report.posts.len(),
            "Aggregation complete"
        );

        report
    }
}

/// Concatenates batches and stably sorts the result by date, newest first.
pub fn merge_newest_first(batches: Vec<Vec<Post>>) -> Vec<Post> {
    let mut posts: Vec<Post> = batches.into_iter().flatten().collect();
    posts.sort_by(|a, b| b.date().cmp(&a.date()));
    posts
}
