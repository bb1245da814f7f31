use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use reddit_client::{PollPolicy, RedditClient, RetryConfig, StreamHandle};
use redstream_core::{ClientConfig, ErrorReporter, Target, Thing};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "redstream=info,reddit_client=info";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Feed {
    Comments,
    Submissions,
    Replies,
    Mentions,
}

/// Follow new Reddit comments, submissions or inbox notifications.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file.
    #[arg(short, long, env = "REDSTREAM_CONFIG", default_value = "redstream.toml")]
    config: PathBuf,

    /// What to follow.
    #[arg(value_enum)]
    feed: Feed,

    /// Subreddit to follow (several may be given).
    #[arg(short = 'r', long = "subreddit", conflicts_with = "redditor")]
    subreddits: Vec<String>,

    /// Redditor to follow.
    #[arg(short = 'u', long)]
    redditor: Option<String>,

    /// Stop a stream after this many failed rounds in a row.
    #[arg(long)]
    max_failures: Option<u32>,

    /// Back off exponentially while rounds keep failing.
    #[arg(long)]
    backoff: bool,
}

impl Args {
    fn target(&self) -> Result<Target> {
        match (&self.redditor, self.subreddits.is_empty()) {
            (Some(name), _) => Ok(Target::redditor(name.as_str())),
            (None, false) => Ok(Target::subreddits(&self.subreddits)),
            (None, true) => bail!("a --subreddit or --redditor is required for this feed"),
        }
    }

    fn policy(&self) -> PollPolicy {
        let mut policy = PollPolicy::liveness();
        if self.backoff {
            policy = policy.with_backoff(RetryConfig::reddit());
        }
        if let Some(limit) = self.max_failures {
            policy = policy.with_max_consecutive_failures(limit);
        }
        policy
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();
    let config = ClientConfig::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?
        .with_env_overrides();

    let reporter = ErrorReporter::new();
    let client = match RedditClient::new(config) {
        Ok(client) => client.with_poll_policy(args.policy()),
        Err(e) => {
            reporter.report_error(&e);
            return Err(e.into());
        }
    };

    tracing::info!("Starting redstream");

    match args.feed {
        Feed::Comments => {
            let handle = client.stream_comments(&args.target()?).await?;
            follow(handle, |c| format!("u/{} in r/{}: {}", c.author, c.subreddit, c.body)).await;
        }
        Feed::Submissions => {
            let handle = client.stream_submissions(&args.target()?).await?;
            follow(handle, |s| format!("{} by u/{}", s.title, s.author)).await;
        }
        Feed::Replies => {
            let handle = client.stream_comment_replies();
            follow(handle, |m| format!("reply from u/{}: {}", m.data.author, m.data.body)).await;
        }
        Feed::Mentions => {
            let handle = client.stream_mentions();
            follow(handle, |m| format!("mention by u/{}: {}", m.data.author, m.data.body)).await;
        }
    }

    client.shutdown();
    tracing::info!("Stopped");
    Ok(())
}

/// Logs every item until Ctrl-C or until the stream ends on its own.
async fn follow<T, F>(mut handle: StreamHandle<T>, describe: F)
where
    T: Thing,
    F: Fn(&T) -> String,
{
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping {}", handle.label());
                break;
            }
            item = handle.recv() => match item {
                Some(item) => tracing::info!("[{}] {}", item.fullname(), describe(&item)),
                None => {
                    let stats = handle.stats();
                    tracing::warn!(
                        "Stream {} ended after {} rounds (last error: {})",
                        handle.label(),
                        stats.rounds,
                        stats.last_error.as_deref().unwrap_or("none")
                    );
                    break;
                }
            },
        }
    }

    handle.shutdown().await;
}
