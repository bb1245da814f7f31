use reddit_client::RedditClient;
use redstream_core::{ClientConfig, Target};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    println!("=== Reddit Submission Stream ===\n");

    let subreddit = std::env::args().nth(1).unwrap_or_else(|| "rust".to_string());

    // Token and user agent come from REDDIT_ACCESS_TOKEN / REDDIT_USER_AGENT
    let config = ClientConfig::new("redstream-example/0.1", "").with_env_overrides();
    if config.access_token.is_empty() {
        println!("❌ Set REDDIT_ACCESS_TOKEN to a valid OAuth bearer token first.");
        return Ok(());
    }

    let client = RedditClient::new(config)?;
    let mut submissions = client
        .stream_submissions(&Target::subreddit(subreddit.clone()))
        .await?;
    println!("✅ Streaming new submissions from r/{} (Ctrl-C to stop)\n", subreddit);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            submission = submissions.recv() => match submission {
                Some(submission) => println!("📝 {} by u/{}: {}", submission.name, submission.author, submission.title),
                None => break,
            },
        }
    }

    println!("\n📊 Stream stats: {:?}", submissions.stats());
    submissions.shutdown().await;
    Ok(())
}
