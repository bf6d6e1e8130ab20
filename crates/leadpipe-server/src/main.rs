use anyhow::{Context, Result};
use clap::Parser;
use leadpipe_local::{BatchConfig, GeminiFactory, GoogleSearchBackend, SlidingWindowLimiter};
use leadpipe_server::{build_router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "leadpipe-server")]
#[command(about = "Lead-generation API (search -> parse -> AI extract)", long_about = None)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "LEADPIPE_BIND", default_value = "0.0.0.0:3000")]
    bind: SocketAddr,
    /// Snippets per AI extraction call.
    #[arg(long, env = "LEADPIPE_BATCH_SIZE", default_value_t = leadpipe_local::DEFAULT_BATCH_SIZE)]
    batch_size: usize,
    /// Pause between AI extraction calls, in milliseconds. Tune to the AI
    /// service's quota; there is no adaptive backoff.
    #[arg(long, env = "LEADPIPE_BATCH_DELAY_MS", default_value_t = 200)]
    batch_delay_ms: u64,
    /// Gemini model used for extraction.
    #[arg(long, env = "LEADPIPE_GEMINI_MODEL", default_value = leadpipe_local::gemini::DEFAULT_MODEL)]
    gemini_model: String,
    /// Rate-limit window length, in seconds.
    #[arg(long, env = "LEADPIPE_RATE_WINDOW_S", default_value_t = 60)]
    rate_window_s: u64,
    /// Requests allowed per client per window.
    #[arg(long, env = "LEADPIPE_RATE_CAPACITY", default_value_t = 10)]
    rate_capacity: u32,
    /// Echo-IP service used by the health endpoint.
    #[arg(long, env = "LEADPIPE_ECHO_IP_URL", default_value = "http://httpbin.org/ip")]
    echo_ip_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,leadpipe_local=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let rate_window = Duration::from_secs(cli.rate_window_s);

    let http = reqwest::Client::builder()
        .build()
        .context("failed to build HTTP client")?;
    let search = GoogleSearchBackend::new().context("failed to build search backend")?;
    let limiter = Arc::new(SlidingWindowLimiter::new(rate_window, cli.rate_capacity));

    let state = AppState {
        limiter: limiter.clone(),
        search: Arc::new(search),
        models: Arc::new(GeminiFactory::new(http.clone(), cli.gemini_model.clone())),
        batch: BatchConfig {
            batch_size: cli.batch_size.max(1),
            batch_delay: Duration::from_millis(cli.batch_delay_ms),
        },
        http,
        echo_ip_url: cli.echo_ip_url.clone(),
    };

    // Background sweep so the per-client window map does not grow forever.
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(rate_window);
        tick.tick().await; // first tick fires immediately; skip it
        loop {
            tick.tick().await;
            let removed = limiter.purge_expired();
            if removed > 0 {
                tracing::debug!(removed, "purged expired rate-limit windows");
            }
        }
    });

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("failed to bind {}", cli.bind))?;
    tracing::info!(addr = %cli.bind, model = %cli.gemini_model, "leadpipe-server listening");
    axum::serve(listener, app).await.context("server exited")?;
    Ok(())
}
