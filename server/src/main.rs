use anyhow::Result;
use axum::Router;
use clap::Parser;
use reelmatch_core::ResolverConfig;
use server::build_app;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Model artifact written by reelmatch-indexer
    #[arg(long, default_value = "./model.bin")]
    artifact: PathBuf,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Minimum fuzzy score for a title match
    #[arg(long, default_value_t = 0.6)]
    threshold: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let resolver = ResolverConfig { threshold: args.threshold, ..ResolverConfig::default() };
    let app: Router = build_app(args.artifact.clone(), resolver)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, artifact = %args.artifact.display(), "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
