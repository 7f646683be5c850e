//! Echoes incoming requests so callers can inspect the headers they send.

// std
use std::{io, net::SocketAddr};
// crates.io
use clap::Parser;
use color_eyre::Result;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
// self
use federated_id_token::dump;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
	/// Address to listen on.
	#[arg(long, env = "REQUEST_DUMP_LISTEN", default_value = "0.0.0.0:8080")]
	listen: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.with_writer(io::stderr)
		.init();

	let cli = Cli::parse();
	let listener = TcpListener::bind(cli.listen).await?;

	tracing::info!(addr = %listener.local_addr()?, "starting server");

	dump::serve(listener).await?;

	Ok(())
}
