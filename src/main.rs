//! Mints an identity token for a service account and calls an endpoint with it.

// std
use std::{
	io::{self, Write},
	path::PathBuf,
	process::ExitCode,
};
// crates.io
use clap::{ArgAction, Parser};
use color_eyre::Result;
use tracing_subscriber::EnvFilter;
// self
use federated_id_token::{
	auth::ServiceAccountName, config::CallerConfig, flows::Caller, url::Url,
};

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
	/// Endpoint to call with the identity token.
	#[arg(long, env = "FEDERATED_ID_TOKEN_URL")]
	url: Url,
	/// Token audience; defaults to the origin of `--url`.
	#[arg(long, env = "FEDERATED_ID_TOKEN_AUDIENCE")]
	audience: Option<String>,
	/// Service account to mint the token for (email or full resource name).
	#[arg(long, env = "FEDERATED_ID_TOKEN_SERVICE_ACCOUNT")]
	service_account: ServiceAccountName,
	/// Delegate in the impersonation chain; repeat for longer chains.
	#[arg(long = "delegate")]
	delegates: Vec<ServiceAccountName>,
	/// Ask for the `email` claim.
	#[arg(long, default_value_t = true, action = ArgAction::Set)]
	include_email: bool,
	/// Credential file to use instead of Application Default Credentials discovery.
	#[arg(long)]
	credentials: Option<PathBuf>,
	/// IAM Credentials API base URL.
	#[arg(long)]
	iam_endpoint: Option<Url>,
	/// Print the raw identity token to stderr.
	#[arg(long)]
	print_token: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
	color_eyre::install()?;
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.with_writer(io::stderr)
		.init();

	let cli = Cli::parse();
	let mut builder = CallerConfig::builder(cli.url, cli.service_account)
		.delegates(cli.delegates)
		.include_email(cli.include_email);

	if let Some(audience) = cli.audience {
		builder = builder.audience(audience);
	}
	if let Some(iam_endpoint) = cli.iam_endpoint {
		builder = builder.iam_endpoint(iam_endpoint);
	}
	if let Some(credentials) = cli.credentials {
		builder = builder.credentials(credentials);
	}

	let caller = Caller::new(builder.build()?)?;
	let outcome = caller.run().await?;
	let id_token = &outcome.id_token;

	tracing::info!(
		fingerprint = %id_token.secret.fingerprint(),
		expires_at = ?id_token.expires_at(),
		email = ?id_token.claims.as_ref().and_then(|claims| claims.email.as_deref()),
		"identity token minted"
	);

	if cli.print_token {
		eprintln!("{}", id_token.secret.expose());
	}

	let response = &outcome.response;

	io::stdout().write_all(&response.body)?;

	if response.is_success() {
		tracing::info!(status = response.status.as_u16(), "target responded");

		Ok(ExitCode::SUCCESS)
	} else {
		tracing::error!(status = response.status.as_u16(), "target returned a non-success status");

		Ok(ExitCode::FAILURE)
	}
}
