//! Mint short-lived Google identity tokens from ambient credentials and call audience-bound
//! endpoints with them.
//!
//! The crate walks one linear flow: discover Application Default Credentials, trade them for an
//! access token, ask the IAM Credentials API for an identity token scoped to an audience, and
//! present that token as a bearer credential on a single HTTP call.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod config;
pub mod credential;
#[cfg(feature = "server")] pub mod dump;
pub mod error;
pub mod flows;
pub mod http;
pub mod iam;
pub mod invoke;
pub mod oauth;
pub mod obs;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// crates.io
	use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
	// self
	use crate::{
		config::CallerConfig,
		credential::CredentialLocator,
		flows::Caller,
		http::{ReqwestHttpClient, Transport},
		oauth::ReqwestTransportErrorMapper,
	};

	/// Caller type alias used by reqwest-backed integration tests.
	pub type ReqwestTestCaller = Caller<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Wraps [`test_reqwest_http_client`] in a [`Transport`] with the default error mapper.
	pub fn build_reqwest_test_transport() -> Transport<ReqwestHttpClient, ReqwestTransportErrorMapper>
	{
		Transport::new(test_reqwest_http_client(), ReqwestTransportErrorMapper)
	}

	/// Constructs a [`Caller`] for `config` backed by the insecure test transport.
	///
	/// Discovery only considers `config.credentials`, so the host environment cannot leak in.
	pub fn build_reqwest_test_caller(config: CallerConfig) -> ReqwestTestCaller {
		let locator = CredentialLocator {
			explicit: config.credentials.clone(),
			environment: None,
			well_known: None,
		};

		Caller::with_transport(config, build_reqwest_test_transport()).with_locator(locator)
	}

	/// Writes `contents` to a per-process temporary file named after `name`.
	pub fn write_temp_file(name: &str, contents: &str) -> PathBuf {
		let path = std::env::temp_dir()
			.join(format!("federated-id-token-{}-{name}", std::process::id()));

		std::fs::write(&path, contents).expect("Failed to write temporary test file.");

		path
	}

	/// Builds an unsigned compact JWT carrying `claims`.
	pub fn unsigned_jwt(claims: &serde_json::Value) -> String {
		format!(
			"{}.{}.c2lnbmF0dXJl",
			URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#),
			URL_SAFE_NO_PAD.encode(claims.to_string())
		)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		path::{Path, PathBuf},
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(any(feature = "cli", feature = "server"))]
use {clap as _, color_eyre as _, tracing_subscriber as _};
#[cfg(any(test, feature = "cli", feature = "server"))] use tokio as _;
#[cfg(test)] use {color_eyre as _, federated_id_token as _, httpmock as _};
