//! Outcome alerts for archive jobs.

pub mod ntfy;
pub mod webhook;

mod error;

pub use error::{Error, Result};

use std::{future::Future, pin::Pin, time::Duration};

use reqwest::{Client, Url};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Terminal result of an archive job, as far as alerting is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	Archived,
	Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
	pub title: String,
	pub body: String,
}
impl AlertMessage {
	pub fn for_outcome(outcome: Outcome, url: &str) -> Self {
		let title = match outcome {
			Outcome::Archived => "Archived",
			Outcome::Failed => "Failed",
		};

		Self { title: title.to_string(), body: url.to_string() }
	}
}

pub trait AlertTransport
where
	Self: Send + Sync,
{
	/// Short label used in logs. Must not contain credentials.
	fn name(&self) -> &str;

	fn send<'a>(&'a self, message: &'a AlertMessage) -> BoxFuture<'a, Result<()>>;
}

/// Fans an outcome out to every configured transport. With no transports it does nothing.
#[derive(Default)]
pub struct AlertSink {
	transports: Vec<Box<dyn AlertTransport>>,
}
impl AlertSink {
	pub fn new(transports: Vec<Box<dyn AlertTransport>>) -> Self {
		Self { transports }
	}

	/// Builds one transport per URI, sharing a single HTTP client.
	pub fn from_urls(urls: &[String]) -> Result<Self> {
		if urls.is_empty() {
			return Ok(Self::default());
		}

		let client = Client::builder().timeout(SEND_TIMEOUT).build()?;
		let mut transports: Vec<Box<dyn AlertTransport>> = Vec::with_capacity(urls.len());

		for raw in urls {
			let url = Url::parse(raw).map_err(|err| Error::InvalidUrl {
				url: redact(raw),
				message: err.to_string(),
			})?;

			match url.scheme() {
				"ntfy" | "ntfys" =>
					transports.push(Box::new(ntfy::NtfyTransport::from_url(client.clone(), &url)?)),
				"json" | "jsons" => transports
					.push(Box::new(webhook::JsonWebhook::from_url(client.clone(), &url)?)),
				scheme => return Err(Error::UnsupportedScheme { scheme: scheme.to_string() }),
			}
		}

		Ok(Self { transports })
	}

	pub fn is_enabled(&self) -> bool {
		!self.transports.is_empty()
	}

	pub fn len(&self) -> usize {
		self.transports.len()
	}

	pub fn is_empty(&self) -> bool {
		self.transports.is_empty()
	}

	/// Sends one message per transport: "Archived" or "Failed" with the URL as body.
	///
	/// Every transport is attempted even when an earlier one fails; failures are returned
	/// together so the caller decides what to do with them.
	pub async fn notify(&self, outcome: Outcome, url: &str) -> Result<()> {
		if self.transports.is_empty() {
			return Ok(());
		}

		let message = AlertMessage::for_outcome(outcome, url);
		let mut failures = Vec::new();

		for transport in &self.transports {
			match transport.send(&message).await {
				Ok(()) => tracing::debug!(
					transport = transport.name(),
					title = %message.title,
					"Alert sent."
				),
				Err(err) => failures.push(format!("{}: {err}", transport.name())),
			}
		}

		if failures.is_empty() { Ok(()) } else { Err(Error::Delivery { failures }) }
	}
}

/// Turns an alert URI into the HTTP(S) endpoint it designates.
pub(crate) fn http_endpoint(url: &Url, secure: bool) -> Result<Url> {
	let host = url.host_str().filter(|host| !host.is_empty()).ok_or_else(|| Error::InvalidUrl {
		url: redact(url.as_str()),
		message: "missing host".to_string(),
	})?;
	let scheme = if secure { "https" } else { "http" };
	let mut raw = format!("{scheme}://{host}");

	if let Some(port) = url.port() {
		raw.push_str(&format!(":{port}"));
	}

	raw.push_str(url.path());

	if let Some(query) = url.query() {
		raw.push('?');
		raw.push_str(query);
	}

	Url::parse(&raw)
		.map_err(|err| Error::InvalidUrl { url: redact(url.as_str()), message: err.to_string() })
}

/// Drops userinfo so credentials never reach logs or error messages.
pub(crate) fn redact(raw: &str) -> String {
	let Some((scheme, rest)) = raw.split_once("://") else {
		return raw.to_string();
	};
	let authority_end = rest.find('/').unwrap_or(rest.len());

	match rest[..authority_end].rfind('@') {
		Some(at) => format!("{scheme}://***@{}", &rest[at + 1..]),
		None => raw.to_string(),
	}
}
