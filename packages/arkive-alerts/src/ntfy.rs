use reqwest::{Client, RequestBuilder, Url};

use crate::{AlertMessage, AlertTransport, BoxFuture, Error, Result, http_endpoint, redact};

/// Publishes to an ntfy topic. `ntfy://host/topic` uses HTTP, `ntfys://host/topic` HTTPS.
/// Userinfo, when present, is sent as basic auth.
pub struct NtfyTransport {
	client: Client,
	endpoint: Url,
	credentials: Option<(String, Option<String>)>,
	label: String,
}
impl NtfyTransport {
	pub fn from_url(client: Client, url: &Url) -> Result<Self> {
		if url.path().trim_matches('/').is_empty() {
			return Err(Error::InvalidUrl {
				url: redact(url.as_str()),
				message: "missing ntfy topic".to_string(),
			});
		}

		let endpoint = http_endpoint(url, url.scheme() == "ntfys")?;
		let credentials = (!url.username().is_empty())
			.then(|| (url.username().to_string(), url.password().map(str::to_string)));
		let label = format!("ntfy:{}", endpoint.as_str());

		Ok(Self { client, endpoint, credentials, label })
	}

	fn request(&self, message: &AlertMessage) -> RequestBuilder {
		let mut request = self
			.client
			.post(self.endpoint.clone())
			.header("Title", message.title.as_str())
			.body(message.body.clone());

		if let Some((user, password)) = &self.credentials {
			request = request.basic_auth(user, password.as_deref());
		}

		request
	}

	async fn publish(&self, message: &AlertMessage) -> Result<()> {
		self.request(message).send().await?.error_for_status()?;

		Ok(())
	}
}
impl AlertTransport for NtfyTransport {
	fn name(&self) -> &str {
		&self.label
	}

	fn send<'a>(&'a self, message: &'a AlertMessage) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.publish(message))
	}
}
