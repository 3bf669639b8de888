use reqwest::{Client, RequestBuilder, Url};

use crate::{AlertMessage, AlertTransport, BoxFuture, Result, http_endpoint};

/// Posts `{"title": ..., "body": ...}` to a webhook. `json://` uses HTTP, `jsons://` HTTPS.
pub struct JsonWebhook {
	client: Client,
	endpoint: Url,
	label: String,
}
impl JsonWebhook {
	pub fn from_url(client: Client, url: &Url) -> Result<Self> {
		let endpoint = http_endpoint(url, url.scheme() == "jsons")?;
		let label = format!("json:{}", endpoint.host_str().unwrap_or_default());

		Ok(Self { client, endpoint, label })
	}

	fn request(&self, message: &AlertMessage) -> RequestBuilder {
		let body = serde_json::json!({
			"title": message.title,
			"body": message.body,
		});

		self.client.post(self.endpoint.clone()).json(&body)
	}

	async fn publish(&self, message: &AlertMessage) -> Result<()> {
		self.request(message).send().await?.error_for_status()?;

		Ok(())
	}
}
impl AlertTransport for JsonWebhook {
	fn name(&self) -> &str {
		&self.label
	}

	fn send<'a>(&'a self, message: &'a AlertMessage) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.publish(message))
	}
}
