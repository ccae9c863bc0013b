use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Existence check for a single image URL. `Ok(())` means reachable.
#[async_trait]
pub trait ImageProbe: Send + Sync {
    async fn probe(&self, url: &str) -> Result<()>;
}

/// `HEAD` request probe; only 2xx responses (after redirects) count.
#[derive(Clone)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("brick-sync/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("failed to build image probe client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageProbe for HttpProbe {
    async fn probe(&self, url: &str) -> Result<()> {
        let parsed = parse_http_url(url)?;
        let resp = self
            .client
            .head(parsed)
            .send()
            .await
            .with_context(|| format!("HEAD {url} failed"))?;
        let status = resp.status();
        if !status.is_success() {
            bail!("HEAD {url} returned {status}");
        }
        Ok(())
    }
}

fn parse_http_url(raw: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(raw).with_context(|| format!("invalid image url {raw:?}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => bail!("unsupported scheme {other:?} for image url {raw:?}"),
    }
}
