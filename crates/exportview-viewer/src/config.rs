use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use url::Url;

const USAGE: &str = "usage: exportview <archive.zip> [channel] [query]";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_url: Url,
    pub debounce: Duration,
    pub archive: PathBuf,
    pub channel: Option<String>,
    pub query: Option<String>,
}

impl Config {
    /// Read `EXPORTVIEW_*` variables and the positional arguments.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_parts(std::env::args().skip(1), |key| std::env::var(key).ok())
    }

    fn from_parts(
        args: impl IntoIterator<Item = String>,
        var: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let server_url = var("EXPORTVIEW_SERVER_URL").unwrap_or_else(|| "http://127.0.0.1:5000".into());
        let server_url = Url::parse(&server_url)
            .with_context(|| format!("EXPORTVIEW_SERVER_URL is not a URL: {}", server_url))?;

        let debounce_ms: u64 = var("EXPORTVIEW_DEBOUNCE_MS")
            .unwrap_or_else(|| "300".into())
            .parse()
            .context("EXPORTVIEW_DEBOUNCE_MS must be a number of milliseconds")?;

        let mut args = args.into_iter();
        let Some(archive) = args.next() else {
            bail!(USAGE);
        };

        Ok(Self {
            server_url,
            debounce: Duration::from_millis(debounce_ms),
            archive: PathBuf::from(archive),
            channel: args.next(),
            query: args.next(),
        })
    }
}
