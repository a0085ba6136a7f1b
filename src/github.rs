use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use std::env;

use crate::buildinfo::user_agent;
use crate::config::Settings;
use crate::error::{Error, Result};

/// One published release, as returned by the GitHub releases API.
///
/// Fields not listed here are ignored when decoding.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub name: String,
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: String,
}

/// Build the HTTP client shared by the fetcher, the downloader and the self-updater.
///
/// Sends the installer's `User-Agent` on every request and, when `GITHUB_TOKEN`
/// is set, a bearer token so API rate limits do not bite.
pub fn gh_client(settings: &Settings) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/vnd.github+json"),
    );
    if let Ok(tok) = env::var("GITHUB_TOKEN")
        && let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", tok))
    {
        headers.insert("Authorization", value);
    }
    let client = Client::builder()
        .default_headers(headers)
        .user_agent(user_agent())
        .connect_timeout(settings.connect_timeout())
        .timeout(settings.timeout())
        .build()?;
    Ok(client)
}

/// Fetch and decode the release at `url`.
///
/// # Errors
/// - [`Error::Network`] if the request could not be sent or the body could not be read.
/// - [`Error::HttpStatus`] for any status of 300 or above; the body is discarded.
/// - [`Error::Decode`] if the body is not a release object.
pub fn fetch_release(client: &Client, url: &str) -> Result<Release> {
    log::debug!("fetching {}", url);

    let resp = client.get(url).send().inspect_err(|e| {
        log::error!("failed to send request to {}: {}", url, e);
    })?;

    let status = resp.status();
    if status.as_u16() >= 300 {
        log::error!("{} returned non-OK status {}", url, status);
        return Err(Error::HttpStatus {
            url: url.to_string(),
            status,
        });
    }

    let body = resp.bytes()?;
    let release: Release = serde_json::from_slice(&body).inspect_err(|e| {
        log::error!("failed to decode GitHub response: {}", e);
    })?;
    Ok(release)
}
