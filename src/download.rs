use reqwest::blocking::{Client, Response};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::github::Asset;
use crate::ownership::OwnershipHook;

/// What one successful asset download produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub path: PathBuf,
    pub bytes: u64,
    pub declared: Option<u64>,
}

/// GET `url`, mapping statuses of 300 and above to [`Error::HttpStatus`].
pub fn get_ok(client: &Client, url: &str) -> Result<Response> {
    let resp = client.get(url).send()?;
    let status = resp.status();
    if status.as_u16() >= 300 {
        return Err(Error::HttpStatus {
            url: url.to_string(),
            status,
        });
    }
    Ok(resp)
}

/// Stream `reader` into `writer` and check the total against `declared`.
///
/// A missing declaration counts as a mismatch: without it a truncated body
/// cannot be told apart from a complete one.
pub fn copy_verified<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    declared: Option<u64>,
) -> Result<u64> {
    let read = io::copy(reader, writer)?;
    writer.flush()?;
    if declared != Some(read) {
        return Err(Error::LengthMismatch {
            expected: declared,
            actual: read,
        });
    }
    Ok(read)
}

/// Download one asset into `dir/<asset name>`.
///
/// Creates `dir` if needed and truncates an existing file. On success the
/// ownership hook runs on the written file; its failure is only logged.
pub fn download_asset(
    client: &Client,
    asset: &Asset,
    dir: &Path,
    hook: &dyn OwnershipHook,
) -> Result<DownloadOutcome> {
    fs::create_dir_all(dir)?;
    let dest = dir.join(&asset.name);

    log::debug!("downloading {} to {}", asset.name, dest.display());
    let mut resp = get_ok(client, &asset.browser_download_url).inspect_err(|e| {
        log::error!("failed to download {}: {}", asset.name, e);
    })?;
    let declared = resp.content_length();

    let mut out = fs::File::create(&dest)?;
    let bytes = copy_verified(&mut resp, &mut out, declared).inspect_err(|e| {
        log::error!("failed to download to {}: {}", dest.display(), e);
    })?;
    drop(out);

    if let Err(e) = hook.fix(&dest) {
        log::warn!("failed to fix ownership of {}: {}", dest.display(), e);
    }

    Ok(DownloadOutcome {
        path: dest,
        bytes,
        declared,
    })
}

/// Download every asset in order. The first failure aborts the rest.
pub fn download_all(
    client: &Client,
    assets: &[&Asset],
    dir: &Path,
    hook: &dyn OwnershipHook,
) -> Result<Vec<DownloadOutcome>> {
    assets
        .iter()
        .map(|a| download_asset(client, a, dir, hook))
        .collect()
}
