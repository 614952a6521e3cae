//! Update detection against the dataset API and the remote release descriptor.

use crate::download::build_client;
use crate::error::SyncError;
use crate::metadata::load_metadata;
use crate::release::{decode_descriptor, parse_version};
use crate::types::{SyncConfig, SyncMetadata, RELEASE_FILE};
use std::fmt;
use std::time::Duration;
use tracing::info;

/// Timeout for each request made while checking for updates.
const CHECK_TIMEOUT: Duration = Duration::from_secs(30);

/// Why an update was or was not requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateReason {
    Forced,
    FirstSync,
    ApiDateChanged,
    ReleaseVersionChanged,
    UpToDate,
}

impl fmt::Display for UpdateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            UpdateReason::Forced => "forced download enabled",
            UpdateReason::FirstSync => "first sync",
            UpdateReason::ApiDateChanged => "API modified date changed",
            UpdateReason::ReleaseVersionChanged => "release version changed",
            UpdateReason::UpToDate => "data is up to date",
        };
        f.write_str(text)
    }
}

/// Outcome of an update check. All fields are reported regardless of the decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDecision {
    pub has_update: bool,
    pub reason: UpdateReason,
    pub remote_version: String,
    pub local_version: String,
    pub remote_modified_date: String,
}

/// Decides whether a sync is needed.
///
/// Checked in order: force flag, no local version, API modified date
/// differs, release version differs.
pub fn decide(
    force_download: bool,
    remote_modified_date: &str,
    remote_version: &str,
    local: &SyncMetadata,
) -> UpdateDecision {
    let reason = if force_download {
        UpdateReason::Forced
    } else if local.release_version.is_empty() {
        UpdateReason::FirstSync
    } else if remote_modified_date != local.api_modified_date {
        UpdateReason::ApiDateChanged
    } else if remote_version != local.release_version {
        UpdateReason::ReleaseVersionChanged
    } else {
        UpdateReason::UpToDate
    };

    UpdateDecision {
        has_update: reason != UpdateReason::UpToDate,
        reason,
        remote_version: remote_version.to_string(),
        local_version: local.release_version.clone(),
        remote_modified_date: remote_modified_date.to_string(),
    }
}

/// Fetches `result.modifiedDate` from the dataset API; `""` when the field is absent.
pub async fn fetch_api_modified_date(
    client: &reqwest::Client,
    api_url: &str,
) -> Result<String, SyncError> {
    info!("Retrieving dataset info from {}", api_url);
    let response = client.get(api_url).send().await?.error_for_status()?;
    let body: serde_json::Value = response.json().await?;

    Ok(body
        .get("result")
        .and_then(|result| result.get("modifiedDate"))
        .and_then(|date| date.as_str())
        .unwrap_or_default()
        .to_string())
}

/// Fetches the remote release descriptor and parses its version line.
///
/// `client` must be the open-data client; the host's certificate does not
/// validate.
pub async fn fetch_remote_release_version(
    client: &reqwest::Client,
    base_url: &str,
) -> Result<String, SyncError> {
    let url = format!("{}/{}", base_url, RELEASE_FILE);
    info!("Retrieving release descriptor from {}", url);
    let response = client.get(&url).send().await?.error_for_status()?;
    let bytes = response.bytes().await?;
    Ok(parse_version(&decode_descriptor(&bytes)))
}

/// Runs the full update check for `config`.
///
/// Any remote failure is returned as an error; callers must treat that as
/// "no update".
pub async fn check_for_update(config: &SyncConfig) -> Result<UpdateDecision, SyncError> {
    let api_client = build_client(CHECK_TIMEOUT, false)?;
    let open_data_client = build_client(CHECK_TIMEOUT, true)?;

    let remote_modified_date = fetch_api_modified_date(&api_client, &config.api_url).await?;
    let remote_version = fetch_remote_release_version(&open_data_client, &config.base_url).await?;
    info!("Remote API modified date: {}", remote_modified_date);
    info!("Remote release version: {}", remote_version);

    let local = load_metadata(&config.metadata_path())?;
    info!("Local release version: {}", display_or_none(&local.release_version));
    info!("Local API modified date: {}", display_or_none(&local.api_modified_date));

    let decision = decide(
        config.force_download,
        &remote_modified_date,
        &remote_version,
        &local,
    );
    info!("Decision: {} (has_update={})", decision.reason, decision.has_update);
    Ok(decision)
}

fn display_or_none(value: &str) -> &str {
    if value.is_empty() {
        "(none)"
    } else {
        value
    }
}
