//! CLI helper functions

use crate::{
    client::{Auth, ElasticClient},
    elastic::{ElasticRepository, IndexExtractor, RetryPolicy},
    etl::Pipeline,
    storage::{CursorSerde, ExportManifest, NdjsonWriter, OffsetStore},
    transform::FieldSelector,
};
use eyre::{Context, Result, bail};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Export manifest filename inside a project directory
pub const MANIFEST_FILE: &str = "export.yml";
/// Persisted offset filename inside a project directory
pub const OFFSET_FILE: &str = "offset.json";
/// NDJSON output filename inside a project directory
pub const OUTPUT_FILE: &str = "export.ndjson";

/// Load Elasticsearch client from environment variables
///
/// Expected environment variables:
/// - ELASTICSEARCH_URL: Elasticsearch base URL (required)
/// - ELASTICSEARCH_USERNAME: Username for basic auth (optional)
/// - ELASTICSEARCH_PASSWORD: Password for basic auth (optional)
/// - ELASTICSEARCH_APIKEY: API key for auth (optional, takes precedence over username/password)
pub fn load_elastic_client() -> Result<ElasticClient> {
    let url_str = std::env::var("ELASTICSEARCH_URL")
        .context("ELASTICSEARCH_URL environment variable not set")?;
    let url = Url::parse(&url_str)
        .with_context(|| format!("Invalid ELASTICSEARCH_URL: {}", url_str))?;

    let auth = auth_from_env();
    log::info!("Using {} authentication", auth);

    ElasticClient::try_new(url, auth).context("Failed to create Elasticsearch client")
}

/// Pick the auth method from the environment, API key first
fn auth_from_env() -> Auth {
    if let Ok(apikey) = std::env::var("ELASTICSEARCH_APIKEY") {
        Auth::Apikey(apikey)
    } else if let (Ok(username), Ok(password)) = (
        std::env::var("ELASTICSEARCH_USERNAME"),
        std::env::var("ELASTICSEARCH_PASSWORD"),
    ) {
        Auth::Basic(username, password)
    } else {
        Auth::None
    }
}

/// Test connectivity and credentials against the configured cluster
///
/// Prints the cluster name and version; warns when the version predates the
/// point in time API the export engine depends on.
pub async fn check_auth() -> Result<()> {
    let client = load_elastic_client()?;
    log::info!("Connecting to {}", client);

    let info = client
        .info()
        .await
        .context("Failed to reach Elasticsearch")?;
    log::info!(
        "✓ Connected to cluster '{}' ({})",
        info.cluster_name,
        info.version.number
    );

    if !info.supports_point_in_time() {
        log::warn!(
            "Elasticsearch {} predates the point in time API (7.10.0); exports will not run",
            info.version.number
        );
    }

    Ok(())
}

/// List index names matching a prefix, one per line
pub async fn list_indices(prefix: &str) -> Result<usize> {
    let client = load_elastic_client()?;

    let indices = client
        .cat_indices(prefix)
        .await
        .context("Failed to list indices")?;

    for name in &indices {
        println!("{}", name);
    }
    match indices.is_empty() {
        true => log::info!("No indices match '{}'", prefix),
        false => log::info!("✓ {} index(es)", indices.len()),
    }

    Ok(indices.len())
}

/// Force a refresh of an index so recent writes become searchable
pub async fn refresh_index(index: &str) -> Result<()> {
    let client = load_elastic_client()?;

    client
        .refresh(index)
        .await
        .with_context(|| format!("Failed to refresh '{}'", index))?;
    log::info!("✓ Refreshed '{}'", index);

    Ok(())
}

/// Run the export described by `<project_dir>/export.yml`
///
/// Documents land in `export.ndjson`; the resume position is committed to
/// `offset.json` after every page. A fresh export truncates the output file
/// so it stays in step with the offset; a resumed export appends.
///
/// With `poll_seconds` set, the stream is re-armed and polled again after
/// each drained pass instead of stopping at the first empty page.
pub async fn run_export(project_dir: impl AsRef<Path>, poll_seconds: Option<u64>) -> Result<u64> {
    let project_dir = project_dir.as_ref();
    let manifest_path = project_dir.join(MANIFEST_FILE);

    log::info!("Loading manifest from {}", manifest_path.display());
    let mut manifest = ExportManifest::read(&manifest_path)?;
    manifest.validate()?;
    log::info!(
        "Manifest loaded: '{}' with {} cursor field(s)",
        manifest.index,
        manifest.cursor_fields.len()
    );

    log::info!("Connecting to Elasticsearch...");
    let client = load_elastic_client()?;
    let info = client
        .info()
        .await
        .context("Failed to reach Elasticsearch")?;
    if !info.supports_point_in_time() {
        bail!(
            "Elasticsearch {} predates the point in time API (7.10.0)",
            info.version.number
        );
    }
    if manifest.elasticsearch_version() != Some(info.version.number.as_str()) {
        manifest.set_elasticsearch_version(info.version.number.as_str());
        manifest.write(&manifest_path)?;
        log::debug!(
            "Recorded cluster version {} in manifest",
            info.version.number
        );
    }

    let offsets = OffsetStore::new(project_dir.join(OFFSET_FILE));
    let writer = NdjsonWriter::new(project_dir.join(OUTPUT_FILE));

    let cursor = match offsets.read()? {
        Some(cursor) => {
            if cursor.index != manifest.index {
                bail!(
                    "Offset file tracks index '{}' but the manifest wants '{}'; delete {} to start over",
                    cursor.index,
                    manifest.index,
                    offsets.path().display()
                );
            }
            log::info!("Resuming from persisted offset: {}", cursor);
            cursor
        }
        None => {
            log::info!("No offset found, starting a fresh export");
            writer.truncate()?;
            manifest.cursor()
        }
    };

    let retry = RetryPolicy::try_new(
        manifest.max_attempts,
        Duration::from_millis(manifest.retry_backoff_millis),
    )?;
    let repository = ElasticRepository::new(
        client,
        manifest.page_size,
        manifest.pit_keep_alive_seconds,
        retry,
    );
    let selector = match manifest.fields.clone() {
        Some(fields) => FieldSelector::keep(fields),
        None => FieldSelector::passthrough(),
    };
    let mut pipeline = Pipeline::new(IndexExtractor::new(repository, cursor), selector, writer);

    let mut total: u64 = 0;
    loop {
        let count = pipeline
            .run_with(|extractor| offsets.write(extractor.cursor()))
            .await?;
        total += count as u64;

        let position = pipeline.extractor().cursor();
        log::info!(
            "✓ Exported {} document(s) this pass ({} total for '{}')",
            count,
            position.running_document_count,
            position.index
        );

        match poll_seconds {
            Some(seconds) => {
                log::debug!("Polling again in {}s", seconds);
                tokio::time::sleep(Duration::from_secs(seconds)).await;
                pipeline.extractor_mut().rearm();
            }
            None => break,
        }
    }

    // Release the search session and persist a session-free offset.
    let parked = pipeline.extractor_mut().close().await;
    offsets.write(&parked)?;
    log::info!(
        "✓ Export complete: {} document(s) in {}",
        parked.running_document_count,
        project_dir.join(OUTPUT_FILE).display()
    );

    Ok(total)
}

/// Print the persisted offset of a project directory
pub fn show_offset(project_dir: impl AsRef<Path>) -> Result<()> {
    let offsets = OffsetStore::new(project_dir.as_ref().join(OFFSET_FILE));

    match offsets.read()? {
        Some(cursor) => {
            log::info!("Offset: {}", cursor);
            println!("{}", CursorSerde::serialize(&cursor)?);
        }
        None => log::info!("No offset persisted at {}", offsets.path().display()),
    }

    Ok(())
}

/// Delete the persisted offset so the next export starts from the manifest
pub fn reset_offset(project_dir: impl AsRef<Path>) -> Result<()> {
    let offsets = OffsetStore::new(project_dir.as_ref().join(OFFSET_FILE));

    match offsets.delete()? {
        true => log::info!("✓ Deleted offset {}", offsets.path().display()),
        false => log::info!("No offset to delete at {}", offsets.path().display()),
    }

    Ok(())
}
