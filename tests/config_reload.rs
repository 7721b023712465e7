//! Hot reload of retry settings from the configuration file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use catalog_http::config::{load_config, ConfigWatcher};
use catalog_http::http::{CatalogClient, RequestOptions};
use common::{json_response, ScriptedTransport};

mod common;

const URL: &str = "http://catalog.test/ermrest/catalog/1/entity/isa:dataset";

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("catalog_http_{}_{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Save the way editors do: write a sibling file, then rename it into place.
fn save(path: &Path, contents: &str) {
    let staged = path.with_extension("toml.swp");
    std::fs::write(&staged, contents).unwrap();
    std::fs::rename(&staged, path).unwrap();
}

async fn wait_for_max_retries(client: &CatalogClient, expected: u32) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while client.retry_settings().max_retries != expected {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_file_edit_changes_later_calls() {
    let dir = scratch_dir("reload");
    let path = dir.join("client.toml");
    std::fs::write(&path, "[retry]\nmax_retries = 0\ninitial_delay_ms = 1\n").unwrap();

    let transport = ScriptedTransport::repeating(Ok(json_response(503)));
    let client = Arc::new(CatalogClient::new(transport.clone(), &load_config(&path).unwrap()));
    let _watcher = ConfigWatcher::spawn(&path, client.clone()).unwrap();

    assert!(client.get(URL, RequestOptions::new()).await.is_err());
    assert_eq!(transport.dispatch_count(), 1);

    save(&path, "[retry]\nmax_retries = 2\ninitial_delay_ms = 1\n");
    wait_for_max_retries(&client, 2).await;

    assert!(client.get(URL, RequestOptions::new()).await.is_err());
    assert_eq!(transport.dispatch_count(), 1 + 3);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_invalid_edit_keeps_settings() {
    let dir = scratch_dir("reload_invalid");
    let path = dir.join("client.toml");
    std::fs::write(&path, "[retry]\nmax_retries = 1\n").unwrap();

    let transport = ScriptedTransport::repeating(Ok(json_response(200)));
    let client = Arc::new(CatalogClient::new(transport, &load_config(&path).unwrap()));
    let _watcher = ConfigWatcher::spawn(&path, client.clone()).unwrap();

    save(&path, "[retry]\nmax_retries = 4\ninitial_delay_ms = 0\n");
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(client.retry_settings().max_retries, 1);

    // The watcher is still following the file after the rejected edit.
    save(&path, "[retry]\nmax_retries = 5\n");
    wait_for_max_retries(&client, 5).await;

    let _ = std::fs::remove_dir_all(&dir);
}
