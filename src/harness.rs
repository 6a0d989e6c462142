// src/harness.rs
// Mock controller + temporary client config + SDK client, wired together for a test

use crate::client::Client;
use crate::error::Result;
use crate::server::TestServer;
use crate::settings::Settings;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Username written into the temporary client config
pub const TEST_USERNAME: &str = "t";

/// Token written into the temporary client config
pub const TEST_TOKEN: &str = "a";

/// Directory (under the temp dir) holding the client config
pub const CONFIG_DIR: &str = ".deis";

/// Client config file name
pub const CONFIG_FILE: &str = "client.json";

/// Everything a controller test needs: a config file, a mock server and a client.
///
/// The temp directory holding the config file lives as long as the harness.
/// Call [`TestHarness::close`] to release the server and delete the directory
/// and see any cleanup error; dropping the harness does the same silently.
pub struct TestHarness {
    pub config_path: PathBuf,
    pub server: TestServer,
    pub client: Client,
    dir: Option<TempDir>,
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("client").tempdir()?;
        let server = TestServer::start().await?;

        let config_path = dir.path().join(CONFIG_DIR).join(CONFIG_FILE);
        let mut settings = Settings::new(server.url(), TEST_TOKEN);
        settings.username = TEST_USERNAME.to_string();
        settings.ssl_verify = false;
        settings.save(&config_path)?;

        let client = Settings::load(&config_path)?.client()?;
        debug!(config = %config_path.display(), url = %server.url(), "Test harness ready");

        Ok(Self {
            config_path,
            server,
            client,
            dir: Some(dir),
        })
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Stop the mock server and delete the temporary config directory
    pub async fn close(mut self) -> Result<()> {
        self.server.shutdown().await;
        if let Some(dir) = self.dir.take() {
            dir.close()?;
        }
        Ok(())
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.server.close();
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                warn!(error = %e, "Failed to remove test harness config directory");
            }
        }
    }
}

/// Create a temporary client config, a mock controller and a client pointed at it
pub async fn new_test_server_and_client() -> Result<TestHarness> {
    TestHarness::new().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_harness_writes_config() {
        let harness = TestHarness::new().await.unwrap();

        assert!(harness.config_path().exists());
        let settings = Settings::load(harness.config_path()).unwrap();
        assert_eq!(settings.controller, harness.server.url());
        assert_eq!(settings.token, TEST_TOKEN);
        assert_eq!(settings.username, TEST_USERNAME);
        assert!(!settings.ssl_verify);

        assert_eq!(
            harness.client.controller_url().as_str().trim_end_matches('/'),
            harness.server.url()
        );
    }

    #[tokio::test]
    async fn test_close_removes_config() {
        let harness = TestHarness::new().await.unwrap();
        let path = harness.config_path.clone();
        harness.close().await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_drop_removes_config() {
        let path = {
            let harness = TestHarness::new().await.unwrap();
            harness.config_path.clone()
        };
        assert!(!path.exists());
    }
}
