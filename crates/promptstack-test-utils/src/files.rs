//! Temporary files for config and pool tests.

use std::path::PathBuf;

use promptstack_config::AppConfig;
use tempfile::TempDir;

/// A test-scoped directory. Everything in it is deleted on drop, even on panic.
pub struct TestFiles {
    dir: TempDir,
}

impl TestFiles {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    /// Write `content` to `name` inside the directory and return its path.
    pub async fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        tokio::fs::write(&path, content)
            .await
            .expect("failed to write test file");
        path
    }

    /// Write `toml_content` as `promptstack.toml` and load it.
    pub async fn load_config(&self, toml_content: &str) -> AppConfig {
        let path = self.write("promptstack.toml", toml_content).await;
        AppConfig::load(&path)
            .await
            .expect("failed to parse test config")
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

impl Default for TestFiles {
    fn default() -> Self {
        Self::new()
    }
}
