use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};

use super::CredentialStore;
use crate::runtime::Runtime;

/// Keeps one file per key under a directory, `<config_dir>/repguard` by default.
pub struct FileStore<R: Runtime> {
    runtime: R,
    dir: PathBuf,
}

impl<R: Runtime> FileStore<R> {
    pub fn new(runtime: R, dir: PathBuf) -> Self {
        Self { runtime, dir }
    }

    /// Uses the platform config directory.
    pub fn in_config_dir(runtime: R) -> Result<Self> {
        let dir = runtime
            .config_dir()
            .context("Could not determine the user config directory")?
            .join("repguard");
        Ok(Self::new(runtime, dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl<R: Runtime> CredentialStore for FileStore<R> {
    #[tracing::instrument(skip(self))]
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !self.runtime.exists(&path) {
            return Ok(None);
        }
        let value = self.runtime.read_to_string(&path)?;
        Ok(Some(value))
    }

    #[tracing::instrument(skip(self, value))]
    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.runtime.create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        self.runtime.write_private(&path, value.as_bytes())?;
        debug!("Stored {} in {}", key, path.display());
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if self.runtime.exists(&path) {
            self.runtime.remove_file(&path)?;
            debug!("Removed {}", path.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, RealRuntime};
    use crate::store::ShopInfo;
    use mockall::predicate::eq;
    use tempfile::tempdir;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(RealRuntime, dir.path().join("repguard"));

        assert_eq!(store.get_token().unwrap(), None);

        store.set_token("tok-123").unwrap();
        store
            .set_shop_info(&ShopInfo {
                shop_id: "64f0".to_string(),
                shop_type: "restaurant".to_string(),
                shop_name: "Al Noor".to_string(),
            })
            .unwrap();

        // A second instance sees the same state, as after a restart.
        let reopened = FileStore::new(RealRuntime, dir.path().join("repguard"));
        assert_eq!(reopened.get_token().unwrap().as_deref(), Some("tok-123"));
        assert_eq!(reopened.get_shop_info().unwrap().unwrap().shop_id, "64f0");

        reopened.clear().unwrap();
        assert_eq!(store.get_token().unwrap(), None);
        assert!(!dir.path().join("repguard/auth_token").exists());
        assert!(!dir.path().join("repguard/shop_info").exists());
    }

    #[test]
    fn test_clear_without_files_is_ok() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(RealRuntime, dir.path().join("never-created"));
        store.clear().unwrap();
    }

    #[test]
    fn test_in_config_dir_appends_app_name() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_config_dir()
            .returning(|| Some(PathBuf::from("/home/user/.config")));

        let store = FileStore::in_config_dir(runtime).unwrap();
        assert_eq!(store.dir(), Path::new("/home/user/.config/repguard"));
    }

    #[test]
    fn test_in_config_dir_requires_a_directory() {
        let mut runtime = MockRuntime::new();
        runtime.expect_config_dir().returning(|| None);
        assert!(FileStore::in_config_dir(runtime).is_err());
    }

    #[test]
    fn test_set_writes_owner_only_files() {
        let mut runtime = MockRuntime::new();
        let dir = PathBuf::from("/store");
        runtime
            .expect_create_dir_all()
            .with(eq(dir.clone()))
            .times(1)
            .returning(|_| Ok(()));
        runtime
            .expect_write_private()
            .withf(|path, contents| path == Path::new("/store/auth_token") && contents == b"t")
            .times(1)
            .returning(|_, _| Ok(()));
        runtime.expect_write().never();

        let store = FileStore::new(runtime, dir);
        store.set_token("t").unwrap();
    }

    #[test]
    fn test_token_with_trailing_newline_is_trimmed() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("auth_token"), "tok\n").unwrap();
        let store = FileStore::new(RealRuntime, dir.path().to_path_buf());
        assert_eq!(store.get_token().unwrap().as_deref(), Some("tok"));

        std::fs::write(dir.path().join("auth_token"), " \r\n").unwrap();
        assert_eq!(store.get_token().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_stored_token_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = FileStore::new(RealRuntime, dir.path().join("repguard"));
        store.set_token("tok").unwrap();

        let meta = std::fs::metadata(dir.path().join("repguard/auth_token")).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn test_get_propagates_read_errors() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_read_to_string()
            .returning(|_| Err(anyhow::anyhow!("permission denied")));

        let store = FileStore::new(runtime, PathBuf::from("/store"));
        assert!(store.get_token().is_err());
    }
}
