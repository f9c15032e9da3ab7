use crate::models::{Currency, Metric};
use crate::ranking::DEFAULT_RANK_LIMIT;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

// CONFIGURATION STRUCTS
// `config.json` in the storage directory deserializes straight into these.

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,  // e.g., "https://api.coingecko.com/api/v3"
    pub timeout_secs: u64, // applies to every request
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            timeout_secs: 20,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub market_ttl_secs: u64,
    pub coin_list_ttl_secs: u64,
    pub history_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            market_ttl_secs: 60,
            coin_list_ttl_secs: 3600,
            history_ttl_secs: 3600,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SnapshotLogConfig {
    pub enabled: bool,
    pub file_name: String, // relative to the storage directory
}

impl Default for SnapshotLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file_name: "crypto_snapshot.csv".to_string(),
        }
    }
}

/// Initial widget values for a new dashboard session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DefaultsConfig {
    pub top_n: u32,
    pub currency: Currency,
    pub sort_by: Metric,
    pub rank_by: Metric,
    pub rank_limit: usize,
    pub refresh_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            top_n: 30,
            currency: Currency::Usd,
            sort_by: Metric::MarketCap,
            rank_by: Metric::Change24h,
            rank_limit: DEFAULT_RANK_LIMIT,
            refresh_secs: 0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub snapshot_log: SnapshotLogConfig,
    pub history_days: u32,
    pub defaults: DefaultsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            cache: CacheConfig::default(),
            snapshot_log: SnapshotLogConfig::default(),
            history_days: 1095,
            defaults: DefaultsConfig::default(),
        }
    }
}

// STORAGE MANAGER

pub struct AsyncStorageManager {
    // Absolute path of the storage directory (e.g., ".../target/debug/storage")
    pub base_dir: PathBuf,
}

impl AsyncStorageManager {
    /// Storage directory resolved relative to the running executable.
    pub async fn new_relative<P: AsRef<Path>>(relative_path: P) -> anyhow::Result<Self> {
        let exe_path = std::env::current_exe()?;

        let base_dir = exe_path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Could not find binary directory"))?
            .join(relative_path);

        Self::new(base_dir).await
    }

    /// Storage rooted at an explicit directory, created if missing.
    pub async fn new<P: AsRef<Path>>(base_dir: P) -> anyhow::Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();

        // Created once up front so later writes never need to check.
        if !base_dir.exists() {
            fs::create_dir_all(&base_dir).await?;
        }

        Ok(Self { base_dir })
    }

    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.base_dir.join(file_name)
    }

    /// Serializes `data` to `<filename>.json`. Writes a `.tmp` file first and renames it
    /// over the target so a crash mid-write leaves the previous file intact.
    pub async fn save<T: Serialize>(&self, filename: &str, data: &T) -> anyhow::Result<()> {
        let file_name = format!("{}.json", filename);
        let final_path = self.base_dir.join(&file_name);
        let tmp_path = self.base_dir.join(format!("{}.tmp", file_name));

        let json_bytes = serde_json::to_vec_pretty(data)?;

        fs::write(&tmp_path, json_bytes).await?;
        fs::rename(tmp_path, final_path).await?;

        Ok(())
    }

    pub async fn load<T: DeserializeOwned>(&self, filename: &str) -> anyhow::Result<T> {
        let path = self.base_dir.join(format!("{}.json", filename));

        // serde_json validates UTF-8 itself, so skip `read_to_string`.
        let content = fs::read(path).await?;

        let data = serde_json::from_slice(&content)?;
        Ok(data)
    }

    /// Loads `<filename>.json`, writing `T::default()` there first if the file is missing.
    pub async fn load_or_init<T>(&self, filename: &str) -> anyhow::Result<T>
    where
        T: Serialize + DeserializeOwned + Default,
    {
        let path = self.base_dir.join(format!("{}.json", filename));
        if fs::try_exists(&path).await? {
            return self.load(filename).await;
        }

        let data = T::default();
        self.save(filename, &data).await?;
        info!("Wrote default {} to {:?}", filename, path);
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_config_is_initialised_with_defaults() {
        let dir = TempDir::new().unwrap();
        let storage = AsyncStorageManager::new(dir.path().join("storage")).await.unwrap();

        let config: AppConfig = storage.load_or_init("config").await.unwrap();

        assert_eq!(config, AppConfig::default());
        assert!(storage.path_for("config.json").exists());
        assert!(!storage.path_for("config.json.tmp").exists());
    }

    #[tokio::test]
    async fn partial_config_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{ "api": { "timeout_secs": 5 }, "defaults": { "currency": "eur" } }"#,
        )
        .unwrap();
        let storage = AsyncStorageManager::new(dir.path()).await.unwrap();

        let config: AppConfig = storage.load_or_init("config").await.unwrap();

        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.api.base_url, ApiConfig::default().base_url);
        assert_eq!(config.defaults.currency, Currency::Eur);
        assert_eq!(config.defaults.top_n, 30);
        assert_eq!(config.cache.market_ttl_secs, 60);
        assert_eq!(config.history_days, 1095);
    }

    #[tokio::test]
    async fn save_then_load_preserves_values() {
        let dir = TempDir::new().unwrap();
        let storage = AsyncStorageManager::new(dir.path()).await.unwrap();
        let mut config = AppConfig::default();
        config.defaults.rank_by = Metric::Change7d;
        config.snapshot_log.enabled = false;

        storage.save("config", &config).await.unwrap();
        let loaded: AppConfig = storage.load("config").await.unwrap();

        assert_eq!(loaded, config);
    }
}
