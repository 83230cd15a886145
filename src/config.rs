use directories::ProjectDirs;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.scryfall.com";
const REQUEST_TIMEOUT_SECONDS: u64 = 60;
const CACHE_MAX_AGE_SECONDS: u64 = 60 * 60 * 12;
const DATABASE_FILE: &str = "mtgsearch.db";
const CACHE_DIR: &str = "cache";

#[derive(Clone, Debug)]
pub struct Config {
  pub api_base_url: String,
  pub data_dir: PathBuf,
  pub request_timeout: Duration,
  pub cache_max_age: Duration,
  pub use_cache: bool,
}

impl Config {
  pub fn with_data_dir(data_dir: PathBuf) -> Self {
    Self {
      api_base_url: DEFAULT_API_BASE_URL.to_string(),
      data_dir,
      request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECONDS),
      cache_max_age: Duration::from_secs(CACHE_MAX_AGE_SECONDS),
      use_cache: true,
    }
  }

  /// Uses `data_dir` when given, otherwise the platform data directory.
  pub fn resolve(data_dir: Option<PathBuf>) -> Result<Self, String> {
    let data_dir = match data_dir {
      Some(dir) => dir,
      None => ProjectDirs::from("", "", "mtgsearch")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
          "Unable to determine a data directory. Pass --data-dir or set MTGSEARCH_DATA_DIR."
            .to_string()
        })?,
    };
    Ok(Self::with_data_dir(data_dir))
  }

  pub fn db_path(&self) -> PathBuf {
    self.data_dir.join(DATABASE_FILE)
  }

  pub fn cache_dir(&self) -> PathBuf {
    self.data_dir.join(CACHE_DIR)
  }
}
