use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// On-disk store for successful API bodies, keyed by request URL.
pub struct ResponseCache {
  dir: PathBuf,
  max_age: Duration,
}

impl ResponseCache {
  pub fn new(dir: PathBuf, max_age: Duration) -> Self {
    Self { dir, max_age }
  }

  pub fn path_for(&self, url: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    self.dir.join(format!("{:x}.json", hasher.finalize()))
  }

  pub fn load(&self, url: &str) -> Option<String> {
    let path = self.path_for(url);
    if !is_cache_fresh(&path, self.max_age) {
      return None;
    }
    match fs::read_to_string(&path) {
      Ok(body) => Some(body),
      Err(error) => {
        log::warn!("unable to read cached response {}: {}", path.display(), error);
        None
      }
    }
  }

  pub fn store(&self, url: &str, body: &str) {
    let path = self.path_for(url);
    let written = fs::create_dir_all(&self.dir).and_then(|_| fs::write(&path, body));
    if let Err(error) = written {
      log::warn!("unable to cache response at {}: {}", path.display(), error);
    }
  }
}

pub fn is_cache_fresh(path: &Path, max_age: Duration) -> bool {
  if !path.exists() {
    return false;
  }
  let Ok(metadata) = fs::metadata(path) else {
    return false;
  };
  let Ok(modified) = metadata.modified() else {
    return false;
  };
  let Ok(age) = SystemTime::now().duration_since(modified) else {
    return false;
  };
  age <= max_age
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn stored_body_is_served_while_fresh() {
    let tmp = TempDir::new().unwrap();
    let cache = ResponseCache::new(tmp.path().join("cache"), Duration::from_secs(60));
    let url = "https://api.scryfall.com/cards/abc";

    assert_eq!(cache.load(url), None);
    cache.store(url, "{\"object\":\"card\"}");
    assert_eq!(cache.load(url).as_deref(), Some("{\"object\":\"card\"}"));
  }

  #[test]
  fn distinct_urls_use_distinct_files() {
    let cache = ResponseCache::new(PathBuf::from("/tmp/unused"), Duration::from_secs(60));
    let first = cache.path_for("https://api.scryfall.com/cards/search?q=bolt&page=1");
    let second = cache.path_for("https://api.scryfall.com/cards/search?q=bolt&page=2");
    assert_ne!(first, second);
    assert_eq!(first.extension().and_then(|ext| ext.to_str()), Some("json"));
  }

  #[test]
  fn zero_max_age_expires_entries() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("entry.json");
    assert!(!is_cache_fresh(&path, Duration::from_secs(3600)));
    fs::write(&path, "{}").unwrap();
    assert!(is_cache_fresh(&path, Duration::from_secs(3600)));
    std::thread::sleep(Duration::from_millis(20));
    assert!(!is_cache_fresh(&path, Duration::ZERO));
  }
}
