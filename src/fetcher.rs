use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::fs;
use tracing::info;

/// Remote source of the raw case table.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Human readable location, used in errors and logs.
    fn location(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<u8>>;
}

pub struct UrlFetcher {
    url: String,
    client: reqwest::Client,
}

impl UrlFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn unavailable(&self, reason: impl ToString) -> PipelineError {
        PipelineError::SourceUnavailable {
            url: self.url.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl Fetch for UrlFetcher {
    fn location(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.unavailable(e))?;
        if !resp.status().is_success() {
            return Err(self.unavailable(format!("HTTP {}", resp.status())));
        }
        let body = resp.bytes().await.map_err(|e| self.unavailable(e))?;
        Ok(body.to_vec())
    }
}

/// Returns the cached table, fetching and caching it first when absent.
///
/// The cache is a byte-identical copy of the fetched payload and is never
/// checked for staleness.
pub async fn load_source(cache_path: &Path, fetcher: &dyn Fetch) -> Result<Vec<u8>> {
    let cached = fs::try_exists(cache_path)
        .await
        .map_err(|e| PipelineError::io(format!("cannot check cache {:?}", cache_path), e))?;
    if cached {
        info!("Reading cached dataset from {:?}", cache_path);
        return fs::read(cache_path)
            .await
            .map_err(|e| PipelineError::io(format!("cannot read cache {:?}", cache_path), e));
    }

    info!("No cache at {:?}, fetching {}", cache_path, fetcher.location());
    let body = fetcher.fetch().await?;

    if let Some(parent) = cache_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| PipelineError::io(format!("cannot create cache dir {:?}", parent), e))?;
    }
    fs::write(cache_path, &body)
        .await
        .map_err(|e| PipelineError::io(format!("cannot write cache {:?}", cache_path), e))?;
    info!("Cached {} bytes to {:?}", body.len(), cache_path);

    Ok(body)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory source counting its calls.
    pub struct StaticFetcher {
        pub body: Vec<u8>,
        pub calls: AtomicUsize,
    }

    impl StaticFetcher {
        pub fn new(body: &[u8]) -> Self {
            Self {
                body: body.to_vec(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Fetch for StaticFetcher {
        fn location(&self) -> &str {
            "memory://static"
        }

        async fn fetch(&self) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl Fetch for FailingFetcher {
        fn location(&self) -> &str {
            "memory://down"
        }

        async fn fetch(&self) -> Result<Vec<u8>> {
            Err(PipelineError::SourceUnavailable {
                url: self.location().to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn fetches_once_then_reads_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("nested/data.csv");
        let fetcher = StaticFetcher::new(b"Date;Zone\n2020-11-19;France\n");

        let first = load_source(&cache, &fetcher).await.unwrap();
        let second = load_source(&cache, &fetcher).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read(&cache).unwrap(), fetcher.body);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn existing_cache_skips_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("data.csv");
        std::fs::write(&cache, b"cached").unwrap();

        let body = load_source(&cache, &FailingFetcher).await.unwrap();
        assert_eq!(body, b"cached");
    }

    #[tokio::test]
    async fn cache_lookup_error_is_not_a_miss() {
        // Interior NUL makes the existence check itself fail
        let cache = Path::new("cache\0dir/data.csv");
        let fetcher = StaticFetcher::new(b"fresh");

        let err = load_source(cache, &fetcher).await.unwrap_err();
        assert!(matches!(err, PipelineError::Io { ref context, .. } if context.starts_with("cannot check cache")));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_failure_without_cache_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("data.csv");

        let err = load_source(&cache, &FailingFetcher).await.unwrap_err();
        assert!(matches!(err, PipelineError::SourceUnavailable { .. }));
        assert!(!cache.exists());
    }
}
