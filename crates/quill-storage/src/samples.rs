//! Built-in sample documents with a local edit cache.
//!
//! Samples come from a read-only [`SampleSource`]. The first time a sample is
//! requested its content is copied into storage, and from then on that cached
//! copy (including any edits) is what callers see.

use std::collections::BTreeMap;
use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;

use crate::facade::Persistence;

#[derive(Debug, Error, Diagnostic)]
pub enum SampleError {
    #[error("unknown sample `{0}`")]
    #[diagnostic(code(samples::unknown))]
    Unknown(String),

    #[error("failed to load sample `{key}`: {message}")]
    #[diagnostic(code(samples::load))]
    Load { key: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleInfo {
    pub key: String,
    pub title: String,
}

/// Where sample content originally comes from.
#[async_trait::async_trait]
pub trait SampleSource: Send + Sync {
    async fn load_sample(&self, key: &str) -> Result<String, SampleError>;

    fn catalog(&self) -> Vec<SampleInfo>;
}

/// Samples held in memory, in catalog order.
#[derive(Debug, Clone, Default)]
pub struct StaticSamples {
    order: Vec<SampleInfo>,
    content: BTreeMap<String, String>,
}

impl StaticSamples {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        key: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let key = key.into();
        self.content.insert(key.clone(), content.into());
        self.order.retain(|info| info.key != key);
        self.order.push(SampleInfo {
            key,
            title: title.into(),
        });
        self
    }
}

#[async_trait::async_trait]
impl SampleSource for StaticSamples {
    async fn load_sample(&self, key: &str) -> Result<String, SampleError> {
        self.content
            .get(key)
            .cloned()
            .ok_or_else(|| SampleError::Unknown(key.to_owned()))
    }

    fn catalog(&self) -> Vec<SampleInfo> {
        self.order.clone()
    }
}

/// Markdown shown in place of a sample that could not be loaded.
pub fn load_error_markdown(key: &str) -> String {
    format!("# Error\n\nCould not load {}", key)
}

#[derive(Clone)]
pub struct SampleLibrary {
    persistence: Persistence,
    source: Arc<dyn SampleSource>,
}

impl std::fmt::Debug for SampleLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleLibrary")
            .field("persistence", &self.persistence)
            .field("samples", &self.source.catalog().len())
            .finish()
    }
}

impl SampleLibrary {
    pub fn new(persistence: Persistence, source: Arc<dyn SampleSource>) -> Self {
        Self {
            persistence,
            source,
        }
    }

    /// Cached content for `key`, filling the cache from the source on a miss.
    pub async fn get_sample(&self, key: &str) -> String {
        if let Some(cached) = self.persistence.get_sample(key).await {
            return cached;
        }

        match self.source.load_sample(key).await {
            Ok(content) => {
                self.persistence.save_sample(key, content.clone()).await;
                content
            }
            Err(e) => {
                tracing::error!(key, error = %e, "error loading sample");
                load_error_markdown(key)
            }
        }
    }

    /// Overwrite the cached copy of a sample. The source is never touched.
    pub async fn update_sample(&self, key: &str, content: impl Into<String>) {
        self.persistence.save_sample(key, content).await
    }

    /// The catalog, with the key standing in for a missing title.
    pub fn samples(&self) -> Vec<SampleInfo> {
        self.source
            .catalog()
            .into_iter()
            .map(|info| {
                if info.title.trim().is_empty() {
                    SampleInfo {
                        title: info.key.clone(),
                        key: info.key,
                    }
                } else {
                    info
                }
            })
            .collect()
    }

    pub fn source(&self) -> &Arc<dyn SampleSource> {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::backend::Backend;
    use crate::flat::FlatStore;
    use crate::selector::StorageSelector;

    struct Counting {
        inner: StaticSamples,
        loads: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl SampleSource for Counting {
        async fn load_sample(&self, key: &str) -> Result<String, SampleError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load_sample(key).await
        }

        fn catalog(&self) -> Vec<SampleInfo> {
            self.inner.catalog()
        }
    }

    fn library() -> (SampleLibrary, Arc<Counting>) {
        let source = Arc::new(Counting {
            inner: StaticSamples::new()
                .with("hello", "Hello World", "# Hello")
                .with("bare", "", "# Bare"),
            loads: AtomicUsize::new(0),
        });
        let persistence = Persistence::new(Arc::new(StorageSelector::with_backend(
            Backend::Flat(FlatStore::in_memory()),
        )));
        (SampleLibrary::new(persistence, source.clone()), source)
    }

    #[tokio::test]
    async fn first_load_fills_the_cache() {
        let (library, source) = library();
        assert_eq!(library.get_sample("hello").await, "# Hello");
        assert_eq!(library.get_sample("hello").await, "# Hello");
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn edits_shadow_the_source() {
        let (library, _) = library();
        library.get_sample("hello").await;
        library.update_sample("hello", "# Edited").await;
        assert_eq!(library.get_sample("hello").await, "# Edited");
    }

    #[tokio::test]
    async fn load_failures_are_not_cached() {
        let (library, source) = library();
        assert_eq!(
            library.get_sample("missing").await,
            "# Error\n\nCould not load missing"
        );
        library.get_sample("missing").await;
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn catalog_titles_fall_back_to_keys() {
        let (library, _) = library();
        let titles: Vec<_> = library.samples().into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["Hello World".to_string(), "bare".to_string()]);
    }
}
