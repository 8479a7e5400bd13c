//! Video lookup contract
//!
//! Search is an external service; the room only needs descriptors back.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::VideoDescriptor;

/// Finds candidate videos for a free-text query
#[async_trait]
pub trait VideoLookup: Send + Sync {
    /// Candidates for `query`, best match first
    async fn search(&self, query: &str) -> Result<Vec<VideoDescriptor>>;
}

/// Lookup used when no search backend is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledLookup;

#[async_trait]
impl VideoLookup for DisabledLookup {
    async fn search(&self, _query: &str) -> Result<Vec<VideoDescriptor>> {
        Err(Error::Adapter("video search is not configured".into()))
    }
}

/// Lookup over a fixed catalog, matching titles and creators
#[derive(Debug, Default, Clone)]
pub struct StaticLookup {
    catalog: Vec<VideoDescriptor>,
}

impl StaticLookup {
    pub fn new(catalog: Vec<VideoDescriptor>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl VideoLookup for StaticLookup {
    async fn search(&self, query: &str) -> Result<Vec<VideoDescriptor>> {
        let needle = query.trim().to_lowercase();
        Ok(self
            .catalog
            .iter()
            .filter(|v| {
                needle.is_empty()
                    || v.title.to_lowercase().contains(&needle)
                    || v.creator.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(title: &str, creator: &str) -> VideoDescriptor {
        VideoDescriptor {
            title: title.into(),
            creator: creator.into(),
            source_id: title.to_lowercase().replace(' ', "-"),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn test_static_lookup_matches_title_and_creator() {
        let lookup = StaticLookup::new(vec![
            video("Cat Compilation", "Pets Daily"),
            video("Rust in 100 Seconds", "Fireship"),
        ]);

        assert_eq!(lookup.search("cat").await.unwrap().len(), 1);
        assert_eq!(lookup.search("FIRESHIP").await.unwrap().len(), 1);
        assert_eq!(lookup.search("").await.unwrap().len(), 2);
        assert!(lookup.search("opera").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_lookup_fails() {
        let result = DisabledLookup.search("anything").await;
        assert!(matches!(result, Err(Error::Adapter(_))));
    }
}
