//! File-backed context provider.
//!
//! Scouting context (situational metadata, historical memory snippets)
//! is prepared offline as a JSON `EventContext` and loaded per game.

use std::path::PathBuf;

use anyhow::Context as _;
use async_trait::async_trait;

use consensus::{ContextProvider, EventContext, EventId};

/// Loads a prepared `EventContext` from a JSON file.
pub struct FileContextProvider {
    path: PathBuf,
}

impl FileContextProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ContextProvider for FileContextProvider {
    async fn fetch(&self, event_id: &EventId) -> anyhow::Result<EventContext> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading context file {}", self.path.display()))?;
        let context: EventContext = serde_json::from_str(&raw)
            .with_context(|| format!("parsing context file {}", self.path.display()))?;
        anyhow::ensure!(
            &context.event_id == event_id,
            "context file is for event '{}', expected '{}'",
            context.event_id,
            event_id
        );
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consensus::MemorySnippet;

    #[tokio::test]
    async fn test_loads_prepared_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("context.json");
        let mut context = EventContext::bare("game-7", "Harbor City", "Ridgeline");
        context.memory.push(MemorySnippet {
            id: "mem-1".into(),
            text: "Harbor City averages 27.4 at home".into(),
            relevance: 0.8,
        });
        tokio::fs::write(&path, serde_json::to_string(&context).unwrap())
            .await
            .unwrap();

        let provider = FileContextProvider::new(&path);
        let loaded = provider.fetch(&"game-7".to_string()).await.unwrap();
        assert_eq!(loaded, context);
    }

    #[tokio::test]
    async fn test_event_id_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("context.json");
        let context = EventContext::bare("game-7", "Harbor City", "Ridgeline");
        tokio::fs::write(&path, serde_json::to_string(&context).unwrap())
            .await
            .unwrap();

        let provider = FileContextProvider::new(&path);
        assert!(provider.fetch(&"game-8".to_string()).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let provider = FileContextProvider::new("/nonexistent/context.json");
        assert!(provider.fetch(&"game-7".to_string()).await.is_err());
    }
}
