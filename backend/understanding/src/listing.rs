use std::sync::Arc;

use tracing::instrument;

use textlens_core::{ModelEntry, ModelListing};

use crate::catalog::{display_info, family_of, size_hint};
use crate::status::StatusChecker;

/// Turns the server's vision models into display-ready selector rows.
pub struct ModelLister {
    checker: Arc<StatusChecker>,
    preferred_family: String,
}

impl ModelLister {
    pub fn new(checker: Arc<StatusChecker>, preferred_family: impl Into<String>) -> Self {
        Self {
            checker,
            preferred_family: preferred_family.into().to_lowercase(),
        }
    }

    /// Recommended models first, then by display name. Never fails; an
    /// unreachable server yields no models and a status carrying the error.
    #[instrument(skip(self))]
    pub async fn list(&self) -> ModelListing {
        let status = self.checker.check().await;
        let mut models: Vec<ModelEntry> = status
            .models
            .iter()
            .map(|id| self.entry(id))
            .collect();
        models.sort_by(|a, b| {
            b.recommended
                .cmp(&a.recommended)
                .then_with(|| a.name.cmp(&b.name))
        });
        ModelListing { models, status }
    }

    fn entry(&self, id: &str) -> ModelEntry {
        let info = display_info(id);
        let recommended =
            !self.preferred_family.is_empty() && family_of(id) == self.preferred_family;
        ModelEntry {
            id: id.to_string(),
            name: info.name,
            description: info.description,
            size: size_hint(id),
            available: true,
            recommended,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockInferenceClient;

    fn lister(client: MockInferenceClient, family: &str) -> ModelLister {
        let checker = Arc::new(StatusChecker::new(Arc::new(client)));
        ModelLister::new(checker, family)
    }

    #[tokio::test]
    async fn recommended_family_sorts_first() {
        let client = MockInferenceClient::new().with_models(["llava:7b", "gemma3:4b"]);
        let listing = lister(client, "gemma3").list().await;

        let ids: Vec<_> = listing.models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["gemma3:4b", "llava:7b"]);
        assert!(listing.models[0].recommended);
        assert!(!listing.models[1].recommended);
        assert!(listing.models.iter().all(|m| m.available));
        assert!(listing.status.is_running);
    }

    #[tokio::test]
    async fn remaining_models_sort_by_name() {
        let client = MockInferenceClient::new().with_models([
            "moondream:latest",
            "llava:13b",
            "bakllava:7b",
        ]);
        let listing = lister(client, "gemma3").list().await;

        let names: Vec<_> = listing.models.iter().map(|m| m.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(listing.models.iter().all(|m| !m.recommended));
    }

    #[tokio::test]
    async fn equal_names_keep_server_order() {
        let client = MockInferenceClient::new().with_models(["llava:7b", "library/llava:7b"]);
        let listing = lister(client, "gemma3").list().await;

        assert_eq!(listing.models[0].name, listing.models[1].name);
        let ids: Vec<_> = listing.models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["llava:7b", "library/llava:7b"]);
    }

    #[tokio::test]
    async fn entries_carry_display_info_and_size() {
        let client = MockInferenceClient::new().with_models(["gemma3:4b"]);
        let listing = lister(client, "GEMMA3").list().await;

        let entry = &listing.models[0];
        assert_eq!(entry.size, "4B");
        assert!(!entry.name.is_empty());
        assert!(!entry.description.is_empty());
        assert!(entry.recommended);
    }

    #[tokio::test]
    async fn unreachable_server_lists_nothing() {
        let listing = lister(MockInferenceClient::new().unreachable(), "gemma3")
            .list()
            .await;
        assert!(listing.models.is_empty());
        assert!(!listing.status.is_running);
        assert!(listing.status.error.is_some());
    }

    #[tokio::test]
    async fn non_vision_models_are_not_listed() {
        let client = MockInferenceClient::new().with_models(["mistral:7b", "llava:7b"]);
        let listing = lister(client, "").list().await;
        assert_eq!(listing.models.len(), 1);
        assert_eq!(listing.models[0].id, "llava:7b");
        assert!(!listing.models[0].recommended);
    }
}
