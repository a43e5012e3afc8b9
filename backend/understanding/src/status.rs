//! Server status check: reachability plus the installed vision-capable models.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use textlens_core::{InferenceClient, ServerStatus, VisionClassifier};

use crate::catalog::PatternClassifier;

pub struct StatusChecker {
    client: Arc<dyn InferenceClient>,
    classifier: Arc<dyn VisionClassifier>,
}

impl StatusChecker {
    /// Checker using the default name-pattern classifier.
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self::with_classifier(client, Arc::new(PatternClassifier::default()))
    }

    pub fn with_classifier(
        client: Arc<dyn InferenceClient>,
        classifier: Arc<dyn VisionClassifier>,
    ) -> Self {
        Self { client, classifier }
    }

    /// Check the server. Never fails: errors are reported inside the status.
    #[instrument(skip(self), fields(client = self.client.name()))]
    pub async fn check(&self) -> ServerStatus {
        match self.client.list_installed_models().await {
            Ok(installed) => {
                let total = installed.len();
                let models: Vec<String> = installed
                    .into_iter()
                    .filter(|m| self.classifier.is_vision_capable(m))
                    .map(|m| m.identifier)
                    .collect();
                debug!(total, vision = models.len(), "Inference server is up");
                ServerStatus::running(models)
            }
            Err(e) => {
                warn!(error = %e, "Inference server check failed");
                let message = match e.hint() {
                    Some(hint) => format!("{e}. {hint}"),
                    None => e.to_string(),
                };
                ServerStatus::down(message)
            }
        }
    }
}
