//! Model catalog: vision classification and display names for model identifiers.
//!
//! Identifiers look like `family[:variant]` (`gemma3:4b`). Everything here is
//! static data; nothing is mutated at runtime.

use std::sync::Arc;

use textlens_core::{InstalledModel, ModelDisplayInfo, VisionClassifier};

/// Description used when nothing in the catalog matches.
pub const GENERIC_DESCRIPTION: &str = "Vision-capable model served by the local inference server";

/// One classification rule, applied to the lowercased family segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisionRule {
    Prefix(&'static str),
    Contains(&'static str),
}

impl VisionRule {
    fn matches(&self, family: &str) -> bool {
        match self {
            VisionRule::Prefix(p) => family.starts_with(p),
            VisionRule::Contains(s) => family.contains(s),
        }
    }
}

/// Known vision families and name fragments.
pub const DEFAULT_VISION_RULES: &[VisionRule] = &[
    VisionRule::Prefix("llava"),
    VisionRule::Prefix("bakllava"),
    VisionRule::Prefix("gemma3"),
    VisionRule::Prefix("llama3.2-vision"),
    VisionRule::Prefix("llama4"),
    VisionRule::Prefix("minicpm-v"),
    VisionRule::Prefix("moondream"),
    VisionRule::Prefix("qwen2.5vl"),
    VisionRule::Prefix("qwen2-vl"),
    VisionRule::Prefix("granite3.2-vision"),
    VisionRule::Prefix("mistral-small3.1"),
    VisionRule::Contains("vision"),
    VisionRule::Contains("multimodal"),
    VisionRule::Contains("-vl"),
];

/// Exact identifiers with hand-written display info.
const KNOWN_MODELS: &[(&str, &str, &str)] = &[
    ("gemma3:4b", "Gemma 3 4B", "Fast multimodal model, good default for OCR on a laptop"),
    ("gemma3:12b", "Gemma 3 12B", "Balanced multimodal model with stronger layout handling"),
    ("gemma3:27b", "Gemma 3 27B", "Largest Gemma 3, best accuracy on dense documents"),
    ("llava:7b", "LLaVA 7B", "General-purpose vision model, lightweight"),
    ("llava:13b", "LLaVA 13B", "General-purpose vision model, more accurate"),
    ("llama3.2-vision:11b", "Llama 3.2 Vision 11B", "Meta's vision model, strong on photos and charts"),
    ("minicpm-v:8b", "MiniCPM-V 8B", "Compact model tuned for OCR and high-resolution images"),
    ("moondream:1.8b", "Moondream 1.8B", "Tiny vision model for quick, rough transcription"),
    ("qwen2.5vl:7b", "Qwen 2.5 VL 7B", "Strong multilingual document and table reading"),
];

/// Family-level fallbacks, matched as prefixes of the family segment.
const KNOWN_FAMILIES: &[(&str, &str, &str)] = &[
    ("gemma3", "Gemma 3", "Google's multimodal Gemma model"),
    ("llava", "LLaVA", "Large Language and Vision Assistant"),
    ("bakllava", "BakLLaVA", "Mistral-based LLaVA variant"),
    ("llama3.2-vision", "Llama 3.2 Vision", "Meta's multimodal Llama"),
    ("llama4", "Llama 4", "Meta's natively multimodal Llama"),
    ("minicpm-v", "MiniCPM-V", "Efficient multimodal model focused on OCR"),
    ("moondream", "Moondream", "Small vision model for edge devices"),
    ("qwen2.5vl", "Qwen 2.5 VL", "Alibaba's vision-language model"),
    ("granite3.2-vision", "Granite 3.2 Vision", "IBM's document-understanding model"),
];

/// Split an identifier into its family and optional variant.
///
/// A namespace prefix (`user/llava:7b`) is dropped from the family.
pub fn split_identifier(id: &str) -> (&str, Option<&str>) {
    let (family, variant) = match id.split_once(':') {
        Some((f, v)) if !v.is_empty() => (f, Some(v)),
        Some((f, _)) => (f, None),
        None => (id, None),
    };
    let family = family.rsplit('/').next().unwrap_or(family);
    (family, variant)
}

/// Lowercased family segment of an identifier.
pub fn family_of(id: &str) -> String {
    split_identifier(id).0.to_lowercase()
}

/// Size hint from the variant segment (`4b` → `4B`), or `Unknown`.
pub fn size_hint(id: &str) -> String {
    split_identifier(id)
        .1
        .map(str::to_uppercase)
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Whether the identifier's family matches any default vision rule.
pub fn classify_vision(id: &str) -> bool {
    PatternClassifier::default().classify_id(id)
}

/// Display info for any identifier. Never fails.
pub fn display_info(id: &str) -> ModelDisplayInfo {
    if let Some((_, name, description)) = KNOWN_MODELS.iter().find(|(known, _, _)| *known == id) {
        return ModelDisplayInfo {
            name: name.to_string(),
            description: description.to_string(),
        };
    }

    let (family, variant) = split_identifier(id);
    let family_lower = family.to_lowercase();

    // Longest matching key wins
    let family_match = KNOWN_FAMILIES
        .iter()
        .filter(|(key, _, _)| family_lower.starts_with(key))
        .max_by_key(|(key, _, _)| key.len());

    if let Some((_, name, description)) = family_match {
        let name = match variant {
            Some(v) => format!("{name} {}", v.to_uppercase()),
            None => name.to_string(),
        };
        return ModelDisplayInfo {
            name,
            description: description.to_string(),
        };
    }

    ModelDisplayInfo {
        name: title_case(id),
        description: GENERIC_DESCRIPTION.to_string(),
    }
}

fn title_case(id: &str) -> String {
    let words: Vec<String> = id
        .split(|c: char| c == ':' || c == '-' || c == '_' || c == '/')
        .filter(|s| !s.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();

    if words.is_empty() {
        "Unknown Model".to_string()
    } else {
        words.join(" ")
    }
}

/// Name-pattern classifier. Unknown names are not vision-capable.
#[derive(Debug, Clone)]
pub struct PatternClassifier {
    rules: &'static [VisionRule],
}

impl PatternClassifier {
    pub fn new(rules: &'static [VisionRule]) -> Self {
        Self { rules }
    }

    pub fn classify_id(&self, id: &str) -> bool {
        let family = family_of(id);
        self.rules.iter().any(|rule| rule.matches(&family))
    }
}

impl Default for PatternClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_VISION_RULES)
    }
}

impl VisionClassifier for PatternClassifier {
    fn is_vision_capable(&self, model: &InstalledModel) -> bool {
        self.classify_id(&model.identifier)
    }
}

/// Trusts server-reported architecture families (`clip`, `mllama`, ...) and
/// falls back to name patterns when the server reports none.
#[derive(Debug, Clone, Default)]
pub struct MetadataClassifier {
    fallback: PatternClassifier,
}

const VISION_ARCHITECTURES: &[&str] = &["clip", "mllama", "siglip", "qwen25vl", "gemma3"];

impl VisionClassifier for MetadataClassifier {
    fn is_vision_capable(&self, model: &InstalledModel) -> bool {
        if model.families.is_empty() {
            return self.fallback.is_vision_capable(model);
        }
        model.families.iter().any(|f| {
            let f = f.to_lowercase();
            VISION_ARCHITECTURES.contains(&f.as_str())
        }) || self.fallback.is_vision_capable(model)
    }
}

/// Classifier for a configured name (`pattern` or `metadata`, any case).
pub fn classifier_by_name(name: &str) -> Option<Arc<dyn VisionClassifier>> {
    match name.trim().to_lowercase().as_str() {
        "pattern" => Some(Arc::new(PatternClassifier::default())),
        "metadata" => Some(Arc::new(MetadataClassifier::default())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vision_families_are_detected() {
        for id in ["llava:7b", "gemma3:4b", "gemma3:27b", "llama3.2-vision:11b", "LLaVA:13b"] {
            assert!(classify_vision(id), "{id} should be vision-capable");
        }
    }

    #[test]
    fn substring_rules_apply() {
        assert!(classify_vision("acme-vision-pro:1b"));
        assert!(classify_vision("some-multimodal"));
        assert!(classify_vision("internlm-vl:7b"));
    }

    #[test]
    fn unknown_models_default_to_not_vision() {
        for id in ["mistral:7b", "llama3:8b", "phi3", "nomic-embed-text:latest", ""] {
            assert!(!classify_vision(id), "{id} should not be vision-capable");
        }
    }

    #[test]
    fn variant_does_not_drive_classification() {
        // Only the family segment is inspected
        assert!(!classify_vision("mistral:vision"));
    }

    #[test]
    fn namespaced_identifiers_use_last_segment() {
        assert_eq!(split_identifier("user/llava:7b"), ("llava", Some("7b")));
        assert!(classify_vision("user/llava:7b"));
    }

    #[test]
    fn exact_match_wins() {
        let info = display_info("gemma3:4b");
        assert_eq!(info.name, "Gemma 3 4B");
        assert!(info.description.contains("OCR"));
    }

    #[test]
    fn family_prefix_appends_uppercased_variant() {
        let info = display_info("llava:34b-v1.6");
        assert_eq!(info.name, "LLaVA 34B-V1.6");
        assert_eq!(info.description, "Large Language and Vision Assistant");

        let info = display_info("gemma3");
        assert_eq!(info.name, "Gemma 3");
    }

    #[test]
    fn family_prefix_covers_derived_names() {
        assert_eq!(display_info("bakllava:7b").name, "BakLLaVA 7B");
        assert_eq!(display_info("llava-phi3:3.8b").name, "LLaVA 3.8B");
    }

    #[test]
    fn unknown_identifier_falls_back_to_title_case() {
        let info = display_info("foo:9b");
        assert_eq!(info.name, "Foo 9b");
        assert_eq!(info.description, GENERIC_DESCRIPTION);

        let info = display_info("my-cool_model:latest");
        assert_eq!(info.name, "My Cool Model Latest");
    }

    #[test]
    fn display_info_never_returns_empty_name() {
        assert_eq!(display_info("").name, "Unknown Model");
        assert_eq!(display_info(":").name, "Unknown Model");
        assert!(!display_info("x").name.is_empty());
    }

    #[test]
    fn size_hint_uses_variant() {
        assert_eq!(size_hint("gemma3:4b"), "4B");
        assert_eq!(size_hint("llava"), "Unknown");
        assert_eq!(size_hint("llava:"), "Unknown");
    }

    #[test]
    fn metadata_classifier_uses_families() {
        let classifier = MetadataClassifier::default();
        let custom = InstalledModel::new("my-finetune:3b").with_families(["llama", "clip"]);
        assert!(classifier.is_vision_capable(&custom));

        let text_only = InstalledModel::new("my-finetune:3b").with_families(["llama"]);
        assert!(!classifier.is_vision_capable(&text_only));

        let no_metadata = InstalledModel::new("llava:7b");
        assert!(classifier.is_vision_capable(&no_metadata));
    }

    #[test]
    fn classifiers_are_chosen_by_name() {
        let clip_finetune = InstalledModel::new("my-finetune:3b").with_families(["clip"]);

        let metadata = classifier_by_name("Metadata").unwrap();
        assert!(metadata.is_vision_capable(&clip_finetune));

        let pattern = classifier_by_name("pattern").unwrap();
        assert!(!pattern.is_vision_capable(&clip_finetune));

        assert!(classifier_by_name("regex").is_none());
    }
}
