//! `qg-prompts`: system prompt for the diagram assistant.
//!
//! Pure string assembly: a base template picked by model id, a style block
//! picked by the minimal-style flag, and the model name substituted in.

/// Placeholder replaced with the model id.
pub const MODEL_NAME_PLACEHOLDER: &str = "{{MODEL_NAME}}";

/// Name used when no model id is known.
const FALLBACK_MODEL_NAME: &str = "AI";

const DEFAULT_PROMPT: &str = include_str!("../templates/default.md");
const EXTENDED_ADDITIONS: &str = include_str!("../templates/extended_additions.md");
const STYLE_INSTRUCTIONS: &str = include_str!("../templates/style.md");
const MINIMAL_STYLE_INSTRUCTIONS: &str = include_str!("../templates/minimal_style.md");

/// Model-id substrings that get the extended template.  These models need a
/// longer prompt to reach their provider's prompt-cache minimum.
const EXTENDED_MODEL_PATTERNS: &[&str] = &["claude-opus-4-5", "claude-haiku-4-5"];

/// Which base template a model gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptVariant {
    Default,
    Extended,
}

impl PromptVariant {
    pub fn for_model(model_id: Option<&str>) -> Self {
        match model_id {
            Some(id) if EXTENDED_MODEL_PATTERNS.iter().any(|p| id.contains(p)) => {
                PromptVariant::Extended
            }
            _ => PromptVariant::Default,
        }
    }
}

/// Assemble the system prompt.
///
/// - Extended template when `model_id` contains one of the known patterns,
///   default template otherwise (including when absent).
/// - `minimal_style` puts the minimal-style block first; otherwise the
///   regular style block goes last.
/// - Every `{{MODEL_NAME}}` becomes the model id, or `"AI"` when the id is
///   absent or empty.
pub fn build_system_prompt(model_id: Option<&str>, minimal_style: bool) -> String {
    let model_id = model_id.filter(|id| !id.is_empty());
    let variant = PromptVariant::for_model(model_id);
    tracing::debug!(model = model_id.unwrap_or("unknown"), ?variant, minimal_style, "building system prompt");

    let mut prompt = String::with_capacity(
        MINIMAL_STYLE_INSTRUCTIONS.len() + DEFAULT_PROMPT.len() + EXTENDED_ADDITIONS.len(),
    );
    if minimal_style {
        prompt.push_str(MINIMAL_STYLE_INSTRUCTIONS);
    }
    prompt.push_str(DEFAULT_PROMPT);
    if variant == PromptVariant::Extended {
        prompt.push_str(EXTENDED_ADDITIONS);
    }
    if !minimal_style {
        prompt.push_str(STYLE_INSTRUCTIONS);
    }

    prompt.replace(MODEL_NAME_PLACEHOLDER, model_id.unwrap_or(FALLBACK_MODEL_NAME))
}
