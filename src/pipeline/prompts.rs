use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};

use crate::config::PromptsSection;

pub const DEFAULT_PROMPTS_DIR: &str = "prompts";

pub const DEFAULT_CHAT: &str = "chat.txt";
pub const DEFAULT_CORRECTION: &str = "correction.txt";
pub const DEFAULT_GUIDANCE: &str = "guidance.txt";
pub const DEFAULT_PARAGRAPH: &str = "paragraph.txt";

/// The prompt templates the translator assembles requests from: one for fresh
/// chat translation and three retranslation variants.
#[derive(Clone, Debug)]
pub struct PromptCatalog {
    pub chat: String,
    pub correction: String,
    pub guidance: String,
    pub paragraph: String,
    /// Extra rules prepended to every prompt as an `[Additional Rules]` block.
    pub rules: Option<String>,
}

impl PromptCatalog {
    /// Built-in templates only; used when no config file is in play.
    pub fn builtin() -> Self {
        Self {
            chat: DEFAULT_CHAT_TEXT.to_string(),
            correction: DEFAULT_CORRECTION_TEXT.to_string(),
            guidance: DEFAULT_GUIDANCE_TEXT.to_string(),
            paragraph: DEFAULT_PARAGRAPH_TEXT.to_string(),
            rules: None,
        }
    }

    /// Loads templates from the files named in the config's `[prompts]`
    /// section, resolved against the config directory. A key left unset falls
    /// back to the built-in template; a configured file that is missing is an
    /// error.
    pub fn load(config_path: &Path, section: &PromptsSection) -> anyhow::Result<Self> {
        let config_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
        Ok(Self {
            chat: read_prompt(config_dir, section.chat.as_deref(), DEFAULT_CHAT_TEXT)?,
            correction: read_prompt(
                config_dir,
                section.correction.as_deref(),
                DEFAULT_CORRECTION_TEXT,
            )?,
            guidance: read_prompt(config_dir, section.guidance.as_deref(), DEFAULT_GUIDANCE_TEXT)?,
            paragraph: read_prompt(
                config_dir,
                section.paragraph.as_deref(),
                DEFAULT_PARAGRAPH_TEXT,
            )?,
            rules: section
                .rules
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        })
    }
}

fn read_prompt(
    config_dir: &Path,
    configured: Option<&str>,
    default_text: &str,
) -> anyhow::Result<String> {
    let Some(rel) = configured else {
        return Ok(default_text.to_string());
    };
    let mut path = PathBuf::from(rel);
    if path.is_relative() {
        path = config_dir.join(&path);
    }
    if !path.exists() {
        return Err(anyhow!(
            "prompt file not found: {} (run: chatfold --init-config)",
            path.display()
        ));
    }
    std::fs::read_to_string(&path).with_context(|| format!("read prompt: {}", path.display()))
}

pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (k, v) in vars {
        let pat = format!("{{{{{k}}}}}");
        out = out.replace(&pat, v);
    }
    out
}

pub fn default_prompt_files() -> Vec<(&'static str, &'static str)> {
    vec![
        (DEFAULT_CHAT, DEFAULT_CHAT_TEXT),
        (DEFAULT_CORRECTION, DEFAULT_CORRECTION_TEXT),
        (DEFAULT_GUIDANCE, DEFAULT_GUIDANCE_TEXT),
        (DEFAULT_PARAGRAPH, DEFAULT_PARAGRAPH_TEXT),
    ]
}

pub const DEFAULT_CHAT_TEXT: &str = r#"Translate the following chat message into {{target_lang}}.

Rules:
- Keep ALL placeholders like [[__VAR_0__]] unchanged; never translate or reshape them.
- Preserve the original line breaks and paragraph count exactly.
- Output ONLY the translation, with no explanations or greetings."#;

pub const DEFAULT_CORRECTION_TEXT: &str = r#"You are a translation proofreader following the principle of minimal intervention: preserve the draft's style and wording, and surgically fix only clear errors.

Rules:
- Do NOT rewrite sentences that are already correct.
- Replace stray foreign-language words (wrong-script leakage) with natural {{target_lang}}.
- Keep ALL placeholders like [[__VAR_0__]] unchanged.
- Output ONLY the complete corrected translation."#;

pub const DEFAULT_GUIDANCE_TEXT: &str = r#"You are a {{target_lang}} translation proofreader. Correct the draft translation precisely according to the additional guidance below.

Rules:
- Do NOT rewrite sentences the guidance does not touch.
- Keep ALL placeholders like [[__VAR_0__]] unchanged.
- Output ONLY the complete corrected translation."#;

pub const DEFAULT_PARAGRAPH_TEXT: &str = r#"You are a text-structure corrector. The draft translation's line breaks and paragraph count do not match the source. Make the translation's structure match the source exactly.

Rules:
- Do NOT re-translate or rephrase; only move line breaks and paragraph boundaries.
- Keep single and double blank lines distinct, exactly as in the source.
- Keep ALL placeholders like [[__VAR_0__]] unchanged.
- Output ONLY the restructured translation."#;
