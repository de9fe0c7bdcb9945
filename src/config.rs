use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Shape of the rendered markup only; protection and alignment logic do not
/// change with the mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayMode {
    Disabled,
    Folded,
    Unfolded,
    OriginalFirst,
}

impl DisplayMode {
    pub fn parse(s: Option<&str>) -> Self {
        match s.unwrap_or("disabled").trim().to_ascii_lowercase().as_str() {
            "folded" => Self::Folded,
            "unfolded" => Self::Unfolded,
            "original_first" | "original-first" => Self::OriginalFirst,
            _ => Self::Disabled,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Folded => "folded",
            Self::Unfolded => "unfolded",
            Self::OriginalFirst => "original_first",
        }
    }
}

/// Everything one render call needs, supplied explicitly by the caller.
/// Immutable for the duration of the call; the core keeps no global state.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub display_mode: DisplayMode,
    pub force_sequential_matching: bool,
    pub user_translate_protect_patterns: Vec<String>,
    pub user_fold_protect_patterns: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            display_mode: DisplayMode::Folded,
            force_sequential_matching: false,
            user_translate_protect_patterns: Vec::new(),
            user_fold_protect_patterns: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub render: RenderSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub prompts: PromptsSection,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct RenderSection {
    /// "disabled", "folded", "unfolded", or "original_first".
    #[serde(default)]
    pub display_mode: Option<String>,

    /// Opt-in to positional pairing even when paragraph counts differ.
    #[serde(default)]
    pub force_sequential_matching: Option<bool>,

    /// Extra translate-protect patterns, each `/body/flags` or a plain body.
    #[serde(default)]
    pub translate_protect_patterns: Option<Vec<String>>,

    /// Extra fold-protect patterns, same syntax.
    #[serde(default)]
    pub fold_protect_patterns: Option<Vec<String>>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PipelineSection {
    /// External translation command; receives the prompt on stdin and prints
    /// the translation on stdout.
    #[serde(default)]
    pub backend_command: Option<String>,

    #[serde(default)]
    pub target_lang: Option<String>,

    /// Delay between messages in batch translation.
    #[serde(default)]
    pub throttle_delay_ms: Option<u64>,

    #[serde(default)]
    pub cache_path: Option<String>,

    #[serde(default)]
    pub trace_dir: Option<String>,
    #[serde(default)]
    pub trace_stages: Option<bool>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PromptsSection {
    #[serde(default)]
    pub chat: Option<String>,
    #[serde(default)]
    pub correction: Option<String>,
    #[serde(default)]
    pub guidance: Option<String>,
    #[serde(default)]
    pub paragraph: Option<String>,

    /// Optional extra rules prepended to every prompt as `[Additional Rules]`.
    #[serde(default)]
    pub rules: Option<String>,
}

impl RenderSection {
    pub fn to_render_config(&self) -> RenderConfig {
        RenderConfig {
            display_mode: DisplayMode::parse(self.display_mode.as_deref()),
            force_sequential_matching: self.force_sequential_matching.unwrap_or(false),
            user_translate_protect_patterns: self
                .translate_protect_patterns
                .clone()
                .unwrap_or_default(),
            user_fold_protect_patterns: self.fold_protect_patterns.clone().unwrap_or_default(),
        }
    }
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: AppConfig = toml::from_str(&text).context("parse config toml")?;
    Ok(cfg)
}

pub fn find_file_upwards(start: &Path, filename: &str, max_depth: usize) -> Option<PathBuf> {
    let mut dir = Some(start.to_path_buf());
    for _ in 0..=max_depth {
        let d = dir?;
        let candidate = d.join(filename);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = d.parent().map(|p| p.to_path_buf());
    }
    None
}

pub fn find_default_config(workdir: &Path, filename: &str) -> Option<PathBuf> {
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(p) = find_file_upwards(&cwd, filename, 8) {
            return Some(p);
        }
    }
    if let Some(p) = find_file_upwards(workdir, filename, 8) {
        return Some(p);
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            if let Some(p) = find_file_upwards(dir, filename, 10) {
                return Some(p);
            }
        }
    }
    None
}
