use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context};

use crate::config::{self, AppConfig, DisplayMode, RenderConfig};
use crate::pipeline::prompts::{self, PromptCatalog};

pub const DEFAULT_CONFIG_FILENAME: &str = "chatfold.toml";
pub const CONFIG_ENV_VAR: &str = "CHATFOLD_CONFIG";

const DEFAULT_TARGET_LANG: &str = "Korean";
const DEFAULT_CACHE_FILENAME: &str = "chatfold-cache.json";
const DEFAULT_TRACE_DIRNAME: &str = "_trace";

/// Overrides from the command line; anything left None falls through to the
/// config file, then to the built-in default.
#[derive(Clone, Debug, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub display_mode: Option<String>,
    pub force_sequential: bool,
    pub backend_command: Option<String>,
    pub target_lang: Option<String>,
    pub cache_path: Option<PathBuf>,
}

/// Fully resolved settings for one pipeline run.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Where the config file was found (or would live), used as the anchor for
    /// relative cache/trace/prompt paths.
    pub config_path: PathBuf,
    pub render: RenderConfig,
    pub backend_command: Option<String>,
    pub target_lang: String,
    pub throttle_delay: Duration,
    pub cache_path: PathBuf,
    pub trace_dir: PathBuf,
    pub trace_stages: bool,
    pub prompts: PromptCatalog,
}

impl PipelineConfig {
    /// Loads the config file (explicit path, then `CHATFOLD_CONFIG`, then an
    /// upward search for `chatfold.toml`) and applies CLI overrides on top.
    pub fn resolve(overrides: &CliOverrides) -> anyhow::Result<Self> {
        let (config_path, app) = load_app_config(overrides.config_path.as_deref())?;
        let config_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut render = app.render.to_render_config();
        if let Some(mode) = overrides.display_mode.as_deref() {
            render.display_mode = DisplayMode::parse(Some(mode));
        }
        if overrides.force_sequential {
            render.force_sequential_matching = true;
        }

        let backend_command = overrides
            .backend_command
            .clone()
            .or_else(|| app.pipeline.backend_command.clone());

        let target_lang = overrides
            .target_lang
            .clone()
            .or_else(|| app.pipeline.target_lang.clone())
            .unwrap_or_else(|| DEFAULT_TARGET_LANG.to_string());

        let cache_path = overrides
            .cache_path
            .clone()
            .or_else(|| app.pipeline.cache_path.as_deref().map(PathBuf::from))
            .map(|p| anchor_path(&config_dir, p))
            .unwrap_or_else(|| config_dir.join(DEFAULT_CACHE_FILENAME));

        let trace_dir = app
            .pipeline
            .trace_dir
            .as_deref()
            .map(|p| anchor_path(&config_dir, PathBuf::from(p)))
            .unwrap_or_else(|| config_dir.join(DEFAULT_TRACE_DIRNAME));

        let prompts = PromptCatalog::load(&config_path, &app.prompts)?;

        Ok(Self {
            config_path,
            render,
            backend_command,
            target_lang,
            throttle_delay: Duration::from_millis(app.pipeline.throttle_delay_ms.unwrap_or(0)),
            cache_path,
            trace_dir,
            trace_stages: app.pipeline.trace_stages.unwrap_or(false),
            prompts,
        })
    }
}

fn anchor_path(config_dir: &Path, p: PathBuf) -> PathBuf {
    if p.is_relative() {
        config_dir.join(p)
    } else {
        p
    }
}

fn load_app_config(explicit: Option<&Path>) -> anyhow::Result<(PathBuf, AppConfig)> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(anyhow!("config file not found: {}", path.display()));
        }
        return Ok((path.to_path_buf(), config::load_config(path)?));
    }
    if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
        let path = PathBuf::from(env_path);
        if !path.is_file() {
            return Err(anyhow!(
                "{CONFIG_ENV_VAR} points to a missing file: {}",
                path.display()
            ));
        }
        return Ok((path.clone(), config::load_config(&path)?));
    }
    let workdir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    match config::find_default_config(&workdir, DEFAULT_CONFIG_FILENAME) {
        Some(path) => {
            let app = config::load_config(&path)?;
            Ok((path, app))
        }
        // No config anywhere: run on built-in defaults, anchored to the cwd.
        None => Ok((workdir.join(DEFAULT_CONFIG_FILENAME), AppConfig::default())),
    }
}

/// Writes a starter `chatfold.toml` plus the default prompt files into `dir`.
/// Refuses to overwrite existing files unless `force` is set.
pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;

    let config_path = dir.join(DEFAULT_CONFIG_FILENAME);
    if config_path.exists() && !force {
        return Err(anyhow!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        ));
    }
    std::fs::write(&config_path, DEFAULT_CONFIG_TEXT)
        .with_context(|| format!("write config: {}", config_path.display()))?;

    let prompts_dir = dir.join(prompts::DEFAULT_PROMPTS_DIR);
    std::fs::create_dir_all(&prompts_dir)
        .with_context(|| format!("create prompts dir: {}", prompts_dir.display()))?;
    for (name, text) in prompts::default_prompt_files() {
        let path = prompts_dir.join(name);
        if path.exists() && !force {
            continue;
        }
        std::fs::write(&path, text)
            .with_context(|| format!("write prompt: {}", path.display()))?;
    }

    Ok(config_path)
}

const DEFAULT_CONFIG_TEXT: &str = r#"# chatfold configuration

[render]
# "disabled", "folded", "unfolded", or "original_first".
display_mode = "folded"
# Pair paragraphs positionally even when the counts differ.
force_sequential_matching = false
# Extra protection patterns, each "/body/flags" or a plain body.
translate_protect_patterns = []
fold_protect_patterns = []

[pipeline]
# External translation command: prompt on stdin, translation on stdout.
# backend_command = "my-translate-cli --model fast"
target_lang = "Korean"
throttle_delay_ms = 0
cache_path = "chatfold-cache.json"
trace_dir = "_trace"
trace_stages = false

[prompts]
chat = "prompts/chat.txt"
correction = "prompts/correction.txt"
guidance = "prompts/guidance.txt"
paragraph = "prompts/paragraph.txt"
# rules = "Translate names as-is."
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "chatfold-plcfg-test-{name}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).expect("mkdir");
        dir
    }

    #[test]
    fn init_writes_config_and_prompts() {
        let dir = temp_dir("init");
        let path = init_default_config(&dir, false).expect("init");
        assert!(path.is_file());
        assert!(dir.join("prompts").join("chat.txt").is_file());

        // Re-running without force must not clobber.
        assert!(init_default_config(&dir, false).is_err());
        assert!(init_default_config(&dir, true).is_ok());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn default_config_text_parses_and_resolves() {
        let dir = temp_dir("parse");
        let path = init_default_config(&dir, false).expect("init");
        let cfg = PipelineConfig::resolve(&CliOverrides {
            config_path: Some(path),
            ..CliOverrides::default()
        })
        .expect("resolve");
        assert_eq!(cfg.render.display_mode, DisplayMode::Folded);
        assert_eq!(cfg.target_lang, "Korean");
        assert_eq!(cfg.cache_path, dir.join("chatfold-cache.json"));
        assert!(!cfg.trace_stages);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn cli_overrides_win_over_config() {
        let dir = temp_dir("override");
        let path = init_default_config(&dir, false).expect("init");
        let cfg = PipelineConfig::resolve(&CliOverrides {
            config_path: Some(path),
            display_mode: Some("unfolded".to_string()),
            force_sequential: true,
            backend_command: Some("cat".to_string()),
            target_lang: Some("Japanese".to_string()),
            cache_path: Some(PathBuf::from("/tmp/other-cache.json")),
        })
        .expect("resolve");
        assert_eq!(cfg.render.display_mode, DisplayMode::Unfolded);
        assert!(cfg.render.force_sequential_matching);
        assert_eq!(cfg.backend_command.as_deref(), Some("cat"));
        assert_eq!(cfg.target_lang, "Japanese");
        assert_eq!(cfg.cache_path, PathBuf::from("/tmp/other-cache.json"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
