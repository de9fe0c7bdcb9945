use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::Parser;

use chatfold::backend::{CommandBackend, TranslationBackend};
use chatfold::cache::TranslationStore;
use chatfold::pipeline::{
    init_default_config, ChatTranslator, CliOverrides, PipelineConfig, RetranslateKind,
};
use chatfold::process_translation_text;
use chatfold::progress::ConsoleProgress;

/// Translate chat messages and render them as foldable bilingual markup.
#[derive(Parser, Debug)]
#[command(name = "chatfold", version, about)]
struct Args {
    /// Original (source-language) text file.
    #[arg(value_name = "ORIGINAL")]
    original: Option<PathBuf>,

    /// Already-translated text file: render only, no backend call.
    #[arg(short = 't', long, value_name = "FILE")]
    translated: Option<PathBuf>,

    /// Display mode: disabled, folded, unfolded, or original_first.
    #[arg(long, value_name = "MODE")]
    mode: Option<String>,

    /// Pair paragraphs positionally even when the counts differ.
    #[arg(long)]
    force_sequential: bool,

    /// Message id used for in-flight tracking and trace filenames.
    #[arg(long, value_name = "ID", default_value_t = 0)]
    message_id: u64,

    /// Config file (default: CHATFOLD_CONFIG, then chatfold.toml upwards).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Translation command: prompt on stdin, translation on stdout.
    #[arg(long, value_name = "CMD")]
    backend_cmd: Option<String>,

    /// Target language name used in the prompts.
    #[arg(long, value_name = "LANG")]
    target_lang: Option<String>,

    /// Write the rendered markup here instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Re-translate even when a cached translation exists; with
    /// --init-config, overwrite existing files.
    #[arg(long)]
    force: bool,

    /// Write a starter config and prompt files, then exit.
    #[arg(long)]
    init_config: bool,

    /// Directory for --init-config (default: current directory).
    #[arg(long, value_name = "DIR")]
    init_config_dir: Option<PathBuf>,

    /// Rerun the cached translation through a retranslation prompt:
    /// correction, guidance, or paragraph.
    #[arg(long, value_name = "KIND")]
    retranslate: Option<String>,

    /// Guidance text for --retranslate guidance.
    #[arg(long, value_name = "TEXT")]
    guidance: Option<String>,

    /// Cache override (default from config).
    #[arg(long, value_name = "FILE")]
    cache: Option<PathBuf>,

    /// Export the translation cache to a JSON backup, then exit.
    #[arg(long, value_name = "FILE")]
    export_cache: Option<PathBuf>,

    /// Merge a JSON backup into the translation cache, then exit.
    #[arg(long, value_name = "FILE")]
    import_cache: Option<PathBuf>,

    /// Delete every cached translation, then exit.
    #[arg(long)]
    clear_cache: bool,

    /// Delete the cached translation for ORIGINAL, then exit.
    #[arg(long)]
    delete_cached: bool,

    /// Suppress status output on stderr.
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let progress = ConsoleProgress::new(!args.quiet);

    if args.init_config {
        let dir = args
            .init_config_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let path = init_default_config(&dir, args.force)?;
        progress.info(format!("wrote {}", path.display()));
        return Ok(());
    }

    let cfg = PipelineConfig::resolve(&CliOverrides {
        config_path: args.config.clone(),
        display_mode: args.mode.clone(),
        force_sequential: args.force_sequential,
        backend_command: args.backend_cmd.clone(),
        target_lang: args.target_lang.clone(),
        cache_path: args.cache.clone(),
    })?;

    if run_cache_command(&args, &cfg, &progress)? {
        return Ok(());
    }

    let original_path = args
        .original
        .as_ref()
        .ok_or_else(|| anyhow!("an ORIGINAL text file is required"))?;
    let original = std::fs::read_to_string(original_path)
        .with_context(|| format!("read original: {}", original_path.display()))?;

    if args.delete_cached {
        let mut store = TranslationStore::open(&cfg.cache_path)?;
        if store.delete(&original)? {
            progress.info("cached translation deleted");
        } else {
            progress.warn("no cached translation for this text");
        }
        return Ok(());
    }

    // Render-only path: both texts supplied, no backend involved.
    if let Some(translated_path) = &args.translated {
        let translated = std::fs::read_to_string(translated_path)
            .with_context(|| format!("read translated: {}", translated_path.display()))?;
        let outcome = process_translation_text(&original, &translated, &cfg.render);
        for err in &outcome.pattern_errors {
            progress.warn(format!(
                "invalid protection pattern {:?}: {}",
                err.pattern, err.error
            ));
        }
        for warning in &outcome.warnings {
            progress.warn(warning.to_string());
        }
        return emit(&args.output, &outcome.text);
    }

    let backend: Option<Box<dyn TranslationBackend>> = match cfg.backend_command.as_deref() {
        Some(cmd) => Some(Box::new(CommandBackend::from_command_line(cmd)?)),
        None => None,
    };
    let mut translator = ChatTranslator::new(cfg, progress, backend)?;

    let result = match &args.retranslate {
        Some(kind) => translator.retranslate_message(
            args.message_id,
            &original,
            RetranslateKind::parse(kind)?,
            args.guidance.as_deref(),
        )?,
        None => translator.translate_message(args.message_id, &original, args.force)?,
    };

    emit(&args.output, &result.markup)
}

/// Runs the standalone cache maintenance commands. Returns true when one ran.
fn run_cache_command(
    args: &Args,
    cfg: &PipelineConfig,
    progress: &ConsoleProgress,
) -> anyhow::Result<bool> {
    if let Some(path) = &args.export_cache {
        let store = TranslationStore::open(&cfg.cache_path)?;
        store.export(path)?;
        progress.info(format!(
            "exported {} translation(s) to {}",
            store.len(),
            path.display()
        ));
        return Ok(true);
    }
    if let Some(path) = &args.import_cache {
        let mut store = TranslationStore::open(&cfg.cache_path)?;
        let count = store.import(path)?;
        progress.info(format!("imported {count} translation(s)"));
        return Ok(true);
    }
    if args.clear_cache {
        let mut store = TranslationStore::open(&cfg.cache_path)?;
        let count = store.len();
        store.clear()?;
        progress.info(format!("cleared {count} translation(s)"));
        return Ok(true);
    }
    Ok(false)
}

fn emit(output: &Option<PathBuf>, text: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("write output: {}", path.display())),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}
