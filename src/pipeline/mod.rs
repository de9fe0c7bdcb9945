//! Translate-and-render pipeline around the core: prompt assembly, the
//! external backend, the persistent cache, and per-message stage traces.

pub mod config;
pub mod prompts;
pub mod trace;
pub mod translator;

pub use config::{init_default_config, CliOverrides, PipelineConfig};
pub use prompts::PromptCatalog;
pub use trace::TraceWriter;
pub use translator::{ChatTranslator, RetranslateKind, TranslatedMessage};
