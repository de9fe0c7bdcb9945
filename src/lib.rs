//! Reversible structural protection and bilingual rendering for
//! machine-translated chat text.
//!
//! The core path masks fragile spans out of both texts, aligns the translated
//! and original paragraphs, renders them as foldable bilingual markup, and
//! restores every masked span byte for byte. A second grammar protects the
//! same spans across the round trip to the translation model itself. The
//! `pipeline` module wraps the core with prompt assembly, an external
//! backend, and a persistent translation cache.

pub mod backend;
pub mod bilingual;
pub mod cache;
pub mod config;
pub mod ffi;
pub mod guard;
pub mod inflight;
pub mod isolator;
pub mod pipeline;
pub mod progress;
pub mod render;
pub mod restore;
pub mod rules;
pub mod skeleton;
pub mod textutil;
pub mod tokens;

pub use bilingual::{process_translation_text, RenderOutcome, RenderWarning};
pub use config::{DisplayMode, RenderConfig};
pub use guard::{mask_for_translation, repair_placeholders, unmask, MaskedForTranslation};
pub use pipeline::{ChatTranslator, PipelineConfig};
