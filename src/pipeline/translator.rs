use std::panic::{self, AssertUnwindSafe};

use anyhow::anyhow;

use crate::backend::TranslationBackend;
use crate::bilingual::{process_translation_text, RenderOutcome, RenderWarning};
use crate::cache::TranslationStore;
use crate::guard::{mask_for_translation, repair_placeholders, unmask};
use crate::inflight::InFlightRegistry;
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::prompts::render_template;
use crate::pipeline::trace::TraceWriter;
use crate::progress::ConsoleProgress;
use crate::rules::RuleSet;
use crate::textutil::correct_backticks;

/// Which retranslation prompt to use on a cached draft.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetranslateKind {
    /// Minimal-intervention proofread of the existing translation.
    Correction,
    /// Proofread steered by user-supplied guidance text.
    Guidance,
    /// Fix line-break and paragraph structure only.
    Paragraph,
}

impl RetranslateKind {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "correction" => Ok(Self::Correction),
            "guidance" => Ok(Self::Guidance),
            "paragraph" => Ok(Self::Paragraph),
            other => Err(anyhow!(
                "unknown retranslate kind: {other} (expected correction, guidance, or paragraph)"
            )),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Correction => "correction",
            Self::Guidance => "guidance",
            Self::Paragraph => "paragraph",
        }
    }
}

/// Result of one translate+render cycle.
#[derive(Clone, Debug)]
pub struct TranslatedMessage {
    pub message_id: u64,
    pub markup: String,
    pub from_cache: bool,
    pub warnings: Vec<RenderWarning>,
}

/// Drives the full cycle for chat messages: in-flight claim, cache lookup,
/// backend call with placeholder masking, cache write, bilingual render.
pub struct ChatTranslator {
    cfg: PipelineConfig,
    progress: ConsoleProgress,
    trace: TraceWriter,
    store: TranslationStore,
    backend: Option<Box<dyn TranslationBackend>>,
    inflight: InFlightRegistry,
}

impl ChatTranslator {
    pub fn new(
        cfg: PipelineConfig,
        progress: ConsoleProgress,
        backend: Option<Box<dyn TranslationBackend>>,
    ) -> anyhow::Result<Self> {
        let trace = TraceWriter::new(&cfg.trace_dir, cfg.trace_stages);
        let store = TranslationStore::open(&cfg.cache_path)?;
        Ok(Self {
            cfg,
            progress,
            trace,
            store,
            backend,
            inflight: InFlightRegistry::new(),
        })
    }

    pub fn store(&self) -> &TranslationStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TranslationStore {
        &mut self.store
    }

    /// Translates one message, serving from the cache unless `force` is set,
    /// and renders the bilingual markup.
    pub fn translate_message(
        &mut self,
        message_id: u64,
        original: &str,
        force: bool,
    ) -> anyhow::Result<TranslatedMessage> {
        let _slot = self
            .inflight
            .try_begin(message_id)
            .ok_or_else(|| anyhow!("message {message_id} is already being translated"))?;

        if !force {
            if let Some(cached) = self.store.get(original) {
                let cached = cached.to_string();
                self.progress.info(format!("message {message_id}: cache hit"));
                return Ok(self.render_message(message_id, original, &cached, true));
            }
        }

        let prompt = self.chat_prompt();
        let translation = self.fetch_translation(message_id, original, &prompt)?;
        self.store.put(original, &translation)?;
        Ok(self.render_message(message_id, original, &translation, false))
    }

    /// Re-runs a cached translation through one of the retranslation prompts,
    /// replacing the cache entry. Falls back to a fresh translation when no
    /// draft is cached.
    pub fn retranslate_message(
        &mut self,
        message_id: u64,
        original: &str,
        kind: RetranslateKind,
        guidance: Option<&str>,
    ) -> anyhow::Result<TranslatedMessage> {
        let _slot = self
            .inflight
            .try_begin(message_id)
            .ok_or_else(|| anyhow!("message {message_id} is already being translated"))?;

        let Some(existing) = self.store.get(original).map(str::to_string) else {
            self.progress.warn(format!(
                "message {message_id}: no cached draft to {}; translating fresh",
                kind.label()
            ));
            let prompt = self.chat_prompt();
            let translation = self.fetch_translation(message_id, original, &prompt)?;
            self.store.put(original, &translation)?;
            return Ok(self.render_message(message_id, original, &translation, false));
        };

        let kind = match (kind, guidance) {
            (RetranslateKind::Guidance, None) => {
                self.progress
                    .warn("guidance retranslation without guidance text; using correction");
                RetranslateKind::Correction
            }
            (kind, _) => kind,
        };

        let mut prompt = match kind {
            RetranslateKind::Correction => self.template(&self.cfg.prompts.correction),
            RetranslateKind::Guidance => self.template(&self.cfg.prompts.guidance),
            RetranslateKind::Paragraph => self.template(&self.cfg.prompts.paragraph),
        };
        if kind == RetranslateKind::Guidance {
            if let Some(text) = guidance {
                prompt.push_str("\n\n[Additional Guidance]:\n");
                prompt.push_str(text);
            }
        }
        prompt = self.with_rules(prompt);

        // The draft rides along so the model corrects instead of re-translating.
        let subject = format!("[Original Text]:\n{original}\n\n[Translated Text]:\n{existing}");
        let translation = self.fetch_with_subject(message_id, &subject, &prompt)?;

        self.store.delete(original)?;
        self.store.put(original, &translation)?;
        Ok(self.render_message(message_id, original, &translation, false))
    }

    /// Translates a batch front to back, skipping cached messages and pausing
    /// `throttle_delay` between backend calls. Returns the number of messages
    /// actually sent to the backend.
    pub fn translate_batch(
        &mut self,
        messages: &[(u64, String)],
        force: bool,
    ) -> anyhow::Result<usize> {
        let total = messages.len();
        let mut sent = 0;
        for (index, (message_id, original)) in messages.iter().enumerate() {
            self.progress.progress("translating", index, total);
            let result = self.translate_message(*message_id, original, force)?;
            if !result.from_cache {
                sent += 1;
                if !self.cfg.throttle_delay.is_zero() && index + 1 < total {
                    std::thread::sleep(self.cfg.throttle_delay);
                }
            }
        }
        self.progress.progress("translating", total, total);
        Ok(sent)
    }

    fn chat_prompt(&self) -> String {
        self.with_rules(self.template(&self.cfg.prompts.chat))
    }

    fn template(&self, template: &str) -> String {
        render_template(template, &[("target_lang", &self.cfg.target_lang)])
    }

    fn with_rules(&self, mut prompt: String) -> String {
        if let Some(rules) = self.cfg.prompts.rules.as_deref() {
            prompt.push_str("\n\n[Additional Rules]:\n");
            prompt.push_str(rules);
        }
        prompt
    }

    fn fetch_translation(
        &mut self,
        message_id: u64,
        original: &str,
        prompt: &str,
    ) -> anyhow::Result<String> {
        self.fetch_with_subject(message_id, original, prompt)
    }

    /// Masks the subject text, sends it with the prompt, repairs and unmasks
    /// the reply.
    fn fetch_with_subject(
        &mut self,
        message_id: u64,
        subject: &str,
        prompt: &str,
    ) -> anyhow::Result<String> {
        let backend = self
            .backend
            .as_ref()
            .ok_or_else(|| anyhow!("no translation backend configured"))?;

        let (rules, pattern_errors) = RuleSet::compile(
            &self.cfg.render.user_translate_protect_patterns,
            &self.cfg.render.user_fold_protect_patterns,
        );
        for err in &pattern_errors {
            self.progress
                .warn(format!("invalid protection pattern {:?}: {}", err.pattern, err.error));
        }

        let masked = mask_for_translation(subject, &rules);
        self.trace_stage(message_id, "masked", &masked.text);

        let request = format!("{prompt}\n\n{}", masked.text);
        self.trace_stage(message_id, "prompt", &request);

        self.progress
            .info(format!("message {message_id}: sending to {}", backend.name()));
        let raw = backend.send(&request)?;
        self.trace_stage(message_id, "raw", &raw);

        let repaired = repair_placeholders(&raw);
        let (restored, report) = unmask(&repaired, &masked.spans);
        if !report.is_complete() {
            self.progress.warn(format!(
                "message {message_id}: {} of {} protected placeholders lost by the model",
                report.expected - report.found,
                report.expected
            ));
        }
        self.trace_stage(message_id, "restored", &restored);
        Ok(restored)
    }

    fn render_message(
        &self,
        message_id: u64,
        original: &str,
        translation: &str,
        from_cache: bool,
    ) -> TranslatedMessage {
        let outcome = render_or_fallback(original, translation, &self.cfg);
        for err in &outcome.pattern_errors {
            self.progress
                .warn(format!("invalid protection pattern {:?}: {}", err.pattern, err.error));
        }
        for warning in &outcome.warnings {
            self.progress.warn(format!("message {message_id}: {warning}"));
        }
        self.trace_stage(message_id, "rendered", &outcome.text);
        TranslatedMessage {
            message_id,
            markup: outcome.text,
            from_cache,
            warnings: outcome.warnings,
        }
    }

    fn trace_stage(&self, message_id: u64, stage: &str, text: &str) {
        if let Err(err) = self.trace.write_stage(message_id, stage, text) {
            self.progress.warn(format!("trace write failed: {err:#}"));
        }
    }
}

/// Rendering must never take the translation down with it: if the render path
/// panics, fall back to the backtick-corrected translation alone.
fn render_or_fallback(original: &str, translation: &str, cfg: &PipelineConfig) -> RenderOutcome {
    let render = &cfg.render;
    panic::catch_unwind(AssertUnwindSafe(|| {
        process_translation_text(original, translation, render)
    }))
    .unwrap_or_else(|_| RenderOutcome {
        text: correct_backticks(translation),
        warnings: Vec::new(),
        pattern_errors: Vec::new(),
    })
}
