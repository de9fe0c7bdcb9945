use std::path::{Path, PathBuf};

use anyhow::Context;

/// Writes per-message stage snapshots (masked text, prompt, raw reply, ...)
/// under one directory so a bad translation can be replayed offline.
pub struct TraceWriter {
    dir: PathBuf,
    enabled: bool,
}

impl TraceWriter {
    pub fn new(dir: &Path, enabled: bool) -> Self {
        Self {
            dir: dir.to_path_buf(),
            enabled,
        }
    }

    pub fn disabled() -> Self {
        Self {
            dir: PathBuf::new(),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Snapshot one pipeline stage for one message, e.g.
    /// `msg_000042.masked.txt`. Trace failures are reported, never fatal.
    pub fn write_stage(&self, message_id: u64, stage: &str, text: &str) -> anyhow::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let name = format!("msg_{message_id:06}.{}.txt", sanitize_filename(stage));
        self.write_named(&name, text)
    }

    pub fn write_named(&self, filename: &str, text: &str) -> anyhow::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create trace dir: {}", self.dir.display()))?;
        let path = self.dir.join(sanitize_filename(filename));
        std::fs::write(&path, text).with_context(|| format!("write trace: {}", path.display()))?;
        Ok(())
    }
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
