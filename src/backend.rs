use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{anyhow, Context};

/// The translation backend is an external collaborator: it gets a fully
/// assembled prompt and returns the translated text. Network, auth, and retry
/// concerns live behind this seam.
pub trait TranslationBackend {
    fn name(&self) -> &str;
    fn send(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Backend that pipes the prompt into an external command's stdin and reads
/// the translation from its stdout. Lets any provider CLI plug in without
/// this crate carrying network code.
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
}

impl CommandBackend {
    pub fn from_command_line(cmdline: &str) -> anyhow::Result<Self> {
        let mut parts = cmdline.split_whitespace().map(|s| s.to_string());
        let program = parts
            .next()
            .ok_or_else(|| anyhow!("empty backend command"))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl TranslationBackend for CommandBackend {
    fn name(&self) -> &str {
        &self.program
    }

    fn send(&self, prompt: &str) -> anyhow::Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn backend: {}", self.program))?;

        child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("backend stdin unavailable"))?
            .write_all(prompt.as_bytes())
            .context("write prompt to backend")?;

        let output = child.wait_with_output().context("wait for backend")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "backend {} failed ({}): {}",
                self.program,
                output.status,
                stderr.trim()
            ));
        }

        let text = String::from_utf8(output.stdout).context("backend output not UTF-8")?;
        let text = text.trim_end_matches('\n').to_string();
        if text.trim().is_empty() {
            return Err(anyhow!("backend {} returned empty translation", self.program));
        }
        Ok(text)
    }
}
