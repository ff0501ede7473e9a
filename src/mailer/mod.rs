//! Outbound mail seam.
//!
//! The review server only ever sends confirmation codes, so the contract is
//! a single `send` call. Deployments plug an actual transport behind it;
//! the bundled implementations log the message or drop it into a local
//! directory for development setups.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

pub trait Mailer: Send + Sync {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Writes outbound messages to the log instead of delivering them.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        info!("Mail to <{}> [{}]: {}", to, subject, body);
        Ok(())
    }
}

/// Drops every message into a directory, one file per mail.
pub struct FileMailer {
    dir: PathBuf,
}

impl FileMailer {
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create mail directory {:?}", dir))?;
        Ok(FileMailer { dir })
    }
}

impl Mailer for FileMailer {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let recipient: String = to
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let path = self.dir.join(format!("{}-{}.eml", timestamp, recipient));
        let content = format!("To: {}\nSubject: {}\n\n{}\n", to, subject, body);
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write mail file {:?}", path))?;
        Ok(())
    }
}
