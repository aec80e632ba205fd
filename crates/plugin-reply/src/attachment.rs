use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use async_trait::async_trait;
use plugin_core::Attachment;
use reqwest::header::USER_AGENT;
use tempfile::TempDir;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Video,
    Other,
}

/// Evaluated in order; the first rule listing the extension wins.
const KIND_RULES: &[(AttachmentKind, &[&str])] = &[
    (AttachmentKind::Image, &[".jpg", ".png", ".jpeg", ".gif", ".gifv"]),
    (AttachmentKind::Video, &[".mp4", ".avi", ".flv", ".mov", ".wmv"]),
];

/// Classifies by the filename's final extension. Case-sensitive.
#[must_use]
pub fn classify(filename: &str) -> AttachmentKind {
    let Some(dot) = filename.rfind('.') else {
        return AttachmentKind::Other;
    };
    let ext = &filename[dot..];
    KIND_RULES
        .iter()
        .find(|(_, exts)| exts.contains(&ext))
        .map_or(AttachmentKind::Other, |(kind, _)| *kind)
}

#[async_trait]
pub trait AttachmentFetcher: Send + Sync {
    async fn fetch(&self, url: &str, user_agent: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    #[must_use]
    pub const fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AttachmentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, user_agent: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .send()
            .await
            .context("requesting attachment")?
            .error_for_status()
            .context("attachment host refused download")?;
        let bytes = resp.bytes().await.context("reading attachment body")?;
        Ok(bytes.to_vec())
    }
}

/// A downloaded attachment parked on disk under its original filename.
/// The backing directory is removed on drop.
#[derive(Debug)]
pub struct StagedAttachment {
    path: PathBuf,
    _dir: TempDir,
}

impl StagedAttachment {
    pub async fn download(
        fetcher: &dyn AttachmentFetcher,
        attachment: &Attachment,
        user_agent: &str,
    ) -> Result<Self> {
        let bytes = fetcher
            .fetch(&attachment.url, user_agent)
            .await
            .with_context(|| format!("downloading {}", attachment.filename))?;
        if bytes.is_empty() {
            bail!("downloaded {} is empty", attachment.filename);
        }

        let dir = tempfile::Builder::new()
            .prefix("quote-reply-")
            .tempdir()
            .context("creating staging directory")?;
        let path = dir.path().join(file_name(&attachment.filename));
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        debug!(file = %path.display(), bytes = bytes.len(), "Staged attachment");

        Ok(Self { path, _dir: dir })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

// Platform filenames are untrusted; keep only the last path component.
fn file_name(raw: &str) -> &str {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    if name.is_empty() || name == "." || name == ".." {
        "attachment"
    } else {
        name
    }
}
