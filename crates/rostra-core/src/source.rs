//! Provenance tags written to employee documents.
//!
//! Every write records which channel produced it (`email` attachments or the
//! `kafka` event stream) and whether it was a snapshot upsert or a delta.
//! Downstream consumers key off the literal tag strings, so the rendering
//! here must stay stable.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Ingestion channel that produced a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestChannel {
    /// CSV/XLSX/JSON attachments arriving by mailbox or direct upload.
    Email,
    /// The partitioned event stream.
    Kafka,
}

impl IngestChannel {
    /// The tag segment for this channel.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Kafka => "kafka",
        }
    }
}

/// Kind of write: full-roster upsert or single-employee delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestKind {
    /// Create-or-update row from a snapshot.
    Upsert,
    /// Single-employee status transition.
    Delta,
}

impl IngestKind {
    /// The tag segment for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upsert => "upsert",
            Self::Delta => "delta",
        }
    }
}

/// Combined provenance tag, rendered as `<channel>:<kind>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceTag {
    pub channel: IngestChannel,
    pub kind: IngestKind,
}

impl SourceTag {
    /// Build a tag from its parts.
    #[must_use]
    pub fn new(channel: IngestChannel, kind: IngestKind) -> Self {
        Self { channel, kind }
    }

    /// Render the stored form, e.g. `kafka:upsert`.
    #[must_use]
    pub fn render(&self) -> String {
        format!("{}:{}", self.channel.as_str(), self.kind.as_str())
    }
}

impl Display for SourceTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.channel.as_str(), self.kind.as_str())
    }
}
