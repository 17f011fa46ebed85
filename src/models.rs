//! Core data models for organizations, text units, and interaction records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Location tag stamped on every organization at creation time.
pub const ORG_LOCATION: &str = "global";

/// A registered knowledge domain with its own isolated index and history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    /// Unique id, generated exactly once at creation and never reused.
    pub org_id: String,
    pub name: String,
    pub description: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
    /// Mode-specific ingestion payload (automatic XOR manual).
    pub payload: IngestionPayload,
}

/// Mode-specific payload persisted with an organization.
///
/// A tagged variant rather than an all-optional record, so an organization
/// carrying both PDF metadata and manual fields is unrepresentable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum IngestionPayload {
    /// Derived from an uploaded PDF.
    Automatic(AutomaticPayload),
    /// Entered as structured fields by the operator.
    Manual(ManualPayload),
}

impl IngestionPayload {
    /// Mode discriminator as stored in the `organizations.mode` column.
    pub fn mode(&self) -> &'static str {
        match self {
            IngestionPayload::Automatic(_) => "automatic",
            IngestionPayload::Manual(_) => "manual",
        }
    }
}

/// PDF-derived metadata kept after automatic ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomaticPayload {
    pub source_filename: String,
    pub page_count: usize,
}

/// Structured organization description for manual ingestion.
///
/// All fields are optional except the lists' entry names; missing fields
/// render as empty strings during normalization, not omitted lines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManualPayload {
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub about: String,
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub products: Vec<Offering>,
    #[serde(default)]
    pub services: Vec<Offering>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub name: String,
    #[serde(default)]
    pub role: String,
}

/// A named product or service with descriptive detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offering {
    pub name: String,
    #[serde(default)]
    pub details: String,
}

/// Raw ingestion input before normalization.
#[derive(Debug, Clone)]
pub enum IngestSource {
    /// An uploaded binary document (PDF bytes). The bytes are staged in
    /// memory only and dropped on every exit path.
    Automatic { filename: String, bytes: Vec<u8> },
    /// Structured manual description.
    Manual(ManualPayload),
}

/// An atomic chunk of normalized text belonging to exactly one organization.
///
/// One unit per PDF page in automatic mode; exactly one synthesized
/// narrative block in manual mode.
#[derive(Debug, Clone, PartialEq)]
pub struct TextUnit {
    pub org_id: String,
    /// Zero-based, contiguous position within the organization's units.
    pub position: usize,
    pub text: String,
}

/// One question/answer exchange, appended after a successful generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub org_id: String,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}
