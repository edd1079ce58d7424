use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileCategory {
    All,
    Image,
    Audio,
    Video,
    Document,
    Archive,
    Other,
}

impl FileCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Document => "document",
            Self::Archive => "archive",
            Self::Other => "other",
        }
    }
}

pub type CategoryCounts = BTreeMap<FileCategory, u64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Name,
    Size,
    CreatedAt,
    ModifiedAt,
    LastAccessed,
    FileType,
}

impl SortField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Size => "size",
            Self::CreatedAt => "created_at",
            Self::ModifiedAt => "modified_at",
            Self::LastAccessed => "last_accessed",
            Self::FileType => "file_type",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortOptions {
    pub field: SortField,
    pub order: SortOrder,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            field: SortField::ModifiedAt,
            order: SortOrder::Desc,
        }
    }
}

/// "All watched directories" or one specific directory by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryScope {
    All,
    Directory(String),
}

impl DirectoryScope {
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directory {
    pub id: String,
    pub path: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub id: String,
    pub path: String,
    pub name: String,
    pub directory_id: String,
    pub size: u64,
    pub mime_type: Option<String>,
    pub is_directory: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    pub last_accessed: Option<DateTime<Utc>>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// One primary result row as returned by the backend, before enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredFile {
    pub file: FileEntry,
    pub score: f64,
}

/// One visible result row: the primary file plus its tag enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileHit {
    pub file: FileEntry,
    pub tags: Vec<Tag>,
    pub score: f64,
}

/// One backend page: primary rows plus the count maps computed by the same
/// query, so the caller can commit them as a unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePage {
    pub files: Vec<ScoredFile>,
    pub total_count: u64,
    pub category_counts: CategoryCounts,
    pub total_category_counts: CategoryCounts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetadataLogic {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataOperator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataFilter {
    pub key_id: String,
    pub value: String,
    pub operator: MetadataOperator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetadataDataType {
    Text,
    Number,
    Date,
    Boolean,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomMetadataKey {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub data_type: MetadataDataType,
    pub description: Option<String>,
    pub is_required: bool,
    pub default_value: Option<String>,
    pub validation_pattern: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMetadataKeyRequest {
    pub name: String,
    pub display_name: String,
    pub data_type: MetadataDataType,
    pub description: Option<String>,
    pub is_required: bool,
    pub default_value: Option<String>,
    pub validation_pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMetadataKeyRequest {
    pub display_name: String,
    pub data_type: MetadataDataType,
    pub description: Option<String>,
    pub is_required: bool,
    pub default_value: Option<String>,
    pub validation_pattern: Option<String>,
}

/// Removing a directory may cascade-delete tags that only it used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryRemovalResult {
    pub deleted_tags_count: u64,
    pub deleted_tag_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSettings {
    pub files_per_page: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self { files_per_page: 20 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingSteps {
    pub directories: bool,
    pub tags: bool,
    pub files: bool,
}
