use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::warn;

use crate::value_utils::{non_empty, parse_calendar_date, parse_timestamp};

/// Lifecycle position of a report. Only the API moves a report between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub enum ReportStatus {
    EnCours,
    Investigation,
    TransmisAutorite,
    Classifier,
    #[default]
    Unknown,
}

impl ReportStatus {
    pub const KNOWN: [ReportStatus; 4] = [
        ReportStatus::EnCours,
        ReportStatus::Investigation,
        ReportStatus::TransmisAutorite,
        ReportStatus::Classifier,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "en_cours" => Some(Self::EnCours),
            "investigation" => Some(Self::Investigation),
            "transmis_autorite" => Some(Self::TransmisAutorite),
            "classifier" => Some(Self::Classifier),
            _ => None,
        }
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::EnCours => "en_cours",
            Self::Investigation => "investigation",
            Self::TransmisAutorite => "transmis_autorite",
            Self::Classifier => "classifier",
            Self::Unknown => "inconnu",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::EnCours => "En cours",
            Self::Investigation => "En investigation",
            Self::TransmisAutorite => "Transmis à l'autorité",
            Self::Classifier => "Classé sans suite",
            Self::Unknown => "Statut inconnu",
        }
    }
}

impl Serialize for ReportStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for ReportStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .as_deref()
            .and_then(ReportStatus::parse)
            .unwrap_or_default())
    }
}

/// Known report categories and their display labels.
pub const CATEGORIES: [(&str, &str); 7] = [
    ("faux-diplomes", "Faux diplômes"),
    ("fraude-examens", "Fraude aux examens"),
    ("corruption", "Corruption"),
    ("abus-pouvoir", "Abus de pouvoir"),
    ("harcelement", "Harcèlement"),
    ("detournement", "Détournement de fonds"),
    ("divers", "Divers"),
];

/// Display label for a category id; unknown ids are shown as-is.
pub fn category_label(id: &str) -> &str {
    CATEGORIES
        .iter()
        .find(|(known, _)| *known == id)
        .map(|(_, label)| *label)
        .unwrap_or(id)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachmentDescriptor {
    #[serde(default, alias = "filename", alias = "original_name")]
    pub name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default, alias = "mime")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attachment {
    Name(String),
    Descriptor(AttachmentDescriptor),
}

impl Attachment {
    pub fn display_name(&self) -> String {
        match self {
            Attachment::Name(name) => name.clone(),
            Attachment::Descriptor(desc) => non_empty(desc.name.as_deref())
                .or_else(|| {
                    non_empty(desc.path.as_deref())
                        .and_then(|path| path.rsplit(['/', '\\']).next())
                })
                .unwrap_or("fichier")
                .to_string(),
        }
    }
}

/// `files` as it arrives on the wire: either a JSON-encoded string or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ReportFiles {
    List(Vec<Attachment>),
    Encoded(String),
}

impl ReportFiles {
    pub fn into_attachments(self) -> Vec<Attachment> {
        match self {
            ReportFiles::List(items) => items,
            ReportFiles::Encoded(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Vec::new();
                }
                match serde_json::from_str::<Vec<Attachment>>(trimmed) {
                    Ok(items) => items,
                    Err(err) => {
                        warn!(error = %err, "unparsable files field, using an empty list");
                        Vec::new()
                    }
                }
            }
        }
    }
}

fn deserialize_files<'de, D>(deserializer: D) -> Result<Vec<Attachment>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let Some(value) = raw else {
        return Ok(Vec::new());
    };
    if value.is_null() {
        return Ok(Vec::new());
    }
    match serde_json::from_value::<ReportFiles>(value) {
        Ok(files) => Ok(files.into_attachments()),
        Err(err) => {
            warn!(error = %err, "unexpected files shape, using an empty list");
            Ok(Vec::new())
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reference: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default)]
    pub status: ReportStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_anonymous: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "deserialize_files")]
    pub files: Vec<Attachment>,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

impl Report {
    /// Decodes a single API record. Only a record without a usable `id` is rejected.
    pub fn from_value(value: Value) -> Option<Self> {
        match serde_json::from_value::<Report>(value) {
            Ok(report) => Some(report),
            Err(err) => {
                warn!(error = %err, "skipping undecodable report record");
                None
            }
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }

    /// Day the report was filed, in the offset it was recorded with.
    pub fn created_on(&self) -> Option<NaiveDate> {
        self.created_at.as_deref().and_then(parse_calendar_date)
    }

    pub fn category_label(&self) -> &str {
        category_label(&self.category)
    }

    pub fn author_name(&self) -> Option<&str> {
        if self.is_anonymous {
            return None;
        }
        non_empty(self.name.as_deref())
    }

    pub fn author_email(&self) -> Option<&str> {
        if self.is_anonymous {
            return None;
        }
        non_empty(self.email.as_deref())
    }

    pub fn author_phone(&self) -> Option<&str> {
        if self.is_anonymous {
            return None;
        }
        non_empty(self.phone.as_deref())
    }

    pub fn author_display(&self) -> String {
        self.author_name().unwrap_or("Anonyme").to_string()
    }

    pub fn location(&self) -> String {
        [&self.city, &self.province, &self.region]
            .into_iter()
            .filter_map(|part| non_empty(part.as_deref()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub(crate) fn apply_edit(&mut self, edit: &ReportEdit) {
        let edit = edit.sanitized_for(self);
        if let Some(category) = edit.category {
            self.category = category;
        }
        if let Some(description) = edit.description {
            self.description = description;
        }
        if edit.name.is_some() {
            self.name = edit.name;
        }
        if edit.email.is_some() {
            self.email = edit.email;
        }
        if edit.phone.is_some() {
            self.phone = edit.phone;
        }
        if edit.city.is_some() {
            self.city = edit.city;
        }
        if edit.province.is_some() {
            self.province = edit.province;
        }
        if edit.region.is_some() {
            self.region = edit.region;
        }
        if edit.assigned_to.is_some() {
            self.assigned_to = edit.assigned_to;
        }
    }
}

/// Fields a staff member may change on an existing report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportEdit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

impl ReportEdit {
    /// Identity fields of anonymous reports are never editable.
    pub fn sanitized_for(&self, report: &Report) -> ReportEdit {
        let mut edit = self.clone();
        if report.is_anonymous {
            edit.name = None;
            edit.email = None;
            edit.phone = None;
        }
        edit
    }

    pub fn is_empty(&self) -> bool {
        self == &ReportEdit::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportNote {
    pub memo: String,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_encoded_files_string() {
        let report = Report::from_value(json!({
            "id": 7,
            "reference": "REF-0007",
            "files": "[\"preuve.pdf\", {\"filename\": \"photo.jpg\", \"size\": 1200}]"
        }))
        .unwrap();
        assert_eq!(report.files.len(), 2);
        assert_eq!(report.files[0].display_name(), "preuve.pdf");
        assert_eq!(report.files[1].display_name(), "photo.jpg");
    }

    #[test]
    fn broken_files_string_becomes_empty_list() {
        let report = Report::from_value(json!({ "id": 1, "files": "[not json" })).unwrap();
        assert!(report.files.is_empty());

        let report = Report::from_value(json!({ "id": 2, "files": 42 })).unwrap();
        assert!(report.files.is_empty());

        let report = Report::from_value(json!({ "id": 3, "files": null })).unwrap();
        assert!(report.files.is_empty());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let report = Report::from_value(json!({
            "id": 3,
            "reference": null,
            "status": "archived",
            "description": null
        }))
        .unwrap();
        assert_eq!(report.reference, "");
        assert_eq!(report.status, ReportStatus::Unknown);
        assert_eq!(report.description, "");
        assert!(report.created_at().is_none());
        assert!(Report::from_value(json!({ "reference": "REF-X" })).is_none());
    }

    #[test]
    fn anonymous_reports_hide_identity() {
        let report = Report::from_value(json!({
            "id": 4,
            "is_anonymous": true,
            "name": "Rakoto",
            "email": "rakoto@example.mg",
            "phone": "0340000000"
        }))
        .unwrap();
        assert_eq!(report.author_name(), None);
        assert_eq!(report.author_email(), None);
        assert_eq!(report.author_phone(), None);
        assert_eq!(report.author_display(), "Anonyme");

        let edit = ReportEdit {
            name: Some("Rabe".into()),
            city: Some("Toamasina".into()),
            ..ReportEdit::default()
        };
        let sanitized = edit.sanitized_for(&report);
        assert_eq!(sanitized.name, None);
        assert_eq!(sanitized.city.as_deref(), Some("Toamasina"));
    }

    #[test]
    fn status_round_trips_wire_names() {
        let status: ReportStatus = serde_json::from_value(json!("transmis_autorite")).unwrap();
        assert_eq!(status, ReportStatus::TransmisAutorite);
        assert_eq!(serde_json::to_value(status).unwrap(), json!("transmis_autorite"));
        assert_eq!(category_label("corruption"), "Corruption");
        assert_eq!(category_label("autre"), "autre");
    }
}
