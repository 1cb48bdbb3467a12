//! Data handed to the engine by the admin views.
//!
//! These mirror the backend's JSON (camelCase, every field optional) and are
//! read-only snapshots: the engine never mutates them.

use serde::{Deserialize, Deserializer, Serialize};

/// A fetchable resource plus the caption it is filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReference {
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
    pub url: String,
}

impl FileReference {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }

    /// Caption for generated labels; never empty.
    pub fn display_label(&self) -> &str {
        let label = self.label.trim();
        if label.is_empty() { "Document" } else { label }
    }
}

/// Snapshot of one application and its applicant's profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub application: ApplicationRecord,
    #[serde(default, deserialize_with = "null_as_default")]
    pub profile: ProfileRecord,
}

// =============================================================================
// Application
// =============================================================================

/// Review status. Covers both status taxonomies the backend has shipped;
/// anything newer lands in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApplicationStatus {
    Applied,
    Scheduled,
    Selected,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Other(String),
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Applied => "applied",
            Self::Scheduled => "scheduled",
            Self::Selected => "selected",
            Self::Submitted => "submitted",
            Self::UnderReview => "under-review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Other(s) => s,
        }
    }

    /// Upper-case form shown on the cover page (`UNDER REVIEW`).
    pub fn display_label(&self) -> String {
        self.as_str().replace(['-', '_'], " ").to_uppercase()
    }
}

impl From<String> for ApplicationStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "applied" => Self::Applied,
            "scheduled" => Self::Scheduled,
            "selected" => Self::Selected,
            "submitted" => Self::Submitted,
            "under-review" => Self::UnderReview,
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            _ => Self::Other(s),
        }
    }
}

impl From<ApplicationStatus> for String {
    fn from(status: ApplicationStatus) -> Self {
        status.as_str().to_string()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<ApplicationStatus>,
    #[serde(default)]
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub remark_text: Option<String>,
}

// =============================================================================
// Profile
// =============================================================================

/// An uploaded file as the backend describes it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadedFile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl UploadedFile {
    pub fn url(&self) -> Option<&str> {
        non_empty(self.url.as_ref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicInfo {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub profile_pic_file: Option<UploadedFile>,
}

/// One side of an identity document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityDocFile {
    /// `nid`, `passport` or `birthReg`
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl IdentityDocFile {
    /// Caption used when the document is handed to the merger.
    pub fn label(&self) -> String {
        let side = non_empty(self.side.as_ref()).unwrap_or("Document");
        match self.kind.as_deref() {
            Some("nid") => format!("NID ({side})"),
            Some("passport") => format!("Passport ({side})"),
            Some("birthReg") => "Birth Registration".to_string(),
            _ => non_empty(self.name.as_ref())
                .unwrap_or("Identity Document")
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityInfo {
    #[serde(default, deserialize_with = "lenient_string")]
    pub number: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub doc_files: Vec<IdentityDocFile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub upazila: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
}

impl Address {
    /// Non-empty parts joined with `", "`; `None` when every part is empty.
    pub fn joined(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.street, &self.upazila, &self.district]
            .into_iter()
            .filter_map(|part| non_empty(part.as_ref()))
            .collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddressInfo {
    #[serde(default)]
    pub present: Option<Address>,
    #[serde(default)]
    pub permanent: Option<Address>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherInfo {
    #[serde(default)]
    pub fathers_name: Option<String>,
    #[serde(default)]
    pub mothers_name: Option<String>,
    #[serde(default)]
    pub religion: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub marital_status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmergencyContact {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(default)]
    pub relation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationInfo {
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub cgpa_or_gpa: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub passing_year: Option<String>,
    #[serde(default)]
    pub certificate_file: Option<UploadedFile>,
}

/// A titled attachment (testimonial, verification, commitment, agreement).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitledFile {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(
        default,
        alias = "testimonialFile",
        alias = "myVerifiedFile",
        alias = "commitmentFile",
        alias = "agreementFile"
    )]
    pub file: Option<UploadedFile>,
}

impl TitledFile {
    fn reference(&self, caption: &str) -> Option<FileReference> {
        let url = self.file.as_ref()?.url()?;
        let label = match non_empty(self.title.as_ref()) {
            Some(title) => format!("{caption}: {title}"),
            None => caption.to_string(),
        };
        Some(FileReference::new(label, url))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkInfo {
    #[serde(default, deserialize_with = "lenient_string")]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub shift: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    #[serde(default)]
    pub basic: Option<BasicInfo>,
    #[serde(default)]
    pub identity: Option<IdentityInfo>,
    #[serde(default)]
    pub address: Option<AddressInfo>,
    #[serde(default)]
    pub other: Option<OtherInfo>,
    #[serde(default)]
    pub emergency_contact: Option<EmergencyContact>,
    #[serde(default)]
    pub cv_file: Option<UploadedFile>,
    #[serde(default)]
    pub education: Option<EducationInfo>,
    #[serde(default)]
    pub testimonial: Option<TitledFile>,
    #[serde(default)]
    pub my_verified: Option<TitledFile>,
    #[serde(default)]
    pub commitment_note: Option<TitledFile>,
    #[serde(default)]
    pub agreement: Option<TitledFile>,
    #[serde(default)]
    pub work_info: Option<WorkInfo>,
}

impl ProfileRecord {
    pub fn full_name(&self) -> Option<&str> {
        non_empty(self.basic.as_ref()?.full_name.as_ref())
    }

    pub fn profile_picture_url(&self) -> Option<&str> {
        self.basic.as_ref()?.profile_pic_file.as_ref()?.url()
    }

    /// Every attachment on the profile, in the order the review screen lists
    /// them. Entries without a URL are left out.
    pub fn file_references(&self) -> Vec<FileReference> {
        let mut files = Vec::new();

        if let Some(url) = self.profile_picture_url() {
            files.push(FileReference::new("Profile Picture", url));
        }

        if let Some(identity) = &self.identity {
            files.extend(identity.doc_files.iter().filter_map(|doc| {
                non_empty(doc.url.as_ref()).map(|url| FileReference::new(doc.label(), url))
            }));
        }

        if let Some(url) = self.cv_file.as_ref().and_then(UploadedFile::url) {
            files.push(FileReference::new("Resume / CV", url));
        }

        if let Some(url) = self
            .education
            .as_ref()
            .and_then(|e| e.certificate_file.as_ref())
            .and_then(UploadedFile::url)
        {
            files.push(FileReference::new("Education Certificate", url));
        }

        let titled = [
            (&self.testimonial, "Testimonial"),
            (&self.my_verified, "Verification"),
            (&self.commitment_note, "Commitment Note"),
            (&self.agreement, "Agreement"),
        ];
        files.extend(
            titled
                .into_iter()
                .filter_map(|(file, caption)| file.as_ref()?.reference(caption)),
        );

        files
    }
}

/// Trimmed, non-empty view of an optional string.
pub(crate) fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// Read an explicit null as the type's default, like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept strings, numbers or null for fields the backend is loose about.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}
