//! Processed-report listing served by `GET /api/reports`.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Pdf,
    Zip,
}

impl ReportKind {
    pub fn label(&self) -> &'static str {
        match self {
            ReportKind::Pdf => "PDF",
            ReportKind::Zip => "ZIP",
        }
    }
}

// Anything that is not "pdf" (including "unknown") is listed as a zip upload.
impl<'de> Deserialize<'de> for ReportKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(match raw.as_deref() {
            Some("pdf") => ReportKind::Pdf,
            _ => ReportKind::Zip,
        })
    }
}

fn default_kind() -> ReportKind {
    ReportKind::Zip
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFile {
    pub name: String,
    pub preview_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub name: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: ReportKind,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub files: Vec<ReportFile>,
}

impl Report {
    /// Task id the server accepts for previewing this report's files.
    pub fn temporary_task_id(&self) -> String {
        format!("temp_{}", self.name.replace(' ', "_"))
    }
}
