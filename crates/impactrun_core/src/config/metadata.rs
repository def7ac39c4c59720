//! Descriptive metadata carried by model files.
//!
//! None of it takes part in evaluation; it is kept so tools can display
//! where a model comes from and who reviewed it.

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Study report the model was published with
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<Date>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Contact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<Contact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<Report>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// Version of the tool that generated the model file
    #[serde(
        default,
        alias = "appabuild_version",
        skip_serializing_if = "Option::is_none"
    )]
    pub builder_version: Option<String>,
}

impl ModelMetadata {
    /// One-line description for logs and listings
    #[must_use]
    pub fn summary(&self) -> String {
        let author = self
            .author
            .as_ref()
            .and_then(|a| a.name.as_deref())
            .unwrap_or("unknown author");
        match (&self.version, self.report.as_ref().and_then(|r| r.date)) {
            (Some(version), Some(date)) => format!("v{version} by {author}, {date}"),
            (Some(version), None) => format!("v{version} by {author}"),
            (None, Some(date)) => format!("by {author}, {date}"),
            (None, None) => format!("by {author}"),
        }
    }
}
