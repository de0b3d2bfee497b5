use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{CoreError, Result};
use crate::timespan;

/// Priority the service assigns when the client does not ask for one.
pub const DEFAULT_PRIORITY: u8 = 127;

// ===== Quality & Deduplication =====

/// Named quality level; the service publishes `Standard`, `High` and `Extreme`
/// and may offer custom levels per account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct QualityLevel(pub String);

impl QualityLevel {
    /// `Standard`
    pub fn standard() -> Self {
        Self("Standard".to_string())
    }

    /// `High`
    pub fn high() -> Self {
        Self("High".to_string())
    }

    /// `Extreme`
    pub fn extreme() -> Self {
        Self("Extreme".to_string())
    }

    /// Account-specific level
    pub fn custom(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the service flags repeated input addresses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DeduplicationMode {
    Off,
    Safe,
    Relaxed,
}

// ===== Callback & CAPTCHA =====

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CallbackDescriptor {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_server_certificate_validation: Option<bool>,
}

impl CallbackDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            version: None,
            skip_server_certificate_validation: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn skip_server_certificate_validation(mut self, skip: bool) -> Self {
        self.skip_server_certificate_validation = Some(skip);
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CaptchaProvider {
    Turnstile,
    ReCaptchaV2,
    ReCaptchaV3,
    HCaptcha,
}

/// Proof-of-humanity token forwarded to the service for browser-originated
/// submissions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaptchaToken {
    pub provider: CaptchaProvider,
    pub token: String,
}

// ===== Settings =====

fn is_default_priority(priority: &u8) -> bool {
    *priority == DEFAULT_PRIORITY
}

/// Job-level settings shared by value and file submissions.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deduplication: Option<DeduplicationMode>,
    #[serde(skip_serializing_if = "is_default_priority")]
    pub priority: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "timespan::serialize_optional"
    )]
    pub retention: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback: Option<CallbackDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captcha: Option<CaptchaToken>,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            quality: None,
            deduplication: None,
            priority: DEFAULT_PRIORITY,
            name: None,
            retention: None,
            callback: None,
            captcha: None,
        }
    }
}

// ===== Value Submission =====

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequestEntry {
    pub input_data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<String>,
}

impl ValidationRequestEntry {
    pub fn new(input_data: impl Into<String>) -> Self {
        Self {
            input_data: input_data.into(),
            custom: None,
        }
    }

    /// Attaches a caller-defined correlation value echoed back in the result.
    pub fn with_custom(mut self, custom: impl Into<String>) -> Self {
        self.custom = Some(custom.into());
        self
    }
}

/// Submission of explicit input values, serialized as the JSON request body.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValidationRequest {
    pub entries: Vec<ValidationRequestEntry>,
    #[serde(flatten)]
    pub settings: ValidationSettings,
}

impl ValidationRequest {
    pub fn new(entries: Vec<ValidationRequestEntry>) -> Self {
        Self {
            entries,
            settings: ValidationSettings::default(),
        }
    }

    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(values.into_iter().map(ValidationRequestEntry::new).collect())
    }

    pub fn with_quality(mut self, quality: QualityLevel) -> Self {
        self.settings.quality = Some(quality);
        self
    }

    pub fn with_deduplication(mut self, deduplication: DeduplicationMode) -> Self {
        self.settings.deduplication = Some(deduplication);
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.settings.priority = priority;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.settings.name = Some(name.into());
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.settings.retention = Some(retention);
        self
    }

    pub fn with_callback(mut self, callback: CallbackDescriptor) -> Self {
        self.settings.callback = Some(callback);
        self
    }

    pub fn with_captcha(mut self, captcha: CaptchaToken) -> Self {
        self.settings.captcha = Some(captcha);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(CoreError::Validation(
                "a validation request needs at least one entry".to_string(),
            ));
        }
        Ok(())
    }
}

// ===== File Submission =====

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LineEnding {
    Auto,
    CrLf,
    Cr,
    Lf,
}

/// Import options sent alongside an uploaded file.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileImportOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starting_row: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ending_row: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_ending: Option<LineEnding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
}

/// JSON document carried by the `settings` part of a file upload.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FileSubmissionSettings<'a> {
    #[serde(flatten)]
    pub settings: &'a ValidationSettings,
    #[serde(flatten)]
    pub import: &'a FileImportOptions,
}

/// Submission of a file (CSV, TSV, spreadsheet or plain text) holding the
/// addresses to verify.
#[derive(Debug, Clone, PartialEq)]
pub struct FileValidationRequest {
    pub content: Vec<u8>,
    pub content_type: String,
    pub file_name: Option<String>,
    pub import: FileImportOptions,
    pub settings: ValidationSettings,
}

impl FileValidationRequest {
    pub fn new(content: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            content_type: content_type.into(),
            file_name: None,
            import: FileImportOptions::default(),
            settings: ValidationSettings::default(),
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_import(mut self, import: FileImportOptions) -> Self {
        self.import = import;
        self
    }

    pub fn with_settings(mut self, settings: ValidationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn submission_settings(&self) -> FileSubmissionSettings<'_> {
        FileSubmissionSettings {
            settings: &self.settings,
            import: &self.import,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.content.is_empty() {
            return Err(CoreError::Validation("the uploaded file is empty".to_string()));
        }
        if self.content_type.trim().is_empty() {
            return Err(CoreError::Validation(
                "the uploaded file needs a content type".to_string(),
            ));
        }
        Ok(())
    }
}
