use thiserror::Error;

pub type XlFillResult<T> = Result<T, XlFillError>;

#[derive(Error, Debug)]
pub enum XlFillError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Template '{0}' not found")]
    TemplateNotFound(String),

    #[error("Invalid template name '{0}'")]
    InvalidTemplateName(String),

    #[error("Template '{template}' is corrupt: {reason}")]
    TemplateCorrupt { template: String, reason: String },

    #[error("Unsupported template structure in sheet '{sheet}': {reason}")]
    UnsupportedTemplateStructure { sheet: String, reason: String },

    #[error("Serialization error in sheet '{sheet}' at {location}: {reason}")]
    Serialization {
        sheet: String,
        location: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Report generation error: {0}")]
    Report(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl XlFillError {
    /// Stable machine-readable code used in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            XlFillError::TemplateNotFound(_) => "TEMPLATE_NOT_FOUND",
            XlFillError::InvalidTemplateName(_) | XlFillError::Validation(_) => "INVALID_REQUEST",
            XlFillError::Json(_) => "INVALID_JSON",
            XlFillError::TemplateCorrupt { .. } => "TEMPLATE_CORRUPT",
            XlFillError::UnsupportedTemplateStructure { .. } => "TEMPLATE_UNSUPPORTED",
            XlFillError::Serialization { .. } => "SERIALIZATION_ERROR",
            XlFillError::Io(_)
            | XlFillError::Yaml(_)
            | XlFillError::Xml(_)
            | XlFillError::Zip(_)
            | XlFillError::Report(_)
            | XlFillError::Config(_) => "INTERNAL_ERROR",
        }
    }

    /// True when the caller sent something the service cannot act on
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            XlFillError::TemplateNotFound(_)
                | XlFillError::InvalidTemplateName(_)
                | XlFillError::Validation(_)
                | XlFillError::Json(_)
        )
    }

    pub(crate) fn corrupt(template: impl Into<String>, reason: impl ToString) -> Self {
        XlFillError::TemplateCorrupt {
            template: template.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn unsupported(sheet: impl Into<String>, reason: impl Into<String>) -> Self {
        XlFillError::UnsupportedTemplateStructure {
            sheet: sheet.into(),
            reason: reason.into(),
        }
    }
}
