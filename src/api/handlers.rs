//! API request handlers
//!
//! JSON endpoints answer with the [`ApiResponse`] envelope; report endpoints
//! answer with the workbook as an attachment.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::core::{report_filename, FillOptions, FillWarning, GeneratedReport};
use crate::error::{XlFillError, XlFillResult};
use crate::excel::{inspect, TableReport, TemplateInfo};
use crate::templates::XLSX_CONTENT_TYPE;

use super::server::AppState;

pub const WARNINGS_HEADER: &str = "x-report-warnings";
pub const MISSING_FIELDS_HEADER: &str = "x-report-missing-fields";

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Error part of the envelope
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
            message: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    pub fn err(error: ErrorBody) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            message: Some(error.message.clone()),
            error: Some(error),
            timestamp: Utc::now(),
        }
    }
}

/// A failed request: status plus error body
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    /// Map an engine error to a status. Internal details are only exposed
    /// when `debug` is on.
    pub fn from_error(err: XlFillError, debug: bool) -> Self {
        Self::build(err, debug, None)
    }

    /// Like `from_error`, naming the template in the log line
    pub fn from_fill_error(err: XlFillError, template: &str, debug: bool) -> Self {
        Self::build(err, debug, Some(template))
    }

    fn build(err: XlFillError, debug: bool, template: Option<&str>) -> Self {
        let status = match &err {
            XlFillError::TemplateNotFound(_) => StatusCode::NOT_FOUND,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let code = err.code();

        match (status.is_server_error(), template) {
            (true, Some(template)) => {
                error!("Filling template '{}' failed [{}]: {}", template, code, err)
            }
            (true, None) => error!("Request failed [{}]: {}", code, err),
            (false, Some(template)) => {
                warn!("Request for template '{}' rejected [{}]: {}", template, code, err)
            }
            (false, None) => warn!("Request rejected [{}]: {}", code, err),
        }

        let message = if code == "INTERNAL_ERROR" {
            "Internal server error".to_string()
        } else {
            err.to_string()
        };
        let details = (debug && status.is_server_error()).then(|| format!("{:?}", err));

        Self {
            status,
            body: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        }
    }

    fn rejected(rejection: JsonRejection) -> Self {
        warn!("Request body rejected: {}", rejection.body_text());
        let status = rejection.status();
        let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "PAYLOAD_TOO_LARGE"
        } else {
            "INVALID_REQUEST"
        };
        Self {
            status,
            body: ErrorBody {
                code: code.to_string(),
                message: rejection.body_text(),
                details: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::err(self.body))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Run blocking template work off the async runtime
async fn blocking<F, T>(work: F) -> XlFillResult<T>
where
    F: FnOnce() -> XlFillResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(e) => Err(XlFillError::Report(format!("worker task failed: {}", e))),
    }
}

/// Root endpoint response
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: &'static str,
    pub method: &'static str,
    pub description: &'static str,
}

const ENDPOINTS: &[(&str, &str, &str)] = &[
    ("/api/health", "GET", "Health check"),
    ("/version", "GET", "Server version and features"),
    ("/api/templates", "GET", "List available templates"),
    ("/api/templates/:name", "GET", "Describe one template"),
    ("/api/reports", "POST", "Fill a template named in the body"),
    ("/api/reports/:name", "POST", "Fill the named template with the body"),
    ("/api/table-reports", "POST", "Build a formatted table from rows"),
];

/// GET / - Service info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = RootResponse {
        name: state.settings.app_name.clone(),
        version: state.version.clone(),
        description: "Fills Excel templates with JSON data".to_string(),
        endpoints: ENDPOINTS
            .iter()
            .map(|&(path, method, description)| EndpointInfo {
                path,
                method,
                description,
            })
            .collect(),
    };
    Json(ApiResponse::ok(response))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub app_name: String,
    pub version: String,
    pub debug: bool,
    pub timestamp: DateTime<Utc>,
}

/// GET /api/health - Health check
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy",
        app_name: state.settings.app_name.clone(),
        version: state.version.clone(),
        debug: state.settings.debug,
        timestamp: Utc::now(),
    }))
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub features: Vec<&'static str>,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        features: vec!["template-fill", "row-groups", "template-catalogue", "table-reports"],
    }))
}

#[derive(Serialize)]
pub struct TemplatesResponse {
    pub count: usize,
    pub templates: Vec<TemplateInfo>,
}

/// GET /api/templates - Template catalogue
pub async fn list_templates(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ApiResponse<TemplatesResponse>>> {
    let store = state.engine.store().clone();
    let templates = blocking(move || Ok(store.list()?.iter().map(inspect).collect::<Vec<_>>()))
        .await
        .map_err(|e| ApiError::from_error(e, state.settings.debug))?;

    let message = format!("Found {} template(s)", templates.len());
    Ok(Json(
        ApiResponse::ok(TemplatesResponse {
            count: templates.len(),
            templates,
        })
        .with_message(message),
    ))
}

/// GET /api/templates/:name - One template
pub async fn get_template(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<ApiResponse<TemplateInfo>>> {
    let store = state.engine.store().clone();
    let info = blocking(move || store.resolve(&name).map(|t| inspect(&t)))
        .await
        .map_err(|e| ApiError::from_error(e, state.settings.debug))?;
    Ok(Json(ApiResponse::ok(info)))
}

/// Body of `POST /api/reports`
#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub template_name: String,
    pub data: Value,
    #[serde(default)]
    pub text_fields: Vec<String>,
}

/// POST /api/reports - Fill the template named in the body
pub async fn generate_report(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ReportRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = body.map_err(ApiError::rejected)?;
    let options = FillOptions::with_text_fields(request.text_fields);
    fill_template(&state, request.template_name, request.data, options).await
}

/// POST /api/reports/:name - Fill the named template with the body
pub async fn generate_named_report(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(data) = body.map_err(ApiError::rejected)?;
    fill_template(&state, name, data, FillOptions::default()).await
}

async fn fill_template(
    state: &Arc<AppState>,
    name: String,
    data: Value,
    options: FillOptions,
) -> ApiResult<Response> {
    let has_data = data.as_object().is_some_and(|map| !map.is_empty());
    if !has_data {
        return Err(ApiError::from_error(
            XlFillError::Validation("data must be a non-empty JSON object".to_string()),
            state.settings.debug,
        ));
    }

    let engine = state.engine.clone();
    let template = name.clone();
    let report = blocking(move || engine.generate(&template, &data, &options))
        .await
        .map_err(|e| ApiError::from_fill_error(e, &name, state.settings.debug))?;

    info!(
        "Generated {} from {} ({} bytes, {} warning(s))",
        report.filename,
        report.template,
        report.bytes.len(),
        report.warnings.len()
    );
    for warning in &report.warnings {
        warn!("{}: {}", report.template, warning);
    }
    Ok(report_response(report))
}

/// Body of `POST /api/table-reports`
#[derive(Debug, Deserialize)]
pub struct TableReportRequest {
    pub rows: Vec<Value>,
    #[serde(default)]
    pub sheet_name: Option<String>,
}

/// POST /api/table-reports - Formatted table from row objects
pub async fn generate_table_report(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TableReportRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = body.map_err(ApiError::rejected)?;
    let debug = state.settings.debug;
    let bytes = blocking(move || {
        let mut report = TableReport::from_rows(&request.rows)?;
        if let Some(sheet_name) = request.sheet_name {
            report = report.with_sheet_name(sheet_name);
        }
        report.to_bytes()
    })
    .await
    .map_err(|e| ApiError::from_error(e, debug))?;

    let report = GeneratedReport {
        template: "table".to_string(),
        filename: report_filename("table"),
        content_type: XLSX_CONTENT_TYPE,
        bytes,
        warnings: Vec::new(),
    };
    info!("Generated {} ({} bytes)", report.filename, report.bytes.len());
    Ok(report_response(report))
}

/// Attachment response with the warning headers
pub fn report_response(report: GeneratedReport) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", report.filename);
    let missing = report.missing_fields().join(",");
    let warning_count = report.warnings.len();

    let mut response = (
        StatusCode::OK,
        [(header::CONTENT_TYPE, report.content_type.to_string())],
        report.bytes,
    )
        .into_response();

    let headers = response.headers_mut();
    match HeaderValue::from_str(&disposition) {
        Ok(value) => {
            headers.insert(header::CONTENT_DISPOSITION, value);
        }
        Err(e) => warn!("Cannot send filename {}: {}", report.filename, e),
    }
    headers.insert(
        HeaderName::from_static(WARNINGS_HEADER),
        HeaderValue::from(warning_count),
    );
    if !missing.is_empty() {
        match HeaderValue::from_str(&missing) {
            Ok(value) => {
                headers.insert(HeaderName::from_static(MISSING_FIELDS_HEADER), value);
            }
            Err(e) => warn!("Cannot send missing field names: {}", e),
        }
    }
    response
}
