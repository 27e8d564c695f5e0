//! API request handlers
//!
//! Requests name files on the server's disk. Each request builds its own job
//! and runs it on the blocking pool under the configured deadline; a job that
//! misses it is abandoned and its result discarded.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Layout;
use crate::error::PackResult;
use crate::pipeline::{
    run_assortment, run_conversion, run_delivery_slip, run_labels, ConversionJob, ConversionReport,
    DocumentJob, DocumentReport, LabelReport,
};
use crate::writer::SlipNumbering;

use super::server::AppState;

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }

    fn from_result(result: Result<T, String>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(message) => Self::err(message),
        }
    }
}

/// Run `job` on the blocking pool, giving up after the state's deadline.
async fn run_job<T, F>(state: &AppState, job: F) -> Result<T, String>
where
    F: FnOnce() -> PackResult<T> + Send + 'static,
    T: Send + 'static,
{
    let task = tokio::task::spawn_blocking(job);
    match tokio::time::timeout(state.job_timeout, task).await {
        Ok(Ok(Ok(value))) => Ok(value),
        Ok(Ok(Err(e))) => Err(e.to_string()),
        Ok(Err(e)) => Err(format!("Job aborted: {}", e)),
        Err(_) => Err(format!(
            "Job exceeded {}s and was abandoned",
            state.job_timeout.as_secs()
        )),
    }
}

fn load_layout(path: Option<&str>) -> PackResult<Layout> {
    match path {
        Some(path) => Layout::load(&PathBuf::from(path)),
        None => Ok(Layout::default()),
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// GET /health - Health check
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
    }))
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub endpoints: Vec<String>,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        endpoints: [
            "/api/v1/convert",
            "/api/v1/delivery-slip",
            "/api/v1/assortment",
            "/api/v1/labels",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
    }))
}

/// Convert request
#[derive(Deserialize)]
pub struct ConvertRequest {
    pub input_path: String,
    #[serde(default)]
    pub jan_table_path: Option<String>,
    #[serde(default)]
    pub template_path: Option<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub store_detail: bool,
    #[serde(default)]
    pub layout_path: Option<String>,
}

/// POST /api/v1/convert - Allocation table to packing list
pub async fn convert(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConvertRequest>,
) -> Json<ApiResponse<ConversionReport>> {
    let result = run_job(&state, move || {
        let job = ConversionJob {
            jan_table: req.jan_table_path.map(PathBuf::from),
            template: req.template_path.map(PathBuf::from),
            output_dir: req.output_dir.map(PathBuf::from),
            store_detail: req.store_detail,
            layout: load_layout(req.layout_path.as_deref())?,
            ..ConversionJob::new(req.input_path)
        };
        run_conversion(&job)
    })
    .await;
    Json(ApiResponse::from_result(result))
}

/// Request shared by the derived-document endpoints
#[derive(Deserialize)]
pub struct DocumentRequest {
    pub input_path: String,
    pub output_path: String,
    #[serde(default)]
    pub template_path: Option<String>,
    #[serde(default)]
    pub layout_path: Option<String>,
}

impl DocumentRequest {
    fn job(self) -> PackResult<DocumentJob> {
        Ok(DocumentJob {
            layout: load_layout(self.layout_path.as_deref())?,
            input: PathBuf::from(self.input_path),
            output: PathBuf::from(self.output_path),
            template: self.template_path.map(PathBuf::from),
        })
    }
}

#[derive(Deserialize)]
pub struct DeliverySlipRequest {
    #[serde(flatten)]
    pub document: DocumentRequest,
    #[serde(default)]
    pub numbering: SlipNumbering,
}

/// POST /api/v1/delivery-slip - Packing list to delivery slip
pub async fn delivery_slip(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeliverySlipRequest>,
) -> Json<ApiResponse<DocumentReport>> {
    let result = run_job(&state, move || {
        let job = req.document.job()?;
        run_delivery_slip(&job, req.numbering)
    })
    .await;
    Json(ApiResponse::from_result(result))
}

#[derive(Deserialize)]
pub struct AssortmentRequest {
    #[serde(flatten)]
    pub document: DocumentRequest,
    #[serde(default)]
    pub week: Option<String>,
}

/// POST /api/v1/assortment - Packing list to assortment detail
pub async fn assortment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AssortmentRequest>,
) -> Json<ApiResponse<DocumentReport>> {
    let result = run_job(&state, move || {
        let job = req.document.job()?;
        run_assortment(&job, req.week)
    })
    .await;
    Json(ApiResponse::from_result(result))
}

/// POST /api/v1/labels - Packing list to box labels
pub async fn labels(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DocumentRequest>,
) -> Json<ApiResponse<LabelReport>> {
    let result = run_job(&state, move || run_labels(&req.job()?)).await;
    Json(ApiResponse::from_result(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn state(timeout: Duration) -> Arc<AppState> {
        Arc::new(AppState {
            version: "test".to_string(),
            job_timeout: timeout,
        })
    }

    #[test]
    fn test_api_response_ok_and_err() {
        let ok: ApiResponse<u32> = ApiResponse::ok(3);
        assert!(ok.success);
        assert_eq!(ok.request_id.len(), 36);

        let err: ApiResponse<u32> = ApiResponse::err("boom");
        assert!(!err.success);
        assert!(err.data.is_none());
        assert_eq!(err.error.as_deref(), Some("boom"));
        assert_ne!(ok.request_id, err.request_id);
    }

    #[test]
    fn test_delivery_slip_request_defaults_to_offset_numbering() {
        let req: DeliverySlipRequest =
            serde_json::from_str(r#"{"input_path": "pl.xlsx", "output_path": "slip.xlsx"}"#).unwrap();
        assert_eq!(req.numbering, SlipNumbering::default());
        assert_eq!(req.document.input_path, "pl.xlsx");

        let req: DeliverySlipRequest = serde_json::from_str(
            r#"{"input_path": "pl.xlsx", "output_path": "slip.xlsx", "numbering": {"kind": "week", "week": "18"}}"#,
        )
        .unwrap();
        assert_eq!(req.numbering, SlipNumbering::week(Some("18")));
    }

    #[tokio::test]
    async fn test_run_job_reports_errors() {
        let result: Result<(), String> = run_job(&state(Duration::from_secs(5)), || {
            Err(crate::error::PackError::Validation("bad".to_string()))
        })
        .await;
        assert_eq!(result.unwrap_err(), "Validation error: bad");
    }

    #[tokio::test]
    async fn test_run_job_abandons_slow_jobs() {
        let result = run_job(&state(Duration::from_millis(10)), || {
            std::thread::sleep(Duration::from_millis(300));
            Ok(1)
        })
        .await;
        assert!(result.unwrap_err().contains("abandoned"));
    }

    #[tokio::test]
    async fn test_convert_missing_file_is_error_response() {
        let req = ConvertRequest {
            input_path: "/nonexistent/配分表(1).xlsx".to_string(),
            jan_table_path: None,
            template_path: None,
            output_dir: None,
            store_detail: false,
            layout_path: None,
        };
        let Json(response) = convert(State(state(Duration::from_secs(5))), Json(req)).await;
        assert!(!response.success);
        assert!(response.error.unwrap().contains("allocation read"));
    }
}
