use axum::{extract::State, Json};
use serde::Serialize;

use crate::documents::stager::PDF_MIME;
use crate::state::AppState;

pub const PAGE_TITLE: &str = "生合生技 - 產品諮詢專家";
pub const HEADING: &str = "🧬 TWK10 產品技術諮詢專家";
pub const CAPTION: &str = "生合生物科技內部專用系統 - 僅供技術查詢";
pub const INPUT_PLACEHOLDER: &str = "請輸入關於 TWK10 的問題...";

/// Static copy and capabilities the chat UI needs to render itself.
#[derive(Debug, Serialize)]
pub struct MetaResponse {
    pub page_title: &'static str,
    pub heading: &'static str,
    pub caption: &'static str,
    pub input_placeholder: &'static str,
    pub model: String,
    pub policy_version: &'static str,
    pub search_tool_enabled: bool,
    pub streaming: bool,
    pub accepted_document_types: Vec<&'static str>,
    pub max_upload_bytes: usize,
}

/// GET /api/v1/meta
pub async fn handle_meta(State(state): State<AppState>) -> Json<MetaResponse> {
    let settings = state.gateway.settings();
    Json(MetaResponse {
        page_title: PAGE_TITLE,
        heading: HEADING,
        caption: CAPTION,
        input_placeholder: INPUT_PLACEHOLDER,
        model: settings.model.clone(),
        policy_version: settings.policy.version,
        search_tool_enabled: settings.search_grant,
        streaming: true,
        accepted_document_types: vec![PDF_MIME],
        max_upload_bytes: state.stager.max_bytes(),
    })
}
