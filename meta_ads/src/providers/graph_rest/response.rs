use indexmap::IndexMap;
use serde::Deserialize;

/// `{"id": "..."}` returned by every create edge. The reserve action may omit it.
#[derive(Deserialize, Debug)]
pub struct IdResponse {
    #[serde(default)]
    pub id: Option<String>,
}

/// `POST /adimages` answers with the upload keyed by the form field name.
#[derive(Deserialize, Debug)]
pub struct ImageUploadResponse {
    pub images: IndexMap<String, UploadedImage>,
}

#[derive(Deserialize, Debug)]
pub struct UploadedImage {
    pub hash: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct PredictionStatusResponse {
    pub status: i64,
}

#[derive(Deserialize, Debug)]
pub struct VideoStatusResponse {
    pub status: VideoStatusBody,
}

#[derive(Deserialize, Debug)]
pub struct VideoStatusBody {
    pub video_status: String,
    #[serde(default)]
    pub processing_progress: Option<u32>,
}

#[derive(Deserialize, Debug)]
pub struct SearchResponse<T> {
    pub data: Vec<T>,
}

#[derive(Deserialize, Debug)]
pub struct GraphErrorEnvelope {
    pub error: GraphError,
}

#[derive(Deserialize, Debug)]
pub struct GraphError {
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub error_subcode: Option<i64>,
    #[serde(default)]
    pub error_user_msg: Option<String>,
    #[serde(default)]
    pub fbtrace_id: Option<String>,
}

impl GraphError {
    /// Platform message verbatim, followed by the user-facing text and codes when present.
    pub fn describe(&self) -> String {
        let mut out = self.message.clone();
        if let Some(user_msg) = &self.error_user_msg {
            out.push_str(": ");
            out.push_str(user_msg);
        }
        match (self.code, self.error_subcode) {
            (Some(code), Some(sub)) => out.push_str(&format!(" (code {code}, subcode {sub})")),
            (Some(code), None) => out.push_str(&format!(" (code {code})")),
            _ => {}
        }
        out
    }
}
