/// Encoding state of an uploaded video.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VideoStatus {
    Processing,
    Ready,
    Error(String),
}

impl VideoStatus {
    /// Maps the platform's `status.video_status` string.
    pub fn from_platform(video_status: &str, detail: Option<&str>) -> Self {
        match video_status {
            "ready" => Self::Ready,
            "error" => Self::Error(detail.unwrap_or("video encoding failed").to_string()),
            _ => Self::Processing,
        }
    }
}
