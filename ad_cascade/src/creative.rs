//! Creative upload: media asset first, then the creative definition.
//!
//! The row's `ad_format` selects the variant. Image rows upload the image and
//! reference its hash from a link creative. Video rows upload the video, wait
//! for encoding (bounded by a timeout here, the platform call itself waits
//! forever), upload the fixed thumbnail and reference both from a video
//! creative. Any failed sub-step fails the ad row as a whole.

use std::{
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use meta_ads::{
    models::{
        creative::{CallToAction, CreativeSpec, LinkData, ObjectStorySpec, VideoData},
        ids::{CreativeId, ImageHash, PageId},
    },
    providers::AdPlatform,
};
use tracing::{debug, info};

use crate::{
    config::CreativeCfg,
    error::{CascadeError, CreativeStep},
    rows::AdRow,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreativeKind {
    Image,
    Video,
}

impl FromStr for CreativeKind {
    type Err = CascadeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            other => Err(CascadeError::validation(format!(
                "ad_format must be image or video, got {other:?}"
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CreativeUploader {
    page: PageId,
    media_dir: PathBuf,
    default_image: PathBuf,
    default_video: PathBuf,
    thumbnail: PathBuf,
    video_ready_timeout: Duration,
}

impl CreativeUploader {
    pub fn new(page: PageId, cfg: &CreativeCfg) -> Self {
        Self {
            page,
            media_dir: cfg.media_dir.clone(),
            default_image: cfg.default_image_path.clone(),
            default_video: cfg.default_video_path.clone(),
            thumbnail: cfg.thumbnail_path.clone(),
            video_ready_timeout: cfg.video_ready_timeout(),
        }
    }

    pub fn page(&self) -> &PageId {
        &self.page
    }

    /// File to upload for `row`: its `creative_link` when set, else the
    /// configured default for the kind. Relative paths resolve against the
    /// media directory.
    pub fn media_path(&self, kind: CreativeKind, row: &AdRow) -> PathBuf {
        let path = match (&row.creative_link, kind) {
            (Some(link), _) => PathBuf::from(link),
            (None, CreativeKind::Image) => self.default_image.clone(),
            (None, CreativeKind::Video) => self.default_video.clone(),
        };
        self.resolve(&path)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.media_dir.join(path)
        }
    }

    /// Upload the row's media and create its creative.
    pub async fn upload<P>(&self, platform: &P, row: &AdRow) -> Result<CreativeId, CascadeError>
    where
        P: AdPlatform + ?Sized,
    {
        let kind: CreativeKind = row.format.parse()?;
        let path = self.media_path(kind, row);
        debug!(ad = %row.name, ?kind, path = %path.display(), "uploading creative media");

        let story = match kind {
            CreativeKind::Image => {
                let image_hash = self
                    .upload_image(platform, &path, CreativeStep::ImageUpload)
                    .await?;
                ObjectStorySpec {
                    page_id: self.page.clone(),
                    link_data: Some(LinkData {
                        image_hash,
                        link: row.link.clone(),
                        message: row.primary_text.clone(),
                        name: row.headline.clone(),
                        description: row.description.clone(),
                        call_to_action: CallToAction::new(&row.call_to_action, &row.link),
                    }),
                    video_data: None,
                }
            }
            CreativeKind::Video => {
                let upload = platform.upload_video(&path);
                let video_id = tokio::time::timeout(self.video_ready_timeout, upload)
                    .await
                    .map_err(|_| {
                        CascadeError::creative(
                            CreativeStep::VideoTimeout,
                            format!("video not ready after {:?}", self.video_ready_timeout),
                        )
                    })?
                    .map_err(|e| CascadeError::creative(CreativeStep::VideoUpload, e))?;
                let thumbnail = self.resolve(&self.thumbnail);
                let image_hash = self
                    .upload_image(platform, &thumbnail, CreativeStep::ThumbnailUpload)
                    .await?;
                ObjectStorySpec {
                    page_id: self.page.clone(),
                    link_data: None,
                    video_data: Some(VideoData {
                        video_id,
                        title: row.headline.clone(),
                        message: row.primary_text.clone(),
                        link_description: row.description.clone(),
                        image_hash,
                        call_to_action: CallToAction::new(&row.call_to_action, &row.link),
                    }),
                }
            }
        };

        let spec = CreativeSpec {
            name: format!("{} Creative", row.name),
            object_story_spec: story,
        };
        let id = platform
            .create_creative(&spec)
            .await
            .map_err(|e| CascadeError::creative(CreativeStep::CreativeSubmission, e))?;
        info!(ad = %row.name, creative_id = %id, "creative created");
        Ok(id)
    }

    async fn upload_image<P>(
        &self,
        platform: &P,
        path: &Path,
        step: CreativeStep,
    ) -> Result<ImageHash, CascadeError>
    where
        P: AdPlatform + ?Sized,
    {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| CascadeError::creative(step, format!("{}: {e}", path.display())))?;
        platform
            .upload_image(&bytes)
            .await
            .map_err(|e| CascadeError::creative(step, e))
    }
}
