//! Marketing content reads: testimonials and sustainable-gifting items
//!
//! Text and video testimonials are distinct sub-families under the
//! testimonials list, never overloaded onto one key shape.

use super::Storefront;
use crate::client::{QueryRequest, QuerySpec};
use crate::error::ApiResult;
use crate::key::ResourceKey;
use serde::{Deserialize, Serialize};

pub fn testimonials_root() -> ResourceKey {
    ResourceKey::new("testimonials")
}

pub fn text_testimonials_key() -> ResourceKey {
    testimonials_root().child("list").child("text")
}

pub fn video_testimonials_key() -> ResourceKey {
    testimonials_root().child("list").child("video")
}

pub fn sustainable_gifting_key() -> ResourceKey {
    ResourceKey::new("sustainable-gifting").child("list")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextTestimonial {
    pub id: String,
    pub author: String,
    pub quote: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoTestimonial {
    pub id: String,
    pub title: String,
    pub video_url: String,
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SustainableGiftingItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub order: u32,
    pub is_active: bool,
}

impl Storefront {
    pub async fn text_testimonials(&self) -> ApiResult<Vec<TextTestimonial>> {
        let config = self.client().config();
        self.client()
            .query(
                QuerySpec::new(text_testimonials_key(), config.catalog_staleness)
                    .retry(config.retry_limit),
                QueryRequest::new("/content/testimonials/text/"),
            )
            .await
    }

    pub async fn video_testimonials(&self) -> ApiResult<Vec<VideoTestimonial>> {
        let config = self.client().config();
        self.client()
            .query(
                QuerySpec::new(video_testimonials_key(), config.catalog_staleness)
                    .retry(config.retry_limit),
                QueryRequest::new("/content/testimonials/video/"),
            )
            .await
    }

    pub async fn sustainable_gifting(&self) -> ApiResult<Vec<SustainableGiftingItem>> {
        let config = self.client().config();
        self.client()
            .query(
                QuerySpec::new(sustainable_gifting_key(), config.catalog_staleness)
                    .retry(config.retry_limit),
                QueryRequest::new("/content/sustainable-gifting/"),
            )
            .await
    }
}
