//! Events the recipe emits towards the renderer and the social client, and
//! the completions it receives back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload of [`crate::events::NEW_HIGH`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHigh {
    pub exchange: String,
    pub price: f64,
    pub pair: String,
    pub time: DateTime<Utc>,
}

/// Payload of [`crate::events::MEDIA_CREATE`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaCreate {
    pub exchange: String,
    pub high: f64,
    pub time: DateTime<Utc>,
    pub data: MediaSpec,
}

/// Image composition handed to the external renderer: a background image with
/// text drawn over it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSpec {
    pub image: String,
    pub width: u32,
    pub height: u32,
    pub font: String,
    pub texts: Vec<TextOverlay>,
}

/// One string drawn onto the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOverlay {
    pub text: String,
    pub size: u32,
    pub color: String,
    pub x: i32,
    pub y: i32,
}

/// Payload of [`crate::events::MEDIA_CREATE_DONE`].
///
/// `image` is whatever the renderer produced (a path, a data URL, a byte
/// array); it is forwarded to the social client untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaCreated {
    pub exchange: String,
    pub high: f64,
    pub time: DateTime<Utc>,
    pub image: Value,
}

/// Payload of [`crate::events::POST_MEDIA`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostMedia {
    pub exchange: String,
    pub high: f64,
    pub time: DateTime<Utc>,
    pub image: Value,
    pub text: String,
}
