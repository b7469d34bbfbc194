//! Stand-in renderer and social client for dry runs.
//!
//! Answers `media.CREATE` with `media.CREATE:DONE` (the "image" is the
//! template's background path) and `twitter.POST_MEDIA` with
//! `twitter.POST_MEDIA:DONE`, logging the caption instead of posting it.

use std::sync::{Arc, Weak};

use ath_core::bus::{EventBus, EventBusExt};
use ath_core::events::{self, Event};
use ath_core::types::{MediaCreate, MediaCreated, PostMedia};
use serde_json::json;
use tracing::{info, warn};

/// Register the loopback handlers on `bus`. They hold the bus weakly and
/// stay registered for the life of the process.
pub fn install(bus: &Arc<dyn EventBus>) {
    let weak = Arc::downgrade(bus);
    bus.subscribe(events::MEDIA_CREATE, Arc::new(move |ev: &Event| render(&weak, ev)));

    let weak = Arc::downgrade(bus);
    bus.subscribe(events::POST_MEDIA, Arc::new(move |ev: &Event| post(&weak, ev)));

    info!("loopback renderer and social client installed");
}

fn render(bus: &Weak<dyn EventBus>, ev: &Event) {
    let Some(bus) = bus.upgrade() else { return };
    let req: MediaCreate = match ev.decode() {
        Ok(r) => r,
        Err(e) => return bus.emit("media.ERROR", json!({ "error": e.to_string() })),
    };
    info!("loopback: rendering {} overlay(s) on {}", req.data.texts.len(), req.data.image);
    bus.emit_json(
        events::MEDIA_CREATE_DONE,
        &MediaCreated {
            exchange: req.exchange,
            high: req.high,
            time: req.time,
            image: json!(req.data.image),
        },
    );
}

fn post(bus: &Weak<dyn EventBus>, ev: &Event) {
    let Some(bus) = bus.upgrade() else { return };
    let req: PostMedia = match ev.decode() {
        Ok(r) => r,
        Err(e) => {
            warn!("loopback: bad post request: {e}");
            return bus.emit("twitter.ERROR", json!({ "error": e.to_string() }));
        }
    };
    info!("loopback: would post\n{}", req.text);
    bus.emit(
        events::POST_MEDIA_DONE,
        json!({
            "id": "loopback",
            "exchange": req.exchange,
            "high": req.high,
            "time": req.time,
            "text": req.text,
            "image": req.image,
        }),
    );
}
