//! The all-time-high recipe.
//!
//! ## Subscriptions
//!
//! Registered in this order on [`Recipe::start`]:
//!
//! ```text
//! *.ERROR                  ──► log
//! gdax.TRADE               ──► store predicate ──► emit core.NEW_HIGH
//! core.NEW_HIGH            ──► log old -> new, set store high
//! core.NEW_HIGH            ──► debounce per exchange ──► upsert highs (spawned)
//!                                                    └─► emit media.CREATE
//! media.CREATE:DONE        ──► compose caption ──► emit twitter.POST_MEDIA
//! twitter.POST_MEDIA:DONE  ──► log (without image)
//! gdax.CLOSE               ──► log
//! ```
//!
//! The bus dispatches synchronously, so the store is updated by the commit
//! handler before the next trade reaches the predicate. Nothing here retries:
//! a failed highs write is re-emitted as `db.ERROR` and only logged.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use ath_core::bus::{EventBus, EventBusExt, SubscriptionId};
use ath_core::config::{AppConfig, MediaTemplate};
use ath_core::events::{self, Event};
use ath_core::json_util::without_key;
use ath_core::types::*;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::Recipe;
use crate::debounce::{Debouncer, Sink};
use crate::highs::HighsCollection;
use crate::media::{CaptionStyle, compose_caption, compose_media};
use crate::store::{HighState, HighStore};

/// State shared by every handler of one running recipe.
struct Shared {
    name: String,
    bus: Arc<dyn EventBus>,
    highs: Arc<dyn HighsCollection>,
    store: Arc<Mutex<HighStore>>,
    media: MediaTemplate,
    caption: CaptionStyle,
}

impl Shared {
    fn decode<T: serde::de::DeserializeOwned>(&self, ev: &Event) -> Option<T> {
        match ev.decode() {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("[{}] dropping event: {e}", self.name);
                None
            }
        }
    }

    fn on_error(&self, ev: &Event) {
        error!("[{}] {}: {}", self.name, ev.name, ev.payload);
    }

    fn on_trade(&self, ev: &Event) {
        let Some(trade) = self.decode::<TradeEvent>(ev) else { return };
        let is_high = {
            let store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
            store.is_all_time_high(&trade)
        };
        if !is_high {
            return;
        }
        self.bus.emit_json(
            events::NEW_HIGH,
            &NewHigh {
                exchange: trade.exchange,
                price: trade.trade.price,
                pair: trade.trade.product_id,
                time: trade.trade.time,
            },
        );
    }

    fn on_new_high(&self, ev: &Event) {
        let Some(high) = self.decode::<NewHigh>(ev) else { return };
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = store.high(&high.exchange);
        info!(
            "[{}] NEW ALL TIME HIGH! {} {}: {} -> {}",
            self.name,
            high.exchange,
            high.pair,
            previous.map_or_else(|| "none".to_string(), |p| p.to_string()),
            high.price,
        );
        store.set_high(&high.exchange, high.price);
    }

    /// Runs once a burst of new highs on one exchange has settled.
    fn on_settled(&self, high: NewHigh) {
        debug!(
            "[{}] core.NEW_HIGH:DEBOUNCED {}",
            self.name,
            json!({ "exchange": high.exchange, "high": high.price, "time": high.time })
        );

        let record = HighRecord::new(&high.exchange, high.price).at(high.time);
        let highs = Arc::clone(&self.highs);
        let bus = Arc::clone(&self.bus);
        tokio::spawn(async move {
            if let Err(e) = highs.upsert(&record).await {
                bus.emit(
                    events::DB_ERROR,
                    json!({
                        "exchange": record.exchange,
                        "high": record.high,
                        "error": e.to_string()
                    }),
                );
            }
        });

        self.bus.emit_json(
            events::MEDIA_CREATE,
            &MediaCreate {
                data: compose_media(&self.media, high.price),
                exchange: high.exchange,
                high: high.price,
                time: high.time,
            },
        );
    }

    fn on_media_created(&self, ev: &Event) {
        let Some(done) = self.decode::<MediaCreated>(ev) else { return };
        debug!(
            "[{}] media.CREATE:DONE {} {} {}",
            self.name, done.exchange, done.high, done.time
        );

        let text = compose_caption(&self.caption, &done.exchange, done.high, done.time);
        self.bus.emit_json(
            events::POST_MEDIA,
            &PostMedia {
                exchange: done.exchange,
                high: done.high,
                time: done.time,
                image: done.image,
                text,
            },
        );
    }

    fn on_post_done(&self, ev: &Event) {
        info!("[{}] twitter.POST_MEDIA:DONE {}", self.name, without_key(&ev.payload, "image"));
    }

    fn on_feed_close(&self, _ev: &Event) {
        info!("[{}] GDAX connection closed.", self.name);
    }
}

/// Tracks per-exchange all-time highs from the trade feed and drives the
/// announcement chain.
pub struct AllTimeHighRecipe {
    name: String,
    bus: Arc<dyn EventBus>,
    highs: Arc<dyn HighsCollection>,
    store: Arc<Mutex<HighStore>>,
    debounce: Duration,
    media: MediaTemplate,
    caption: CaptionStyle,
    debouncer: Option<Arc<Debouncer<String, NewHigh>>>,
    subscriptions: Vec<SubscriptionId>,
}

impl AllTimeHighRecipe {
    pub fn new(
        bus: Arc<dyn EventBus>,
        highs: Arc<dyn HighsCollection>,
        config: &AppConfig,
    ) -> Result<Self> {
        let caption = CaptionStyle {
            asset_name: config.asset_name.clone(),
            offset: config.caption_offset()?,
        };
        Ok(Self {
            name: config.module_name(),
            bus,
            highs,
            store: Arc::new(Mutex::new(HighStore::new())),
            debounce: config.debounce(),
            media: config.media.clone(),
            caption,
            debouncer: None,
            subscriptions: Vec::new(),
        })
    }

    /// Snapshot of the tracked highs.
    pub fn state(&self) -> HighState {
        self.store.lock().unwrap_or_else(PoisonError::into_inner).get_state()
    }

    pub fn is_running(&self) -> bool {
        !self.subscriptions.is_empty()
    }

    fn on(&mut self, shared: &Arc<Shared>, pattern: &str, handler: fn(&Shared, &Event)) {
        let shared = Arc::clone(shared);
        let id = self.bus.subscribe(pattern, Arc::new(move |ev: &Event| handler(&shared, ev)));
        self.subscriptions.push(id);
    }
}

#[async_trait]
impl Recipe for AllTimeHighRecipe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            bail!("[{}] already started", self.name);
        }

        let records = self.highs.find_all().await?;
        let tracked = self.store.lock().unwrap_or_else(PoisonError::into_inner).load(&records);
        info!(
            "[{}] loaded {} high record(s) for {tracked} exchange(s)",
            self.name,
            records.len()
        );

        let shared = Arc::new(Shared {
            name: self.name.clone(),
            bus: Arc::clone(&self.bus),
            highs: Arc::clone(&self.highs),
            store: Arc::clone(&self.store),
            media: self.media.clone(),
            caption: self.caption.clone(),
        });

        let settle = Arc::clone(&shared);
        let sink: Sink<NewHigh> = Arc::new(move |high| settle.on_settled(high));
        let debouncer = Arc::new(Debouncer::new(self.debounce, sink));
        self.debouncer = Some(Arc::clone(&debouncer));

        self.on(&shared, events::ANY_ERROR, Shared::on_error);
        self.on(&shared, events::TRADE, Shared::on_trade);
        self.on(&shared, events::NEW_HIGH, Shared::on_new_high);

        let debounce_shared = Arc::clone(&shared);
        let id = self.bus.subscribe(
            events::NEW_HIGH,
            Arc::new(move |ev: &Event| {
                if let Some(high) = debounce_shared.decode::<NewHigh>(ev) {
                    debouncer.push(high.exchange.clone(), high);
                }
            }),
        );
        self.subscriptions.push(id);

        self.on(&shared, events::MEDIA_CREATE_DONE, Shared::on_media_created);
        self.on(&shared, events::POST_MEDIA_DONE, Shared::on_post_done);
        self.on(&shared, events::FEED_CLOSE, Shared::on_feed_close);

        info!(
            "[{}] started ({} subscriptions, debounce {:?})",
            self.name,
            self.subscriptions.len(),
            self.debounce,
        );
        info!("[{}] Previous all time high: {}", self.name, self.state());
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        for id in self.subscriptions.drain(..) {
            self.bus.unsubscribe(id);
        }
        if let Some(debouncer) = self.debouncer.take() {
            if debouncer.pending() > 0 {
                warn!("[{}] dropping {} unsettled high(s)", self.name, debouncer.pending());
            }
            debouncer.cancel_all();
        }
        info!("[{}] stopped", self.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use ath_core::bus::LocalBus;
    use ath_core::error::AthError;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::Value;

    use super::*;
    use crate::highs::MemoryHighs;

    const DEBOUNCE: Duration = Duration::from_millis(1000);

    /// Highs collection that records every upsert and can be told to fail.
    #[derive(Default)]
    struct RecordingHighs {
        inner: MemoryHighs,
        upserts: StdMutex<Vec<HighRecord>>,
        fail: bool,
    }

    #[async_trait]
    impl HighsCollection for RecordingHighs {
        async fn find_all(&self) -> ath_core::error::Result<Vec<HighRecord>> {
            self.inner.find_all().await
        }

        async fn upsert(&self, record: &HighRecord) -> ath_core::error::Result<()> {
            self.upserts.lock().unwrap().push(record.clone());
            if self.fail {
                return Err(AthError::Storage("disk full".into()));
            }
            self.inner.upsert(record).await
        }
    }

    struct Harness {
        bus: Arc<LocalBus>,
        highs: Arc<RecordingHighs>,
        seen: Arc<StdMutex<Vec<Event>>>,
        recipe: AllTimeHighRecipe,
    }

    impl Harness {
        async fn start(highs: RecordingHighs) -> Self {
            let bus = Arc::new(LocalBus::new());
            let seen = Arc::new(StdMutex::new(Vec::new()));
            let sink = Arc::clone(&seen);
            bus.subscribe(
                "**",
                Arc::new(move |ev: &Event| sink.lock().unwrap().push(ev.clone())),
            );

            let highs = Arc::new(highs);
            let config = AppConfig::with_debounce(DEBOUNCE);
            let mut recipe = AllTimeHighRecipe::new(bus.clone(), highs.clone(), &config).unwrap();
            recipe.start().await.unwrap();
            Self { bus, highs, seen, recipe }
        }

        fn trade(&self, price: f64, time: DateTime<Utc>) {
            self.bus.emit_json(events::TRADE, &TradeEvent::new("gdax", price, "BTC-USD", time));
        }

        fn payloads(&self, name: &str) -> Vec<Value> {
            let seen = self.seen.lock().unwrap();
            seen.iter().filter(|e| e.name == name).map(|e| e.payload.clone()).collect()
        }

        fn upserts(&self) -> Vec<HighRecord> {
            self.highs.upserts.lock().unwrap().clone()
        }
    }

    fn t(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 4, 14, 0, 0, secs).unwrap()
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        // Let spawned upserts run.
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn first_trade_is_a_new_high() {
        let h = Harness::start(RecordingHighs::default()).await;
        h.trade(50000.0, t(1));

        let highs = h.payloads(events::NEW_HIGH);
        assert_eq!(highs.len(), 1);
        let got: NewHigh = serde_json::from_value(highs[0].clone()).unwrap();
        assert_eq!(
            got,
            NewHigh { exchange: "gdax".into(), price: 50000.0, pair: "BTC-USD".into(), time: t(1) }
        );
        assert_eq!(h.recipe.state().high.get("gdax"), Some(&50000.0));
    }

    #[tokio::test(start_paused = true)]
    async fn lower_or_equal_trade_is_ignored() {
        let h = Harness::start(RecordingHighs::default()).await;
        h.trade(50000.0, t(1));
        h.trade(49000.0, t(2));
        h.trade(50000.0, t(3));

        assert_eq!(h.payloads(events::NEW_HIGH).len(), 1);
        assert_eq!(h.recipe.state().high.get("gdax"), Some(&50000.0));
    }

    #[tokio::test(start_paused = true)]
    async fn high_holds_after_non_qualifying_trades() {
        let h = Harness::start(RecordingHighs::default()).await;
        h.trade(100.0, t(0));
        h.trade(200.0, t(1));
        for i in 0..20 {
            h.trade(150.0 + i as f64, t(2));
        }
        assert_eq!(h.recipe.state().high.get("gdax"), Some(&200.0));
        assert_eq!(h.payloads(events::NEW_HIGH).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_is_persisted_and_announced_once() {
        let h = Harness::start(RecordingHighs::default()).await;
        h.trade(60000.0, t(1));
        advance(200).await;
        h.trade(61000.0, t(2));

        advance(900).await;
        assert!(h.upserts().is_empty());
        assert!(h.payloads(events::MEDIA_CREATE).is_empty());

        advance(200).await;
        assert_eq!(h.upserts(), vec![HighRecord::new("gdax", 61000.0).at(t(2))]);

        let media = h.payloads(events::MEDIA_CREATE);
        assert_eq!(media.len(), 1);
        let req: MediaCreate = serde_json::from_value(media[0].clone()).unwrap();
        assert_eq!((req.exchange.as_str(), req.high, req.time), ("gdax", 61000.0, t(2)));
        assert_eq!(req.data.texts.len(), 8);
        assert!(req.data.texts.iter().all(|o| o.text == "$61,000"));
    }

    #[tokio::test(start_paused = true)]
    async fn exchanges_settle_independently() {
        let h = Harness::start(RecordingHighs::default()).await;
        h.trade(60000.0, t(1));
        advance(500).await;
        let bitstamp = TradeEvent::new("bitstamp", 59000.0, "BTC-USD", t(2));
        h.bus.emit_json(events::TRADE, &bitstamp);
        advance(600).await;

        assert_eq!(h.upserts(), vec![HighRecord::new("gdax", 60000.0).at(t(1))]);
        advance(500).await;
        assert_eq!(h.upserts().len(), 2);
        assert_eq!(h.payloads(events::MEDIA_CREATE).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn persisted_high_is_restored_on_start() {
        let highs = RecordingHighs {
            inner: MemoryHighs::with_records(vec![HighRecord::new("gdax", 61000.0)]),
            ..Default::default()
        };
        let h = Harness::start(highs).await;
        assert_eq!(h.recipe.state().high.get("gdax"), Some(&61000.0));

        h.trade(60000.0, t(1));
        assert!(h.payloads(events::NEW_HIGH).is_empty());
        h.trade(61000.5, t(2));
        assert_eq!(h.payloads(events::NEW_HIGH).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn written_high_reloads_into_a_new_recipe() {
        let h = Harness::start(RecordingHighs::default()).await;
        h.trade(42000.0, t(1));
        advance(1100).await;

        let saved = h.highs.inner.find_all().await.unwrap();
        let highs =
            RecordingHighs { inner: MemoryHighs::with_records(saved), ..Default::default() };
        let restarted = Harness::start(highs).await;
        assert_eq!(restarted.recipe.state().high.get("gdax"), Some(&42000.0));
    }

    #[tokio::test(start_paused = true)]
    async fn rendered_image_is_posted_with_caption() {
        let h = Harness::start(RecordingHighs::default()).await;
        let time = Utc.with_ymd_and_hms(2017, 12, 17, 12, 0, 0).unwrap();
        h.bus.emit_json(
            events::MEDIA_CREATE_DONE,
            &MediaCreated {
                exchange: "gdax".into(),
                high: 19650.01,
                time,
                image: json!("/tmp/ath.png"),
            },
        );

        let posts = h.payloads(events::POST_MEDIA);
        assert_eq!(posts.len(), 1);
        let post: PostMedia = serde_json::from_value(posts[0].clone()).unwrap();
        assert_eq!(post.image, json!("/tmp/ath.png"));
        assert_eq!(post.high, 19650.01);
        assert_eq!(
            post.text,
            "🎉🎉 NEW ALL TIME HIGH 🎉🎉\n\n 1 Bitcoin = $19,650.01 USD\n\n \
             Sunday, December 17th 2017, 12:00:00 pm on GDAX"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_write_surfaces_as_db_error() {
        let h = Harness::start(RecordingHighs { fail: true, ..Default::default() }).await;
        h.trade(1.0, t(1));
        advance(1100).await;

        let errors = h.payloads(events::DB_ERROR);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["exchange"], "gdax");
        assert!(errors[0]["error"].as_str().unwrap().contains("disk full"));
        // The announcement does not wait on the write.
        assert_eq!(h.payloads(events::MEDIA_CREATE).len(), 1);
        assert_eq!(h.upserts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_trade_is_dropped() {
        let h = Harness::start(RecordingHighs::default()).await;
        h.bus.emit(events::TRADE, json!({ "exchange": "gdax", "trade": { "price": "n/a" } }));
        assert!(h.payloads(events::NEW_HIGH).is_empty());
        assert!(h.recipe.state().high.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn infinite_price_string_never_becomes_a_high() {
        let h = Harness::start(RecordingHighs::default()).await;
        let trade = |price: &str| {
            json!({
                "exchange": "gdax",
                "trade": {
                    "price": price,
                    "product_id": "BTC-USD",
                    "time": "2021-04-14T00:00:01Z"
                }
            })
        };
        h.bus.emit(events::TRADE, trade("inf"));
        h.bus.emit(events::TRADE, trade("NaN"));
        advance(1100).await;

        assert!(h.payloads(events::NEW_HIGH).is_empty());
        assert!(h.upserts().is_empty());

        h.bus.emit(events::TRADE, trade("64000"));
        assert_eq!(h.recipe.state().high.get("gdax"), Some(&64000.0));
    }

    #[tokio::test(start_paused = true)]
    async fn half_dollar_high_rounds_up_in_overlay() {
        let h = Harness::start(RecordingHighs::default()).await;
        h.trade(60000.5, t(1));
        advance(1100).await;

        let media = h.payloads(events::MEDIA_CREATE);
        let req: MediaCreate = serde_json::from_value(media[0].clone()).unwrap();
        assert!(req.data.texts.iter().all(|o| o.text == "$60,001"));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_unsubscribes_and_cancels_pending() {
        let mut h = Harness::start(RecordingHighs::default()).await;
        assert_eq!(h.bus.subscriber_count(), 8);
        assert!(h.recipe.start().await.is_err());

        h.trade(10.0, t(1));
        h.recipe.stop().await.unwrap();
        assert_eq!(h.bus.subscriber_count(), 1);

        h.trade(20.0, t(2));
        advance(2000).await;
        assert_eq!(h.payloads(events::NEW_HIGH).len(), 1);
        assert!(h.upserts().is_empty());
        assert!(h.payloads(events::MEDIA_CREATE).is_empty());
    }
}
