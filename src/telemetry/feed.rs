//! Telemetry feed channel.
//!
//! Bridges the push client (or the demo generator) into the synchronous
//! egui update loop. Every event goes through one unbounded channel with a
//! single consumer, so readings are drained in delivery order.

use eframe::egui;
use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::types::{TelemetryEvent, TelemetryReading, TelemetryValue};
use crate::config::{TelemetryConfig, TelemetrySourceKind};

/// Deterministic tank level generator used when no live feed is available.
#[derive(Debug, Clone)]
pub struct DemoFeed {
    field: String,
    level: f64,
    step: f64,
}

impl DemoFeed {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            level: 0.0,
            step: 3.5,
        }
    }

    /// Fills up to 100% and then drains back to 0.
    pub fn next_reading(&mut self) -> TelemetryReading {
        self.level += self.step;
        if !(0.0..=100.0).contains(&self.level) {
            self.step = -self.step;
            self.level = self.level.clamp(0.0, 100.0);
        }
        let rounded = (self.level * 10.0).round() / 10.0;
        TelemetryReading::new(self.field.clone(), TelemetryValue::Number(rounded))
    }
}

/// Channel-based telemetry subscription.
///
/// At most one subscription is active at a time; `subscribe` while active
/// is ignored. Each subscription gets its own channel, so events still
/// queued from an earlier subscription are never delivered after it ends.
pub struct TelemetryFeed {
    sender: UnboundedSender<TelemetryEvent>,
    receiver: UnboundedReceiver<TelemetryEvent>,
    active: bool,
    stop_requested: Arc<AtomicBool>,
    #[cfg(target_arch = "wasm32")]
    live: Option<lightstreamer::LiveSubscription>,
}

impl Default for TelemetryFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryFeed {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            active: false,
            stop_requested: Arc::new(AtomicBool::new(false)),
            #[cfg(target_arch = "wasm32")]
            live: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Starts the configured source.
    pub fn subscribe(&mut self, ctx: egui::Context, config: &TelemetryConfig) {
        if self.active {
            log::debug!("Telemetry subscription already active, ignoring request");
            return;
        }

        // Leftovers of a subscription that ended by error.
        self.teardown();

        // A fresh flag and channel, so a previous source that has not
        // noticed its stop yet can neither be revived nor reach the reader.
        let (sender, receiver) = unbounded();
        self.sender = sender;
        self.receiver = receiver;
        self.stop_requested = Arc::new(AtomicBool::new(false));
        self.active = true;

        match config.source {
            TelemetrySourceKind::Demo => self.start_demo(ctx, config),
            TelemetrySourceKind::Lightstreamer => self.start_live(ctx, config),
        }
    }

    /// Cancels the subscription and releases its source.
    pub fn stop(&mut self) {
        if self.active {
            log::info!("Stopping telemetry feed");
            self.active = false;
        }
        self.teardown();
    }

    /// Signals the demo loop to stop and disconnects the live client.
    fn teardown(&mut self) {
        self.stop_requested.store(true, Ordering::SeqCst);

        #[cfg(target_arch = "wasm32")]
        {
            if self.live.take().is_some() {
                log::info!("Disconnected live telemetry client");
            }
        }
    }

    /// Non-blocking poll for the next event.
    ///
    /// An `Error` ends the subscription: its source is torn down and later
    /// events from it are discarded.
    pub fn try_recv(&mut self) -> Option<TelemetryEvent> {
        if !self.active {
            return None;
        }
        match self.receiver.try_next() {
            Ok(Some(event)) => {
                if matches!(event, TelemetryEvent::Error(_)) {
                    self.active = false;
                    self.teardown();
                }
                Some(event)
            }
            _ => None,
        }
    }

    /// Sender side, for sources that push events directly.
    pub fn sender(&self) -> UnboundedSender<TelemetryEvent> {
        self.sender.clone()
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn start_demo(&self, ctx: egui::Context, config: &TelemetryConfig) {
        let sender = self.sender();
        let stop = self.stop_requested.clone();
        let interval = std::time::Duration::from_millis(config.demo_interval_ms as u64);
        let mut demo = DemoFeed::new(config.value_field.clone());

        log::info!("Starting demo telemetry feed ({:?} interval)", interval);
        let _ = sender.unbounded_send(TelemetryEvent::Subscribed);

        std::thread::spawn(move || loop {
            if stop.load(Ordering::SeqCst) {
                log::info!("Demo telemetry feed stopped");
                break;
            }
            if sender
                .unbounded_send(TelemetryEvent::Reading(demo.next_reading()))
                .is_err()
            {
                break;
            }
            ctx.request_repaint();
            std::thread::sleep(interval);
        });
    }

    #[cfg(target_arch = "wasm32")]
    fn start_demo(&self, ctx: egui::Context, config: &TelemetryConfig) {
        let sender = self.sender();
        let stop = self.stop_requested.clone();
        let interval = config.demo_interval_ms;
        let mut demo = DemoFeed::new(config.value_field.clone());

        log::info!("Starting demo telemetry feed ({} ms interval)", interval);
        let _ = sender.unbounded_send(TelemetryEvent::Subscribed);

        wasm_bindgen_futures::spawn_local(async move {
            loop {
                if stop.load(Ordering::SeqCst) {
                    log::info!("Demo telemetry feed stopped");
                    break;
                }
                if sender
                    .unbounded_send(TelemetryEvent::Reading(demo.next_reading()))
                    .is_err()
                {
                    break;
                }
                ctx.request_repaint();
                sleep_ms(interval).await;
            }
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn start_live(&mut self, _ctx: egui::Context, config: &TelemetryConfig) {
        let _ = self.sender.unbounded_send(TelemetryEvent::Error(format!(
            "Live telemetry not available on native platform (item: {})",
            config.item
        )));
    }

    #[cfg(target_arch = "wasm32")]
    fn start_live(&mut self, ctx: egui::Context, config: &TelemetryConfig) {
        match lightstreamer::LiveSubscription::start(ctx, config, self.sender()) {
            Ok(live) => self.live = Some(live),
            Err(e) => {
                log::error!("Failed to start telemetry subscription: {}", e);
                let _ = self.sender.unbounded_send(TelemetryEvent::Error(e));
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
async fn sleep_ms(ms: u32) {
    use wasm_bindgen::prelude::*;

    #[wasm_bindgen]
    extern "C" {
        #[wasm_bindgen(js_name = setTimeout)]
        fn set_timeout(closure: &Closure<dyn FnMut()>, millis: u32) -> i32;
    }

    let (tx, rx) = futures_channel::oneshot::channel::<()>();
    let closure = Closure::once(move || {
        let _ = tx.send(());
    });
    set_timeout(&closure, ms);
    let _ = rx.await;
}

/// Bindings to the Lightstreamer web client loaded by the host page.
#[cfg(target_arch = "wasm32")]
mod lightstreamer {
    use super::super::types::{TelemetryEvent, TelemetryReading, TelemetryValue};
    use crate::config::TelemetryConfig;
    use eframe::egui;
    use futures_channel::mpsc::UnboundedSender;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;

    #[wasm_bindgen]
    extern "C" {
        type LightstreamerClient;

        #[wasm_bindgen(catch, constructor)]
        fn new(server: &str, adapter_set: &str) -> Result<LightstreamerClient, JsValue>;

        #[wasm_bindgen(method)]
        fn connect(this: &LightstreamerClient);

        #[wasm_bindgen(method)]
        fn disconnect(this: &LightstreamerClient);

        #[wasm_bindgen(method)]
        fn subscribe(this: &LightstreamerClient, subscription: &Subscription);

        type Subscription;

        #[wasm_bindgen(catch, constructor)]
        fn new(
            mode: &str,
            items: js_sys::Array,
            fields: js_sys::Array,
        ) -> Result<Subscription, JsValue>;

        #[wasm_bindgen(method, js_name = addListener)]
        fn add_listener(this: &Subscription, listener: &js_sys::Object);

        type ItemUpdate;

        #[wasm_bindgen(method, js_name = getValue)]
        fn get_value(this: &ItemUpdate, field: &str) -> Option<String>;
    }

    /// A connected client with its listener callbacks.
    pub(super) struct LiveSubscription {
        client: LightstreamerClient,
        _on_update: Closure<dyn FnMut(ItemUpdate)>,
        _on_subscribed: Closure<dyn FnMut()>,
        _on_error: Closure<dyn FnMut(JsValue, JsValue)>,
    }

    impl LiveSubscription {
        pub(super) fn start(
            ctx: egui::Context,
            config: &TelemetryConfig,
            sender: UnboundedSender<TelemetryEvent>,
        ) -> Result<Self, String> {
            log::info!(
                "Connecting to {} ({}) for item {}",
                config.server_url,
                config.adapter_set,
                config.item
            );

            let client = LightstreamerClient::new(&config.server_url, &config.adapter_set)
                .map_err(|e| format!("Lightstreamer client unavailable: {:?}", e))?;

            let items = js_sys::Array::of1(&JsValue::from_str(&config.item));
            let fields = js_sys::Array::of2(
                &JsValue::from_str(&config.value_field),
                &JsValue::from_str(&config.timestamp_field),
            );
            let subscription = Subscription::new("MERGE", items, fields)
                .map_err(|e| format!("Subscription rejected: {:?}", e))?;

            let on_update = {
                let sender = sender.clone();
                let ctx = ctx.clone();
                let value_field = config.value_field.clone();
                let timestamp_field = config.timestamp_field.clone();
                Closure::<dyn FnMut(ItemUpdate)>::new(move |update: ItemUpdate| {
                    let Some(raw) = update.get_value(&value_field) else {
                        return;
                    };
                    let timestamp = update
                        .get_value(&timestamp_field)
                        .and_then(|t| t.parse::<f64>().ok());
                    let reading =
                        TelemetryReading::new(value_field.clone(), TelemetryValue::parse(&raw))
                            .with_timestamp(timestamp);
                    let _ = sender.unbounded_send(TelemetryEvent::Reading(reading));
                    ctx.request_repaint();
                })
            };

            let on_subscribed = {
                let sender = sender.clone();
                let ctx = ctx.clone();
                Closure::<dyn FnMut()>::new(move || {
                    let _ = sender.unbounded_send(TelemetryEvent::Subscribed);
                    ctx.request_repaint();
                })
            };

            let on_error = {
                let ctx = ctx.clone();
                Closure::<dyn FnMut(JsValue, JsValue)>::new(move |code: JsValue, msg: JsValue| {
                    let _ = sender.unbounded_send(TelemetryEvent::Error(format!(
                        "Subscription error {:?}: {:?}",
                        code, msg
                    )));
                    ctx.request_repaint();
                })
            };

            let listener = js_sys::Object::new();
            let set = |name: &str, f: &JsValue| {
                js_sys::Reflect::set(&listener, &JsValue::from_str(name), f)
                    .map(|_| ())
                    .map_err(|e| format!("Failed to build listener: {:?}", e))
            };
            set("onItemUpdate", on_update.as_ref().unchecked_ref())?;
            set("onSubscription", on_subscribed.as_ref().unchecked_ref())?;
            set("onSubscriptionError", on_error.as_ref().unchecked_ref())?;

            subscription.add_listener(&listener);
            client.connect();
            client.subscribe(&subscription);

            Ok(Self {
                client,
                _on_update: on_update,
                _on_subscribed: on_subscribed,
                _on_error: on_error,
            })
        }
    }

    impl Drop for LiveSubscription {
        fn drop(&mut self) {
            self.client.disconnect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_feed_stays_in_range() {
        let mut demo = DemoFeed::new("Value");
        let mut saw_full = false;
        for _ in 0..200 {
            let reading = demo.next_reading();
            assert_eq!(reading.field, "Value");
            let TelemetryValue::Number(n) = reading.value else {
                panic!("demo feed produced text");
            };
            assert!((0.0..=100.0).contains(&n));
            saw_full |= n == 100.0;
        }
        assert!(saw_full);
    }

    #[test]
    fn test_events_drain_in_order() {
        let mut feed = TelemetryFeed::new();
        feed.active = true;
        let sender = feed.sender();
        for v in [10.0, 20.0, 30.0] {
            sender
                .unbounded_send(TelemetryEvent::Reading(TelemetryReading::new(
                    "Value",
                    TelemetryValue::Number(v),
                )))
                .unwrap();
        }

        let mut values = Vec::new();
        while let Some(TelemetryEvent::Reading(r)) = feed.try_recv() {
            values.push(r.value);
        }
        assert_eq!(
            values,
            vec![
                TelemetryValue::Number(10.0),
                TelemetryValue::Number(20.0),
                TelemetryValue::Number(30.0)
            ]
        );
        assert!(feed.try_recv().is_none());
    }

    #[test]
    fn test_error_event_clears_active() {
        let mut feed = TelemetryFeed::new();
        feed.active = true;
        feed.sender()
            .unbounded_send(TelemetryEvent::Error("gone".into()))
            .unwrap();

        assert!(matches!(feed.try_recv(), Some(TelemetryEvent::Error(_))));
        assert!(!feed.is_active());
    }

    /// Demo source that emits its first reading and then sleeps for a minute.
    fn slow_demo() -> TelemetryConfig {
        TelemetryConfig {
            source: TelemetrySourceKind::Demo,
            demo_interval_ms: 60_000,
            ..Default::default()
        }
    }

    fn count_subscribed(feed: &mut TelemetryFeed) -> usize {
        let mut count = 0;
        while let Some(event) = feed.try_recv() {
            if matches!(event, TelemetryEvent::Subscribed) {
                count += 1;
            }
        }
        count
    }

    #[test]
    fn test_subscribe_while_active_is_ignored() {
        let ctx = egui::Context::default();
        let mut feed = TelemetryFeed::new();

        feed.subscribe(ctx.clone(), &slow_demo());
        feed.subscribe(ctx, &slow_demo());

        assert!(feed.is_active());
        assert_eq!(count_subscribed(&mut feed), 1);
        feed.stop();
    }

    #[test]
    fn test_stop_then_subscribe_leaves_one_source() {
        let ctx = egui::Context::default();
        let mut feed = TelemetryFeed::new();

        feed.subscribe(ctx.clone(), &slow_demo());
        let first_stop = feed.stop_requested.clone();
        feed.stop();
        assert!(!feed.is_active());
        assert!(first_stop.load(Ordering::SeqCst));

        feed.subscribe(ctx, &slow_demo());
        assert!(feed.is_active());
        assert!(!feed.stop_requested.load(Ordering::SeqCst));
        assert_eq!(count_subscribed(&mut feed), 1);
        feed.stop();
    }

    #[test]
    fn test_events_from_previous_subscription_are_discarded() {
        let ctx = egui::Context::default();
        let mut feed = TelemetryFeed::new();

        feed.subscribe(ctx.clone(), &slow_demo());
        let old_sender = feed.sender();
        feed.stop();
        feed.subscribe(ctx, &slow_demo());

        // A late error from the old source cannot end the new subscription
        let _ = old_sender.unbounded_send(TelemetryEvent::Error("late".into()));
        while let Some(event) = feed.try_recv() {
            assert!(!matches!(event, TelemetryEvent::Error(_)));
        }
        assert!(feed.is_active());
        feed.stop();
    }

    #[test]
    fn test_events_after_stop_are_not_delivered() {
        let mut feed = TelemetryFeed::new();
        feed.active = true;
        let sender = feed.sender();
        feed.stop();

        let _ = sender.unbounded_send(TelemetryEvent::Subscribed);
        assert!(feed.try_recv().is_none());
    }

    #[test]
    fn test_error_then_resubscribe_is_single_subscription() {
        let ctx = egui::Context::default();
        let mut feed = TelemetryFeed::new();

        feed.subscribe(ctx.clone(), &slow_demo());
        let first_stop = feed.stop_requested.clone();
        feed.sender()
            .unbounded_send(TelemetryEvent::Error("dropped".into()))
            .unwrap();
        while feed.try_recv().is_some() {}
        assert!(!feed.is_active());
        assert!(first_stop.load(Ordering::SeqCst));

        feed.subscribe(ctx, &slow_demo());
        assert!(feed.is_active());
        assert_eq!(count_subscribed(&mut feed), 1);
        feed.stop();
    }
}
