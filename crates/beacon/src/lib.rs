//! Beacon Pixel Dispatch Engine
//!
//! Frequency-policy evaluation, fire-history persistence, cohort bucketing,
//! and transport-agnostic dispatch for analytics pixels. One [`Dispatcher`]
//! is constructed at startup and passed to the call sites that fire events;
//! there is no global instance.

pub mod calendar;
pub mod cohort;
pub mod history;
pub mod naming;

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use beacon_core::event::error_parameters;
use beacon_core::wire::{headers, params, suffix};
use chrono::{DateTime, Utc};
use url::Url;

pub use beacon_core::{
    BeaconError, BeaconResult, Event, EventKind, Frequency, PixelError, Platform,
};
pub use beacon_store::{MemoryStore, SqliteStore, TimestampStore};

use crate::calendar::{system_clock, DateGenerator, PixelCalendar};
use crate::history::FireHistory;
use crate::naming::{check_name, dedup_key, wire_name};

/// Simulated server response time in dry run.
const DRY_RUN_DELAY_MS: u64 = 100;

/// Completion callback for one planned request: whether the pixel was
/// transmitted, and the transport error when it was not.
pub type OnComplete = Arc<dyn Fn(bool, Option<PixelError>) + Send + Sync>;

/// Transport seam. Receives one composed request and reports the outcome
/// through the completion callback; the engine itself never does HTTP.
pub type FireRequest = Arc<dyn Fn(PixelRequest, OnComplete) + Send + Sync>;

/// One composed pixel request, ready for transmission.
#[derive(Debug, Clone)]
pub struct PixelRequest {
    pub name: String,
    pub headers: HashMap<String, String>,
    pub parameters: HashMap<String, String>,
    /// Query-reserved characters the transport may leave unescaped.
    pub allowed_reserved_characters: Option<String>,
    /// Whether the transport should deliver the completion on its main thread.
    pub callback_on_main_thread: bool,
}

/// Dispatcher configuration.
#[derive(Clone)]
pub struct DispatcherConfig {
    /// Simulate firing without invoking the transport.
    pub dry_run: bool,
    /// Version reported in the `appVersion` parameter.
    pub app_version: String,
    /// Shipping platform, driving the naming rules, the `pixelSource`
    /// parameter, and the client header. `None` leaves names untouched.
    pub platform: Option<Platform>,
    /// Headers used when a call site supplies none of its own.
    pub default_headers: HashMap<String, String>,
    /// Documentation link advertised in the more-info header.
    pub info_url: Option<Url>,
    /// Calendar for daily gating and cohort weeks.
    pub calendar: PixelCalendar,
    /// Clock used for gating and recording; tests substitute a fake.
    pub now: DateGenerator,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            app_version: String::new(),
            platform: None,
            default_headers: HashMap::new(),
            info_url: None,
            calendar: PixelCalendar::utc(),
            now: system_clock(),
        }
    }
}

/// Per-call options for [`Dispatcher::fire_with`].
#[derive(Debug)]
pub struct FireOptions {
    /// Headers replacing the configured defaults for this call.
    pub headers: Option<HashMap<String, String>>,
    /// Extra parameters merged over the event's own.
    pub parameters: HashMap<String, String>,
    /// Error to derive parameters from when the event itself carries none.
    pub error: Option<PixelError>,
    /// Prefix prepended to the event name before the naming rules run.
    pub name_prefix: Option<String>,
    /// Passed through to the transport untouched.
    pub allowed_reserved_characters: Option<String>,
    /// Append the `appVersion` parameter.
    pub include_app_version: bool,
    /// Passed through to the transport untouched.
    pub callback_on_main_thread: bool,
}

impl Default for FireOptions {
    fn default() -> Self {
        Self {
            headers: None,
            parameters: HashMap::new(),
            error: None,
            name_prefix: None,
            allowed_reserved_characters: None,
            include_app_version: true,
            callback_on_main_thread: false,
        }
    }
}

/// The pixel dispatcher: evaluates the frequency policy for each fired event
/// and hands permitted requests to the injected transport.
pub struct Dispatcher {
    config: DispatcherConfig,
    history: FireHistory,
    transport: FireRequest,
}

impl Dispatcher {
    /// Create a dispatcher over a timestamp store and a transport callback.
    pub fn new(
        config: DispatcherConfig,
        store: Arc<dyn TimestampStore>,
        transport: FireRequest,
    ) -> Self {
        let history = FireHistory::new(store, config.calendar, config.dry_run);
        log::debug!(
            "Pixel dispatcher initialized: dry_run={} app_version={} platform={:?}",
            config.dry_run,
            config.app_version,
            config.platform,
        );
        Self {
            config,
            history,
            transport,
        }
    }

    /// Fire an event with default options and no completion callback.
    pub fn fire(&self, event: Event, frequency: Frequency) {
        self.fire_with(event, frequency, FireOptions::default(), None);
    }

    /// Fire an event. Every request the frequency policy plans resolves
    /// `on_complete` exactly once: with the transport outcome when sent,
    /// with `(false, None)` when gated out or dropped.
    pub fn fire_with(
        &self,
        event: Event,
        frequency: Frequency,
        options: FireOptions,
        on_complete: Option<OnComplete>,
    ) {
        let on_complete: OnComplete = on_complete.unwrap_or_else(|| Arc::new(|_, _| {}));
        let now = (*self.config.now)();

        let Event {
            name,
            mut parameters,
            error: event_error,
            kind,
        } = event;
        let pixel_name = wire_name(
            kind,
            &name,
            options.name_prefix.as_deref(),
            self.config.platform,
        );

        let violations = check_name(&pixel_name, frequency);
        let mut fatal = false;
        for violation in &violations {
            log::error!("Pixel {} {}", pixel_name, violation);
            fatal = fatal || violation.is_fatal();
        }
        if fatal {
            (*on_complete)(false, None);
            return;
        }

        // Caller-visible parameters only; the dedup key for parameter-keyed
        // unique pixels must not change when the app version does.
        parameters.extend(options.parameters);
        let unique_key = match frequency {
            Frequency::UniqueByNameAndParameters => Some(dedup_key(&pixel_name, &parameters)),
            _ => None,
        };

        if options.include_app_version {
            parameters.insert(
                params::APP_VERSION.to_string(),
                self.config.app_version.clone(),
            );
        }
        if let Some(platform) = self.config.platform {
            parameters.insert(
                params::PIXEL_SOURCE.to_string(),
                platform.source_tag().to_string(),
            );
        }
        if cfg!(debug_assertions) {
            parameters.insert(params::TEST.to_string(), params::TEST_VALUE.to_string());
        }
        if let Some(error) = event_error.as_deref().or(options.error.as_deref()) {
            parameters.extend(error_parameters(error));
        }

        let mut request_headers = match options.headers {
            Some(request_headers) => request_headers,
            None => self.config.default_headers.clone(),
        };
        if let Some(info_url) = &self.config.info_url {
            request_headers.insert(headers::MORE_INFO.to_string(), format!("See {}", info_url));
        }
        if let Some(platform) = self.config.platform {
            request_headers.insert(
                headers::CLIENT.to_string(),
                platform.client_name().to_string(),
            );
        }

        let request = |request_name: String| PixelRequest {
            name: request_name,
            headers: request_headers.clone(),
            parameters: parameters.clone(),
            allowed_reserved_characters: options.allowed_reserved_characters.clone(),
            callback_on_main_thread: options.callback_on_main_thread,
        };

        match frequency {
            Frequency::Standard => {
                self.send(request(pixel_name), frequency, on_complete);
            }
            Frequency::LegacyInitial | Frequency::UniqueByName => {
                if self.history.fired_ever(&pixel_name) {
                    log_fire(&pixel_name, frequency, &parameters, true);
                    (*on_complete)(false, None);
                } else {
                    self.send(request(pixel_name.clone()), frequency, on_complete);
                    self.history.record_fire(&pixel_name, now);
                }
            }
            Frequency::UniqueByNameAndParameters => {
                let key = unique_key.unwrap_or_else(|| pixel_name.clone());
                if self.history.fired_ever(&key) {
                    log_fire(&pixel_name, frequency, &parameters, true);
                    (*on_complete)(false, None);
                } else {
                    self.send(request(pixel_name), frequency, on_complete);
                    self.history.record_fire(&key, now);
                }
            }
            Frequency::LegacyDaily => {
                if self.history.fired_today(&pixel_name, now) {
                    log_fire(&pixel_name, frequency, &parameters, true);
                    (*on_complete)(false, None);
                } else {
                    self.send(request(pixel_name.clone()), frequency, on_complete);
                    self.history.record_fire(&pixel_name, now);
                }
            }
            Frequency::Daily => {
                let daily_name = format!("{}{}", pixel_name, suffix::LEGACY_DAILY);
                if self.history.fired_today(&pixel_name, now) {
                    log_fire(&daily_name, frequency, &parameters, true);
                    (*on_complete)(false, None);
                } else {
                    self.send(request(daily_name), frequency, on_complete);
                    self.history.record_fire(&pixel_name, now);
                }
            }
            Frequency::LegacyDailyAndCount => {
                let daily_name = format!("{}{}", pixel_name, suffix::LEGACY_DAILY);
                if self.history.fired_today(&pixel_name, now) {
                    log_fire(&daily_name, frequency, &parameters, true);
                    (*on_complete)(false, None);
                } else {
                    self.send(request(daily_name), frequency, on_complete.clone());
                    self.history.record_fire(&pixel_name, now);
                }

                let count_name = format!("{}{}", pixel_name, suffix::LEGACY_COUNT);
                self.send(request(count_name), frequency, on_complete);
            }
            Frequency::DailyAndCount => {
                let daily_name = format!("{}{}", pixel_name, suffix::DAILY);
                if self.history.fired_today(&pixel_name, now) {
                    log_fire(&daily_name, frequency, &parameters, true);
                    (*on_complete)(false, None);
                } else {
                    self.send(request(daily_name), frequency, on_complete.clone());
                    self.history.record_fire(&pixel_name, now);
                }

                let count_name = format!("{}{}", pixel_name, suffix::COUNT);
                self.send(request(count_name), frequency, on_complete);
            }
            Frequency::DailyAndStandard => {
                let daily_name = format!("{}{}", pixel_name, suffix::DAILY);
                if self.history.fired_today(&pixel_name, now) {
                    log_fire(&daily_name, frequency, &parameters, true);
                    (*on_complete)(false, None);
                } else {
                    self.send(request(daily_name), frequency, on_complete.clone());
                    self.history.record_fire(&pixel_name, now);
                }

                self.send(request(pixel_name), frequency, on_complete);
            }
        }
    }

    /// Last time the named pixel fired, in either key layout.
    pub fn pixel_last_fire_date(&self, pixel_name: &str) -> Option<DateTime<Utc>> {
        self.history.last_fire(pixel_name)
    }

    /// Last fire for an event, resolving the wire name first.
    pub fn event_last_fire_date(
        &self,
        event: &Event,
        name_prefix: Option<&str>,
    ) -> Option<DateTime<Utc>> {
        let pixel_name = wire_name(event.kind, &event.name, name_prefix, self.config.platform);
        self.pixel_last_fire_date(&pixel_name)
    }

    /// Forget the named pixel's frequency history so it may fire again.
    pub fn clear_frequency_history(&self, pixel_name: &str) {
        self.history.clear(pixel_name);
    }

    /// Forget all recorded frequency history.
    pub fn clear_all_frequency_history(&self) {
        self.history.clear_all();
    }

    /// Cohort label for an enrollment date, using this dispatcher's calendar
    /// and clock.
    pub fn cohort(&self, enrollment: Option<DateTime<Utc>>) -> String {
        cohort::cohort(enrollment, (*self.config.now)(), self.config.calendar)
    }

    fn send(&self, request: PixelRequest, frequency: Frequency, on_complete: OnComplete) {
        log_fire(&request.name, frequency, &request.parameters, false);

        if self.config.dry_run {
            // Simulate server response time.
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(DRY_RUN_DELAY_MS));
                (*on_complete)(true, None);
            });
            return;
        }

        (*self.transport)(request, on_complete);
    }
}

fn log_fire(name: &str, frequency: Frequency, parameters: &HashMap<String, String>, skipped: bool) {
    let mut shown: Vec<String> = parameters
        .iter()
        .filter(|(key, _)| key.as_str() != params::TEST)
        .map(|(key, value)| format!("{}={}", key, value))
        .collect();
    shown.sort();
    log::debug!(
        "[{}-{}] {} {:?}",
        frequency.label(),
        if skipped { "skipped" } else { "fired" },
        name,
        shown
    );
}
