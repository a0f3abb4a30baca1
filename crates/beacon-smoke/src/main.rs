//! Beacon Smoke Harness
//!
//! Exercises the pixel dispatcher end to end against a recording transport
//! and a steerable clock: naming rules, frequency gating, history
//! persistence, cohort labels, and the dry-run path. Prints a JSON result
//! summary and exits non-zero when any check fails.

use std::path::Path;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use beacon::calendar::DateGenerator;
use beacon::{
    Dispatcher, DispatcherConfig, Event, FireOptions, FireRequest, Frequency, MemoryStore,
    OnComplete, PixelRequest, Platform, SqliteStore, TimestampStore,
};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use url::Url;

const TIMEOUT: Duration = Duration::from_secs(2);

/// Parse command line arguments
struct Args {
    db: Option<String>,
    json_output: Option<String>,
    verbose: bool,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut db = None;
        let mut json_output = None;
        let mut verbose = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    db = args.next();
                }
                "--json-output" => {
                    json_output = args.next();
                }
                "--verbose" => {
                    verbose = true;
                }
                _ => {}
            }
        }

        Self {
            db,
            json_output,
            verbose,
        }
    }
}

/// Steerable clock driving the dispatcher under test.
#[derive(Clone)]
struct Clock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl Clock {
    fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    fn generator(&self) -> DateGenerator {
        let now = self.now.clone();
        Arc::new(move || *now.lock().unwrap())
    }

    fn advance(&self, duration: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + duration;
    }
}

/// Transport double that records every request and reports success.
#[derive(Clone, Default)]
struct RecordingTransport {
    requests: Arc<Mutex<Vec<PixelRequest>>>,
}

impl RecordingTransport {
    fn fire_request(&self) -> FireRequest {
        let requests = self.requests.clone();
        Arc::new(move |request: PixelRequest, on_complete: OnComplete| {
            requests.lock().unwrap().push(request);
            (*on_complete)(true, None);
        })
    }

    fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn names(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.name.clone())
            .collect()
    }

    fn last(&self) -> Option<PixelRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

/// Accumulates named pass/fail results for the final summary.
struct CheckList {
    results: Vec<(String, bool)>,
}

impl CheckList {
    fn new() -> Self {
        Self {
            results: Vec::new(),
        }
    }

    fn record(&mut self, name: &str, pass: bool) {
        if pass {
            info!("[PASS] {}", name);
        } else {
            error!("[FAIL] {}", name);
        }
        self.results.push((name.to_string(), pass));
    }

    fn failed(&self) -> usize {
        self.results.iter().filter(|(_, pass)| !pass).count()
    }
}

fn completion_channel() -> (OnComplete, Receiver<(bool, Option<String>)>) {
    let (tx, rx) = mpsc::channel();
    let on_complete: OnComplete = Arc::new(move |fired, error| {
        let _ = tx.send((fired, error.map(|e| e.to_string())));
    });
    (on_complete, rx)
}

fn harness_config(clock: &Clock) -> DispatcherConfig {
    DispatcherConfig {
        app_version: "1.0.5".to_string(),
        platform: Some(Platform::MacDmg),
        info_url: Some(Url::parse("https://example.com/privacy").expect("valid info url")),
        now: clock.generator(),
        ..DispatcherConfig::default()
    }
}

fn main() {
    let args = Args::parse();

    // Initialize logging with log compatibility
    tracing_log::LogTracer::init().expect("Failed to set log tracer");
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    info!("Starting Beacon smoke harness");

    let start = Utc
        .with_ymd_and_hms(2024, 2, 24, 12, 0, 0)
        .single()
        .expect("valid start date");
    let clock = Clock::new(start);
    let transport = RecordingTransport::default();

    let store: Arc<dyn TimestampStore> = match &args.db {
        Some(path) => match SqliteStore::open(Path::new(path)) {
            Ok(store) => {
                info!(path = %path, "Using sqlite-backed timestamp store");
                Arc::new(store)
            }
            Err(e) => {
                error!(?e, "Failed to open sqlite store, falling back to memory");
                Arc::new(MemoryStore::new())
            }
        },
        None => Arc::new(MemoryStore::new()),
    };

    let dispatcher = Dispatcher::new(
        harness_config(&clock),
        store.clone(),
        transport.fire_request(),
    );
    let mut checks = CheckList::new();

    // Naming, parameter, and header composition.
    dispatcher.fire(
        Event::new("settings_opened").with_parameter("section", "general"),
        Frequency::Standard,
    );
    match transport.last() {
        Some(request) => {
            checks.record(
                "standard pixel carries the platform prefix",
                request.name == "m_mac_settings_opened",
            );
            checks.record(
                "standard pixel reports appVersion",
                request.parameters.get("appVersion").map(String::as_str) == Some("1.0.5"),
            );
            checks.record(
                "standard pixel advertises the info url",
                request.headers.get("X-Beacon-More-Info").map(String::as_str)
                    == Some("See https://example.com/privacy"),
            );
        }
        None => checks.record("standard pixel reaches the transport", false),
    }

    // Error details become pixel parameters.
    let io_error = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
    dispatcher.fire(
        Event::new("sync_failed").with_error(io_error),
        Frequency::Standard,
    );
    checks.record(
        "error details become pixel parameters",
        transport
            .last()
            .and_then(|r| r.parameters.get("error").cloned())
            .as_deref()
            == Some("connection reset"),
    );

    // Daily gating across a midnight boundary.
    let before = transport.count();
    dispatcher.fire(Event::new("daily_section"), Frequency::Daily);
    dispatcher.fire(Event::new("daily_section"), Frequency::Daily);
    checks.record(
        "daily pixel gates within the day",
        transport.count() == before + 1,
    );
    checks.record(
        "daily pixel takes the _d suffix on the wire",
        transport
            .names()
            .iter()
            .any(|name| name == "m_mac_daily_section_d"),
    );
    clock.advance(chrono::Duration::days(1));
    dispatcher.fire(Event::new("daily_section"), Frequency::Daily);
    checks.record(
        "daily pixel fires again after midnight",
        transport.count() == before + 2,
    );

    // Unique pixels fire once ever and re-arm after a history clear.
    let before = transport.count();
    dispatcher.fire(Event::new("setup_complete_u"), Frequency::UniqueByName);
    dispatcher.fire(Event::new("setup_complete_u"), Frequency::UniqueByName);
    checks.record(
        "unique pixel fires once ever",
        transport.count() == before + 1,
    );
    dispatcher.clear_frequency_history("m_mac_setup_complete_u");
    dispatcher.fire(Event::new("setup_complete_u"), Frequency::UniqueByName);
    checks.record(
        "clearing history re-arms the pixel",
        transport.count() == before + 2,
    );

    // Unique pixels without the required suffix are dropped, not sent.
    let before = transport.count();
    let (on_complete, rx) = completion_channel();
    dispatcher.fire_with(
        Event::new("setup_missing"),
        Frequency::UniqueByName,
        FireOptions::default(),
        Some(on_complete),
    );
    let dropped = matches!(rx.recv_timeout(TIMEOUT), Ok((false, None)));
    checks.record(
        "unique pixel without the _u suffix is dropped",
        dropped && transport.count() == before,
    );

    // Two-leg daily-and-count dispatch.
    let before = transport.count();
    dispatcher.fire(Event::new("copy"), Frequency::DailyAndCount);
    checks.record(
        "daily-and-count plans two requests",
        transport.count() == before + 2,
    );
    dispatcher.fire(Event::new("copy"), Frequency::DailyAndCount);
    checks.record(
        "daily-and-count gates only the daily leg",
        transport.count() == before + 3,
    );

    // History lives in the store, not the dispatcher.
    let rebuilt = Dispatcher::new(
        harness_config(&clock),
        store.clone(),
        transport.fire_request(),
    );
    let before = transport.count();
    rebuilt.fire(Event::new("setup_complete_u"), Frequency::UniqueByName);
    checks.record(
        "history survives dispatcher reconstruction",
        transport.count() == before,
    );

    // Cohort labels from the enrollment week, collapsing after six weeks.
    checks.record(
        "cohort labels the enrollment week",
        dispatcher.cohort(Some(start)) == "week-60",
    );
    clock.advance(chrono::Duration::days(49));
    checks.record(
        "cohort collapses after six weeks",
        dispatcher.cohort(Some(start)).is_empty(),
    );

    // Dry run simulates the transport without invoking it.
    let dry_transport = RecordingTransport::default();
    let dry = Dispatcher::new(
        DispatcherConfig {
            dry_run: true,
            ..harness_config(&clock)
        },
        Arc::new(MemoryStore::new()),
        dry_transport.fire_request(),
    );
    let (on_complete, rx) = completion_channel();
    dry.fire_with(
        Event::new("dry_probe"),
        Frequency::Standard,
        FireOptions::default(),
        Some(on_complete),
    );
    let completed = matches!(rx.recv_timeout(TIMEOUT), Ok((true, None)));
    checks.record(
        "dry run completes without touching the transport",
        completed && dry_transport.count() == 0,
    );

    let failed = checks.failed();
    let result = json!({
        "status": if failed == 0 { "pass" } else { "fail" },
        "checks": checks
            .results
            .iter()
            .map(|(name, pass)| json!({ "name": name, "pass": pass }))
            .collect::<Vec<_>>(),
        "pixels_sent": transport.count(),
        "failed": failed,
    });
    println!("{}", result);

    if let Some(path) = &args.json_output {
        if let Err(e) = std::fs::write(path, result.to_string()) {
            error!(?e, "Failed to write result summary");
        } else {
            info!(path = %path, "Result summary written");
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
}
