//! Process-wide Prometheus metrics and the `/metrics` exporter.

use axum::{Router, http::StatusCode, routing::get};
use poise::serenity_prelude as serenity;
use prometheus::{
    Histogram, IntCounter, IntCounterVec, IntGauge, TextEncoder, register_histogram,
    register_int_counter, register_int_counter_vec, register_int_gauge,
};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, LazyLock, Mutex};
use tokio::sync::oneshot;
use tracing::{error, info};

use crate::constants::METRICS_UPDATE_PERIOD;

pub static TRACK_EVENTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "track_event",
        "Music track events (failed/loaded/searched)",
        &["type"]
    )
    .expect("valid metric")
});

pub static BIRTHDAYS_LOGGED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!("birthdays_logged", "Announced birthdays").expect("valid metric")
});

pub static COMMAND_LATENCY: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!("command_latency", "Time it takes for a command to process")
        .expect("valid metric")
});

pub static COMMANDS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!("commands", "Commands ran by name", &["name"]).expect("valid metric")
});

pub static CATEGORIES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!("categories", "Command categories ran by name", &["name"])
        .expect("valid metric")
});

pub static GUILDS: LazyLock<IntGauge> =
    LazyLock::new(|| register_int_gauge!("guilds", "Guild count").expect("valid metric"));

pub static USERS: LazyLock<IntGauge> =
    LazyLock::new(|| register_int_gauge!("users", "User count").expect("valid metric"));

pub static MESSAGES_RECEIVED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!("messages_received", "Received messages (all users and bots)")
        .expect("valid metric")
});

pub static ACTIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!("actions", "Action commands used", &["type"]).expect("valid metric")
});

pub static GUILD_ACTIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!("guild_actions", "Guild options executed", &["type"])
        .expect("valid metric")
});

pub static BIRTHDAY_CACHE_SIZE: LazyLock<IntGauge> = LazyLock::new(|| {
    register_int_gauge!("birthday_cache_size", "Users in the birthday cache").expect("valid metric")
});

/// Register every metric so the first scrape already lists them
pub fn init() {
    LazyLock::force(&TRACK_EVENTS);
    LazyLock::force(&BIRTHDAYS_LOGGED);
    LazyLock::force(&COMMAND_LATENCY);
    LazyLock::force(&COMMANDS);
    LazyLock::force(&CATEGORIES);
    LazyLock::force(&GUILDS);
    LazyLock::force(&USERS);
    LazyLock::force(&MESSAGES_RECEIVED);
    LazyLock::force(&ACTIONS);
    LazyLock::force(&GUILD_ACTIONS);
    LazyLock::force(&BIRTHDAY_CACHE_SIZE);

    #[cfg(target_os = "linux")]
    {
        let collector = prometheus::process_collector::ProcessCollector::for_self();
        if let Err(e) = prometheus::register(Box::new(collector)) {
            error!("Failed to register process collector: {}", e);
        }
    }
}

/// Render every registered metric in the text exposition format
pub fn render() -> Result<String, prometheus::Error> {
    TextEncoder::new().encode_to_string(&prometheus::gather())
}

/// Refresh the guild and user gauges from the gateway cache
pub fn start_gauge_updater(cache: Arc<serenity::Cache>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(METRICS_UPDATE_PERIOD);
        loop {
            interval.tick().await;
            GUILDS.set(cache.guild_count() as i64);
            USERS.set(cache.user_count() as i64);
        }
    });
}

/// Lifecycle of the metrics HTTP exporter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExporterState {
    Disabled,
    Enabling,
    Enabled,
}

impl ExporterState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ExporterState::Enabling,
            2 => ExporterState::Enabled,
            _ => ExporterState::Disabled,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ExporterState::Disabled => 0,
            ExporterState::Enabling => 1,
            ExporterState::Enabled => 2,
        }
    }
}

/// HTTP server exposing `/metrics`
pub struct Exporter {
    state: AtomicU8,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

pub static PROMETHEUS: Exporter = Exporter::new();

impl Exporter {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(0),
            shutdown: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ExporterState {
        ExporterState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn transition(&self, from: ExporterState, to: ExporterState) -> bool {
        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Start serving metrics on the given port.
    ///
    /// Returns `Ok(false)` when the exporter is already running or starting.
    pub async fn enable(&self, port: u16) -> Result<bool, std::io::Error> {
        if !self.transition(ExporterState::Disabled, ExporterState::Enabling) {
            return Ok(false);
        }

        let listener = match tokio::net::TcpListener::bind(("0.0.0.0", port)).await {
            Ok(listener) => listener,
            Err(e) => {
                self.state
                    .store(ExporterState::Disabled.as_u8(), Ordering::SeqCst);
                return Err(e);
            }
        };

        let local_addr = listener.local_addr()?;
        let (tx, rx) = oneshot::channel::<()>();
        if let Ok(mut guard) = self.shutdown.lock() {
            *guard = Some(tx);
        }

        let app = Router::new().route("/metrics", get(metrics_handler));
        tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = rx.await;
            });
            if let Err(e) = server.await {
                error!("Metrics exporter stopped with error: {}", e);
            }
        });

        self.state
            .store(ExporterState::Enabled.as_u8(), Ordering::SeqCst);
        info!("Metrics exporter listening on {}", local_addr);
        Ok(true)
    }

    /// Stop the exporter if it is running
    pub async fn disable(&self) {
        loop {
            if self.transition(ExporterState::Enabled, ExporterState::Disabled) {
                break;
            }
            if self.state() == ExporterState::Disabled {
                return;
            }
            tokio::task::yield_now().await;
        }

        let sender = self.shutdown.lock().ok().and_then(|mut guard| guard.take());
        if let Some(tx) = sender {
            let _ = tx.send(());
        }
        info!("Metrics exporter stopped");
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new()
    }
}

async fn metrics_handler() -> (StatusCode, String) {
    match render() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
        }
    }
}
