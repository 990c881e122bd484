// src/notify/mod.rs
//! Threshold-gated alert dispatch to a chat channel.
//!
//! The send path is serialized by an async mutex: concurrent callers queue up
//! behind one in-flight delivery (including its backoff sleeps) instead of
//! interleaving requests. Delivery is at-least-once; a retried 429 may
//! duplicate a message the server actually accepted.

pub mod message;
pub mod retry;
pub mod telegram;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::NotifyConfig;
use crate::telemetry::ensure_metrics_described;
pub use message::{format_alert_message, truncate_message, MAX_MESSAGE_LENGTH, TRUNCATION_MARKER};
pub use retry::{DeliveryOutcome, RetryPolicy, Step};
pub use telegram::TelegramTransport;

/// Aggregate sentiment figures fed in once per evaluation cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlertMetrics {
    pub average_compound_score: f64,
    pub positive_ratio: f64,
    pub negative_ratio: f64,
    pub total_analyzed: u32,
    pub anomalies_detected: Option<u32>,
    /// Free-form label such as "bullish" / "bearish" / "neutral".
    pub trend_direction: Option<String>,
}

/// Counters kept under the send lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub attempts: u64,
    pub delivered: u64,
    pub failed: u64,
}

pub struct AlertDispatcher {
    channel_id: Option<String>,
    threshold: f64,
    dry_run: bool,
    policy: RetryPolicy,
    /// `None` when credentials are missing (or the client could not be built).
    transport: Option<TelegramTransport>,
    send_lock: Mutex<DispatchStats>,
}

impl AlertDispatcher {
    pub fn new(cfg: NotifyConfig) -> Self {
        ensure_metrics_described();

        let policy = RetryPolicy {
            max_retries: cfg.max_retries,
            initial_delay: cfg.initial_backoff(),
            max_delay: cfg.max_backoff(),
        };

        let transport = match (cfg.bot_token.as_deref(), cfg.channel_id.as_deref()) {
            (Some(token), Some(chat)) if !token.is_empty() && !chat.is_empty() => {
                match TelegramTransport::new(&cfg.api_base, token, chat, cfg.timeout()) {
                    Ok(t) => Some(t),
                    Err(e) => {
                        error!(error = ?e, "alert transport unavailable");
                        None
                    }
                }
            }
            _ => None,
        };

        if transport.is_none() {
            warn!(
                "alert dispatcher not configured: missing TELEGRAM_BOT_TOKEN or TELEGRAM_CHANNEL_ID; \
                 alerts will be logged but not sent"
            );
        } else if cfg.dry_run {
            info!("alert dispatcher in dry-run mode (messages will be logged, not sent)");
        } else {
            info!(
                channel = %mask_channel_id(cfg.channel_id.as_deref().unwrap_or_default()),
                "alert dispatcher initialized"
            );
        }

        Self {
            channel_id: cfg.channel_id,
            threshold: cfg.threshold,
            dry_run: cfg.dry_run,
            policy,
            transport,
            send_lock: Mutex::new(DispatchStats::default()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn channel_id(&self) -> Option<&str> {
        self.channel_id.as_deref()
    }

    /// Waits for any in-flight send to finish.
    pub async fn stats(&self) -> DispatchStats {
        *self.send_lock.lock().await
    }

    /// Alert when `score` is strictly above the threshold. Returns whether an
    /// alert was sent (or would have been, in dry-run).
    pub async fn check_and_alert(
        &self,
        score: f64,
        metrics: &AlertMetrics,
        timestamp: Option<DateTime<Utc>>,
    ) -> bool {
        // NaN compares false and never alerts.
        if !(score > self.threshold) {
            debug!(score, threshold = self.threshold, "score not above threshold, no alert");
            return false;
        }

        info!(score, threshold = self.threshold, "score exceeds threshold, triggering alert");
        counter!("alerts_triggered_total").increment(1);

        let ts = timestamp.unwrap_or_else(Utc::now);
        let message = format_alert_message(score, metrics, ts);
        self.send_alert(&message).await
    }

    pub async fn send_alert(&self, message: &str) -> bool {
        let mut stats = self.send_lock.lock().await;
        let message = truncate_message(message);

        let Some(transport) = &self.transport else {
            info!("[UNCONFIGURED] alert message:\n{message}");
            return false;
        };

        if self.dry_run {
            info!("[DRY-RUN] would send alert:\n{message}");
            return true;
        }

        let ok = self.deliver(transport, &message, &mut stats).await;
        if ok {
            stats.delivered += 1;
            counter!("alerts_sent_total").increment(1);
        } else {
            stats.failed += 1;
            counter!("alerts_failed_total").increment(1);
        }
        ok
    }

    async fn deliver(
        &self,
        transport: &TelegramTransport,
        message: &str,
        stats: &mut DispatchStats,
    ) -> bool {
        let mut delay = self.policy.initial_delay;
        let mut attempt = 0u32;

        loop {
            stats.attempts += 1;
            counter!("alert_attempts_total").increment(1);

            let outcome = transport.send_once(message).await;
            log_outcome(&outcome);

            match self.policy.transition(attempt, &outcome, delay) {
                Step::Done(ok) => {
                    let retryable = matches!(
                        outcome,
                        DeliveryOutcome::RateLimited { .. } | DeliveryOutcome::Timeout
                    );
                    if !ok && retryable {
                        error!(
                            attempts = attempt + 1,
                            max_attempts = self.policy.max_attempts(),
                            "alert delivery gave up, max retries reached"
                        );
                    }
                    return ok;
                }
                Step::Retry { wait, next_delay } => {
                    warn!(
                        wait_ms = wait.as_millis() as u64,
                        attempt = attempt + 1,
                        max_retries = self.policy.max_retries,
                        "retrying alert delivery"
                    );
                    tokio::time::sleep(wait).await;
                    delay = next_delay;
                    attempt += 1;
                }
            }
        }
    }
}

fn log_outcome(outcome: &DeliveryOutcome) {
    match outcome {
        DeliveryOutcome::Success => info!("alert sent"),
        DeliveryOutcome::RateLimited { retry_after } => {
            warn!(retry_after = ?retry_after, "rate limited by chat endpoint (429)")
        }
        DeliveryOutcome::AuthFailed { status } => error!(
            status,
            "chat endpoint authentication failed; check TELEGRAM_BOT_TOKEN and channel permissions"
        ),
        DeliveryOutcome::OtherFailure {
            status,
            description,
        } => error!(status, %description, "chat endpoint error"),
        DeliveryOutcome::Timeout => warn!("alert request timed out"),
        DeliveryOutcome::ConnectionError(e) => error!(error = %e, "connection error sending alert"),
    }
}

/// First four characters only; short ids are shown as-is.
pub fn mask_channel_id(channel_id: &str) -> String {
    if channel_id.is_empty() {
        return "<none>".to_string();
    }
    if channel_id.chars().count() <= 4 {
        return channel_id.to_string();
    }
    let head: String = channel_id.chars().take(4).collect();
    format!("{head}...")
}
