// src/notify/message.rs
use chrono::{DateTime, Utc};
use std::borrow::Cow;

use super::AlertMetrics;

/// Hard limit of the chat transport, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 4096;
pub const TRUNCATION_MARKER: &str = "\n\n... (message truncated)";

/// Cut `message` so that content + marker fits in `MAX_MESSAGE_LENGTH` chars.
/// Messages already within the limit are returned untouched.
pub fn truncate_message(message: &str) -> Cow<'_, str> {
    let len = message.chars().count();
    if len <= MAX_MESSAGE_LENGTH {
        return Cow::Borrowed(message);
    }

    let keep = MAX_MESSAGE_LENGTH - TRUNCATION_MARKER.chars().count();
    tracing::warn!(
        from = len,
        to = MAX_MESSAGE_LENGTH,
        "alert message truncated"
    );
    let mut out: String = message.chars().take(keep).collect();
    out.push_str(TRUNCATION_MARKER);
    Cow::Owned(out)
}

/// Three-way direction inferred from the free-form trend label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Flat,
}

impl Direction {
    pub fn from_label(label: &str) -> Self {
        let l = label.to_lowercase();
        if l.contains("bull") {
            Direction::Up
        } else if l.contains("bear") {
            Direction::Down
        } else {
            Direction::Flat
        }
    }

    pub fn indicator(self) -> &'static str {
        match self {
            Direction::Up => "📈",
            Direction::Down => "📉",
            Direction::Flat => "➡️",
        }
    }
}

/// `min(100, |score| * 100 * min(samples / 20, 1))`, truncated to an integer.
/// Small samples scale confidence down.
pub fn confidence_pct(score: f64, sample_count: u32) -> u32 {
    let sample_factor = (f64::from(sample_count) / 20.0).min(1.0);
    let raw = score.abs() * 100.0 * sample_factor;
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, 100.0) as u32
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => {
            let rest = chars.as_str().to_lowercase();
            first.to_uppercase().chain(rest.chars()).collect()
        }
        None => String::new(),
    }
}

/// HTML body for the chat endpoint (`parse_mode = HTML`).
pub fn format_alert_message(score: f64, m: &AlertMetrics, timestamp: DateTime<Utc>) -> String {
    let trend = capitalize(m.trend_direction.as_deref().unwrap_or("Unknown"));
    let arrow = Direction::from_label(&trend).indicator();
    let confidence = confidence_pct(score, m.total_analyzed);
    let time_str = timestamp.format("%Y-%m-%d %H:%M:%S UTC");

    let mut msg = format!(
        "🚨 <b>High Sentiment Alert</b>\n\
         \n\
         <b>Score:</b> {score:.2}\n\
         <b>Trend:</b> {trend} {arrow}\n\
         <b>Confidence:</b> {confidence}%\n\
         <b>Timestamp:</b> {time_str}\n\
         \n\
         <b>Details:</b>\n\
         • Average sentiment: {avg:.2}\n\
         • Positive ratio: {pos:.1}%\n\
         • Negative ratio: {neg:.1}%\n\
         • News analyzed: {count}",
        trend = html_escape::encode_text(&trend),
        avg = m.average_compound_score,
        pos = m.positive_ratio * 100.0,
        neg = m.negative_ratio * 100.0,
        count = m.total_analyzed,
    );

    if let Some(n) = m.anomalies_detected.filter(|n| *n > 0) {
        msg.push_str(&format!("\n• ⚠️ Anomalies detected: {n}"));
    }
    msg
}
