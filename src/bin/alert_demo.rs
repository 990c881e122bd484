//! Demo that pushes a few evaluation cycles through the alert dispatcher.
//! Runs in dry-run mode unless ALERT_DRY_RUN=0 and credentials are present.

use crypto_news_sentinel::config::AppConfig;
use crypto_news_sentinel::notify::{mask_channel_id, AlertDispatcher, AlertMetrics};
use crypto_news_sentinel::telemetry;

#[tokio::main]
async fn main() {
    let mut cfg = AppConfig::from_env();
    if std::env::var("ALERT_DRY_RUN").is_err() {
        cfg.notify.dry_run = true;
    }
    telemetry::init_tracing(false);

    let bot = AlertDispatcher::new(cfg.notify);
    println!(
        "alert-demo: threshold={:.2} channel={} dry_run={}",
        bot.threshold(),
        mask_channel_id(bot.channel_id().unwrap_or_default()),
        bot.is_dry_run()
    );

    let cycles = [
        (0.42, "neutral", 12, None),
        (0.80, "bullish", 18, None),
        (0.86, "bullish", 25, Some(2)),
        (0.93, "strongly bearish", 8, Some(0)),
    ];

    for (score, trend, n, anomalies) in cycles {
        let metrics = AlertMetrics {
            average_compound_score: score * 0.8,
            positive_ratio: 0.62,
            negative_ratio: 0.14,
            total_analyzed: n,
            anomalies_detected: anomalies,
            trend_direction: Some(trend.to_string()),
        };
        let sent = bot.check_and_alert(score, &metrics, None).await;
        println!("score={score:.2} trend={trend} -> alert={sent}");
        tokio::time::sleep(std::time::Duration::from_millis(400)).await;
    }

    println!("alert-demo done: {:?}", bot.stats().await);
}
