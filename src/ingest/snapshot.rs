// src/ingest/snapshot.rs
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::backfill::IngestionRun;
use super::types::ArticleRecord;

pub const SUMMARY_FILE: &str = "backfill_summary.json";

/// Self-describing per-day file: `news_<YYYY-MM-DD>.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaySnapshot {
    pub date: NaiveDate,
    pub fetched_at: DateTime<Utc>,
    pub article_count: usize,
    pub articles: Vec<ArticleRecord>,
}

pub fn day_file_name(date: NaiveDate) -> String {
    format!("news_{}.json", date.format("%Y-%m-%d"))
}

/// Sequential JSON writer rooted at the backfill data directory.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating data dir {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_day(&self, date: NaiveDate, articles: &[ArticleRecord]) -> Result<PathBuf> {
        let snap = DaySnapshot {
            date,
            fetched_at: Utc::now(),
            article_count: articles.len(),
            articles: articles.to_vec(),
        };
        let path = self.dir.join(day_file_name(date));
        write_json(&path, &snap)?;
        Ok(path)
    }

    pub fn write_summary(&self, run: &IngestionRun) -> Result<PathBuf> {
        let path = self.dir.join(SUMMARY_FILE);
        write_json(&path, run)?;
        Ok(path)
    }

    pub fn read_day(&self, date: NaiveDate) -> Result<DaySnapshot> {
        let path = self.dir.join(day_file_name(date));
        let s = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&s).with_context(|| format!("parsing {}", path.display()))
    }
}

/// Pretty JSON via tmp file + rename, so a crash never leaves a half-written snapshot.
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing snapshot")?;
    let tmp = path.with_extension("json.tmp");
    let mut f =
        fs::File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
    f.write_all(json.as_bytes())
        .with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("renaming to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::providers::synthetic::synthetic_articles;

    #[test]
    fn day_file_round_trips_with_expected_shape() {
        let tmp = tempfile::tempdir().unwrap();
        let w = SnapshotWriter::new(tmp.path().join("nested/dir")).unwrap();
        let d = NaiveDate::from_ymd_opt(2025, 5, 9).unwrap();

        let path = w.write_day(d, &synthetic_articles(d, 2)).unwrap();
        assert!(path.ends_with("news_2025-05-09.json"));

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["date"], "2025-05-09");
        assert_eq!(raw["article_count"], 2);
        assert_eq!(raw["articles"].as_array().unwrap().len(), 2);
        assert!(raw["fetched_at"].is_string());

        let back = w.read_day(d).unwrap();
        assert_eq!(back.articles[1].id, "mock_20250509_1");
        assert!(!path.with_extension("json.tmp").exists());
    }
}
