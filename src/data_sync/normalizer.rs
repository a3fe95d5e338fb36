use crate::data_sync::error::SyncError;
use crate::data_sync::snapshot::{
    DEFAULT_SNAPSHOT, DashboardAssets, DashboardMetrics, DashboardSnapshot, MAX_RECENT_ACTIVITIES,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

type Fields = Map<String, Value>;

/// Completes partial, untrusted payloads into full snapshots.
///
/// `metrics` is merged field by field; activity and asset collections are
/// taken wholesale from the payload or wholesale from the defaults. The
/// conversion is total: any JSON value produces a snapshot that passes
/// [`DashboardSnapshot::validate`].
#[derive(Debug, Clone)]
pub struct SnapshotNormalizer {
    defaults: Arc<DashboardSnapshot>,
}

impl Default for SnapshotNormalizer {
    fn default() -> Self {
        Self::new(Arc::new(DEFAULT_SNAPSHOT.clone()))
    }
}

impl SnapshotNormalizer {
    /// Create a normalizer backed by a custom default snapshot.
    ///
    /// The defaults are assumed to be valid themselves; they are the terminal fallback.
    pub fn new(defaults: Arc<DashboardSnapshot>) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &DashboardSnapshot {
        &self.defaults
    }

    /// Fresh copy of the fallback snapshot
    pub fn default_snapshot(&self) -> DashboardSnapshot {
        self.defaults.as_ref().clone()
    }

    /// Decode a text frame and normalize it. Fails only when the text is not JSON.
    pub fn normalize_text(&self, text: &str) -> Result<DashboardSnapshot, SyncError> {
        let payload: Value = serde_json::from_str(text)?;
        Ok(self.normalize(&payload))
    }

    /// Merge a decoded payload against the defaults. Non-object payloads act like `{}`.
    pub fn normalize(&self, payload: &Value) -> DashboardSnapshot {
        let empty = Fields::new();
        let root = payload.as_object().unwrap_or(&empty);
        let defaults = self.defaults.as_ref();

        let assets = root.get("assets").and_then(Value::as_object).unwrap_or(&empty);

        let mut recent_activities =
            collection(root.get("recentActivities")).unwrap_or_else(|| defaults.recent_activities.clone());
        recent_activities.truncate(MAX_RECENT_ACTIVITIES);

        DashboardSnapshot {
            metrics: self.merge_metrics(root.get("metrics")),
            recent_activities,
            assets: DashboardAssets {
                tokens: collection(assets.get("tokens")).unwrap_or_else(|| defaults.assets.tokens.clone()),
                defi: collection(assets.get("defi")).unwrap_or_else(|| defaults.assets.defi.clone()),
                nfts: collection(assets.get("nfts")).unwrap_or_else(|| defaults.assets.nfts.clone()),
            },
            updated_at: timestamp(root.get("updatedAt")).unwrap_or_else(Utc::now),
        }
    }

    fn merge_metrics(&self, payload: Option<&Value>) -> DashboardMetrics {
        let base = &self.defaults.metrics;
        let Some(fields) = payload.and_then(Value::as_object) else {
            return base.clone();
        };

        DashboardMetrics {
            portfolio_value: number(fields, "portfolioValue").unwrap_or(base.portfolio_value),
            portfolio_change_percent: number(fields, "portfolioChangePercent")
                .unwrap_or(base.portfolio_change_percent),
            portfolio_change_value: number(fields, "portfolioChangeValue").unwrap_or(base.portfolio_change_value),
            altseason_index: index(fields, "altseasonIndex").unwrap_or(base.altseason_index),
            altseason_trend: series(fields, "altseasonTrend").unwrap_or_else(|| base.altseason_trend.clone()),
            btc_dominance: number(fields, "btcDominance").unwrap_or(base.btc_dominance),
            eth_dominance: number(fields, "ethDominance").unwrap_or(base.eth_dominance),
            dominance_map: dominance(fields, "dominanceMap").unwrap_or_else(|| base.dominance_map.clone()),
            total_market_cap: number(fields, "totalMarketCap").unwrap_or(base.total_market_cap),
            market_cap_change_percent: number(fields, "marketCapChangePercent")
                .unwrap_or(base.market_cap_change_percent),
            market_cap_trend: series(fields, "marketCapTrend").unwrap_or_else(|| base.market_cap_trend.clone()),
            fear_greed_index: index(fields, "fearGreedIndex").unwrap_or(base.fear_greed_index),
        }
    }
}

fn finite(value: &Value) -> Option<f64> {
    value.as_f64().filter(|number| number.is_finite())
}

fn number(fields: &Fields, key: &str) -> Option<f64> {
    fields.get(key).and_then(finite)
}

/// 0..=100 indicator, out-of-range values are clamped
fn index(fields: &Fields, key: &str) -> Option<f64> {
    number(fields, key).map(|value| value.clamp(0.0, 100.0))
}

/// A trend is only taken when every element is a finite number
fn series(fields: &Fields, key: &str) -> Option<Vec<f64>> {
    fields.get(key)?.as_array()?.iter().map(finite).collect()
}

fn dominance(fields: &Fields, key: &str) -> Option<BTreeMap<String, f64>> {
    fields
        .get(key)?
        .as_object()?
        .iter()
        .map(|(label, share)| finite(share).map(|share| (label.clone(), share)))
        .collect()
}

/// A collection is only taken when every element decodes
fn collection<T: DeserializeOwned>(value: Option<&Value>) -> Option<Vec<T>> {
    Vec::<T>::deserialize(value?).ok()
}

fn timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let raw = value?.as_str()?;
    DateTime::parse_from_rfc3339(raw).ok().map(|parsed| parsed.with_timezone(&Utc))
}
