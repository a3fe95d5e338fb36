use chrono::{DateTime, Utc};
use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use strum_macros::{Display, EnumIter, EnumString, VariantNames};

/// Closed set of activity categories shown in the recent activity feed
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString, VariantNames,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ActivityKind {
    Buy,
    Sell,
    Stake,
    Swap,
    Receive,
    Claim,
}

/// One entry of the recent activity feed. All display fields arrive pre-formatted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub action: String,
    pub amount: String,
    pub value: String,
    /// Relative time label, e.g. "2 mins ago"
    pub time: String,
    pub chain: String,
    /// Display color token for the chain badge
    pub chain_color: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
}

impl RecentActivity {
    pub fn new(
        action: &str,
        amount: &str,
        value: &str,
        time: &str,
        chain: &str,
        chain_color: &str,
        kind: ActivityKind,
    ) -> Self {
        Self {
            action: action.to_string(),
            amount: amount.to_string(),
            value: value.to_string(),
            time: time.to_string(),
            chain: chain.to_string(),
            chain_color: chain_color.to_string(),
            kind,
        }
    }
}

/// A single holding inside one of the asset buckets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetItem {
    pub name: String,
    pub symbol: String,
    pub chain: String,
    pub amount: String,
    pub value: String,
    #[serde(rename = "change24h")]
    pub change_24h: f64,
}

impl AssetItem {
    pub fn new(name: &str, symbol: &str, chain: &str, amount: &str, value: &str, change_24h: f64) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            chain: chain.to_string(),
            amount: amount.to_string(),
            value: value.to_string(),
            change_24h,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardAssets {
    pub tokens: Vec<AssetItem>,
    pub defi: Vec<AssetItem>,
    pub nfts: Vec<AssetItem>,
}

/// Numeric portfolio and market indicators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub portfolio_value: f64,
    pub portfolio_change_percent: f64,
    pub portfolio_change_value: f64,
    /// 0..=100
    pub altseason_index: f64,
    /// Chronological, sparkline only
    pub altseason_trend: Vec<f64>,
    pub btc_dominance: f64,
    pub eth_dominance: f64,
    pub dominance_map: BTreeMap<String, f64>,
    pub total_market_cap: f64,
    pub market_cap_change_percent: f64,
    pub market_cap_trend: Vec<f64>,
    /// 0..=100
    pub fear_greed_index: f64,
}

impl DashboardMetrics {
    fn scalars(&self) -> [(&'static str, f64); 9] {
        [
            ("portfolioValue", self.portfolio_value),
            ("portfolioChangePercent", self.portfolio_change_percent),
            ("portfolioChangeValue", self.portfolio_change_value),
            ("altseasonIndex", self.altseason_index),
            ("btcDominance", self.btc_dominance),
            ("ethDominance", self.eth_dominance),
            ("totalMarketCap", self.total_market_cap),
            ("marketCapChangePercent", self.market_cap_change_percent),
            ("fearGreedIndex", self.fear_greed_index),
        ]
    }
}

/// Complete dashboard state handed to consumers. Replaced wholesale on every update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub metrics: DashboardMetrics,
    pub recent_activities: Vec<RecentActivity>,
    pub assets: DashboardAssets,
    pub updated_at: DateTime<Utc>,
}

/// Upper bound on `recent_activities` after normalization
pub const MAX_RECENT_ACTIVITIES: usize = 10;

impl DashboardSnapshot {
    /// The process-wide fallback snapshot
    pub fn default_snapshot() -> &'static DashboardSnapshot {
        &DEFAULT_SNAPSHOT
    }

    /// Check the invariants every snapshot handed to a consumer must hold
    pub fn validate(&self) -> Result<()> {
        for (field, value) in self.metrics.scalars() {
            if !value.is_finite() {
                return Err(eyre!("Non-finite metric {}: {}", field, value));
            }
        }

        let mut series = self.metrics.altseason_trend.iter()
            .chain(self.metrics.market_cap_trend.iter())
            .chain(self.metrics.dominance_map.values());
        if let Some(value) = series.find(|value| !value.is_finite()) {
            return Err(eyre!("Non-finite trend or dominance value: {}", value));
        }

        for (field, index) in [
            ("altseasonIndex", self.metrics.altseason_index),
            ("fearGreedIndex", self.metrics.fear_greed_index),
        ] {
            if !(0.0..=100.0).contains(&index) {
                return Err(eyre!("{} out of range: {}", field, index));
            }
        }

        if self.recent_activities.len() > MAX_RECENT_ACTIVITIES {
            return Err(eyre!(
                "Too many recent activities: {} > {}",
                self.recent_activities.len(),
                MAX_RECENT_ACTIVITIES
            ));
        }

        let buckets = [&self.assets.tokens, &self.assets.defi, &self.assets.nfts];
        if let Some(item) = buckets.iter().flat_map(|bucket| bucket.iter()).find(|item| !item.change_24h.is_finite()) {
            return Err(eyre!("Non-finite 24h change for {}", item.symbol));
        }

        Ok(())
    }
}

/// Fallback snapshot used whenever live data is partial or unreachable.
///
/// Built once on first access and never mutated afterwards.
pub static DEFAULT_SNAPSHOT: LazyLock<DashboardSnapshot> = LazyLock::new(build_default_snapshot);

fn build_default_snapshot() -> DashboardSnapshot {
    let dominance_map = [
        ("BTC", 51.2),
        ("ETH", 18.7),
        ("USDT", 5.8),
        ("BNB", 3.9),
        ("SOL", 3.3),
        ("OTHERS", 17.1),
    ]
    .into_iter()
    .map(|(label, share)| (label.to_string(), share))
    .collect();

    DashboardSnapshot {
        metrics: DashboardMetrics {
            portfolio_value: 128_456.32,
            portfolio_change_percent: 4.82,
            portfolio_change_value: 5_894.12,
            altseason_index: 67.0,
            altseason_trend: vec![42.0, 45.0, 48.0, 52.0, 57.0, 60.0, 63.0, 67.0],
            btc_dominance: 51.2,
            eth_dominance: 18.7,
            dominance_map,
            total_market_cap: 2.41e12,
            market_cap_change_percent: 2.1,
            market_cap_trend: vec![2.22, 2.24, 2.27, 2.31, 2.28, 2.35, 2.39, 2.41],
            fear_greed_index: 72.0,
        },
        recent_activities: vec![
            RecentActivity::new("Bought ETH", "+2.456 ETH", "$4,856.78", "2 mins ago", "ETH", "bg-blue-500", ActivityKind::Buy),
            RecentActivity::new("Staked SOL", "125 SOL", "$9,234.56", "15 mins ago", "SOL", "bg-purple-500", ActivityKind::Stake),
            RecentActivity::new("Sold BNB", "-12.5 BNB", "$3,456.78", "32 mins ago", "BNB", "bg-yellow-500", ActivityKind::Sell),
            RecentActivity::new("Swapped USDT", "500 USDT → TON", "$500.00", "1 hour ago", "TON", "bg-blue-600", ActivityKind::Swap),
            RecentActivity::new("Received NFT", "Mad Lad #8234", "$9,234.50", "2 hours ago", "SOL", "bg-purple-500", ActivityKind::Receive),
            RecentActivity::new("Claimed Rewards", "+45.67 CAKE", "$234.56", "3 hours ago", "BNB", "bg-yellow-500", ActivityKind::Claim),
        ],
        assets: DashboardAssets {
            tokens: vec![
                AssetItem::new("Ethereum", "ETH", "ETH", "12.84", "$25,217.31", 2.4),
                AssetItem::new("Solana", "SOL", "SOL", "326.1", "$61,492.20", 6.1),
                AssetItem::new("BNB", "BNB", "BNB", "54.7", "$17,231.53", -1.2),
                AssetItem::new("Tether", "USDT", "ETH", "4,500", "$4,500.00", 0.0),
            ],
            defi: vec![
                AssetItem::new("Jito Staked SOL", "JITOSOL", "SOL", "18.2", "$3,410.74", 4.9),
                AssetItem::new("Pancake LP", "CAKE-LP", "BNB", "11.7", "$2,107.33", 1.6),
            ],
            nfts: vec![
                AssetItem::new("Mad Lads", "MADLAD", "SOL", "1", "$9,234.50", 12.2),
                AssetItem::new("Azuki", "AZUKI", "ETH", "1", "$14,122.00", -2.3),
            ],
        },
        updated_at: Utc::now(),
    }
}
