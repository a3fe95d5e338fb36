use crate::data_sync::snapshot::{
    ActivityKind, AssetItem, DashboardAssets, DashboardMetrics, DashboardSnapshot, RecentActivity,
};
use chrono::Utc;
use std::collections::BTreeMap;

const PORTFOLIO_BASE: f64 = 128_456.32;
const PORTFOLIO_FLOOR: f64 = 50_000.0;
const MARKET_CAP_BASE: f64 = 2.41e12;

/// Deterministic snapshot for the given tick.
///
/// The portfolio drifts on a 40-tick cycle, dominance and sentiment wobble on
/// shorter cycles. Every snapshot passes [`DashboardSnapshot::validate`].
pub fn build_snapshot(tick: u64) -> DashboardSnapshot {
    let phase = (tick % 40) as f64;
    let portfolio_value = (PORTFOLIO_BASE + (phase - 20.0) * 215.0).max(PORTFOLIO_FLOOR);
    let portfolio_change_percent = ((phase - 20.0) / 20.0) * 4.8;
    let portfolio_change_value = portfolio_value * (portfolio_change_percent / 100.0);

    let altseason_index = (67 + (tick % 8) as i64 - 4).clamp(0, 100) as f64;
    let fear_greed_index = (72 + (tick % 10) as i64 - 5).clamp(0, 100) as f64;

    let btc_dominance = 51.2 + ((tick % 6) as f64 - 3.0) * 0.12;
    let eth_dominance = 18.7 + ((tick % 5) as f64 - 2.0) * 0.1;
    let (usdt, bnb, sol) = (5.8, 3.9, 3.3);
    let others = (100.0 - (btc_dominance + eth_dominance + usdt + bnb + sol)).max(0.0);

    let total_market_cap = MARKET_CAP_BASE + ((tick % 12) as f64 - 6.0) * 8.5e9;
    let market_cap_change_percent = ((tick % 10) as f64 - 5.0) * 0.36;

    let dominance_map = BTreeMap::from([
        ("BTC".to_string(), round2(btc_dominance)),
        ("ETH".to_string(), round2(eth_dominance)),
        ("USDT".to_string(), usdt),
        ("BNB".to_string(), bnb),
        ("SOL".to_string(), sol),
        ("OTHERS".to_string(), round2(others)),
    ]);

    DashboardSnapshot {
        metrics: DashboardMetrics {
            portfolio_value: round2(portfolio_value),
            portfolio_change_percent: round2(portfolio_change_percent),
            portfolio_change_value: round2(portfolio_change_value),
            altseason_index,
            altseason_trend: vec![42.0, 45.0, 48.0, 52.0, 57.0, 60.0, 63.0, altseason_index],
            btc_dominance: round2(btc_dominance),
            eth_dominance: round2(eth_dominance),
            dominance_map,
            total_market_cap,
            market_cap_change_percent: round2(market_cap_change_percent),
            market_cap_trend: vec![2.22, 2.24, 2.27, 2.31, 2.28, 2.35, 2.39, round2(total_market_cap / 1e12)],
            fear_greed_index,
        },
        recent_activities: vec![
            RecentActivity::new("Bought ETH", "+2.456 ETH", "$4,856.78", "just now", "ETH", "bg-blue-500", ActivityKind::Buy),
            RecentActivity::new("Staked SOL", "125 SOL", "$9,234.56", "2 mins ago", "SOL", "bg-purple-500", ActivityKind::Stake),
            RecentActivity::new("Sold BNB", "-12.5 BNB", "$3,456.78", "5 mins ago", "BNB", "bg-yellow-500", ActivityKind::Sell),
            RecentActivity::new("Swapped USDT", "500 USDT → TON", "$500.00", "12 mins ago", "TON", "bg-blue-600", ActivityKind::Swap),
            RecentActivity::new("Received NFT", "Mad Lad #8234", "$9,234.50", "26 mins ago", "SOL", "bg-purple-500", ActivityKind::Receive),
            RecentActivity::new("Claimed Rewards", "+45.67 CAKE", "$234.56", "44 mins ago", "BNB", "bg-yellow-500", ActivityKind::Claim),
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

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
