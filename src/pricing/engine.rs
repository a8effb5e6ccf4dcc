//! Door-based price computation
//!
//! Pure functions only: no I/O, no shared state, total over their inputs.

use serde::Serialize;

use crate::pricing::tiers::{TierConfig, TierId, TierTable};

/// How a monthly price was built up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceBreakdown {
    pub base_cents: u64,
    pub overage_units: u32,
    pub overage_cost_cents: u64,
}

/// Price of holding `door_count` doors on one tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricingQuote {
    pub tier: TierId,
    pub door_count: u32,
    pub monthly_cents: u64,
    /// Always `monthly_cents * 12`; no annual discount is applied
    pub annual_cents: u64,
    pub breakdown: PriceBreakdown,
}

/// Clamp a raw door count to the engine's domain (at least one door)
pub fn clamp_door_count(raw: Option<i64>) -> u32 {
    match raw {
        Some(n) if n >= 1 => u32::try_from(n).unwrap_or(u32::MAX),
        _ => 1,
    }
}

/// Quote a tier for a door count
pub fn quote(tier: &TierConfig, door_count: u32) -> PricingQuote {
    let door_count = door_count.max(1);
    let overage_units = door_count.saturating_sub(tier.included_doors);
    let overage_cost_cents = u64::from(overage_units).saturating_mul(tier.overage_cents_per_door);
    let monthly_cents = tier.base_price_cents.saturating_add(overage_cost_cents);

    PricingQuote {
        tier: tier.id.clone(),
        door_count,
        monthly_cents,
        annual_cents: monthly_cents.saturating_mul(12),
        breakdown: PriceBreakdown {
            base_cents: tier.base_price_cents,
            overage_units,
            overage_cost_cents,
        },
    }
}

/// Cheapest tier whose ceiling accommodates `door_count`
///
/// Ties go to the lower-ranked tier. The unlimited top tier is the fallback
/// when nothing else fits.
pub fn recommended_tier(table: &TierTable, door_count: u32) -> &TierConfig {
    let door_count = door_count.max(1);
    table
        .tiers()
        .iter()
        .filter(|tier| tier.accommodates(door_count))
        .min_by_key(|tier| quote(tier, door_count).monthly_cents)
        .unwrap_or_else(|| table.top())
}

/// One row of a tier comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierOption {
    pub quote: PricingQuote,
    pub display_name: String,
    /// Whether the tier's ceiling allows this many doors
    pub fits: bool,
    pub recommended: bool,
}

/// Quote every tier in rank order for a door count
pub fn compare(table: &TierTable, door_count: u32) -> Vec<TierOption> {
    let recommended = recommended_tier(table, door_count).id.clone();
    table
        .tiers()
        .iter()
        .map(|tier| TierOption {
            quote: quote(tier, door_count),
            display_name: tier.display_name.clone(),
            fits: tier.accommodates(door_count.max(1)),
            recommended: tier.id == recommended,
        })
        .collect()
}

/// Format cents as US dollars: `$1,234.50`
pub fn format_usd(cents: u64) -> String {
    let dollars = (cents / 100).to_string();
    let mut grouped = String::new();
    for (i, ch) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("${}.{:02}", grouped, cents % 100)
}
