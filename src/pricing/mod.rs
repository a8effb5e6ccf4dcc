//! Door-based subscription pricing
//!
//! - `tiers`: the declarative tier table
//! - `engine`: pure price computation and tier recommendation
//! - `transition`: upgrade/downgrade classification and confirmation

pub mod engine;
pub mod tiers;
pub mod transition;

pub use engine::{
    clamp_door_count, compare, format_usd, quote, recommended_tier, PriceBreakdown, PricingQuote,
    TierOption,
};
pub use tiers::{TierConfig, TierId, TierTable, TierTableError};
pub use transition::{
    TierChange, TierChangeRequest, TierTransitionGuard, TransitionError, CONFIRMATION_TOKEN,
};
