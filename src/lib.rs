//! Doorway: property onboarding with door-based pricing
//!
//! A resumable, multi-step wizard that turns a homeowner's or investor's
//! answers into a validated property record, plus the tier table, price
//! engine and upgrade/downgrade guard that bill by the number of doors.

pub mod cli;
pub mod core;
pub mod entities;
pub mod pricing;
pub mod wizard;
