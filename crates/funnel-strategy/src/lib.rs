//! "Three cards + two lines" funnel.
//!
//! A symbol walks a fixed sequence of gates: size filter, statement
//! availability, growth and cash flow ("three cards"), indicator
//! availability, then trend and pullback timing ("two lines"). The first
//! gate that fails decides the verdict.

pub mod gates;
pub mod strategy;
pub mod thresholds;
pub mod universe;

pub use gates::{BasicInfo, TimingCheck};
pub use strategy::{select_top, FunnelStrategy, ScanReport, DEFAULT_CONCURRENCY, SCAN_RESULT_LIMIT};
pub use thresholds::FunnelThresholds;
pub use universe::{moat_symbols, MOAT_UNIVERSE};
