//! Spatio-temporal aggregation of telemetry.
//!
//! Raw rows are bucketed into rounded lat/lon tiles and UTC calendar days,
//! then each bucket is reduced to an event count, total mass and mean TDS.

pub mod aggregate;
pub mod key;
pub mod severity;
pub mod types;
pub mod utility;

pub use aggregate::{aggregate, daily_totals};
pub use key::TileKey;
pub use types::{AggregateOutcome, DailyAggregate, DailyTotal, DropCounts};
