//! Read-only questions asked of the code graph and the snapshot history.

pub mod forecast;
pub mod impact;
pub mod risk;
pub mod safe_zones;
pub mod snapshot;

pub use forecast::{ForecastStatus, MetricForecast, forecast};
pub use impact::{AffectedFile, ImpactReport, impact};
pub use risk::{Diagnosis, Relation, RiskSignals, Suspect, diagnose};
pub use safe_zones::{SafeZone, SafeZoneReport, safe_zones};
pub use snapshot::{SnapshotInputs, TrendPoint, compute_snapshot, dead_exports, metric_value, trend};
