//! Uptime percentage to service status classification

use crate::models::ServiceStatus;

pub const OPERATIONAL_THRESHOLD: f64 = 99.9;
pub const DEGRADED_THRESHOLD: f64 = 95.0;
pub const PARTIAL_OUTAGE_THRESHOLD: f64 = 90.0;

/// Determines service status based on uptime percentage.
///
/// Each tier includes its lower bound. Never yields `Unknown`; that status is
/// reserved for days without samples.
pub fn classify(uptime: f64) -> ServiceStatus {
    if uptime >= OPERATIONAL_THRESHOLD {
        ServiceStatus::Operational
    } else if uptime >= DEGRADED_THRESHOLD {
        ServiceStatus::Degraded
    } else if uptime >= PARTIAL_OUTAGE_THRESHOLD {
        ServiceStatus::PartialOutage
    } else {
        ServiceStatus::MajorOutage
    }
}
