//! Domain Models
//!
//! Production dataset types. A `Dataset` is an immutable snapshot: the core
//! never mutates it, and sessions may share one behind an `Arc` without
//! locking.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Planned production hours per machine per day (two 8-hour shifts)
pub const PLANNED_HOURS_PER_DAY: f64 = 16.0;

/// Tolerance for the uptime + downtime identity
const HOURS_EPSILON: f64 = 1e-6;

/// A production machine
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Machine {
    pub id: u32,

    /// Unique machine name (e.g. "CNC-001")
    pub name: String,

    /// Machine category (e.g. "CNC Machining Center")
    #[serde(rename = "type")]
    pub machine_type: String,

    /// Ideal seconds per part
    pub ideal_cycle_time: f64,
}

/// A work shift; shifts are non-overlapping within a day by construction
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Shift {
    pub id: u32,

    /// Unique shift name (e.g. "Day", "Night")
    pub name: String,

    pub start_hour: u8,
    pub end_hour: u8,
}

/// Severity of a quality issue
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "Low"),
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Severity::Low),
            "Medium" => Ok(Severity::Medium),
            "High" => Ok(Severity::High),
            other => Err(format!("Unknown severity: {}", other)),
        }
    }
}

/// A single downtime incident
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DowntimeEvent {
    /// Reason code (e.g. "mechanical", "changeover")
    pub reason: String,

    pub description: String,

    /// Duration in hours, always positive
    pub duration_hours: f64,
}

/// A recorded quality defect event
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QualityIssue {
    /// Defect category (e.g. "dimensional", "assembly")
    #[serde(rename = "type")]
    pub issue_type: String,

    pub description: String,

    /// Number of parts affected, always positive
    pub parts_affected: u64,

    pub severity: Severity,
}

/// Per-shift slice of a day record
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShiftMetrics {
    pub parts_produced: u64,
    pub scrap_parts: u64,
    pub good_parts: u64,
    pub uptime_hours: f64,
    pub downtime_hours: f64,
}

/// One machine's production record for one date
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DayRecord {
    pub parts_produced: u64,
    pub good_parts: u64,
    pub scrap_parts: u64,

    /// Scrap percentage for the day
    pub scrap_rate: f64,

    pub uptime_hours: f64,
    pub downtime_hours: f64,

    #[serde(default)]
    pub downtime_events: Vec<DowntimeEvent>,

    #[serde(default)]
    pub quality_issues: Vec<QualityIssue>,

    #[serde(default)]
    pub shifts: BTreeMap<String, ShiftMetrics>,
}

/// Immutable production snapshot
///
/// `production` is keyed by ISO `YYYY-MM-DD` date string, then machine name.
/// Ordered maps keep iteration and serialization deterministic.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub generated_at: Option<String>,

    /// First date covered by the snapshot (ISO, may carry a time suffix)
    pub start_date: String,

    /// Last date covered by the snapshot
    pub end_date: String,

    pub machines: Vec<Machine>,
    pub shifts: Vec<Shift>,

    pub production: BTreeMap<String, BTreeMap<String, DayRecord>>,
}

impl Dataset {
    /// Date portion of `start_date`
    pub fn start_day(&self) -> &str {
        date_part(&self.start_date)
    }

    /// Date portion of `end_date`
    pub fn end_day(&self) -> &str {
        date_part(&self.end_date)
    }

    /// Look up a machine by name
    pub fn machine(&self, name: &str) -> Option<&Machine> {
        self.machines.iter().find(|m| m.name == name)
    }

    /// Names of all machines, in declaration order
    pub fn machine_names(&self) -> Vec<&str> {
        self.machines.iter().map(|m| m.name.as_str()).collect()
    }

    /// Check the snapshot invariants
    ///
    /// Every production key must be a date within `[start_date, end_date]`,
    /// every inner key a known machine name, and every record must satisfy
    /// `good + scrap == produced` and `uptime + downtime == 16.0` (within
    /// epsilon).
    pub fn validate(&self) -> Result<(), String> {
        for (date, day) in &self.production {
            if date.as_str() < self.start_day() || date.as_str() > self.end_day() {
                return Err(format!("Date {} outside snapshot range", date));
            }

            for (machine, record) in day {
                if self.machine(machine).is_none() {
                    return Err(format!("Unknown machine {} on {}", machine, date));
                }
                if record.good_parts + record.scrap_parts != record.parts_produced {
                    return Err(format!(
                        "{}/{}: good {} + scrap {} != produced {}",
                        date, machine, record.good_parts, record.scrap_parts, record.parts_produced
                    ));
                }
                let total_hours = record.uptime_hours + record.downtime_hours;
                if (total_hours - PLANNED_HOURS_PER_DAY).abs() > HOURS_EPSILON {
                    return Err(format!(
                        "{}/{}: uptime + downtime = {} != {}",
                        date, machine, total_hours, PLANNED_HOURS_PER_DAY
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Strip a trailing time suffix from an ISO timestamp
pub(crate) fn date_part(s: &str) -> &str {
    s.split('T').next().unwrap_or(s)
}
