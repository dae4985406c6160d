//! Metrics Engine
//!
//! Deterministic, side-effect-free aggregation over a date-filtered,
//! machine-filtered slice of the production snapshot. All four operations
//! share one contract: the snapshot is re-loaded per call, the requested
//! calendar range is expanded day by day, dates missing from the snapshot
//! and machines missing on a given date are silently skipped, and the only
//! failure kinds are `DataUnavailable` and `EmptyRange`.
//!
//! Failures are values, not panics: the toolkit serializes them into tool
//! output so the model can see them and adapt.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::model::{date_part, DayRecord, Dataset, PLANNED_HOURS_PER_DAY};
use crate::store::DatasetSource;

/// Fixed performance factor used by the baseline OEE decomposition.
///
/// A deliberate approximation standing in for an ideal-cycle-time-derived
/// performance metric; callers who want the derived value opt into
/// [`PerformanceModel::CycleTime`].
pub const FIXED_PERFORMANCE: f64 = 0.95;

/// An individual downtime event longer than this many hours is "major".
/// Strictly greater than; exactly 2.0 hours is not major.
pub const MAJOR_EVENT_HOURS: f64 = 2.0;

/// Metrics failure kinds
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MetricsError {
    /// No snapshot loaded
    #[error("No data available")]
    DataUnavailable,

    /// No date in the requested range exists in the snapshot
    #[error("No data for specified date range")]
    EmptyRange,
}

/// Result type for metrics operations
pub type MetricsResult<T> = std::result::Result<T, MetricsError>;

/// How the performance component of OEE is derived
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PerformanceModel {
    /// Fixed factor (the baseline; see [`FIXED_PERFORMANCE`])
    Fixed(f64),

    /// Derived from ideal cycle times:
    /// `Σ(parts × ideal_cycle_time) / uptime`, capped at 1.0
    CycleTime,
}

impl Default for PerformanceModel {
    fn default() -> Self {
        Self::Fixed(FIXED_PERFORMANCE)
    }
}

/// OEE decomposition over a slice
#[derive(Clone, Debug, Serialize)]
pub struct OeeReport {
    pub oee: f64,
    pub availability: f64,
    pub performance: f64,
    pub quality: f64,
    pub total_parts: u64,
    pub good_parts: u64,
    pub scrap_parts: u64,
}

/// Scrap aggregates over a slice
#[derive(Clone, Debug, Serialize)]
pub struct ScrapReport {
    pub total_scrap: u64,
    pub total_parts: u64,

    /// Scrap percentage, 2 decimals
    pub scrap_rate: f64,

    /// Per-machine scrap counts; present only when no machine filter applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrap_by_machine: Option<BTreeMap<String, u64>>,
}

/// A quality issue annotated with its origin
#[derive(Clone, Debug, Serialize)]
pub struct ReportedIssue {
    pub date: String,
    pub machine: String,
    #[serde(rename = "type")]
    pub issue_type: String,
    pub description: String,
    pub parts_affected: u64,
    pub severity: String,
}

/// Quality issues over a slice
#[derive(Clone, Debug, Serialize)]
pub struct QualityReport {
    pub issues: Vec<ReportedIssue>,
    pub total_issues: usize,
    pub total_parts_affected: u64,
    pub severity_breakdown: BTreeMap<String, u64>,
}

/// A downtime event exceeding the major-event threshold
#[derive(Clone, Debug, Serialize)]
pub struct MajorEvent {
    pub date: String,
    pub machine: String,
    pub reason: String,
    pub description: String,
    pub duration_hours: f64,
}

/// Downtime aggregates over a slice
#[derive(Clone, Debug, Serialize)]
pub struct DowntimeReport {
    pub total_downtime_hours: f64,
    pub downtime_by_reason: BTreeMap<String, f64>,
    pub major_events: Vec<MajorEvent>,
}

/// Expand an inclusive calendar range into ISO date strings
///
/// A trailing time suffix on either bound is tolerated. Unparseable bounds
/// and inverted ranges expand to the empty list, which the operations
/// surface as `EmptyRange`.
pub fn date_range(start_date: &str, end_date: &str) -> Vec<String> {
    let (Ok(start), Ok(end)) = (
        NaiveDate::parse_from_str(date_part(start_date), "%Y-%m-%d"),
        NaiveDate::parse_from_str(date_part(end_date), "%Y-%m-%d"),
    ) else {
        return Vec::new();
    };

    let mut dates = Vec::new();
    let mut current = start;
    while current <= end {
        dates.push(current.format("%Y-%m-%d").to_string());
        current = match current.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    dates
}

/// The metrics engine
///
/// Pure and reentrant; safe to share across sessions since the snapshot is
/// read-only within a process lifetime.
pub struct MetricsEngine {
    source: Arc<dyn DatasetSource>,
    performance: PerformanceModel,
}

impl MetricsEngine {
    pub fn new(source: Arc<dyn DatasetSource>) -> Self {
        Self {
            source,
            performance: PerformanceModel::default(),
        }
    }

    pub fn with_performance_model(mut self, model: PerformanceModel) -> Self {
        self.performance = model;
        self
    }

    /// Load the snapshot and the dates of the requested range it covers
    fn load_slice(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> MetricsResult<(Arc<Dataset>, Vec<String>)> {
        let dataset = self.source.load().ok_or(MetricsError::DataUnavailable)?;

        let valid_dates: Vec<String> = date_range(start_date, end_date)
            .into_iter()
            .filter(|d| dataset.production.contains_key(d))
            .collect();

        if valid_dates.is_empty() {
            return Err(MetricsError::EmptyRange);
        }

        Ok((dataset, valid_dates))
    }

    /// Overall Equipment Effectiveness for the range
    ///
    /// `availability × performance × quality`, each component rounded to
    /// 3 decimals. Zero denominators collapse the affected component to 0,
    /// so an unknown machine name yields an all-zero report rather than an
    /// error.
    pub fn calculate_oee(
        &self,
        start_date: &str,
        end_date: &str,
        machine_name: Option<&str>,
    ) -> MetricsResult<OeeReport> {
        let (dataset, dates) = self.load_slice(start_date, end_date)?;

        let mut total_parts: u64 = 0;
        let mut total_good: u64 = 0;
        let mut total_uptime = 0.0;
        let mut total_planned = 0.0;
        let mut total_ideal_secs = 0.0;

        for_each_record(&dataset, &dates, machine_name, |_, machine, record| {
            total_parts += record.parts_produced;
            total_good += record.good_parts;
            total_uptime += record.uptime_hours;
            total_planned += PLANNED_HOURS_PER_DAY;

            if let Some(m) = dataset.machine(machine) {
                total_ideal_secs += record.parts_produced as f64 * m.ideal_cycle_time;
            }
        });

        let availability = ratio(total_uptime, total_planned);
        let quality = ratio(total_good as f64, total_parts as f64);
        let performance = match self.performance {
            PerformanceModel::Fixed(p) => p,
            PerformanceModel::CycleTime => {
                ratio(total_ideal_secs, total_uptime * 3600.0).min(1.0)
            }
        };

        let oee = availability * performance * quality;

        Ok(OeeReport {
            oee: round_to(oee, 3),
            availability: round_to(availability, 3),
            performance: round_to(performance, 3),
            quality: round_to(quality, 3),
            total_parts,
            good_parts: total_good,
            scrap_parts: total_parts - total_good,
        })
    }

    /// Scrap totals and rate for the range
    ///
    /// The per-machine breakdown is reported only when no machine filter is
    /// applied.
    pub fn scrap_metrics(
        &self,
        start_date: &str,
        end_date: &str,
        machine_name: Option<&str>,
    ) -> MetricsResult<ScrapReport> {
        let (dataset, dates) = self.load_slice(start_date, end_date)?;

        let mut total_scrap: u64 = 0;
        let mut total_parts: u64 = 0;
        let mut by_machine: BTreeMap<String, u64> = BTreeMap::new();

        for_each_record(&dataset, &dates, machine_name, |_, machine, record| {
            total_scrap += record.scrap_parts;
            total_parts += record.parts_produced;

            if machine_name.is_none() {
                *by_machine.entry(machine.to_string()).or_insert(0) += record.scrap_parts;
            }
        });

        let scrap_rate = if total_parts > 0 {
            total_scrap as f64 / total_parts as f64 * 100.0
        } else {
            0.0
        };

        Ok(ScrapReport {
            total_scrap,
            total_parts,
            scrap_rate: round_to(scrap_rate, 2),
            scrap_by_machine: if by_machine.is_empty() {
                None
            } else {
                Some(by_machine)
            },
        })
    }

    /// Quality issues in the range, optionally filtered by exact severity
    pub fn quality_issues(
        &self,
        start_date: &str,
        end_date: &str,
        severity: Option<&str>,
        machine_name: Option<&str>,
    ) -> MetricsResult<QualityReport> {
        let (dataset, dates) = self.load_slice(start_date, end_date)?;

        let mut issues = Vec::new();
        let mut total_parts_affected: u64 = 0;
        let mut breakdown: BTreeMap<String, u64> = BTreeMap::new();

        for_each_record(&dataset, &dates, machine_name, |date, machine, record| {
            for issue in &record.quality_issues {
                let sev = issue.severity.to_string();
                if severity.is_some_and(|filter| filter != sev) {
                    continue;
                }

                total_parts_affected += issue.parts_affected;
                *breakdown.entry(sev.clone()).or_insert(0) += 1;

                issues.push(ReportedIssue {
                    date: date.to_string(),
                    machine: machine.to_string(),
                    issue_type: issue.issue_type.clone(),
                    description: issue.description.clone(),
                    parts_affected: issue.parts_affected,
                    severity: sev,
                });
            }
        });

        Ok(QualityReport {
            total_issues: issues.len(),
            issues,
            total_parts_affected,
            severity_breakdown: breakdown,
        })
    }

    /// Downtime totals, per-reason sums, and major events for the range
    pub fn downtime_analysis(
        &self,
        start_date: &str,
        end_date: &str,
        machine_name: Option<&str>,
    ) -> MetricsResult<DowntimeReport> {
        let (dataset, dates) = self.load_slice(start_date, end_date)?;

        let mut total_downtime = 0.0;
        let mut by_reason: BTreeMap<String, f64> = BTreeMap::new();
        let mut major_events = Vec::new();

        for_each_record(&dataset, &dates, machine_name, |date, machine, record| {
            total_downtime += record.downtime_hours;

            for event in &record.downtime_events {
                *by_reason.entry(event.reason.clone()).or_insert(0.0) += event.duration_hours;

                if event.duration_hours > MAJOR_EVENT_HOURS {
                    major_events.push(MajorEvent {
                        date: date.to_string(),
                        machine: machine.to_string(),
                        reason: event.reason.clone(),
                        description: event.description.clone(),
                        duration_hours: event.duration_hours,
                    });
                }
            }
        });

        Ok(DowntimeReport {
            total_downtime_hours: round_to(total_downtime, 2),
            downtime_by_reason: by_reason
                .into_iter()
                .map(|(reason, hours)| (reason, round_to(hours, 2)))
                .collect(),
            major_events,
        })
    }
}

/// Walk every (date, machine, record) in the slice, honoring the optional
/// machine filter. Machines absent on a given date contribute nothing.
fn for_each_record<'a>(
    dataset: &'a Dataset,
    dates: &'a [String],
    machine_name: Option<&str>,
    mut f: impl FnMut(&'a str, &'a str, &'a DayRecord),
) {
    for date in dates {
        let Some(day) = dataset.production.get(date) else {
            continue;
        };

        match machine_name {
            Some(name) => {
                if let Some((machine, record)) = day.get_key_value(name) {
                    f(date.as_str(), machine.as_str(), record);
                }
            }
            None => {
                for (machine, record) in day {
                    f(date.as_str(), machine.as_str(), record);
                }
            }
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DowntimeEvent;
    use crate::store::test_support::{machines, record, sample_dataset, shifts};
    use crate::store::{EmptySource, StaticSource};
    use std::collections::BTreeMap;

    fn engine() -> MetricsEngine {
        MetricsEngine::new(Arc::new(StaticSource::new(sample_dataset())))
    }

    fn single_machine_dataset() -> crate::model::Dataset {
        // One date, one machine: 1000 parts, 970 good, 15.5h uptime.
        let mut day = BTreeMap::new();
        day.insert("CNC-001".to_string(), record(1000, 970, 0.5, Vec::new(), Vec::new()));

        let mut production = BTreeMap::new();
        production.insert("2025-06-01".to_string(), day);

        crate::model::Dataset {
            generated_at: None,
            start_date: "2025-06-01".into(),
            end_date: "2025-06-01".into(),
            machines: machines(),
            shifts: shifts(),
            production,
        }
    }

    #[test]
    fn test_date_range_inclusive() {
        let dates = date_range("2025-06-01", "2025-06-03");
        assert_eq!(dates, vec!["2025-06-01", "2025-06-02", "2025-06-03"]);
    }

    #[test]
    fn test_date_range_tolerates_time_suffix() {
        let dates = date_range("2025-06-01T00:00:00", "2025-06-01T23:59:59");
        assert_eq!(dates, vec!["2025-06-01"]);
    }

    #[test]
    fn test_date_range_inverted_is_empty() {
        assert!(date_range("2025-06-03", "2025-06-01").is_empty());
    }

    #[test]
    fn test_date_range_unparseable_is_empty() {
        assert!(date_range("last tuesday", "2025-06-01").is_empty());
    }

    #[test]
    fn test_all_operations_report_empty_range_on_inverted_bounds() {
        let engine = engine();
        let (start, end) = ("2025-06-02", "2025-06-01");

        assert_eq!(
            engine.calculate_oee(start, end, None).unwrap_err(),
            MetricsError::EmptyRange
        );
        assert_eq!(
            engine.scrap_metrics(start, end, None).unwrap_err(),
            MetricsError::EmptyRange
        );
        assert_eq!(
            engine.quality_issues(start, end, None, None).unwrap_err(),
            MetricsError::EmptyRange
        );
        assert_eq!(
            engine.downtime_analysis(start, end, None).unwrap_err(),
            MetricsError::EmptyRange
        );
    }

    #[test]
    fn test_data_unavailable_takes_precedence() {
        let engine = MetricsEngine::new(Arc::new(EmptySource));
        assert_eq!(
            engine.calculate_oee("2025-06-02", "2025-06-01", None).unwrap_err(),
            MetricsError::DataUnavailable
        );
    }

    #[test]
    fn test_oee_known_scenario() {
        let engine = MetricsEngine::new(Arc::new(StaticSource::new(single_machine_dataset())));

        let report = engine
            .calculate_oee("2025-06-01", "2025-06-01", Some("CNC-001"))
            .unwrap();

        assert_eq!(report.availability, 0.969);
        assert_eq!(report.quality, 0.97);
        assert_eq!(report.performance, 0.95);
        assert_eq!(report.oee, 0.893);
        assert_eq!(report.total_parts, 1000);
        assert_eq!(report.good_parts, 970);
        assert_eq!(report.scrap_parts, 30);
    }

    #[test]
    fn test_oee_identity_holds() {
        let report = engine().calculate_oee("2025-06-01", "2025-06-02", None).unwrap();

        let recomputed = round_to(
            report.availability * report.performance * report.quality,
            3,
        );
        // Identity holds to within the rounding of the stored components.
        assert!((report.oee - recomputed).abs() <= 0.002);
        assert!(report.oee >= 0.0 && report.oee <= 1.0);
    }

    #[test]
    fn test_oee_unknown_machine_yields_zeros() {
        let report = engine()
            .calculate_oee("2025-06-01", "2025-06-02", Some("Ghost-001"))
            .unwrap();

        assert_eq!(report.oee, 0.0);
        assert_eq!(report.availability, 0.0);
        assert_eq!(report.quality, 0.0);
        assert_eq!(report.total_parts, 0);
    }

    #[test]
    fn test_oee_cycle_time_performance_model() {
        let engine = MetricsEngine::new(Arc::new(StaticSource::new(single_machine_dataset())))
            .with_performance_model(PerformanceModel::CycleTime);

        let report = engine
            .calculate_oee("2025-06-01", "2025-06-01", Some("CNC-001"))
            .unwrap();

        // 1000 parts * 45s ideal = 45000s of ideal work in 15.5h (55800s).
        assert_eq!(report.performance, round_to(45_000.0 / 55_800.0, 3));
        assert!(report.performance < 1.0);
    }

    #[test]
    fn test_scrap_breakdown_without_filter() {
        let report = engine().scrap_metrics("2025-06-01", "2025-06-02", None).unwrap();

        assert_eq!(report.total_scrap, 121);
        assert_eq!(report.total_parts, 2620);
        assert_eq!(report.scrap_rate, 4.62);

        let by_machine = report.scrap_by_machine.unwrap();
        assert_eq!(by_machine["CNC-001"], 49);
        assert_eq!(by_machine["Assembly-001"], 60);
        assert_eq!(by_machine["Packaging-001"], 12);
    }

    #[test]
    fn test_scrap_breakdown_omitted_with_filter() {
        let report = engine()
            .scrap_metrics("2025-06-01", "2025-06-02", Some("CNC-001"))
            .unwrap();

        assert_eq!(report.total_scrap, 49);
        assert_eq!(report.total_parts, 1620);
        assert_eq!(report.scrap_rate, 3.02);
        assert!(report.scrap_by_machine.is_none());
    }

    #[test]
    fn test_quality_issues_annotated_with_origin() {
        let report = engine()
            .quality_issues("2025-06-01", "2025-06-02", None, None)
            .unwrap();

        assert_eq!(report.total_issues, 4);
        assert_eq!(report.total_parts_affected, 17);
        assert_eq!(report.severity_breakdown["High"], 2);
        assert_eq!(report.severity_breakdown["Medium"], 1);
        assert_eq!(report.severity_breakdown["Low"], 1);

        let first = report
            .issues
            .iter()
            .find(|i| i.issue_type == "assembly")
            .unwrap();
        assert_eq!(first.date, "2025-06-01");
        assert_eq!(first.machine, "Assembly-001");
    }

    #[test]
    fn test_quality_issues_severity_filter_exact_match() {
        let report = engine()
            .quality_issues("2025-06-01", "2025-06-02", Some("High"), None)
            .unwrap();

        assert_eq!(report.total_issues, 2);
        assert_eq!(report.total_parts_affected, 12);
        assert_eq!(report.severity_breakdown.len(), 1);

        // A severity that matches nothing yields an empty report, not an error.
        let none = engine()
            .quality_issues("2025-06-01", "2025-06-02", Some("Critical"), None)
            .unwrap();
        assert_eq!(none.total_issues, 0);
    }

    #[test]
    fn test_downtime_totals_and_reasons() {
        let report = engine()
            .downtime_analysis("2025-06-01", "2025-06-02", None)
            .unwrap();

        assert_eq!(report.total_downtime_hours, 6.5);
        assert_eq!(report.downtime_by_reason["changeover"], 0.5);
        assert_eq!(report.downtime_by_reason["mechanical"], 6.0);

        // The 2.0h conveyor jam sits exactly on the threshold: not major.
        assert_eq!(report.major_events.len(), 1);
        assert_eq!(report.major_events[0].machine, "Packaging-001");
        assert_eq!(report.major_events[0].duration_hours, 4.0);
    }

    #[test]
    fn test_major_event_boundary_is_strict() {
        let mut dataset = single_machine_dataset();
        let day = dataset.production.get_mut("2025-06-01").unwrap();
        let rec = day.get_mut("CNC-001").unwrap();
        rec.downtime_events = vec![
            DowntimeEvent {
                reason: "electrical".into(),
                description: "Breaker trip".into(),
                duration_hours: 2.0,
            },
            DowntimeEvent {
                reason: "electrical".into(),
                description: "Longer breaker trip".into(),
                duration_hours: 2.01,
            },
        ];

        let engine = MetricsEngine::new(Arc::new(StaticSource::new(dataset)));
        let report = engine
            .downtime_analysis("2025-06-01", "2025-06-01", None)
            .unwrap();

        assert_eq!(report.major_events.len(), 1);
        assert_eq!(report.major_events[0].duration_hours, 2.01);
    }

    #[test]
    fn test_range_wider_than_snapshot_skips_missing_dates() {
        let report = engine().scrap_metrics("2025-05-28", "2025-06-05", None).unwrap();
        // Same totals as the exact range; out-of-snapshot dates contribute nothing.
        assert_eq!(report.total_parts, 2620);
    }

    #[test]
    fn test_machine_missing_on_some_dates_is_skipped() {
        // Assembly-001 only ran on 2025-06-01.
        let report = engine()
            .scrap_metrics("2025-06-01", "2025-06-02", Some("Assembly-001"))
            .unwrap();

        assert_eq!(report.total_parts, 600);
        assert_eq!(report.total_scrap, 60);
        assert_eq!(report.scrap_rate, 10.0);
    }
}
