//! Dataset Source
//!
//! The accessor boundary for production snapshots. Sources are pure reads
//! with no caching contract; every metrics call may re-invoke `load`, so a
//! file-backed source always reflects the snapshot currently on disk.

use std::path::PathBuf;
use std::sync::Arc;

use crate::model::Dataset;

/// Source of the production snapshot
///
/// Returns `None` when no snapshot is available; the metrics engine maps
/// that to its `DataUnavailable` result.
pub trait DatasetSource: Send + Sync {
    fn load(&self) -> Option<Arc<Dataset>>;
}

/// Reads the snapshot from a JSON file on every call
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl DatasetSource for JsonFileSource {
    fn load(&self) -> Option<Arc<Dataset>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Snapshot not readable: {}", e);
                return None;
            }
        };

        match serde_json::from_str::<Dataset>(&raw) {
            Ok(dataset) => Some(Arc::new(dataset)),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Snapshot not decodable: {}", e);
                None
            }
        }
    }
}

/// In-memory source for tests and demos
pub struct StaticSource {
    dataset: Arc<Dataset>,
}

impl StaticSource {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset: Arc::new(dataset),
        }
    }
}

impl DatasetSource for StaticSource {
    fn load(&self) -> Option<Arc<Dataset>> {
        Some(Arc::clone(&self.dataset))
    }
}

/// Source that never has data; exercises the `DataUnavailable` path
pub struct EmptySource;

impl DatasetSource for EmptySource {
    fn load(&self) -> Option<Arc<Dataset>> {
        None
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    //! Deterministic fixture data shared across the crate's tests.

    use std::collections::BTreeMap;

    use crate::model::{
        DayRecord, Dataset, DowntimeEvent, Machine, QualityIssue, Severity, Shift,
    };

    pub fn machines() -> Vec<Machine> {
        vec![
            Machine {
                id: 1,
                name: "CNC-001".into(),
                machine_type: "CNC Machining Center".into(),
                ideal_cycle_time: 45.0,
            },
            Machine {
                id: 2,
                name: "Assembly-001".into(),
                machine_type: "Assembly Station".into(),
                ideal_cycle_time: 120.0,
            },
            Machine {
                id: 3,
                name: "Packaging-001".into(),
                machine_type: "Automated Packaging Line".into(),
                ideal_cycle_time: 30.0,
            },
        ]
    }

    pub fn shifts() -> Vec<Shift> {
        vec![
            Shift {
                id: 1,
                name: "Day".into(),
                start_hour: 6,
                end_hour: 14,
            },
            Shift {
                id: 2,
                name: "Night".into(),
                start_hour: 14,
                end_hour: 22,
            },
        ]
    }

    pub fn record(
        parts: u64,
        good: u64,
        downtime: f64,
        events: Vec<DowntimeEvent>,
        issues: Vec<QualityIssue>,
    ) -> DayRecord {
        let scrap = parts - good;
        DayRecord {
            parts_produced: parts,
            good_parts: good,
            scrap_parts: scrap,
            scrap_rate: if parts > 0 {
                (scrap as f64 / parts as f64 * 10_000.0).round() / 100.0
            } else {
                0.0
            },
            uptime_hours: 16.0 - downtime,
            downtime_hours: downtime,
            downtime_events: events,
            quality_issues: issues,
            shifts: BTreeMap::new(),
        }
    }

    /// Two dates, three machines, with gaps: Assembly-001 only ran on the
    /// first date and Packaging-001 only on the second.
    pub fn sample_dataset() -> Dataset {
        let mut production = BTreeMap::new();

        let mut day1 = BTreeMap::new();
        day1.insert(
            "CNC-001".to_string(),
            record(
                800,
                776,
                0.5,
                vec![DowntimeEvent {
                    reason: "changeover".into(),
                    description: "Product changeover".into(),
                    duration_hours: 0.5,
                }],
                vec![QualityIssue {
                    issue_type: "surface".into(),
                    description: "Surface defect".into(),
                    parts_affected: 3,
                    severity: Severity::Medium,
                }],
            ),
        );
        day1.insert(
            "Assembly-001".to_string(),
            record(
                600,
                540,
                2.0,
                vec![DowntimeEvent {
                    reason: "mechanical".into(),
                    description: "Conveyor jam".into(),
                    duration_hours: 2.0,
                }],
                vec![
                    QualityIssue {
                        issue_type: "assembly".into(),
                        description: "Loose fastener".into(),
                        parts_affected: 8,
                        severity: Severity::High,
                    },
                    QualityIssue {
                        issue_type: "assembly".into(),
                        description: "Misaligned bracket".into(),
                        parts_affected: 4,
                        severity: Severity::High,
                    },
                ],
            ),
        );
        production.insert("2025-06-01".to_string(), day1);

        let mut day2 = BTreeMap::new();
        day2.insert(
            "CNC-001".to_string(),
            record(
                820,
                795,
                0.0,
                Vec::new(),
                vec![QualityIssue {
                    issue_type: "material".into(),
                    description: "Material quality".into(),
                    parts_affected: 2,
                    severity: Severity::Low,
                }],
            ),
        );
        day2.insert(
            "Packaging-001".to_string(),
            record(
                400,
                388,
                4.0,
                vec![DowntimeEvent {
                    reason: "mechanical".into(),
                    description: "Critical bearing failure".into(),
                    duration_hours: 4.0,
                }],
                Vec::new(),
            ),
        );
        production.insert("2025-06-02".to_string(), day2);

        Dataset {
            generated_at: Some("2025-06-03T00:00:00".into()),
            start_date: "2025-06-01T00:00:00".into(),
            end_date: "2025-06-02T00:00:00".into(),
            machines: machines(),
            shifts: shifts(),
            production,
        }
    }
}
