use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{DisasterEvent, EventKind, EventStatus, Prediction, Severity};

/// One flat row summarizing the pipeline's collections at a point in time.
/// Serializes directly into a CSV snapshot line.
#[derive(Debug, Default, Serialize)]
pub struct PipelineStats {
    pub timestamp: DateTime<Utc>,
    pub round: Option<u64>,
    pub total_events: usize,

    // status
    pub active: usize,
    pub monitoring: usize,
    pub resolved: usize,

    // severity
    pub critical: usize,
    pub high: usize,
    pub moderate: usize,
    pub low: usize,

    // event kinds
    pub earthquakes: usize,
    pub wildfires: usize,
    pub floods: usize,
    pub hurricanes: usize,
    pub storms: usize,
    pub other_kinds: usize,

    // estimates (summed where the feed provided them)
    pub affected_population: u64,
    pub economic_impact_usd: u64,

    // predictions
    pub total_predictions: usize,
    pub active_predictions: usize,

    // error tracking
    pub error_type: Option<String>,
    pub error_message: Option<String>,
}

impl PipelineStats {
    pub fn from_collections(events: &[DisasterEvent], predictions: &[Prediction]) -> Self {
        let mut s = PipelineStats {
            timestamp: Utc::now(),
            total_events: events.len(),
            total_predictions: predictions.len(),
            ..Default::default()
        };

        for e in events {
            match e.status {
                EventStatus::Active => s.active += 1,
                EventStatus::Monitoring => s.monitoring += 1,
                EventStatus::Resolved => s.resolved += 1,
            }

            match e.severity {
                Severity::Critical => s.critical += 1,
                Severity::High => s.high += 1,
                Severity::Moderate => s.moderate += 1,
                Severity::Low => s.low += 1,
            }

            match e.event_type {
                EventKind::Earthquake => s.earthquakes += 1,
                EventKind::Wildfire => s.wildfires += 1,
                EventKind::Flood => s.floods += 1,
                EventKind::Hurricane => s.hurricanes += 1,
                EventKind::Storm => s.storms += 1,
                _ => s.other_kinds += 1,
            }

            if let Some(pop) = e.estimated_affected_population {
                s.affected_population += pop;
            }

            if let Some(usd) = e.estimated_economic_impact_usd {
                s.economic_impact_usd += usd;
            }
        }

        s.active_predictions = predictions.iter().filter(|p| p.is_active).count();

        s
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn critical_pct(&self) -> f64 {
        Self::pct(self.critical, self.total_events)
    }

    /// Create an error record with timestamp and error information
    pub fn from_error(error_type: &str, error_message: &str) -> Self {
        PipelineStats {
            timestamp: Utc::now(),
            error_type: Some(error_type.to_string()),
            error_message: Some(error_message.to_string()),
            ..Default::default()
        }
    }

    /// Tag the row with the monitor round that produced it
    pub fn with_round(mut self, round: u64) -> Self {
        self.round = Some(round);
        self
    }
}
