//! Flat report of the current scenario for spreadsheets.

use crate::{
    error::{PlannerError, PlannerResult},
    metrics::{CapacityMetrics, TeamSummary},
    types::{Money, Percent},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub rep:         String,
    pub segment:     String,
    pub accounts:    usize,
    pub arr:         Money,
    pub capacity:    Percent,
    pub status:      String,
    pub whitespace:  Money,
    pub at_risk_arr: Money,
    pub avg_health:  f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportReport {
    pub summary:        TeamSummary,
    pub overall_equity: f64,
    pub rows:           Vec<ExportRow>,
}

impl ExportReport {
    pub fn build(summary: &TeamSummary, overall_equity: f64, metrics: &[CapacityMetrics]) -> Self {
        let rows = metrics
            .iter()
            .map(|m| ExportRow {
                rep:         m.rep_name.clone(),
                segment:     m.segment.label().to_string(),
                accounts:    m.account_count,
                arr:         m.total_arr.round(),
                capacity:    m.capacity_score.round(),
                status:      m.capacity_status.as_str().to_string(),
                whitespace:  m.total_actionable_whitespace.round(),
                at_risk_arr: m.at_risk_arr.round(),
                avg_health:  m.avg_health.round(),
            })
            .collect();
        Self {
            summary: summary.clone(),
            overall_equity,
            rows,
        }
    }

    /// Two blocks separated by a blank line: summary key/value pairs,
    /// then one row per rep under a header.
    pub fn to_csv(&self) -> PlannerResult<String> {
        let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(Vec::new());
        let s = &self.summary;

        wtr.write_record(["Territory Planner Report"])?;
        wtr.write_record([""])?;
        wtr.write_record(["Summary Metrics"])?;
        for (label, value) in [
            ("Team Size", s.team_size.to_string()),
            ("Total Accounts", s.total_accounts.to_string()),
            ("Total ARR", format!("{:.0}", s.total_arr)),
            ("Avg Capacity", format!("{:.0}%", s.avg_capacity)),
            ("Actionable Whitespace", format!("{:.0}", s.total_whitespace)),
            ("At-Risk ARR", format!("{:.0}", s.total_at_risk_arr)),
            ("Overall Equity", format!("{:.0}", self.overall_equity)),
        ] {
            wtr.write_record([label, value.as_str()])?;
        }
        wtr.write_record([""])?;

        wtr.write_record(["Team Details"])?;
        wtr.write_record([
            "Rep", "Segment", "Accounts", "ARR", "Capacity", "Status", "Whitespace", "At-Risk ARR", "Avg Health",
        ])?;
        for row in &self.rows {
            wtr.write_record([
                row.rep.clone(),
                row.segment.clone(),
                row.accounts.to_string(),
                format!("{:.0}", row.arr),
                format!("{:.0}%", row.capacity),
                row.status.clone(),
                format!("{:.0}", row.whitespace),
                format!("{:.0}", row.at_risk_arr),
                format!("{:.0}", row.avg_health),
            ])?;
        }

        let bytes = wtr
            .into_inner()
            .map_err(|e| PlannerError::Other(anyhow::anyhow!("Cannot flush CSV export: {e}")))?;
        String::from_utf8(bytes).map_err(|e| PlannerError::Other(anyhow::anyhow!("CSV export is not UTF-8: {e}")))
    }
}
