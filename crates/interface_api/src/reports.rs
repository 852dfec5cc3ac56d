//! Day-close report delivery

use async_trait::async_trait;
use tracing::info;

use core_kernel::{DomainPort, PortError};
use domain_reconciliation::{DayCloseReport, ReportChannel};

/// Writes day-close reports to the structured log
///
/// Stands in for an email or messaging integration; the reconciliation
/// service tolerates delivery failure either way.
#[derive(Debug, Clone, Default)]
pub struct LogReportChannel;

impl DomainPort for LogReportChannel {}

#[async_trait]
impl ReportChannel for LogReportChannel {
    async fn send_day_close_report(&self, report: &DayCloseReport) -> Result<(), PortError> {
        info!(
            tenant = %report.tenant_id,
            session = %report.session_id,
            date = %report.date,
            cash_counted = %report.physical_cash_total,
            variance = %report.variance,
            matched_lines = report.matched_lines,
            unmatched_lines = report.unmatched_lines,
            "Day-close report"
        );
        Ok(())
    }
}
