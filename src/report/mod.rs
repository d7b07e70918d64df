pub mod change_report;
pub mod relative_time;
pub mod report_writer;
pub mod run_summary;

pub use change_report::{ChangeReport, ChangeReportBuilder, ChangeSet, FailedDownload};
pub use relative_time::RelativeTimeFormatter;
pub use report_writer::ReportWriter;
pub use run_summary::RunSummary;
