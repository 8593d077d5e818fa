use crate::errors::ThemaResult;

/// Report-emission contract: consumes a rendered document.
pub trait ReportSink: Send + Sync {
    fn emit(&mut self, report: &str) -> ThemaResult<()>;
}

/// Collect reports into memory. Handy for tests and for callers that
/// post-process the document themselves.
#[derive(Debug, Default)]
pub struct BufferSink {
    pub documents: Vec<String>,
}

impl ReportSink for BufferSink {
    fn emit(&mut self, report: &str) -> ThemaResult<()> {
        self.documents.push(report.to_string());
        Ok(())
    }
}
