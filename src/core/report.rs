use crate::types::ElementRegion;

/// Sink for step screenshots. The driver calls it after interaction steps and
/// never depends on what it does with the bytes; failures inside a sink are
/// the sink's problem.
pub trait ReportSink: Send + Sync {
    /// Attach a labelled PNG.
    fn attach(&self, label: &str, image: &[u8]);

    /// Attach a labelled PNG together with the acted-on element's viewport
    /// region. Defaults to the plain attachment for sinks that cannot use the
    /// region.
    fn attach_region(&self, label: &str, image: &[u8], _region: ElementRegion) {
        self.attach(label, image);
    }
}
