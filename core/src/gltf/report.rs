//! Severity-tagged import report.
//!
//! Decode units run in parallel and must not unwind, so decode-level
//! problems are funneled through this collector instead of being raised as
//! errors in the hot path. Entries forward to the `log` facade as they are
//! recorded and stay on the report for host display; the session derives
//! its overall success flag from the absence of error entries.

/// Severity of a report entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational note.
    Info,
    /// Recoverable problem; the import continues unchanged.
    Warning,
    /// A primitive or the whole import failed.
    Error,
}

/// Stable codes identifying report entry categories.
pub mod codes {
    /// An extension in `extensionsUsed` is not supported.
    pub const EXTENSION_UNSUPPORTED: &str = "extension-unsupported";
    /// A draw mode was coerced to the nearest supported topology.
    pub const DRAW_MODE_COERCED: &str = "draw-mode-coerced";
    /// An accessor is reused with conflicting usages.
    pub const USAGE_CONFLICT: &str = "accessor-usage-conflict";
    /// An accessor is shared across meshes (performance warning).
    pub const ACCESSOR_SHARED: &str = "accessor-shared-across-meshes";
    /// Keyframe times are duplicated or non-increasing.
    pub const KEYFRAME_TIMES: &str = "keyframe-times-non-increasing";
    /// A primitive's decode failed; its mesh data is absent.
    pub const PRIMITIVE_FAILED: &str = "primitive-failed";
    /// A primitive has no POSITION attribute.
    pub const MISSING_POSITIONS: &str = "missing-positions";
    /// An accessor's component type is invalid for its use.
    pub const INVALID_COMPONENT_TYPE: &str = "invalid-component-type";
    /// More texture coordinate sets than the vertex layout supports.
    pub const EXCESS_TEXCOORDS: &str = "excess-texcoord-sets";
    /// A skin's joint count does not match its inverse bind matrices.
    pub const SKIN_JOINT_MISMATCH: &str = "skin-joint-mismatch";
    /// A skin's inverse bind matrices could not be decoded.
    pub const SKIN_DATA: &str = "skin-data";
    /// A bone attribute pair (joints/weights) is incomplete.
    pub const INCOMPLETE_BONE_DATA: &str = "incomplete-bone-data";
    /// A morph target is malformed.
    pub const MORPH_TARGET: &str = "morph-target";
    /// An animation channel could not be decoded.
    pub const ANIMATION_CHANNEL: &str = "animation-channel";
}

/// One recorded import event.
#[derive(Debug, Clone)]
pub struct ReportEntry {
    /// How severe the event is.
    pub severity: Severity,
    /// Stable category code (see [`codes`]).
    pub code: &'static str,
    /// Host-readable description.
    pub message: String,
}

/// Collects severity-tagged entries over one import.
#[derive(Debug, Default)]
pub struct ImportReport {
    entries: Vec<ReportEntry>,
}

impl ImportReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an informational entry.
    pub fn info(&mut self, code: &'static str, message: impl Into<String>) {
        let message = message.into();
        log::info!("[{code}] {message}");
        self.entries.push(ReportEntry {
            severity: Severity::Info,
            code,
            message,
        });
    }

    /// Records a warning entry.
    pub fn warning(&mut self, code: &'static str, message: impl Into<String>) {
        let message = message.into();
        log::warn!("[{code}] {message}");
        self.entries.push(ReportEntry {
            severity: Severity::Warning,
            code,
            message,
        });
    }

    /// Records an error entry.
    pub fn error(&mut self, code: &'static str, message: impl Into<String>) {
        let message = message.into();
        log::error!("[{code}] {message}");
        self.entries.push(ReportEntry {
            severity: Severity::Error,
            code,
            message,
        });
    }

    /// All entries in recording order.
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    /// Whether any error entry was recorded.
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|e| e.severity == Severity::Error)
    }

    /// Number of entries with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .iter()
            .filter(|e| e.severity == severity)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities_are_counted() {
        let mut report = ImportReport::new();
        report.info(codes::ACCESSOR_SHARED, "note");
        report.warning(codes::DRAW_MODE_COERCED, "line loop coerced");
        report.warning(codes::USAGE_CONFLICT, "accessor 3 reused");
        report.error(codes::PRIMITIVE_FAILED, "mesh 0 primitive 1");

        assert_eq!(report.entries().len(), 4);
        assert_eq!(report.count(Severity::Info), 1);
        assert_eq!(report.count(Severity::Warning), 2);
        assert_eq!(report.count(Severity::Error), 1);
        assert!(report.has_errors());
    }

    #[test]
    fn empty_report_has_no_errors() {
        let report = ImportReport::new();
        assert!(!report.has_errors());
        assert!(report.entries().is_empty());
    }
}
