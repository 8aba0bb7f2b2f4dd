use crate::certportal::ApiResult;
use crate::store::{SectionKind, SectionStatus};

/// One remote (or local) step taken while pushing a section. The orchestrator
/// is the only place these get logged, so log shape stays uniform across all
/// six processors without losing per-step granularity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepEvent {
    pub action: String,
    pub ok: bool,
    pub status: u16,
    pub detail: String,
}

/// Result of running one section processor.
#[derive(Debug, Clone)]
pub struct SectionOutcome {
    pub kind: SectionKind,
    pub status: SectionStatus,
    pub notes: Vec<String>,
    pub events: Vec<StepEvent>,
}

/// Note and event collector threaded through a section run.
///
/// Status is derived, never set directly: a section is done exactly when it
/// finished with an empty note list.
#[derive(Debug)]
pub struct SectionRun {
    kind: SectionKind,
    notes: Vec<String>,
    events: Vec<StepEvent>,
}

impl SectionRun {
    pub fn new(kind: SectionKind) -> Self {
        Self {
            kind,
            notes: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Record a portal step. Failures append the standard user-facing note
    /// and report `false`; the caller decides whether anything downstream
    /// depended on this step.
    pub fn record(&mut self, action: &str, result: &ApiResult) -> bool {
        self.events.push(StepEvent {
            action: action.to_string(),
            ok: result.success,
            status: result.status,
            detail: result.message.clone(),
        });
        if !result.success {
            self.notes.push(format!(
                "Gagal {action}: {} (Status: {})",
                result.message, result.status
            ));
        }
        result.success
    }

    /// Like [`record`](Self::record), but also surfaces the structured
    /// validation-error list verbatim, one note per entry.
    pub fn record_with_errors(&mut self, action: &str, result: &ApiResult) -> bool {
        let ok = self.record(action, result);
        if !ok {
            for error in result.error_strings() {
                self.notes.push(error);
            }
        }
        ok
    }

    /// A local failure (missing file, parse error) that blocks part of the
    /// section without any remote call having been made.
    pub fn note(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.events.push(StepEvent {
            action: "local".to_string(),
            ok: false,
            status: 0,
            detail: message.clone(),
        });
        self.notes.push(message);
    }

    /// A local step that worked; kept for the uniform event log.
    pub fn local_ok(&mut self, action: &str, detail: impl Into<String>) {
        self.events.push(StepEvent {
            action: action.to_string(),
            ok: true,
            status: 0,
            detail: detail.into(),
        });
    }

    pub fn has_notes(&self) -> bool {
        !self.notes.is_empty()
    }

    pub fn finish(self) -> SectionOutcome {
        let status = if self.notes.is_empty() {
            SectionStatus::Done
        } else {
            SectionStatus::Failed
        };
        SectionOutcome {
            kind: self.kind,
            status,
            notes: self.notes,
            events: self.events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_notes_derive_done() {
        let mut run = SectionRun::new(SectionKind::Bahan);
        assert!(run.record("unggah bahan", &ApiResult::ok(200, None, "OK")));
        let outcome = run.finish();
        assert_eq!(outcome.status, SectionStatus::Done);
        assert!(outcome.notes.is_empty());
        assert_eq!(outcome.events.len(), 1);
    }

    #[test]
    fn failures_note_and_derive_failed() {
        let mut run = SectionRun::new(SectionKind::Bahan);
        let result = ApiResult::failure(422, "Validasi gagal", None);
        assert!(!run.record("unggah bahan", &result));
        let outcome = run.finish();
        assert_eq!(outcome.status, SectionStatus::Failed);
        assert_eq!(
            outcome.notes,
            vec!["Gagal unggah bahan: Validasi gagal (Status: 422)"]
        );
    }

    #[test]
    fn validation_errors_are_surfaced_verbatim() {
        let mut run = SectionRun::new(SectionKind::Bahan);
        let result = ApiResult::failure(
            422,
            "Validasi gagal",
            Some(serde_json::json!(["Nama bahan kosong"])),
        );
        run.record_with_errors("unggah daftar bahan", &result);
        let outcome = run.finish();
        assert!(outcome
            .notes
            .iter()
            .any(|note| note.contains("Nama bahan kosong")));
    }
}
