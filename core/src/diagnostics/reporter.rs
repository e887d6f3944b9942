use std::sync::{Mutex, PoisonError};

use super::SizeDiagnostic;

/// Sink for size diagnostics.
///
/// Methods may be generated on several threads at once, so implementations
/// take `&self` and must serialize concurrent reports themselves.
pub trait DiagnosticReporter: Sync {
    fn report(&self, diagnostic: SizeDiagnostic);
}

/// Collects every reported diagnostic in memory.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    diagnostics: Mutex<Vec<SizeDiagnostic>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Diagnostics in the order they arrived.
    pub fn into_vec(self) -> Vec<SizeDiagnostic> {
        self.diagnostics
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Diagnostics ordered by declaring type, then source position, then
    /// method name, independent of which thread reported first.
    pub fn into_sorted(self) -> Vec<SizeDiagnostic> {
        let mut diagnostics = self.into_vec();
        diagnostics.sort_by(|a, b| {
            let key = |d: &SizeDiagnostic| {
                (
                    d.signature.declaring_type.clone(),
                    d.signature.span.as_ref().map(|s| s.0.start),
                    d.signature.name.clone(),
                )
            };
            key(a).cmp(&key(b))
        });
        diagnostics
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SizeDiagnostic>> {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl DiagnosticReporter for CollectingReporter {
    fn report(&self, diagnostic: SizeDiagnostic) {
        self.lock().push(diagnostic);
    }
}
