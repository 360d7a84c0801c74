//! Application-level span guard.

use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Keeps the application span (command mode, run id, build SHA) entered for
/// the lifetime of the process.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter the application-level tracing span.
    #[must_use]
    pub fn new(mode: impl Into<String>, run_id: impl Into<String>) -> Self {
        let mode = mode.into();
        let run_id = run_id.into();
        let span: &'static Span = Box::leak(Box::new(tracing::info_span!(
            "cassvault",
            mode = %mode,
            run_id = %run_id,
            build_sha = %build_sha()
        )));
        let guard = span.enter();
        Self { _guard: guard }
    }
}
