/// Receives the non-fatal events a streaming session produces.
///
/// Injected into each session so callers decide where warnings and encoder
/// output go (log crate, GUI, test recorder) without global logger state.
pub trait DiagnosticSink: Send {
    /// A non-fatal problem with the input, e.g. a skipped empty frame.
    fn warning(&mut self, message: &str);

    /// Text the terminal encoder invocation wrote to stderr.
    fn encoder_diagnostics(&mut self, text: &str);

    /// Lifecycle status message. Default: no-op.
    fn info(&mut self, _message: &str) {}
}

/// Sink that discards everything.
pub struct NullDiagnosticSink;

impl DiagnosticSink for NullDiagnosticSink {
    fn warning(&mut self, _message: &str) {}
    fn encoder_diagnostics(&mut self, _text: &str) {}
}

/// Forwards session events to the `log` facade.
///
/// Repeated warnings are collapsed: the first occurrence of a message is
/// logged, later ones only bump a counter that is reported once the
/// session ends.
#[derive(Default)]
pub struct LogDiagnosticSink {
    last_warning: Option<String>,
    repeated: usize,
}

impl LogDiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn flush_repeats(&mut self) {
        if self.repeated > 0 {
            if let Some(message) = &self.last_warning {
                log::warn!("{message} (repeated {} more times)", self.repeated);
            }
            self.repeated = 0;
        }
    }
}

impl DiagnosticSink for LogDiagnosticSink {
    fn warning(&mut self, message: &str) {
        if self.last_warning.as_deref() == Some(message) {
            self.repeated += 1;
            return;
        }
        self.flush_repeats();
        log::warn!("{message}");
        self.last_warning = Some(message.to_string());
    }

    fn encoder_diagnostics(&mut self, text: &str) {
        self.flush_repeats();
        log::warn!("Encoder output:\n{}", text.trim_end());
    }

    fn info(&mut self, message: &str) {
        self.flush_repeats();
        log::info!("{message}");
    }
}

impl Drop for LogDiagnosticSink {
    fn drop(&mut self) {
        self.flush_repeats();
    }
}
