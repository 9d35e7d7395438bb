//! Colored status lines on stderr.

use console::{Style, Term};
use dita_renderer::{Diagnostic, DiagnosticKind};

pub(crate) struct Output {
    term: Term,
    dim: Style,
    ok: Style,
    warn: Style,
    fail: Style,
    title: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            dim: Style::new().dim(),
            ok: Style::new().green(),
            warn: Style::new().yellow(),
            fail: Style::new().red(),
            title: Style::new().cyan().bold(),
        }
    }

    fn line(&self, style: &Style, msg: &str) {
        let _ = self.term.write_line(&style.apply_to(msg).to_string());
    }

    /// `label: value` with a dimmed label.
    pub(crate) fn field(&self, label: &str, value: &str) {
        let _ = self
            .term
            .write_line(&format!("{} {value}", self.dim.apply_to(format!("{label}:"))));
    }

    pub(crate) fn success(&self, msg: &str) {
        self.line(&self.ok, msg);
    }

    pub(crate) fn warning(&self, msg: &str) {
        self.line(&self.warn, msg);
    }

    pub(crate) fn error(&self, msg: &str) {
        self.line(&self.fail, msg);
    }

    pub(crate) fn heading(&self, msg: &str) {
        self.line(&self.title, msg);
    }

    /// Missing files are printed as errors, everything else as warnings.
    pub(crate) fn diagnostic(&self, diagnostic: &Diagnostic) {
        let style = match diagnostic.kind {
            DiagnosticKind::NotFound => &self.fail,
            DiagnosticKind::Resolution | DiagnosticKind::Validation => &self.warn,
        };
        self.line(style, &format!("  {diagnostic}"));
    }
}
