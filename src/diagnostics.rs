//! Diagnostics context shared by every pipeline stage.
//!
//! Replaces process‑wide error flags with an explicit value the driver owns and
//! threads through `scan`, `parse`, `resolve` and `interpret`.  Two sticky
//! flags are kept apart so the caller can pick distinct exit codes for
//! "static errors found" and "uncaught runtime error".

use log::debug;

use crate::error::LoxError;
use crate::token::Token;

/// Collects error reports and remembers which class of error has been seen.
#[derive(Debug, Default)]
pub struct Diagnostics {
    had_error: bool,
    had_runtime_error: bool,
    reports: Vec<LoxError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error, raising the flag that matches its class.
    pub fn report(&mut self, error: LoxError) {
        debug!("Diagnostic reported: {}", error);

        if error.is_runtime() {
            self.had_runtime_error = true;
        } else {
            self.had_error = true;
        }

        self.reports.push(error);
    }

    /// Static error attributed to a whole line (used by the scanner).
    pub fn report_at_line<S: Into<String>>(&mut self, line: usize, message: S) {
        self.report(LoxError::lex(line, message));
    }

    /// Static error attributed to a token (`at end` for EOF).
    pub fn report_at_token<S: Into<String>>(&mut self, token: &Token, message: S) {
        self.report(LoxError::parse(token, message));
    }

    pub fn report_runtime_error<S: Into<String>>(&mut self, token: &Token, message: S) {
        self.report(LoxError::runtime(token, message));
    }

    /// A lexical, syntax or resolution error has been reported.
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    pub fn reset_error(&mut self) {
        self.had_error = false;
    }

    pub fn reset_runtime_error(&mut self) {
        self.had_runtime_error = false;
    }

    /// Reports collected so far, oldest first.
    pub fn reports(&self) -> &[LoxError] {
        &self.reports
    }

    /// Drain the collected reports; flags are left untouched.
    pub fn take_reports(&mut self) -> Vec<LoxError> {
        std::mem::take(&mut self.reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    #[test]
    fn flags_are_independent_and_sticky() {
        let mut diagnostics = Diagnostics::new();
        let token = Token::new(TokenType::IDENTIFIER, "x", 1);

        diagnostics.report_at_line(1, "Unexpected character.");
        assert!(diagnostics.had_error());
        assert!(!diagnostics.had_runtime_error());

        diagnostics.report_runtime_error(&token, "Undefined variable 'x'.");
        assert!(diagnostics.had_runtime_error());

        diagnostics.reset_error();
        assert!(!diagnostics.had_error());
        assert!(diagnostics.had_runtime_error());

        diagnostics.reset_runtime_error();
        assert!(!diagnostics.had_runtime_error());
        assert_eq!(diagnostics.reports().len(), 2);
    }

    #[test]
    fn take_reports_keeps_flags() {
        let mut diagnostics = Diagnostics::new();
        let token = Token::new(TokenType::EOF, "", 9);

        diagnostics.report_at_token(&token, "Expect expression.");
        let reports = diagnostics.take_reports();

        assert_eq!(reports.len(), 1);
        assert_eq!(
            reports[0].to_string(),
            "[line 9] Error at end: Expect expression."
        );
        assert!(diagnostics.reports().is_empty());
        assert!(diagnostics.had_error());
    }
}
