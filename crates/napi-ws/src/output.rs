//! Colored terminal output for the startup banner and fatal errors.

use console::{Style, Term};

/// Terminal output formatter (writes to stderr).
pub(crate) struct Output {
    term: Term,
    title: Style,
    link: Style,
    notice: Style,
    red: Style,
}

impl Output {
    /// Create a new output formatter.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            title: Style::new().cyan().bold(),
            link: Style::new().green().underlined(),
            notice: Style::new().yellow(),
            red: Style::new().red(),
        }
    }

    /// Print the program name line.
    pub(crate) fn title(&self, msg: &str) {
        self.write(&self.title.apply_to(msg).to_string());
    }

    /// Print a plain message.
    pub(crate) fn info(&self, msg: &str) {
        self.write(msg);
    }

    /// Print `label` followed by an underlined URL.
    pub(crate) fn link(&self, label: &str, url: &str) {
        self.write(&format!("{label} {}", self.link.apply_to(url)));
    }

    /// Print a mode change the developer should notice (yellow).
    pub(crate) fn notice(&self, msg: &str) {
        self.write(&self.notice.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        self.write(&self.red.apply_to(msg).to_string());
    }

    fn write(&self, line: &str) {
        let _ = self.term.write_line(line);
    }
}
