//! Colored terminal output for deployment runs.
//!
//! Write failures on the terminal are ignored; a deployment must not fail
//! because stdout went away.

use std::io::Write;
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Output manager for consistent colored terminal output
#[derive(Debug)]
pub struct OutputManager {
    stdout: BufferWriter,
    stderr: BufferWriter,
    verbose: bool,
    quiet: bool,
}

impl OutputManager {
    /// Create a new output manager
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            stdout: BufferWriter::stdout(ColorChoice::Auto),
            stderr: BufferWriter::stderr(ColorChoice::Auto),
            verbose,
            quiet,
        }
    }

    fn tagged(&self, writer: &BufferWriter, tag: &str, color: Color, bold: bool, color_body: bool, message: &str) {
        let mut buffer = writer.buffer();
        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(bold));
        let _ = write!(&mut buffer, "{}", tag);
        let _ = buffer.reset();
        if color_body {
            let _ = buffer.set_color(ColorSpec::new().set_fg(Some(color)));
        }
        let _ = writeln!(&mut buffer, " {}", message);
        let _ = buffer.reset();
        let _ = writer.print(&buffer);
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if !self.quiet {
            self.tagged(&self.stdout, "ℹ", Color::Cyan, false, false, message);
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if !self.quiet {
            self.tagged(&self.stdout, "✓", Color::Green, true, false, message);
        }
    }

    /// Print a warning (shown in quiet mode too)
    pub fn warn(&self, message: &str) {
        self.tagged(&self.stdout, "⚠", Color::Yellow, true, true, message);
    }

    /// Print an error message to stderr (always shown)
    pub fn error(&self, message: &str) {
        self.tagged(&self.stderr, "✗", Color::Red, true, true, message);
    }

    /// Print a step of a longer operation
    pub fn progress(&self, message: &str) {
        if !self.quiet {
            self.tagged(&self.stdout, "⋯", Color::Magenta, false, false, message);
        }
    }

    /// Print a detail only shown with `--verbose`
    pub fn verbose(&self, message: &str) {
        if self.verbose && !self.quiet {
            self.tagged(&self.stdout, "→", Color::Blue, false, false, message);
        }
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        if self.quiet {
            return;
        }
        let mut buffer = self.stdout.buffer();
        let _ = writeln!(&mut buffer);
        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
        let _ = writeln!(&mut buffer, "═══ {} ═══", title);
        let _ = buffer.reset();
        let _ = self.stdout.print(&buffer);
    }

    /// Print indented text to stderr (for sub-items of an error)
    pub fn indent(&self, message: &str) {
        let mut buffer = self.stderr.buffer();
        let _ = writeln!(&mut buffer, "    {}", message);
        let _ = self.stderr.print(&buffer);
    }
}
