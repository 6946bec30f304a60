/// Abstraction over user-facing output.
///
/// Command modules use this trait instead of `println!`/`eprintln!` so that
/// tests can capture what a command printed.
pub trait UserOutput: Send + Sync {
    /// Informational status message (e.g., "Watching 2 services...")
    fn status(&self, message: &str);

    /// Success message (e.g., "Start of 'api' succeeded")
    fn success(&self, message: &str);

    /// Warning message (e.g., "Missed 3 status changes")
    fn warning(&self, message: &str);

    /// Error message (e.g., "Failed to stop 'api': ...")
    fn error(&self, message: &str);

    /// A blank line separator.
    fn blank(&self);
}

/// Standard CLI output: writes to stdout/stderr with ANSI colors.
pub struct CliOutput;

impl UserOutput for CliOutput {
    fn status(&self, message: &str) {
        println!("{}", message);
    }

    fn success(&self, message: &str) {
        println!("{}", message);
    }

    fn warning(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn error(&self, message: &str) {
        eprintln!("\x1b[31m{}\x1b[0m", message);
    }

    fn blank(&self) {
        println!();
    }
}
