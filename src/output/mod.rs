mod progress;
mod styling;

pub use progress::PhaseProgress;
pub use styling::{dim, magenta_bold};

/// Prints the buildwatch banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("📡 buildwatch"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("CI Build Status Aggregator")
    );
}
