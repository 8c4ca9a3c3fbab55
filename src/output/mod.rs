mod progress;
mod styling;
mod summary;
mod tables;

pub use progress::DiscoveryProgress;
pub use styling::{muted, title};
pub use summary::{print_summary, render_summary};

/// Prints the `refscout` banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        title("🔭 refscout"),
        muted(env!("CARGO_PKG_VERSION")),
        muted("GitLab ref discovery")
    );
}
