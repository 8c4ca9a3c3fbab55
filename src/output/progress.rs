use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{failure, heading, highlight, success};

/// Progress of a one-shot discovery across every configured project.
pub struct DiscoveryProgress {
    pb: ProgressBar,
    failed: std::sync::atomic::AtomicUsize,
}

impl DiscoveryProgress {
    pub fn start(projects: usize) -> Self {
        eprintln!("⚙️  {}", heading("Discovery"));
        let pb = ProgressBar::new(projects as u64);
        pb.set_draw_target(ProgressDrawTarget::stderr());
        if let Ok(style) =
            ProgressStyle::default_bar().template("  {msg} [{bar:30.cyan/blue}] {pos}/{len}")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb.set_message(highlight("Reconciling project refs").to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Self {
            pb,
            failed: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn project_done(&self, succeeded: bool) {
        if !succeeded {
            self.failed
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
        self.pb.inc(1);
    }

    pub fn finish(self) {
        let failed = self.failed.into_inner();
        let message = if failed == 0 {
            success("Reconciled project refs ✓").to_string()
        } else {
            failure(format!("Reconciled project refs, {failed} failed ✗")).to_string()
        };
        self.pb.finish_with_message(message);
        eprintln!();
    }
}
