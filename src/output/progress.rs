use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright, bright_green, bright_yellow};

/// Progress tracking for multi-phase operations
pub struct PhaseProgress {
    pb: ProgressBar,
    current: usize,
    total: usize,
}

impl PhaseProgress {
    pub fn start(total: usize, message: &str) -> Self {
        eprintln!("{}  {}", bright("⚙️"), bright("Phases").underlined());
        let pb = create_spinner(bright_yellow(format!("Phase 1/{total}: {message}")).to_string());
        Self {
            pb,
            current: 1,
            total,
        }
    }

    pub fn advance(self, done_message: &str, next_message: &str) -> Self {
        let total = self.total;
        self.pb.finish_with_message(
            bright_green(format!("Phase {}/{total}: {done_message} ✓", self.current)).to_string(),
        );
        let current = self.current + 1;
        let pb =
            create_spinner(bright_yellow(format!("Phase {current}/{total}: {next_message}")).to_string());
        Self { pb, current, total }
    }

    pub fn finish(self, message: &str) {
        self.pb.finish_with_message(
            bright_green(format!("Phase {}/{}: {message} ✓", self.current, self.total)).to_string(),
        );
        eprintln!("\n");
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {msg} {spinner}")
            .unwrap(),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
