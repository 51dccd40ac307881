use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress bar over one batch; every method is a no-op when disabled.
pub struct ProgressReporter {
    bar: Option<ProgressBar>,
    enabled: bool,
}

impl ProgressReporter {
    pub fn new(enabled: bool) -> Self {
        Self { bar: None, enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn start_validation(&self, total_urls: usize) {
        if let Some(ref bar) = self.bar {
            bar.set_length(total_urls as u64);
            bar.set_position(0);
            bar.enable_steady_tick(Duration::from_millis(120));
        }
    }

    pub fn update(&self, current: usize) {
        if let Some(ref bar) = self.bar {
            bar.set_position(current as u64);
        }
    }

    pub fn finish_validation(&self, success_count: usize, total_count: usize) {
        if let Some(ref bar) = self.bar {
            let message = if success_count == total_count {
                "✓ All URLs valid".to_string()
            } else {
                format!("✓ Validation complete ({success_count}/{total_count} valid)")
            };
            bar.finish_with_message(message);
        }
    }

    pub fn finish_and_clear(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }

    /// Attach the bar; separate from `new` so disabled reporters never touch
    /// the terminal
    pub fn with_bar(mut self) -> Self {
        if !self.enabled {
            return self;
        }

        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.yellow/red}] {pos}/{len} URLs validated {msg}",
        ) {
            bar.set_style(style.progress_chars("#>-"));
        }
        self.bar = Some(bar);
        self
    }
}
