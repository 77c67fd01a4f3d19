use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use qcjson::engine::progress::{Progress, ProgressCallback};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

#[derive(Default)]
struct BarState {
    failed: u64,
}

/// Renders pipeline progress on stderr: a spinner for the phases of a single
/// document, a bar for batches.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
    state: Arc<Mutex<BarState>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let pb = ProgressBar::new(0).with_style(Self::spinner_style());
        pb.set_draw_target(ProgressDrawTarget::stderr());
        pb.finish_and_clear();

        Self {
            pb: Arc::new(Mutex::new(pb)),
            state: Arc::new(Mutex::new(BarState::default())),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb = Arc::clone(&self.pb);
        let state = Arc::clone(&self.state);

        Box::new(move |progress: Progress| {
            let (Ok(pb), Ok(mut state)) = (pb.lock(), state.lock()) else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::PhaseStart(phase) => {
                    if pb.length().unwrap_or(0) > 0 && !pb.is_finished() {
                        // Inside a batch the bar already tracks documents.
                        return;
                    }
                    pb.reset();
                    pb.set_length(0);
                    pb.set_style(Self::spinner_style());
                    pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    pb.set_message(phase.label());
                }
                Progress::PhaseFinish(_) => {
                    if pb.length().unwrap_or(0) == 0 {
                        pb.disable_steady_tick();
                        pb.finish_and_clear();
                    }
                }
                Progress::BatchStart { documents } => {
                    state.failed = 0;
                    pb.disable_steady_tick();
                    pb.reset();
                    pb.set_length(documents);
                    pb.set_position(0);
                    pb.set_style(Self::bar_style());
                    pb.set_message("Running documents");
                }
                Progress::DocumentFinished { success } => {
                    if !success {
                        state.failed += 1;
                        pb.set_message(format!("{} failed", state.failed));
                    }
                    pb.inc(1);
                }
                Progress::BatchFinish => {
                    let total = pb.length().unwrap_or(0);
                    pb.set_position(total);
                    pb.finish_with_message(format!(
                        "✓ {} document(s), {} failed",
                        total, state.failed
                    ));
                }
                Progress::Message(msg) => {
                    pb.println(format!("  {}", msg));
                }
            }
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .expect("Failed to create spinner style template")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<20} [{bar:40.cyan/blue}] {pos}/{len} ({elapsed})")
            .expect("Failed to create bar style template")
            .progress_chars("##-")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcjson::engine::progress::Phase;
    use std::thread;

    #[test]
    fn handler_initializes_in_a_clean_state() {
        let handler = CliProgressHandler::new();
        let pb = handler.pb.lock().unwrap();
        assert_eq!(pb.length(), Some(0));
        assert!(pb.is_finished());
    }

    #[test]
    fn phases_drive_the_spinner() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::PhaseStart(Phase::Computing));
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.message(), Phase::Computing.label());
            assert!(!pb.is_finished());
        }

        callback(Progress::PhaseFinish(Phase::Computing));
        assert!(handler.pb.lock().unwrap().is_finished());
    }

    #[test]
    fn batch_events_drive_the_bar_and_count_failures() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::BatchStart { documents: 3 });
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.length(), Some(3));
            assert_eq!(pb.position(), 0);
        }

        callback(Progress::DocumentFinished { success: true });
        callback(Progress::DocumentFinished { success: false });
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.position(), 2);
            assert_eq!(pb.message(), "1 failed");
        }

        callback(Progress::BatchFinish);
        let pb = handler.pb.lock().unwrap();
        assert!(pb.is_finished());
        assert_eq!(pb.position(), 3);
        assert_eq!(pb.message(), "✓ 3 document(s), 1 failed");
    }

    #[test]
    fn callback_is_thread_safe() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        thread::spawn(move || {
            callback(Progress::BatchStart { documents: 1 });
            callback(Progress::DocumentFinished { success: true });
            callback(Progress::BatchFinish);
        })
        .join()
        .unwrap();

        let pb = handler.pb.lock().unwrap();
        assert!(pb.is_finished());
        assert_eq!(pb.position(), 1);
    }
}
