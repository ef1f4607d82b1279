//! Progress bar utilities for recording processing.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a progress bar for processing multiple recordings.
pub fn create_recording_progress(total_recordings: usize, enabled: bool) -> Option<ProgressBar> {
    if !enabled || total_recordings == 0 {
        return None;
    }

    let pb = ProgressBar::new(total_recordings as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} recordings ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );
    Some(pb)
}

/// Create a progress bar for the frames of one recording.
///
/// Falls back to a spinner when the frame count is unknown.
pub fn create_frame_progress(
    total_frames: Option<usize>,
    recording: &str,
    enabled: bool,
) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }

    let pb = match total_frames {
        Some(0) => return None,
        Some(total) => {
            let pb = ProgressBar::new(total as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(&format!(
                        "{{spinner:.green}} [{{elapsed_precise}}] {{bar:40.cyan/blue}} {{pos}}/{{len}} frames - {recording}"
                    ))
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("█▓▒░ "),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template(&format!(
                        "{{spinner:.green}} [{{elapsed_precise}}] {{pos}} frames - {recording}"
                    ))
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb
        }
    };
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Finish a progress bar with a message.
pub fn finish_progress(pb: Option<ProgressBar>, message: &str) {
    if let Some(pb) = pb {
        pb.finish_with_message(message.to_string());
    }
}

/// Finish a progress bar and remove it from the terminal.
pub fn clear_progress(pb: Option<&ProgressBar>) {
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
}

/// Increment a progress bar.
pub fn inc_progress(pb: Option<&ProgressBar>) {
    if let Some(pb) = pb {
        pb.inc(1);
    }
}
