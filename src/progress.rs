//! Progress bars for the download and extraction phases.
//!
//! Bars are created by the caller and handed to each phase, so the counters
//! live exactly as long as the phase that advances them.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const BYTES_TEMPLATE: &str =
    "{percent:>3}% [{elapsed_precise}] [{bar:40}] {bytes}/{total_bytes} ({eta})";
const ENTRIES_TEMPLATE: &str = "{percent:>3}% [{elapsed_precise}] [{bar:40}] {pos}/{len} entries";
const PROGRESS_CHARS: &str = "#>-";

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars(PROGRESS_CHARS)
}

fn bar(len: u64, visible: bool) -> ProgressBar {
    let target = if visible {
        ProgressDrawTarget::stdout()
    } else {
        ProgressDrawTarget::hidden()
    };
    ProgressBar::with_draw_target(Some(len), target)
}

/// Bar tracking bytes written out of the declared total.
pub fn download_bar(visible: bool) -> ProgressBar {
    let pb = bar(0, visible);
    pb.set_style(style(BYTES_TEMPLATE));
    pb
}

/// Bar tracking archive entries extracted out of the entry count.
pub fn extract_bar(visible: bool) -> ProgressBar {
    let pb = bar(0, visible);
    pb.set_style(style(ENTRIES_TEMPLATE));
    pb
}
