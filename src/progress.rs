use indicatif::{ProgressBar, ProgressStyle};
use std::borrow::Cow;
use std::time::Duration;

const TICK: Duration = Duration::from_millis(200);

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("\x1b[33m{spinner}\x1b[0m {wide_msg}")
        .unwrap()
        .tick_strings(&["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"])
}

fn ok_style() -> ProgressStyle {
    ProgressStyle::with_template("\x1b[32m✔\x1b[0m {wide_msg}").unwrap()
}

fn err_style() -> ProgressStyle {
    ProgressStyle::with_template("\x1b[31m✘\x1b[0m {wide_msg}").unwrap()
}

/// Start a steadily ticking spinner showing `msg`.
pub fn spinner(msg: impl Into<Cow<'static, str>>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style());
    pb.enable_steady_tick(TICK);
    pb.set_message(msg);
    pb
}

/// Replace the spinner with a green check and `msg`.
pub fn finish_ok(pb: &ProgressBar, msg: impl Into<Cow<'static, str>>) {
    pb.set_style(ok_style());
    pb.finish_with_message(msg);
}

/// Replace the spinner with a red cross and `msg`.
pub fn finish_err(pb: &ProgressBar, msg: impl Into<Cow<'static, str>>) {
    pb.set_style(err_style());
    pb.finish_with_message(msg);
}
