//! Spinner and end-of-run summary for CLI downloads.

use std::sync::Arc;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::format::{format_duration, plural};
use crate::stats::{RunReport, RunState};

const TICK: Duration = Duration::from_millis(350);

/// Creates the "Files completed" spinner.
pub fn make_spinner() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("Files completed: {msg} {spinner}")
            .expect("spinner template is valid")
            .tick_strings(&["\\", "|", "/", "-", " "]),
    );
    bar.set_message("0");
    bar
}

/// Polls the run's file counter until `stop` is cancelled.
pub fn spawn_spinner(state: Arc<RunState>, stop: CancellationToken) -> JoinHandle<()> {
    let bar = make_spinner();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(TICK);
        loop {
            tokio::select! {
                () = stop.cancelled() => break,
                _ = ticker.tick() => {
                    bar.set_message(state.files_downloaded().to_string());
                    bar.tick();
                }
            }
        }
        bar.set_message(state.files_downloaded().to_string());
        bar.finish();
    })
}

fn failure_header(count: usize) -> String {
    format!(
        "{count} {} not downloaded (permissions issue or corrupt):",
        plural(count, "file or directory was", "files or directories were")
    )
}

/// Prints enumerated failures, elapsed time and the completion line.
pub fn print_summary(report: &RunReport, app: &str) {
    let failures = report.failures.len();
    if failures > 0 {
        println!("\n{}", failure_header(failures));
        for (index, failure) in report.failures.iter().enumerate() {
            println!("{}", style(format!("{}: {failure}", index + 1)).yellow());
        }
        println!("\nTo skip these next time, pass them to --omit \"path1;path2\" or list them in .cfignore.");
    }

    println!("\nDownload time: {}", format_duration(report.elapsed));

    if report.cancelled {
        let done = usize::try_from(report.files_downloaded).unwrap_or(usize::MAX);
        println!(
            "{}",
            style(format!(
                "{app} download interrupted after {done} {}",
                plural(done, "file", "files")
            ))
            .yellow()
            .bold()
        );
    } else {
        println!("{}", style(format!("{app} Successfully Downloaded!")).green().bold());
    }
}
