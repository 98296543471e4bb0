use std::panic;
use std::process;

use color_eyre::config::HookBuilder;
use color_eyre::eyre::Result;

/// Installs the eyre report hook and a panic hook that logs the report
/// before exiting.
///
/// Release builds also write a `human-panic` crash dump; debug builds print a
/// full `better-panic` backtrace instead.
pub fn initialize_panic_handler() -> Result<()> {
    let (panic_hook, eyre_hook) = HookBuilder::default()
        .panic_section(format!(
            "This is a bug in {} {}. Please report it with the log file from the data directory.",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ))
        .capture_span_trace_by_default(false)
        .display_location_section(false)
        .display_env_section(false)
        .into_hooks();
    eyre_hook.install()?;

    panic::set_hook(Box::new(move |panic_info| {
        let report = panic_hook.panic_report(panic_info).to_string();

        #[cfg(not(debug_assertions))]
        {
            use human_panic::{handle_dump, print_msg, Metadata};

            let meta = Metadata::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
                .authors(env!("CARGO_PKG_AUTHORS").replace(':', ", "));
            let dump_path = handle_dump(&meta, panic_info);
            if let Err(e) = print_msg(dump_path, &meta) {
                eprintln!("human-panic: printing error message to console failed: {e}");
            }
            eprintln!("{report}");
        }

        log_panic_report(&report);

        #[cfg(debug_assertions)]
        better_panic::Settings::auto()
            .most_recent_first(false)
            .lineno_suffix(true)
            .verbosity(better_panic::Verbosity::Full)
            .create_panic_handler()(panic_info);

        process::exit(libc::EXIT_FAILURE);
    }));
    Ok(())
}

/// The log file is plain text, so the colored report is stripped first
fn log_panic_report(report: &str) {
    tracing::error!("Panic: {}", strip_ansi_escapes::strip_str(report));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_panic_report_accepts_colored_text() {
        // No subscriber installed, this only has to not panic itself
        log_panic_report("\u{1b}[31mboom\u{1b}[0m");
        assert_eq!(strip_ansi_escapes::strip_str("\u{1b}[31mboom\u{1b}[0m"), "boom");
    }
}
