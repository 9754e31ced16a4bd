use clap::Parser;
use rulegraph::{
    cli::{self, Args},
    core::{AppError, DefaultErrorReporter, ErrorReporter},
    logging,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();

    // Keep the guard alive so the file writer flushes on exit.
    let _logging_guard = match logging::init(&args.command) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("[WARNING] logging disabled: {err:#}");
            None
        }
    };

    match cli::run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let reporter = DefaultErrorReporter::new();
            match err.downcast::<AppError>() {
                Ok(app_error) => reporter.report_error(&app_error),
                Err(other) => reporter.report_error(&AppError::from(other)),
            }
            ExitCode::FAILURE
        }
    }
}
