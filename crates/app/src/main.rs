use std::process::ExitCode;

fn main() -> ExitCode {
    herdbook_observability::init();

    let root = match std::env::current_dir() {
        Ok(root) => root,
        Err(e) => {
            tracing::error!(error = %e, "cannot determine working directory");
            return ExitCode::FAILURE;
        }
    };

    match herdbook_app::run(&root) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "herdbook failed");
            eprintln!("herdbook: {e:#}");
            ExitCode::FAILURE
        }
    }
}
