//! The `mjc` executable.

use std::process::ExitCode;

use mjc_driver::Mjc;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();
    match Mjc::run(std::env::args_os()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // stage errors arrive pre-rendered as `error: file:pos: message`
            eprintln!("{err}");
            log::debug!(target: "driver", "compilation failed");
            ExitCode::FAILURE
        }
    }
}
