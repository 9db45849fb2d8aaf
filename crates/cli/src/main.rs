use std::process::ExitCode;

fn main() -> ExitCode {
    waiter_cli::run()
}
