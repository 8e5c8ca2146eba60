use std::process::ExitCode;

fn main() -> ExitCode {
    geminiweb::cli::main()
}
