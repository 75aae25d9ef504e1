fn main() {
    use chapterlinks::cli::{Args, CliRunError};
    use clap::Parser;
    use std::error::Error;
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            // --help and --version print to stdout and succeed.
            let code = if e.use_stderr() {
                CliRunError::InvalidInput(e.to_string()).exit_code()
            } else {
                0
            };
            std::process::exit(code);
        }
    };
    chapterlinks::logging::init(if args.verbose { "debug" } else { "warn" });
    if let Err(e) = chapterlinks::cli::run(&args) {
        eprintln!("{}", e);
        if args.verbose {
            let mut source = e.source();
            while let Some(s) = source {
                eprintln!("  cause: {}", s);
                source = s.source();
            }
        }
        std::process::exit(e.exit_code());
    }
}
