use clap::Parser;
use kernel_info::platform::Platform;
use log::{LevelFilter, error, info};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use translation_table_tool::{Config, Status, ToolLogger, run};

/// Precompute the kernel's translation tables and patch them into the kernel ELF.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Target board (`rpi3` or `rpi4`).
    platform: Platform,

    /// Kernel ELF to patch in place.
    kernel_elf: PathBuf,

    /// Log level (`off`, `error`, `warn`, `info`, `debug`, `trace`).
    #[arg(long, env = "TT_TOOL_LOG", default_value = "info")]
    log_level: LevelFilter,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = ToolLogger::new(cli.log_level).init() {
        eprintln!("failed to install logger: {e}");
        return ExitCode::FAILURE;
    }

    let start = Instant::now();
    let config = Config {
        platform: cli.platform,
        kernel_elf: cli.kernel_elf,
    };

    match run(&config) {
        Ok(_) => {
            info!(
                "{} in {:.2}s",
                Status("Finished"),
                start.elapsed().as_secs_f64()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            let mut message = e.to_string();
            let mut source = e.source();
            while let Some(cause) = source {
                message.push_str(": ");
                message.push_str(&cause.to_string());
                source = cause.source();
            }
            error!("{}: {message}", config.kernel_elf.display());
            ExitCode::FAILURE
        }
    }
}
