use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[arg(long, default_value = "serve")]
    pub mode: Mode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Run migrations, then serve the HTTP API.
    Serve,
    /// Run migrations and exit.
    Migrate,
}

impl Mode {
    pub fn run_api(self) -> bool {
        matches!(self, Mode::Serve)
    }
}
