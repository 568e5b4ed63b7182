use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Bind address (overrides HYPERDASH_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port (overrides HYPERDASH_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}
