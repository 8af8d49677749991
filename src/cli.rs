use std::net::IpAddr;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "colgen", about = "LLM-backed column generation service", version)]
pub struct Cli {
    /// Address to bind.
    #[arg(long)]
    pub host: Option<IpAddr>,

    /// Port to bind.
    #[arg(long)]
    pub port: Option<u16>,

    /// Run in mock mode: deterministic results, no upstream calls.
    #[arg(long)]
    pub mock: bool,
}
