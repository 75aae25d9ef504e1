use anyhow::Result;
use chapterlinks::server::{run_server, ServeArgs, ServerConfig};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = ServeArgs::parse();
    chapterlinks::logging::init(if args.verbose { "debug" } else { "info" });
    let config = chapterlinks::config::load_config().map_err(anyhow::Error::msg)?;
    let server_config = ServerConfig::resolve(&args, config.as_ref())?;
    run_server(server_config).await
}
