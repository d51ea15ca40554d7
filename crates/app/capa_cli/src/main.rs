// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use clap::Parser;
use cli::{Cli, Commands};

mod cli;
mod commands;
mod logging;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = run().await {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init()?;

    let args = Cli::parse();

    match &args.command {
        Commands::Decode { schema } => commands::decode(schema)?,
        Commands::Encode { params } => commands::encode(params)?,
        Commands::Preview { capability, method } => commands::preview(capability, *method)?,
        Commands::Compile { capability, args } => commands::compile(capability, args.as_ref())?,
        Commands::Collect { capability, input } => commands::collect_input(capability, input)?,
        Commands::Defaults { capability } => commands::defaults(capability)?,
        Commands::Tool { capabilities } => commands::tool(capabilities)?,
        Commands::Call { capability, args } => commands::call(capability, args.as_ref())?,
        Commands::Test {
            id,
            input,
            api_url,
            token,
        } => commands::test(id, input.as_ref(), api_url.clone(), token.clone()).await?,
        Commands::Version => {
            println!(
                "{} {} (capa_core {}, capa_mcp {})",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                capa_core::version(),
                capa_mcp::version()
            );
        }
    }

    Ok(())
}
