#![allow(unused)]

use crate::prelude::*;
use clap::Parser;

mod ad;
mod error;
mod fetch;
mod inspect;
mod prelude;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Turn vehicle window sticker PDFs into Facebook ads"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Whether to display additional information.
    #[clap(long, env = "STICKERBOT_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Build a Facebook ad from a window sticker PDF
    Ad(crate::ad::App),

    /// Dump what the parser sees in a sticker PDF as JSON
    Inspect(crate::inspect::App),

    /// Download a window sticker PDF by VIN
    Fetch(crate::fetch::App),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Ad(sub_app) => crate::ad::run(sub_app, app.global).await,
        SubCommands::Inspect(sub_app) => crate::inspect::run(sub_app, app.global).await,
        SubCommands::Fetch(sub_app) => crate::fetch::run(sub_app, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
