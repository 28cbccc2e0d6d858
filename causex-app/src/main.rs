mod app;
mod cli;
mod logging;

use anyhow::Result;
use clap::Parser;

use crate::app::App;
use crate::cli::Args;

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_logging(args.verbose);

    let app = App::new(&args)?;
    app.run()
}
