use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = venvtap::cli::Cli::parse();
    venvtap::util::logging::init(cli.verbose);
    cli.run()
}
