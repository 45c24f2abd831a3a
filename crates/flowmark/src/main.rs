use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = flowmark::cli::Cli::parse();
    flowmark::cli::run(cli)
}
