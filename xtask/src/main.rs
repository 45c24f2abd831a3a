use std::fs;
use std::process::Command;

use anyhow::{Context, Result, bail};
use cargo_metadata::MetadataCommand;
use clap::{Parser, Subcommand};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(author, version, about = "Project automation commands", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run cargo nextest with default configuration
    Nextest {
        #[arg(long)]
        profile: Option<String>,
        #[arg(long)]
        release: bool,
        /// Limit the run to one package
        #[arg(long, short)]
        package: Option<String>,
    },
    /// Run the test suite through cargo-insta and review pending snapshots
    Snapshots {
        #[arg(long)]
        accept: bool,
    },
    /// Parse every bundled TOML asset
    CheckAssets,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Nextest {
            profile,
            release,
            package,
        } => run_nextest(profile, release, package)?,
        Commands::Snapshots { accept } => run_snapshots(accept)?,
        Commands::CheckAssets => check_assets()?,
    }
    Ok(())
}

fn run_nextest(profile: Option<String>, release: bool, package: Option<String>) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("nextest").arg("run");
    if let Some(profile) = profile {
        cmd.arg("--profile").arg(profile);
    }
    if let Some(package) = package {
        cmd.arg("--package").arg(package);
    }
    if release {
        cmd.arg("--release");
    }
    let status = cmd.status()?;
    if !status.success() {
        bail!("cargo nextest run failed");
    }
    Ok(())
}

fn run_snapshots(accept: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.args(["insta", "test", "--package", "flowmark"]);
    if accept {
        cmd.arg("--accept");
    } else {
        cmd.arg("--review");
    }
    let status = cmd
        .status()
        .context("failed to run cargo insta; install it with `cargo install cargo-insta`")?;
    if !status.success() {
        bail!("cargo insta test failed");
    }
    Ok(())
}

fn check_assets() -> Result<()> {
    let metadata = MetadataCommand::new()
        .no_deps()
        .exec()
        .context("failed to read cargo metadata")?;
    let crates_dir = metadata.workspace_root.join("crates");

    let mut checked = 0;
    for entry in WalkDir::new(&crates_dir) {
        let entry = entry?;
        let path = entry.path();
        let is_asset = path
            .parent()
            .and_then(|dir| dir.file_name())
            .is_some_and(|name| name == "assets");
        if !is_asset || path.extension().is_none_or(|ext| ext != "toml") {
            continue;
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str::<toml::Table>(&contents)
            .with_context(|| format!("invalid TOML in {}", path.display()))?;
        println!("ok  {}", path.display());
        checked += 1;
    }

    if checked == 0 {
        bail!("no TOML assets found under {crates_dir}");
    }
    Ok(())
}
