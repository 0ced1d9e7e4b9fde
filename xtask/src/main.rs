// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


// Bundle packaging tasks for KBundle
// Run with: cargo xtask <command>

mod commands;
mod helpers;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::bundles::{self, BundleCommands};
use helpers::print_error;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Packaging automation for asset bundles", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Asset bundle operations
    #[command(subcommand)]
    Bundles(BundleCommands),
}

fn main() {
    let cli = Cli::parse();

    use env_logger::{Builder, Env};
    let default_filter = if cli.verbose { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    if let Err(e) = run(cli.command) {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Bundles(command) => bundles::run(command),
    }
}
