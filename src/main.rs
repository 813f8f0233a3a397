// Copyright 2025 dentsusoken
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

use clap::{Parser, Subcommand};
use lockpool::commands::AcquireArgs;
use lockpool::commands::path::PathCommand;
use lockpool::commands::pool::PoolCommand;
use lockpool::commands::run::RunCommand;
use lockpool::commands::status::StatusCommand;
use lockpool::config::LockConfig;
use lockpool::error::{Result, format_error_chain, get_exit_code};
use lockpool::logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lockpool")]
#[command(author, version, about = "Cross-process named file locks", long_about = None)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (defaults to the per-user config location)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Directory holding the lock files
    #[arg(long, value_name = "DIR", global = true)]
    lock_dir: Option<PathBuf>,

    /// Prefix for lock file names
    #[arg(long, value_name = "PREFIX", global = true)]
    prefix: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the lock file path for an identity
    Path { identity: String },

    /// Run a command while holding a named lock
    Run {
        /// Name of the resource to lock
        identity: String,

        #[command(flatten)]
        acquire: AcquireArgs,

        /// Command to run, after `--`
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Run a command while holding the first free slot of a pool
    Pool {
        /// Slot identity, in scan order (repeatable)
        #[arg(long = "slot", value_name = "IDENTITY", required = true)]
        slots: Vec<String>,

        #[command(flatten)]
        acquire: AcquireArgs,

        /// Command to run, after `--`
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Show whether identities are currently locked
    Status {
        /// Identities to check
        #[arg(required = true)]
        identities: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn load_config(cli: &Cli) -> Result<LockConfig> {
    let mut config = match cli.config.clone().or_else(LockConfig::default_path) {
        Some(path) => LockConfig::load(&path)?,
        None => LockConfig::default(),
    };

    if let Some(lock_dir) = &cli.lock_dir {
        config = config.with_lock_dir(lock_dir);
    }
    if let Some(prefix) = &cli.prefix {
        config = config.with_prefix(prefix);
    }

    config.validate()?;
    Ok(config)
}

fn main() {
    let cli = Cli::parse();

    logging::setup_logger(cli.verbose);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format_error_chain(&e));
            std::process::exit(get_exit_code(&e));
        }
    };

    let result: Result<i32> = (|| match &cli.command {
        Commands::Path { identity } => {
            let command = PathCommand::new(&config)?;
            command.execute(identity).map(|_| 0)
        }
        Commands::Run {
            identity,
            acquire,
            command,
        } => {
            let run = RunCommand::new(&config)?;
            run.execute(identity, acquire, command)
        }
        Commands::Pool {
            slots,
            acquire,
            command,
        } => {
            let pool = PoolCommand::new(&config)?;
            pool.execute(slots, acquire, command)
        }
        Commands::Status { identities, json } => {
            let command = StatusCommand::new(&config)?;
            command.execute(identities, *json).map(|_| 0)
        }
    })();

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}", format_error_chain(&e));
            std::process::exit(get_exit_code(&e));
        }
    }
}
