/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! modelsealctl - sign and verify model artifact sets from the command line.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use modelseal::metadata::{ModelDescriptor, TokenizerDescriptor};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;

use commands::sign::SignRequest;
use commands::verify::VerifyRequest;
use config::ConfigLoader;

/// Modelseal - keyless signing for model artifact sets
#[derive(Parser)]
#[command(name = "modelsealctl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (can also be set via MODELSEAL_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Persist and sign an artifact set
    Sign(SignArgs),

    /// Verify a signed artifact set
    Verify(VerifyArgs),

    /// Manage the offline signing authority
    Authority {
        #[command(subcommand)]
        command: AuthorityCommands,
    },
}

#[derive(Subcommand)]
enum AuthorityCommands {
    /// Generate a root keypair (root.key, root.pub)
    Init {
        /// Directory to write the keys into
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Args)]
struct SignArgs {
    /// Target directory for the artifact set
    #[arg(long)]
    dir: PathBuf,

    /// Artifact to persist and sign, as NAME=PATH (repeatable)
    #[arg(long = "file", value_name = "NAME=PATH")]
    files: Vec<String>,

    #[arg(long)]
    model_type: Option<String>,

    #[arg(long)]
    model_name: Option<String>,

    /// Free-form architecture description
    #[arg(long)]
    architecture: Option<String>,

    #[arg(long)]
    tokenizer_name: Option<String>,

    #[arg(long)]
    vocab_size: Option<u32>,

    /// Service-account credentials file
    #[arg(long)]
    credentials: Option<PathBuf>,

    /// Sign as this subject instead of loading credentials
    #[arg(long)]
    subject: Option<String>,

    /// Root private key of the offline authority
    #[arg(long, env = "MODELSEAL_AUTHORITY_KEY")]
    authority_key: Option<PathBuf>,

    /// Qualifying file extension (repeatable, replaces the configured set)
    #[arg(long = "extension", value_name = "EXT")]
    extensions: Vec<String>,

    /// Maximum concurrent signing calls
    #[arg(long)]
    max_concurrency: Option<usize>,
}

#[derive(Args)]
struct VerifyArgs {
    /// Directory of the signed artifact set
    #[arg(long)]
    dir: PathBuf,

    /// Root public key of the offline authority
    #[arg(long, env = "MODELSEAL_TRUST_ROOT")]
    trust_root: Option<PathBuf>,

    /// Report recorded files that are missing on disk as failures
    #[arg(long)]
    strict: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl From<SignArgs> for SignRequest {
    fn from(args: SignArgs) -> Self {
        Self {
            target_dir: args.dir,
            files: args.files,
            model: ModelDescriptor {
                model_type: args.model_type,
                model_name: args.model_name,
                architecture: args.architecture,
            },
            tokenizer: TokenizerDescriptor {
                tokenizer_name: args.tokenizer_name,
                vocab_size: args.vocab_size,
            },
            credentials: args.credentials,
            subject: args.subject,
            authority_key: args.authority_key,
            extensions: args.extensions,
            max_concurrency: args.max_concurrency,
        }
    }
}

impl From<VerifyArgs> for VerifyRequest {
    fn from(args: VerifyArgs) -> Self {
        Self {
            target_dir: args.dir,
            trust_root: args.trust_root,
            strict: args.strict,
            json: args.json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Authority { command } => match command {
            AuthorityCommands::Init { out } => commands::authority::init(&out)?,
        },
        Commands::Sign(args) => {
            let config = ConfigLoader::new()
                .load_config(cli.config.as_deref())
                .context("Failed to load configuration")?;
            commands::sign::run(args.into(), &config).await?;
        }
        Commands::Verify(args) => {
            let config = ConfigLoader::new()
                .load_config(cli.config.as_deref())
                .context("Failed to load configuration")?;
            commands::verify::run(args.into(), &config).await?;
        }
    }

    Ok(())
}
