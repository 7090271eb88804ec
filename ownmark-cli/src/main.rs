//! Ownmark CLI - ownership claims for watermarked media.

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgGroup, Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod exit_codes;
mod utils;

use exit_codes::ExitCode;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success
  1   General error
  64  Invalid arguments
  65  Not verified, or anchor failed
  66  Cannot read input file
  69  Service unavailable (extraction, registry, explorer)
  74  I/O error";

#[derive(Parser)]
#[command(name = "ownmark")]
#[command(author, version, about = "Ownership claims for watermarked media", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Enable debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only print the essential result
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Base URL of the extraction and registry API (env: OWNMARK_API_BASE)
    #[arg(long, global = true, value_name = "URL")]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the SHA-256 digest of an email, a file or a text
    #[command(group(ArgGroup::new("input").required(true).args(["email", "file", "text"])))]
    Digest {
        /// Email address (trimmed and lowercased before hashing)
        #[arg(long)]
        email: Option<String>,

        /// File whose bytes are hashed
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,

        /// Text hashed as-is
        #[arg(long)]
        text: Option<String>,
    },

    /// Print the canonical claim (check text) for an owner
    Claim {
        /// Owner email, 64-hex owner digest, or a full `owner:` claim
        #[arg(value_name = "OWNER")]
        owner: String,

        /// Media id (64 hex, or legacy 32 hex)
        #[arg(long, value_name = "ID")]
        media_id: Option<String>,
    },

    /// Embed an owner/media claim into an image or video
    Embed {
        /// Image or video to watermark
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Owner email or 64-hex owner digest
        #[arg(long)]
        owner: String,

        /// Media id to embed (generated when omitted)
        #[arg(long, value_name = "ID")]
        media_id: Option<String>,

        /// Where to write the watermarked file (default: <stem>_wm.png|mp4)
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Embedding preset: original, facebook, whatsapp, instagram, x_twitter
        #[arg(long, default_value = "facebook")]
        preset: String,

        /// Treat the file as video (detected from the extension otherwise)
        #[arg(long)]
        video: bool,

        /// Override the preset repetition factor
        #[arg(long)]
        repetition: Option<u32>,

        /// Override the preset ECC parity byte count
        #[arg(long)]
        ecc_parity: Option<u32>,

        /// Override the preset QIM step
        #[arg(long)]
        qim_step: Option<f64>,

        /// Override the preset video frame step
        #[arg(long)]
        frame_step: Option<u32>,

        /// Disable Y-channel (luma) embedding
        #[arg(long)]
        no_y_channel: bool,

        /// Extract from the output right away with the reported parameters
        #[arg(long)]
        verify: bool,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract the watermark from a file and check it against a claim
    Verify {
        /// Image or video to check
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Claimed owner: email, 64-hex digest, or full claim text
        #[arg(long)]
        claim: String,

        /// Media id appended to the claim when it has none
        #[arg(long, value_name = "ID")]
        media_id: Option<String>,

        /// Extraction preset: original, facebook, whatsapp, instagram, x_twitter
        #[arg(long, default_value = "facebook")]
        preset: String,

        /// Treat the file as video (detected from the extension otherwise)
        #[arg(long)]
        video: bool,

        /// Override the preset repetition factor
        #[arg(long)]
        repetition: Option<u32>,

        /// Override the preset ECC parity byte count
        #[arg(long)]
        ecc_parity: Option<u32>,

        /// Override the preset QIM step
        #[arg(long)]
        qim_step: Option<f64>,

        /// Override the preset video frame step
        #[arg(long)]
        frame_step: Option<u32>,

        /// Disable Y-channel (luma) embedding
        #[arg(long)]
        no_y_channel: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Anchor an owner/media binding on the ledger
    Anchor {
        /// Owner email or 64-hex owner digest
        #[arg(long)]
        owner: String,

        /// Media id (64 hex, or legacy 32 hex)
        #[arg(long, value_name = "ID")]
        media_id: String,

        /// The watermarked file; its SHA-256 is anchored
        #[arg(long, value_name = "FILE")]
        file: PathBuf,

        /// Content locator of the file (IPFS CID)
        #[arg(long, value_name = "CID")]
        ipfs_cid: Option<String>,

        /// Follow the transaction until it is final
        #[arg(long)]
        track: bool,

        /// Seconds between status queries when tracking
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },

    /// Follow a submitted anchor transaction until it is final
    Track {
        /// Transaction hash (with or without 0x)
        #[arg(value_name = "TX_HASH")]
        tx_hash: String,

        /// Block number reported at submission
        #[arg(long)]
        block: Option<u64>,

        /// Seconds between status queries
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,

        /// Use a simulated ledger that confirms after N pending answers
        #[arg(long, value_name = "PENDING")]
        mock: Option<usize>,
    },

    /// Look up what the ledger holds for a media id or an exact file
    #[command(group(ArgGroup::new("target").required(true).args(["media_id", "file"])))]
    Lookup {
        /// Media id (64 hex, or legacy 32 hex)
        #[arg(value_name = "MEDIA_ID")]
        media_id: Option<String>,

        /// Look up the exact file by its SHA-256 instead
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,

        /// Check that the entry names this owner (email or 64-hex digest)
        #[arg(long)]
        owner: Option<String>,

        /// Print the entry as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("ownmark_core=debug,ownmark=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let ctx = config::GlobalOpts {
        quiet: cli.quiet,
        api_base: cli.api_base,
    };

    match cli.command {
        Commands::Digest { email, file, text } => commands::digest::execute(email, file, text),
        Commands::Claim { owner, media_id } => commands::claim::execute(&ctx, owner, media_id),
        Commands::Embed {
            file,
            owner,
            media_id,
            out,
            preset,
            video,
            repetition,
            ecc_parity,
            qim_step,
            frame_step,
            no_y_channel,
            verify,
            json,
        } => {
            let args = commands::embed::EmbedArgs {
                file,
                owner,
                media_id,
                out,
                preset,
                video,
                overrides: config::ParamOverrides {
                    repetition,
                    ecc_parity,
                    qim_step,
                    frame_step,
                    no_y_channel,
                },
                verify,
                json,
            };
            commands::embed::execute(&ctx, args).await
        }
        Commands::Verify {
            file,
            claim,
            media_id,
            preset,
            video,
            repetition,
            ecc_parity,
            qim_step,
            frame_step,
            no_y_channel,
            json,
        } => {
            let args = commands::verify::VerifyArgs {
                file,
                claim,
                media_id,
                preset,
                video,
                overrides: config::ParamOverrides {
                    repetition,
                    ecc_parity,
                    qim_step,
                    frame_step,
                    no_y_channel,
                },
                json,
            };
            commands::verify::execute(&ctx, args).await
        }
        Commands::Anchor {
            owner,
            media_id,
            file,
            ipfs_cid,
            track,
            interval,
        } => {
            commands::anchor::execute(&ctx, owner, media_id, file, ipfs_cid, track, interval).await
        }
        Commands::Track {
            tx_hash,
            block,
            interval,
            mock,
        } => commands::track::execute(&ctx, tx_hash, block, interval, mock).await,
        Commands::Lookup {
            media_id,
            file,
            owner,
            json,
        } => commands::lookup::execute(&ctx, media_id, file, owner, json).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        let exit = ExitCode::from_anyhow(&err);
        if let Some(message) = &exit.message {
            eprintln!("{} {}", "error:".red().bold(), message);
        }
        std::process::exit(exit.code);
    }
}
