//! Track command - follow an anchor transaction until it is final.

use std::sync::Arc;

use anyhow::{bail, Result};
use colored::Colorize;
use ownmark_core::service::{ExplorerStatusClient, LedgerStatusSource, MockLedgerStatus};
use ownmark_core::{AnchorEvent, AnchorHandle, AnchorRecord, AnchorStatus, AnchorTracker};
use tracing::{info, warn};

use crate::config::GlobalOpts;

/// Execute the track command.
pub async fn execute(
    ctx: &GlobalOpts,
    tx_hash: String,
    block: Option<u64>,
    interval: Option<u64>,
    mock: Option<usize>,
) -> Result<()> {
    let source: Arc<dyn LedgerStatusSource> = match mock {
        Some(pending) => {
            if !ctx.quiet {
                println!(
                    "{}",
                    "⚠️  Using simulated ledger (not a real explorer)".yellow()
                );
            }
            Arc::new(MockLedgerStatus::confirm_after(pending))
        }
        None => Arc::new(ExplorerStatusClient::with_config(ctx.explorer_config())?),
    };

    let tracker = AnchorTracker::new(source, ctx.tracker_config(interval));
    let handle = tracker.start(&tx_hash, block)?;
    follow(ctx, handle).await
}

/// Print poll events until the record is final or the user presses Ctrl-C.
///
/// A failed transaction is an error so the process exits non-zero.
pub async fn follow(ctx: &GlobalOpts, mut handle: AnchorHandle) -> Result<()> {
    let explorer_base = ctx.explorer_config().explorer_base;
    let record = handle.record();
    if !ctx.quiet {
        println!(
            "{}",
            format!("⏳ Tracking {} ({})", record.tx_hash.short(), record.status).dimmed()
        );
        println!("   {} {}", "Explorer:".dimmed(), record.explorer_url(&explorer_base));
    }

    let mut ticks = 0u32;
    loop {
        let interrupted = tokio::select! {
            _ = tokio::signal::ctrl_c() => true,
            event = handle.next_event() => match event {
                Some(AnchorEvent::Status(status)) => {
                    ticks += 1;
                    if !ctx.quiet && !status.is_terminal() {
                        println!("   {} {}", format!("[{ticks}]").dimmed(), status);
                    }
                    false
                }
                Some(AnchorEvent::TransportError(message)) => {
                    ticks += 1;
                    if !ctx.quiet {
                        println!(
                            "   {} {}",
                            format!("[{ticks}]").dimmed(),
                            format!("query failed, retrying: {message}").yellow()
                        );
                    }
                    false
                }
                None => break,
            },
        };

        if interrupted {
            let record = handle.cancel().await;
            warn!(tx_hash = %record.tx_hash, status = %record.status, "Tracking cancelled");
            if !ctx.quiet {
                println!("{}", format!("✋ Cancelled, last status: {}", record.status).yellow());
            }
            return Ok(());
        }
    }

    report_final(ctx, &handle.record(), &explorer_base)
}

fn report_final(ctx: &GlobalOpts, record: &AnchorRecord, explorer_base: &str) -> Result<()> {
    match record.status {
        AnchorStatus::Confirmed => {
            info!(tx_hash = %record.tx_hash, block_number = ?record.block_number, "Anchor confirmed");
            if ctx.quiet {
                println!("{}", record.status);
            } else {
                println!();
                println!("   {}", "✅ Anchor confirmed".green().bold());
                if let Some(block) = record.block_number {
                    println!("   {} {}", "Block:".dimmed(), block);
                }
                println!("   {} {}", "Transaction:".dimmed(), record.tx_hash);
                println!("   {} {}", "Explorer:".dimmed(), record.explorer_url(explorer_base));
            }
            Ok(())
        }
        AnchorStatus::Failed => {
            if !ctx.quiet {
                println!();
                println!("   {}", "❌ Anchor transaction failed".red().bold());
                println!("   {} {}", "Explorer:".dimmed(), record.explorer_url(explorer_base));
            }
            bail!("Anchor failed: transaction {} reverted", record.tx_hash)
        }
        status => bail!("Tracking ended before the anchor was final (status: {status})"),
    }
}
