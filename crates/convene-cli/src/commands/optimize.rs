//! Block ranking command for CLI.

use clap::Args;

use crate::workspace::Workspace;

#[derive(Args)]
pub struct OptimizeArgs {
    /// Event ID
    event: String,
    /// Number of blocks to return (defaults to optimizer.default_top_k)
    #[arg(long, conflicts_with = "all")]
    top: Option<usize>,
    /// Return the full ranking
    #[arg(long)]
    all: bool,
}

pub fn run(args: OptimizeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let ws = Workspace::open()?;

    let blocks = if args.all {
        ws.registry.optimize_all(&args.event)?
    } else {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        runtime.block_on(ws.registry.optimize_with_timeout(
            &args.event,
            args.top,
            ws.config.optimizer.timeout(),
        ))?
    };

    ws.save()?;
    ws.print(&blocks)?;
    Ok(())
}
