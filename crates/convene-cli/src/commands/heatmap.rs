//! Heatmap command for CLI.

use clap::Args;

use crate::workspace::Workspace;

#[derive(Args)]
pub struct HeatmapArgs {
    /// Event ID
    event: String,
    /// Print classified cells as JSON instead of the ASCII grid
    #[arg(long)]
    json: bool,
}

pub fn run(args: HeatmapArgs) -> Result<(), Box<dyn std::error::Error>> {
    let ws = Workspace::open()?;
    let heatmap = ws.registry.heatmap(&args.event)?;

    if args.json {
        ws.print(&heatmap)?;
    } else {
        print!("{}", heatmap.render_ascii());
    }
    Ok(())
}
