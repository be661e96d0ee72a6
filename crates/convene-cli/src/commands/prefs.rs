//! Preference submission commands for CLI.

use clap::Subcommand;

use crate::workspace::Workspace;

#[derive(Subcommand)]
pub enum PrefsAction {
    /// Add and delete ranges for a participant in one transaction
    Submit {
        /// Event ID
        event: String,
        /// Participant ID (email)
        participant: String,
        /// Range to add as HH:MM-HH:MM@YYYY-MM-DD=WEIGHT (1, 3 or 5), repeatable
        #[arg(long = "add", value_name = "RANGE=WEIGHT")]
        add: Vec<String>,
        /// Range to delete as HH:MM-HH:MM@YYYY-MM-DD, repeatable
        #[arg(long = "delete", value_name = "RANGE")]
        delete: Vec<String>,
    },
    /// Show every slot with its weights and heat
    Show {
        /// Event ID
        event: String,
        /// Only slots somebody weighted
        #[arg(long)]
        weighted: bool,
    },
    /// Show the ranges a participant has submitted
    Mine {
        /// Event ID
        event: String,
        /// Participant ID (email)
        participant: String,
    },
}

pub fn run(action: PrefsAction) -> Result<(), Box<dyn std::error::Error>> {
    let ws = Workspace::open()?;

    match action {
        PrefsAction::Submit {
            event,
            participant,
            add,
            delete,
        } => {
            if add.is_empty() && delete.is_empty() {
                return Err("nothing to submit: pass --add and/or --delete".into());
            }
            let additions = add
                .iter()
                .map(|raw| parse_addition(raw))
                .collect::<Result<Vec<_>, _>>()?;
            let receipt = ws
                .registry
                .submit_preferences(&event, &participant, additions, &delete)?;
            ws.save()?;
            ws.print(&receipt)?;
        }
        PrefsAction::Show { event, weighted } => {
            let mut slots = ws.registry.get_aggregated_preferences(&event)?;
            if weighted {
                slots.retain(|slot| !slot.participant_weights.is_empty());
            }
            ws.print(&slots)?;
        }
        PrefsAction::Mine { event, participant } => {
            let ranges = ws.registry.submitted_ranges(&event, &participant)?;
            ws.print(&ranges)?;
        }
    }
    Ok(())
}

fn parse_addition(raw: &str) -> Result<(&str, u8), String> {
    let (range, weight) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected RANGE=WEIGHT, got '{raw}'"))?;
    let weight = weight
        .parse::<u8>()
        .map_err(|_| format!("weight for '{range}' must be 1, 3 or 5"))?;
    Ok((range, weight))
}
