//! Event management commands for CLI.

use std::collections::BTreeMap;

use clap::Subcommand;
use convene_core::EventConfig;

use crate::workspace::Workspace;

#[derive(Subcommand)]
pub enum EventAction {
    /// Create a new event
    Create {
        /// Available days, comma separated (YYYY-MM-DD)
        #[arg(long, value_delimiter = ',', required_unless_present = "json")]
        days: Vec<String>,
        /// Daily start time (HH:MM)
        #[arg(long, required_unless_present = "json")]
        start: Option<String>,
        /// Daily end time (HH:MM)
        #[arg(long, required_unless_present = "json")]
        end: Option<String>,
        /// Meeting length in minutes
        #[arg(long, required_unless_present = "json")]
        duration: Option<u32>,
        /// Participant necessity as PARTICIPANT=1|3|5, repeatable
        #[arg(long = "necessity", value_name = "PARTICIPANT=N")]
        necessity: Vec<String>,
        /// Full event payload as JSON instead of the flags above
        #[arg(long, conflicts_with_all = ["days", "start", "end", "duration", "necessity"])]
        json: Option<String>,
    },
    /// List all events
    List,
    /// Show one event with its last ranking
    Show {
        /// Event ID
        id: String,
    },
    /// Delete an event and its preferences
    Delete {
        /// Event ID
        id: String,
    },
}

pub fn run(action: EventAction) -> Result<(), Box<dyn std::error::Error>> {
    let ws = Workspace::open()?;

    match action {
        EventAction::Create {
            days,
            start,
            end,
            duration,
            necessity,
            json,
        } => {
            let config = match json {
                Some(raw) => serde_json::from_str::<EventConfig>(&raw)?,
                None => EventConfig {
                    available_days: days,
                    start_time: start.unwrap_or_default(),
                    end_time: end.unwrap_or_default(),
                    duration_minutes: duration.unwrap_or_default(),
                    participant_necessity: parse_necessity(&necessity)?,
                },
            };
            let id = ws.registry.create_event(config)?;
            ws.save()?;
            ws.print(&ws.registry.event(&id)?.summary())?;
        }
        EventAction::List => {
            ws.print(&ws.registry.list_events())?;
        }
        EventAction::Show { id } => {
            let event = ws.registry.event(&id)?;
            ws.print(&serde_json::json!({
                "summary": event.summary(),
                "config": event.config(),
                "optimalBlocks": event.optimal_blocks(),
            }))?;
        }
        EventAction::Delete { id } => {
            ws.registry.delete_event(&id)?;
            ws.save()?;
            println!("Event deleted: {id}");
        }
    }
    Ok(())
}

fn parse_necessity(pairs: &[String]) -> Result<BTreeMap<String, u8>, Box<dyn std::error::Error>> {
    pairs
        .iter()
        .map(|pair| -> Result<(String, u8), Box<dyn std::error::Error>> {
            let (who, value) = pair
                .rsplit_once('=')
                .ok_or_else(|| format!("expected PARTICIPANT=N, got '{pair}'"))?;
            let value = value
                .parse::<u8>()
                .map_err(|_| format!("necessity for '{who}' must be 1, 3 or 5"))?;
            Ok((who.to_string(), value))
        })
        .collect()
}
