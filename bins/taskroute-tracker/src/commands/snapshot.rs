//! Snapshot command

use super::load_registry;
use crate::output::{format_count, Status};
use crate::Format;
use anyhow::Result;
use owo_colors::OwoColorize;
use taskroute_core::config::Settings;
use taskroute_tracking::{RegistrySnapshot, Task};

/// Print in-progress tasks and positions
pub async fn run(settings: &Settings, format: Format) -> Result<()> {
    let snapshot = load_registry(settings).await?.snapshot();

    if format == Format::Json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    print_text(&snapshot);
    Ok(())
}

fn print_text(snapshot: &RegistrySnapshot) {
    Status::header(&format!(
        "In-progress tasks ({})",
        format_count(snapshot.tasks.len(), "task", "tasks")
    ));

    if snapshot.tasks.is_empty() {
        Status::info("Nothing is in progress");
        return;
    }

    for task in &snapshot.tasks {
        println!("  {} {}", format!("#{}", task.id).cyan(), task.title.bold());
        if let Some(assignee) = &task.assignee {
            println!("      assignee:  {assignee}");
        }
        println!("      heading:   {}", destination_label(task));

        match snapshot.positions.get(&task.id) {
            Some(position) => println!(
                "      position:  {} {}",
                position.coordinate,
                format!("(received {})", position.received_at.format("%H:%M:%S")).dimmed()
            ),
            None => println!("      position:  {}", "unknown".dimmed()),
        }
    }
    println!();
}

fn destination_label(task: &Task) -> String {
    let stops = task.destinations();
    let last = stops.last().map(|d| {
        d.label
            .clone()
            .unwrap_or_else(|| d.coordinate.to_string())
    });
    let last = last.unwrap_or_default();

    if task.is_multi_stop() {
        format!("{last} ({})", format_count(stops.len(), "stop", "stops"))
    } else {
        last
    }
}
