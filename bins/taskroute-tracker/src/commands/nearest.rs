//! Nearest command

use super::load_registry;
use crate::output::{format_distance, Status};
use crate::Format;
use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;
use taskroute_core::config::Settings;
use taskroute_geo::Coordinate;
use taskroute_tracking::TaskId;

#[derive(Serialize)]
struct NearestEntry {
    task_id: TaskId,
    title: String,
    assignee: Option<String>,
    distance_m: f64,
}

/// Rank tracked tasks with a known position by distance to a point
pub async fn run(settings: &Settings, lat: f64, lng: f64, limit: usize, format: Format) -> Result<()> {
    let target = Coordinate::checked(lat, lng)?;
    let registry = load_registry(settings).await?;

    let entries: Vec<NearestEntry> = registry
        .nearest(target, Some(limit))
        .into_iter()
        .filter_map(|ranked| {
            let task = registry.task(ranked.id)?;
            Some(NearestEntry {
                task_id: task.id,
                title: task.title.clone(),
                assignee: task.assignee.clone(),
                distance_m: ranked.distance_m,
            })
        })
        .collect();

    if format == Format::Json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    Status::header(&format!("Nearest to {target}"));
    if entries.is_empty() {
        Status::info("No tracked task has a known position");
        return Ok(());
    }

    for (rank, entry) in entries.iter().enumerate() {
        let who = entry.assignee.as_deref().unwrap_or("unassigned");
        println!(
            "  {:>2}. {:>9}  {} {} {}",
            rank + 1,
            format_distance(entry.distance_m).green(),
            format!("#{}", entry.task_id).cyan(),
            entry.title,
            format!("({who})").dimmed()
        );
    }
    println!();
    Ok(())
}
