//! Watch command

use super::client;
use crate::output::{format_count, format_distance, format_travel_time, route_status_label, Status};
use crate::Format;
use anyhow::{Context, Result};
use chrono::Local;
use owo_colors::OwoColorize;
use std::future::Future;
use std::time::Duration;
use taskroute_core::config::Settings;
use taskroute_telemetry::{metrics, names};
use taskroute_tracking::{EngineConfig, EngineDeps, TaskId, TrackingEngine, TrackingView};
use tokio::sync::watch;
use tracing::debug;

/// Follow the feed until Ctrl-C or the optional duration elapses
pub async fn run(settings: &Settings, select: Option<TaskId>, duration: Option<u64>, format: Format) -> Result<()> {
    let deps = EngineDeps::connect(client(settings)?, settings.feed.url.clone());
    let mut engine = TrackingEngine::start(deps, EngineConfig::from_settings(settings));
    let mut views = engine.subscribe();

    if format == Format::Text {
        Status::info(&format!("Watching {} (Ctrl-C to stop)", settings.feed.url));
    }

    if let Some(task_id) = select {
        if let Err(e) = engine.select(Some(task_id)).await {
            engine.stop().await;
            return Err(taskroute_core::Error::from(e)).with_context(|| format!("Selecting task {task_id}"));
        }
    }

    let stop_after = async {
        match duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    let interrupted = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupted");
        }
    };
    let stop = async {
        tokio::select! {
            _ = stop_after => {}
            _ = interrupted => {}
        }
    };

    let followed = follow(&mut views, stop, |view| render(view, format)).await;
    engine.stop().await;
    followed?;
    summarize(format)
}

/// Hand every published view to `on_view` until `stop` completes or the
/// engine goes away. `stop` is polled across iterations, never recreated.
async fn follow<S, F>(views: &mut watch::Receiver<TrackingView>, stop: S, mut on_view: F) -> Result<()>
where
    S: Future<Output = ()>,
    F: FnMut(&TrackingView) -> Result<()>,
{
    tokio::pin!(stop);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop => return Ok(()),
            changed = views.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let view = views.borrow_and_update().clone();
                on_view(&view)?;
            }
        }
    }
}

fn render(view: &TrackingView, format: Format) -> Result<()> {
    if format == Format::Json {
        println!("{}", serde_json::to_string(view)?);
        return Ok(());
    }

    let link = if view.connected {
        "● live".green().to_string()
    } else {
        "○ offline".red().to_string()
    };
    let tasks = format_count(view.tasks.len(), "task", "tasks");
    let located = format_count(view.positions.len(), "position", "positions");

    let mut line = format!(
        "{} {link}  {tasks}  {located}",
        Local::now().format("%H:%M:%S").dimmed()
    );

    if let Some(task_id) = view.selected {
        line.push_str(&format!("  {} ", format!("#{task_id}").cyan()));
        match &view.route {
            Some(route) => line.push_str(&format!(
                "{} {} / {}",
                "route".green(),
                format_distance(route.distance_m as f64),
                format_travel_time(route.duration_s)
            )),
            None => line.push_str(&route_status_label(view.route_status).yellow().to_string()),
        }
        if let Some(position) = view.positions.get(&task_id) {
            line.push_str(&format!("  {}", format!("at {}", position.coordinate).dimmed()));
        }
    }

    println!("{line}");
    Ok(())
}

fn summarize(format: Format) -> Result<()> {
    let registry = metrics();

    if format == Format::Json {
        println!("{}", serde_json::to_string(&registry.export_json())?);
        return Ok(());
    }

    Status::header("Session summary");
    for (label, name) in [
        ("feed messages", names::FEED_MESSAGES),
        ("dropped messages", names::FEED_DROPPED),
        ("reconnects", names::FEED_RECONNECTS),
        ("route requests", names::ROUTE_REQUESTS),
        ("route failures", names::ROUTE_FAILURES),
        ("stale routes", names::ROUTE_STALE),
    ] {
        println!("  {label:<18} {}", registry.counter(name));
    }
    println!();
    Status::success("Stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_follow_renders_until_stopped() {
        let (tx, mut views) = watch::channel(TrackingView::default());
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let mut stop_tx = Some(stop_tx);

        tx.send_modify(|v| v.connected = true);
        let mut seen = 0;
        follow(
            &mut views,
            async {
                let _ = stop_rx.await;
            },
            |view| {
                seen += 1;
                assert!(view.connected);
                // Stop arrives while a view is being handled; the next turn sees it.
                if let Some(stop) = stop_tx.take() {
                    let _ = stop.send(());
                }
                tx.send_modify(|v| v.selected = Some(seen));
                Ok(())
            },
        )
        .await
        .unwrap();

        assert_eq!(seen, 1);
    }

    #[tokio::test]
    async fn test_follow_ends_when_engine_is_gone() {
        let (tx, mut views) = watch::channel(TrackingView::default());
        drop(tx);
        follow(&mut views, std::future::pending(), |_| Ok(())).await.unwrap();
    }

    #[tokio::test]
    async fn test_follow_propagates_render_errors() {
        let (tx, mut views) = watch::channel(TrackingView::default());
        tx.send_modify(|v| v.connected = true);
        let result = follow(&mut views, std::future::pending(), |_| Err(anyhow::anyhow!("stdout closed"))).await;
        assert!(result.is_err());
    }
}
