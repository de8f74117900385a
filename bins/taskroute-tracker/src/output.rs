//! Terminal output helpers

use owo_colors::OwoColorize;
use taskroute_tracking::RouteStatus;

/// Status message helpers
pub struct Status;

impl Status {
    /// Print a success message
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Print an info message
    pub fn info(message: &str) {
        println!("{} {}", "ℹ".blue(), message);
    }

    /// Print a header
    pub fn header(message: &str) {
        println!();
        println!("{}", message.bold());
        println!("{}", "─".repeat(message.chars().count()));
    }
}

/// Format meters for display
pub fn format_distance(meters: f64) -> String {
    if !meters.is_finite() {
        "unknown".to_string()
    } else if meters < 1_000.0 {
        format!("{meters:.0} m")
    } else {
        format!("{:.1} km", meters / 1_000.0)
    }
}

/// Format a travel time in seconds for display
pub fn format_travel_time(seconds: u64) -> String {
    let minutes = seconds.div_ceil(60);
    if minutes < 60 {
        format!("{minutes} min")
    } else {
        format!("{}h {}m", minutes / 60, minutes % 60)
    }
}

/// Format a count with singular/plural
pub fn format_count(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

/// Short label for a route status
pub fn route_status_label(status: RouteStatus) -> &'static str {
    match status {
        RouteStatus::Idle => "idle",
        RouteStatus::Pending => "computing",
        RouteStatus::Ready => "ready",
        RouteStatus::Arrived => "arrived",
        RouteStatus::Unavailable => "no route currently available",
    }
}
