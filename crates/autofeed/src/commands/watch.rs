//! `autofeed watch`: follow the poller's snapshots until Ctrl-C.

use futures_util::StreamExt;
use tokio::sync::broadcast::error::RecvError;

use autofeed_core::{Controller, DeviceSnapshot};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

fn status_line(snapshot: &DeviceSnapshot, color: bool) -> String {
    let s = &snapshot.state;
    format!(
        "[{}] {:<7} bowl {:>4} g  container {:>4} g  {}",
        chrono::Local::now().format("%H:%M:%S"),
        output::connectivity(s.online, color),
        s.bowl_weight_grams,
        s.container_weight_grams,
        snapshot.display.text,
    )
}

fn render(
    snapshot: &DeviceSnapshot,
    format: &OutputFormat,
    color: bool,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table | OutputFormat::Plain => Ok(status_line(snapshot, color)),
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_json(snapshot, true),
        OutputFormat::Yaml => Ok(format!("---\n{}", output::render_yaml(snapshot)?.trim_end())),
    }
}

pub async fn handle(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    let settings = controller.settings().await?;
    if settings.device_id.is_empty() {
        return Err(CliError::DeviceNotConfigured);
    }

    let color = output::should_color(&global.color);
    let mut snapshots = controller.snapshots();
    let mut events = controller.events();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    if !global.quiet {
        eprintln!("Watching {} (Ctrl-C to stop)", settings.device_id);
    }

    loop {
        tokio::select! {
            biased;
            _ = &mut ctrl_c => break,
            event = events.recv() => match event {
                Ok(event) => {
                    eprintln!(
                        "{}",
                        output::warning(&format!("{}: {}", event.title(), event.message()), color)
                    );
                }
                Err(RecvError::Lagged(n)) => tracing::debug!(skipped = n, "event receiver lagged"),
                Err(RecvError::Closed) => break,
            },
            next = snapshots.next() => match next {
                Some(snapshot) => {
                    let line = render(&snapshot, &global.output, color)?;
                    output::print_output(&line, global.quiet);
                }
                None => break,
            },
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use autofeed_core::{DeviceState, DisplayStatus};

    fn snapshot() -> DeviceSnapshot {
        let mut state = DeviceState::new("F1", 500);
        state.bowl_weight_grams = 7;
        DeviceSnapshot {
            state,
            command: None,
            display: DisplayStatus::optimistic("Feeding..."),
            low_food_alert_fired: false,
        }
    }

    #[test]
    fn line_shows_weights_and_display_text() {
        let line = render(&snapshot(), &OutputFormat::Plain, false).unwrap();
        assert!(line.contains("offline"));
        assert!(line.contains("bowl    7 g"));
        assert!(line.contains("container  500 g"));
        assert!(line.ends_with("Feeding..."));
    }

    #[test]
    fn json_is_one_line_per_snapshot() {
        let line = render(&snapshot(), &OutputFormat::Json, false).unwrap();
        assert!(!line.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["display"]["source"], "optimistic");
    }
}
