//! `autofeed status`: one fresh fetch, rendered.

use serde::Serialize;

use autofeed_core::{Controller, DeviceEvent, DeviceSnapshot};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct StatusView {
    #[serde(flatten)]
    snapshot: DeviceSnapshot,
    camera_stream_url: Option<String>,
}

fn detail(view: &StatusView, color: bool) -> String {
    let s = &view.snapshot;
    let mut lines = vec![
        format!("Device:    {}", s.state.device_id),
        format!(
            "Status:    {} {}",
            s.display.text,
            output::dim(&format!("({})", s.display.source), color)
        ),
        format!("Online:    {}", output::connectivity(s.state.online, color)),
        format!("Bowl:      {} g", s.state.bowl_weight_grams),
        format!("Container: {} g", s.state.container_weight_grams),
    ];
    if !s.state.remote_status_text.is_empty() && s.state.remote_status_text != s.display.text {
        lines.push(format!("Reported:  {}", s.state.remote_status_text));
    }
    if let Some(ref url) = view.camera_stream_url {
        lines.push(format!("Camera:    {url}"));
    }
    if s.low_food_alert_fired {
        let alert = DeviceEvent::LowFood {
            container_weight_grams: s.state.container_weight_grams,
        };
        lines.push(String::new());
        lines.push(output::warning(
            &format!("{}: {}", alert.title(), alert.message()),
            color,
        ));
    }
    lines.join("\n")
}

pub async fn handle(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = controller.refresh_status().await?;
    let settings = controller.settings().await?;
    let view = StatusView {
        snapshot,
        camera_stream_url: settings.camera_stream_url(),
    };

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &view,
        |v| detail(v, color),
        |v| v.snapshot.display.text.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
