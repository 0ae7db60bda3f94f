use slogcam::config::SlogCamConfig;
use slogcam::controls::{ControlPanel, ControlUpdate};
use slogcam::testing::{SimulatedDevice, SimulatedHost};
use slogcam::{
    AppOpenEvent, CaptureHost, CaptureSession, DeviceController, DeviceSnapshot, NokhwaHost,
    TelemetryReporter,
};
use std::env;
use std::sync::mpsc;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    slogcam::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: slogcam-cli <command> [args] [--simulated] [--json]");
        std::process::exit(1);
    }

    let command = &args[1];
    match command.as_str() {
        "state" => cmd_state(&args),
        "set-iso" => cmd_set_iso(&args),
        "set-shutter" => cmd_set_shutter(&args),
        "stabilization" => cmd_stabilization(&args),
        "preview" => cmd_preview(&args),
        "export" => cmd_export(&args),
        "app-open" => cmd_app_open(&args),
        _ => {
            eprintln!("Unknown command: {}", command);
            std::process::exit(1);
        }
    }
}

fn host_for(args: &[String]) -> Arc<dyn CaptureHost> {
    if args.contains(&"--simulated".to_string()) {
        Arc::new(SimulatedHost::new(Arc::new(SimulatedDevice::new())))
    } else {
        Arc::new(NokhwaHost::default())
    }
}

/// Positional arguments after the command, flags removed.
fn positional(args: &[String]) -> Vec<&str> {
    args.iter()
        .skip(2)
        .map(String::as_str)
        .filter(|a| !a.starts_with("--"))
        .collect()
}

fn open_panel(args: &[String]) -> Result<(CaptureSession, ControlPanel), Box<dyn std::error::Error>> {
    let config = SlogCamConfig::load_or_default();
    let session = CaptureSession::new(host_for(args));
    let device = session.start()?;
    let controller = Arc::new(DeviceController::new(device));
    let panel = ControlPanel::new(controller, config.controls, config.export.target);
    Ok((session, panel))
}

fn print_snapshot(args: &[String], snapshot: &DeviceSnapshot) -> Result<(), Box<dyn std::error::Error>> {
    if args.contains(&"--json".to_string()) {
        println!("{}", serde_json::to_string(snapshot)?);
    } else {
        println!("{} ({})", snapshot.device.name, snapshot.device.id);
        println!("  ISO: {} [{} - {}]", snapshot.iso, snapshot.min_iso, snapshot.max_iso);
        println!(
            "  Exposure: {} s [{} - {}] ({:?})",
            snapshot.exposure_duration,
            snapshot.min_exposure_duration,
            snapshot.max_exposure_duration,
            snapshot.exposure_mode
        );
        println!(
            "  Frame duration: {} - {}",
            snapshot.active_min_frame_duration, snapshot.active_max_frame_duration
        );
        println!("  Smooth autofocus: {}", snapshot.smooth_autofocus);
    }
    Ok(())
}

fn print_update(args: &[String], update: &ControlUpdate) -> Result<(), Box<dyn std::error::Error>> {
    if args.contains(&"--json".to_string()) {
        println!("{}", serde_json::to_string(update)?);
    } else if let Some(error) = &update.error {
        println!("{:?} not applied: {}", update.id, error);
    } else {
        println!("{:?} -> {:?} ({:?})", update.id, update.displayed, update.outcome);
    }
    Ok(())
}

fn cmd_state(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let (session, panel) = open_panel(args)?;
    print_snapshot(args, &panel.controller().snapshot())?;
    session.close()?;
    Ok(())
}

fn cmd_set_iso(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let value: f32 = match positional(args).first() {
        Some(v) => v.parse()?,
        None => {
            eprintln!("Usage: slogcam-cli set-iso <value>");
            std::process::exit(1);
        }
    };
    let (session, panel) = open_panel(args)?;
    print_update(args, &panel.on_iso_changed(value))?;
    print_snapshot(args, &panel.controller().snapshot())?;
    session.close()?;
    Ok(())
}

/// Accepts `1/125` or a plain number of seconds.
fn parse_shutter(s: &str) -> Result<f32, Box<dyn std::error::Error>> {
    match s.split_once('/') {
        Some((num, den)) => {
            let num: f32 = num.parse()?;
            let den: f32 = den.parse()?;
            Ok(num / den)
        }
        None => Ok(s.parse()?),
    }
}

fn cmd_set_shutter(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let value = match positional(args).first() {
        Some(v) => parse_shutter(v)?,
        None => {
            eprintln!("Usage: slogcam-cli set-shutter <1/N|seconds>");
            std::process::exit(1);
        }
    };
    let (session, panel) = open_panel(args)?;
    print_update(args, &panel.on_shutter_speed_changed(value))?;
    print_snapshot(args, &panel.controller().snapshot())?;
    session.close()?;
    Ok(())
}

fn cmd_stabilization(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let enabled = match positional(args).first().copied() {
        Some("on") => true,
        Some("off") => false,
        _ => {
            eprintln!("Usage: slogcam-cli stabilization <on|off>");
            std::process::exit(1);
        }
    };
    let (session, panel) = open_panel(args)?;
    print_update(args, &panel.on_stabilization_changed(enabled))?;
    print_snapshot(args, &panel.controller().snapshot())?;
    session.close()?;
    Ok(())
}

fn cmd_preview(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let (session, panel) = open_panel(args)?;
    print_snapshot(args, &panel.controller().snapshot())?;

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })?;
    println!("Previewing, press Ctrl+C to stop");
    let _ = rx.recv();

    session.stop()?;
    session.close()?;
    Ok(())
}

fn cmd_export(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let (session, panel) = open_panel(args)?;
    panel.on_export();
    session.close()?;
    Ok(())
}

fn cmd_app_open(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let positional = positional(args);
    let config = SlogCamConfig::load_or_default().telemetry;
    let event = AppOpenEvent::from_host(
        &config,
        positional.first().copied().unwrap_or(""),
        positional.get(1).copied().unwrap_or(""),
    );
    let reporter = TelemetryReporter::from_config(&config)?;

    let runtime = tokio::runtime::Runtime::new()?;
    let accepted = runtime.block_on(reporter.report_app_open(&event));
    if args.contains(&"--json".to_string()) {
        println!("{}", serde_json::json!({ "event": event, "accepted": accepted }));
    } else {
        println!("App open event accepted: {}", accepted);
    }
    Ok(())
}
