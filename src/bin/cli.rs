use anyhow::{anyhow, bail, Context};
use crabview::testing::SyntheticDriver;
use crabview::{
    Camera, CameraDriver, CameraEvent, CrabViewConfig, Facing, Flash, SessionType,
};
use std::env;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    crabview::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: crabview-cli <options|demo|config|devices> [args]");
        std::process::exit(1);
    }

    let command = &args[1];
    match command.as_str() {
        "options" => cmd_options(&args).await,
        "demo" => cmd_demo(&args).await,
        "config" => cmd_config(&args),
        "devices" => cmd_devices(&args),
        _ => {
            eprintln!("Unknown command: {}", command);
            std::process::exit(1);
        }
    }
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn parse_facing(s: &str) -> anyhow::Result<Facing> {
    match s {
        "back" => Ok(Facing::Back),
        "front" => Ok(Facing::Front),
        _ => bail!("Invalid facing: {} (expected back or front)", s),
    }
}

#[cfg(feature = "native")]
fn select_driver(args: &[String]) -> Box<dyn CameraDriver> {
    if has_flag(args, "--native") {
        Box::new(crabview::platform::NativeDriver::new())
    } else {
        Box::new(SyntheticDriver::new())
    }
}

#[cfg(not(feature = "native"))]
fn select_driver(args: &[String]) -> Box<dyn CameraDriver> {
    if has_flag(args, "--native") {
        log::warn!("Built without the `native` feature, using the synthetic driver");
    }
    Box::new(SyntheticDriver::new())
}

fn open_camera(args: &[String]) -> anyhow::Result<Camera> {
    let config = match flag_value(args, "--config") {
        Some(path) => CrabViewConfig::load_from_file(path)?,
        None => CrabViewConfig::load_or_default(),
    };
    let camera = Camera::from_config(select_driver(args), &config)?;
    if let Some(facing) = flag_value(args, "--facing") {
        camera.set_facing(parse_facing(facing)?);
    }
    Ok(camera)
}

async fn next_event(events: &mut UnboundedReceiver<CameraEvent>) -> anyhow::Result<CameraEvent> {
    tokio::time::timeout(EVENT_TIMEOUT, events.recv())
        .await
        .context("Timed out waiting for a camera notification")?
        .ok_or_else(|| anyhow!("Camera notification stream closed"))
}

fn event_json(event: &CameraEvent) -> serde_json::Value {
    match event {
        CameraEvent::Opened(options) => serde_json::json!({ "event": "opened", "options": options.as_ref() }),
        CameraEvent::Closed => serde_json::json!({ "event": "closed" }),
        CameraEvent::Error(e) => serde_json::json!({ "event": "error", "message": e.to_string() }),
        CameraEvent::RecordingStarted => serde_json::json!({ "event": "recording_started" }),
        CameraEvent::RecordingStopped => serde_json::json!({ "event": "recording_stopped" }),
        CameraEvent::ZoomChanged(v) => serde_json::json!({ "event": "zoom_changed", "value": v }),
        CameraEvent::ExposureCorrectionChanged(v) => {
            serde_json::json!({ "event": "exposure_correction_changed", "value": v })
        }
    }
}

fn print_event(event: &CameraEvent, json: bool) {
    if json {
        println!("{}", event_json(event));
        return;
    }
    match event {
        CameraEvent::Opened(options) => println!(
            "opened: facing={:?} flash={:?} zoom={} exposure={:?}",
            options.supported_facing(),
            options.supported_flash(),
            options.is_zoom_supported(),
            options.exposure_correction_range()
        ),
        CameraEvent::Closed => println!("closed"),
        CameraEvent::Error(e) => println!("error: {}", e),
        CameraEvent::RecordingStarted => println!("recording started"),
        CameraEvent::RecordingStopped => println!("recording stopped"),
        CameraEvent::ZoomChanged(v) => println!("zoom changed: {}", v),
        CameraEvent::ExposureCorrectionChanged(v) => println!("exposure correction changed: {}", v),
    }
}

async fn cmd_options(args: &[String]) -> anyhow::Result<()> {
    // options [--facing <back|front>] [--config <path>] [--native] [--json]
    let json = has_flag(args, "--json");
    let camera = open_camera(args)?;
    let mut events = camera.subscribe();
    camera.start();

    let opened = loop {
        match next_event(&mut events).await? {
            CameraEvent::Opened(options) => break options,
            CameraEvent::Error(e) => return Err(e.into()),
            _ => {}
        }
    };

    if json {
        println!(
            "{}",
            serde_json::json!({
                "options": opened.as_ref(),
                "extra": camera.extra_properties(),
                "parameters": camera.parameters(),
            })
        );
    } else {
        println!("Facings:        {:?}", opened.supported_facing());
        println!("Flash modes:    {:?}", opened.supported_flash());
        println!("White balances: {:?}", opened.supported_white_balance());
        println!("HDR modes:      {:?}", opened.supported_hdr());
        println!("Zoom:           {:?}", opened.zoom_range());
        println!("Exposure (EV):  {:?}", opened.exposure_correction_range());
        println!("Auto focus:     {}", opened.is_auto_focus_supported());
        println!("Video snapshot: {}", opened.is_video_snapshot_supported());
        if let Some(extra) = camera.extra_properties() {
            println!(
                "View angles:    {}x{} degrees",
                extra.horizontal_view_angle, extra.vertical_view_angle
            );
        }
    }

    camera.stop();
    while !matches!(next_event(&mut events).await?, CameraEvent::Closed) {}
    camera.destroy(SHUTDOWN_TIMEOUT)?;
    Ok(())
}

async fn cmd_demo(args: &[String]) -> anyhow::Result<()> {
    // demo [--config <path>] [--native] [--json]
    let json = has_flag(args, "--json");
    let camera = open_camera(args)?;
    let mut events = camera.subscribe();

    camera.start();
    // Redundant while the open is in flight.
    camera.start();
    print_event(&next_event(&mut events).await?, json);

    camera.set_zoom(2.0);
    camera.set_exposure_correction(-5.0);
    camera.set_flash(Flash::Torch);
    if !json {
        println!(
            "requested zoom 2.0 -> {}, exposure -5.0 -> {}, flash {:?}",
            camera.zoom(),
            camera.exposure_correction(),
            camera.flash()
        );
    }

    camera.set_session_type(SessionType::Video);
    camera.set_facing(match camera.facing() {
        Facing::Back => Facing::Front,
        Facing::Front => Facing::Back,
    });
    // Restart: closed, then opened with the new configuration.
    loop {
        let event = next_event(&mut events).await?;
        print_event(&event, json);
        if matches!(event, CameraEvent::Opened(_)) {
            break;
        }
    }

    camera.start_recording()?;
    print_event(&next_event(&mut events).await?, json);
    camera.stop_recording();
    print_event(&next_event(&mut events).await?, json);

    camera.stop();
    loop {
        let event = next_event(&mut events).await?;
        print_event(&event, json);
        if matches!(event, CameraEvent::Closed) {
            break;
        }
    }

    camera.destroy(SHUTDOWN_TIMEOUT)?;
    Ok(())
}

fn cmd_config(args: &[String]) -> anyhow::Result<()> {
    // config [<path>] [--write]
    let path = args
        .get(2)
        .filter(|a| !a.starts_with("--"))
        .map(std::path::PathBuf::from)
        .unwrap_or_else(CrabViewConfig::default_path);

    let config = CrabViewConfig::load_from_file(&path)?;
    if has_flag(args, "--write") {
        config.save_to_file(&path)?;
        println!("Wrote {}", path.display());
    } else {
        print!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}

#[cfg(feature = "native")]
fn cmd_devices(args: &[String]) -> anyhow::Result<()> {
    let devices = crabview::platform::NativeDriver::list_devices()?;
    if has_flag(args, "--json") {
        println!("{}", serde_json::to_string(&devices)?);
    } else {
        for (i, name) in devices.iter().enumerate() {
            let role = match i {
                0 => "back",
                1 => "front",
                _ => "-",
            };
            println!("{}: {} ({})", i, name, role);
        }
    }
    Ok(())
}

#[cfg(not(feature = "native"))]
fn cmd_devices(_args: &[String]) -> anyhow::Result<()> {
    bail!("Device listing requires the `native` feature")
}
