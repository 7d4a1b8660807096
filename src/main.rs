//! Interactive driver: streams camera frames and the tracked ankle point to
//! a host consumer and lets the operator switch devices at runtime.

use std::io::Write;
use std::sync::{Arc, Mutex};

use anyhow::Result;

use foot_tracker::camera::{enumerate_devices, CaptureDevice, OpenCvFrameSource};
use foot_tracker::config::Config;
use foot_tracker::host::{self, ChannelHost};
use foot_tracker::pose::MoveNetDetector;
use foot_tracker::session::SessionController;

const CONFIG_PATH: &str = "config.toml";

type LogFile = Arc<Mutex<std::io::BufWriter<std::fs::File>>>;

fn open_log_file() -> Result<LogFile> {
    std::fs::create_dir_all("logs")?;
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = format!("logs/tracker_{}.log", ts);
    let file = std::fs::File::create(&path)?;
    eprintln!("Log: {}", path);
    Ok(Arc::new(Mutex::new(std::io::BufWriter::new(file))))
}

macro_rules! log {
    ($logfile:expr, $($arg:tt)*) => {{
        let msg = format!($($arg)*);
        eprintln!("{}", msg);
        if let Ok(mut f) = $logfile.lock() {
            let _ = writeln!(f, "{}", msg);
            let _ = f.flush();
        }
    }};
}

fn print_devices(logfile: &LogFile, devices: &[CaptureDevice]) {
    if devices.is_empty() {
        log!(logfile, "no cameras found");
        return;
    }
    for (i, device) in devices.iter().enumerate() {
        log!(logfile, "  [{}] {}", i, device.display_label());
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = Config::load_or_default(CONFIG_PATH);
    let logfile = open_log_file()?;
    log!(logfile, "Foot Tracker ({})", env!("GIT_VERSION"));
    log!(
        logfile,
        "[config] display_fps={} jpeg_quality={} min_score={} alpha={} model={}",
        config.camera.display_fps,
        config.camera.jpeg_quality,
        config.tracking.min_score,
        config.tracking.smoothing_alpha,
        config.model.path
    );

    let (sink, mut outbound) = ChannelHost::new();

    // Host consumer: stands in for the engine side of the boundary.
    let consumer_logfile = logfile.clone();
    tokio::spawn(async move {
        let mut frames: u64 = 0;
        while let Some(msg) = outbound.recv().await {
            match msg.message.as_str() {
                host::MSG_VIDEO_FRAME => {
                    frames += 1;
                    if frames % 60 == 0 {
                        let size = msg.payload.map(|p| p.len() / 1024).unwrap_or(0);
                        log!(
                            consumer_logfile,
                            "[host] {} frames received (last {}KB)",
                            frames,
                            size
                        );
                    }
                }
                // 毎ティック再送される生存シグナルなので記録しない
                host::MSG_AI_LOADED => {}
                host::MSG_FOOT_POSITION => {
                    log!(
                        consumer_logfile,
                        "[host] foot {}",
                        msg.payload.unwrap_or_default()
                    );
                }
                _ => log!(consumer_logfile, "[host] {}.{}", msg.target, msg.message),
            }
        }
    });

    let probe_limit = config.camera.probe_limit;
    let mut controller = SessionController::new(
        OpenCvFrameSource::new(config.camera.jpeg_quality),
        MoveNetDetector::new(&config.model.path),
        sink,
        &config,
        Box::new(move || enumerate_devices(probe_limit)),
    );

    let mut devices = controller.register();
    print_devices(&logfile, &devices);
    println!("commands: s <n> switch camera, l relist, q quit");

    // stdin はブロッキングなので専用スレッドで読む
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if tx.send(line.trim().to_string()).is_err() {
                        break;
                    }
                }
            }
        }
    });

    while let Some(line) = rx.recv().await {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["s", n] => match n.parse::<usize>() {
                Ok(i) if i < devices.len() => {
                    let device_id = devices[i].device_id.clone();
                    controller.switch_device(&device_id).await;
                }
                _ => println!("unknown camera index: {n}"),
            },
            ["l"] => {
                devices = controller.register();
                print_devices(&logfile, &devices);
            }
            ["q"] => break,
            [] => {}
            _ => println!("unknown command: {line}"),
        }
    }

    controller.cancel_loops().await;
    log!(logfile, "shutting down");
    Ok(())
}
