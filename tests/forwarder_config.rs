use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use framepost::config::ForwarderConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "FRAMEPOST_CONFIG",
        "FRAMEPOST_CAMERA_SOURCE",
        "FRAMEPOST_DETECT_URL",
        "FRAMEPOST_INTERVAL_MS",
        "FRAMEPOST_OVERLAY_PATH",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "camera": {
            "source": "stub://bench",
            "target_fps": 5,
            "width": 320,
            "height": 240
        },
        "detect": {
            "url": "http://detector.local:5000/detect",
            "interval_ms": 250,
            "request_timeout_ms": 3000,
            "single_flight": true
        },
        "photo": {
            "width": 800,
            "height": 600
        },
        "overlay_path": "/tmp/overlay.png"
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("FRAMEPOST_CONFIG", file.path());
    std::env::set_var("FRAMEPOST_CAMERA_SOURCE", "stub://override");
    std::env::set_var("FRAMEPOST_INTERVAL_MS", "400");

    let cfg = ForwarderConfig::load().expect("load config");

    // Env beats file, file beats defaults.
    assert_eq!(cfg.camera.source, "stub://override");
    assert_eq!(cfg.camera.target_fps, 5);
    assert_eq!(cfg.camera.width, 320);
    assert_eq!(cfg.camera.height, 240);
    assert_eq!(cfg.detect.url, "http://detector.local:5000/detect");
    assert_eq!(cfg.detect.interval, Duration::from_millis(400));
    assert_eq!(cfg.detect.request_timeout, Duration::from_millis(3000));
    assert!(cfg.detect.single_flight);
    assert_eq!(cfg.photo.width, 800);
    assert_eq!(cfg.photo.height, 600);
    assert_eq!(
        cfg.overlay_path.as_deref().and_then(|p| p.to_str()),
        Some("/tmp/overlay.png")
    );

    cfg.validate().expect("file+env config validates");

    clear_env();
}

#[test]
fn defaults_apply_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = ForwarderConfig::load().expect("load defaults");

    assert_eq!(cfg.camera.source, "stub://webcam");
    assert_eq!(cfg.camera.target_fps, 10);
    assert_eq!(cfg.camera.width, 640);
    assert_eq!(cfg.camera.height, 480);
    assert_eq!(cfg.detect.url, "http://127.0.0.1:5000/detect");
    assert_eq!(cfg.detect.interval, Duration::from_millis(1000));
    assert_eq!(cfg.detect.request_timeout, Duration::from_millis(10000));
    assert!(!cfg.detect.single_flight);
    assert!(cfg.overlay_path.is_none());

    cfg.validate().expect("defaults validate");
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut cfg = ForwarderConfig::default();
    cfg.detect.interval = Duration::from_millis(0);
    assert!(cfg.validate().is_err());

    let mut cfg = ForwarderConfig::default();
    cfg.detect.url = "ftp://nope/detect".to_string();
    assert!(cfg.validate().is_err());

    let mut cfg = ForwarderConfig::default();
    cfg.camera.width = 0;
    assert!(cfg.validate().is_err());

    std::env::set_var("FRAMEPOST_INTERVAL_MS", "soon");
    assert!(ForwarderConfig::load().is_err());

    clear_env();
}

#[test]
fn partial_file_keeps_defaults_elsewhere() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{"detect": {"url": "http://10.0.0.2:5000/detect"}}"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    std::env::set_var("FRAMEPOST_CONFIG", file.path());

    let cfg = ForwarderConfig::load().expect("load config");

    assert_eq!(cfg.detect.url, "http://10.0.0.2:5000/detect");
    assert_eq!(cfg.detect.interval, Duration::from_millis(1000));
    assert_eq!(cfg.camera.source, "stub://webcam");

    clear_env();
}
