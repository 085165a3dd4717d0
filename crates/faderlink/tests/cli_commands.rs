#![cfg(feature = "cli")]

use std::collections::HashMap;
use std::net::UdpSocket;
use std::process::{Command, Output, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use faderlink::osc::{decode, Message};

/// Loopback console that answers status, name and fader queries.
struct FakeConsole {
    addr: String,
    levels: Arc<Mutex<HashMap<String, f32>>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FakeConsole {
    fn start() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").expect("console socket should bind");
        socket
            .set_read_timeout(Some(Duration::from_millis(50)))
            .expect("read timeout should apply");
        let addr = socket.local_addr().expect("local addr").to_string();
        let levels = Arc::new(Mutex::new(HashMap::new()));
        let running = Arc::new(AtomicBool::new(true));

        let handle = {
            let levels = Arc::clone(&levels);
            let running = Arc::clone(&running);
            thread::spawn(move || serve(&socket, &levels, &running))
        };

        Self {
            addr,
            levels,
            running,
            handle: Some(handle),
        }
    }

    fn set_level(&self, path: &str, level: f32) {
        self.levels
            .lock()
            .unwrap()
            .insert(path.to_string(), level);
    }

    fn level(&self, path: &str) -> Option<f32> {
        self.levels.lock().unwrap().get(path).copied()
    }
}

impl Drop for FakeConsole {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve(socket: &UdpSocket, levels: &Mutex<HashMap<String, f32>>, running: &AtomicBool) {
    let mut names: HashMap<String, String> = HashMap::new();
    let mut buf = [0u8; 512];
    while running.load(Ordering::SeqCst) {
        let Ok((len, from)) = socket.recv_from(&mut buf) else {
            continue;
        };
        let Ok(message) = decode(&buf[..len]) else {
            continue;
        };
        let path = message.address_str().unwrap_or_default().to_string();

        let reply = if path == "/info" {
            Some(
                Message::new("/info")
                    .with_string("V2.07")
                    .with_string("fake")
                    .with_string("X32")
                    .with_string("4.06"),
            )
        } else if path.ends_with("/config/name") {
            match message.strings().into_iter().next() {
                Some(name) => {
                    names.insert(path, name);
                    None
                }
                None => {
                    let name = names.get(&path).cloned().unwrap_or_default();
                    Some(Message::new(&path).with_string(name))
                }
            }
        } else {
            let mut levels = levels.lock().unwrap();
            match message.first_float() {
                Some(level) => {
                    levels.insert(path, level);
                    None
                }
                None => {
                    let level = levels.get(&path).copied().unwrap_or(0.0);
                    Some(Message::new(&path).with_float(level))
                }
            }
        };

        if let Some(reply) = reply {
            let _ = socket.send_to(&reply.encode().unwrap(), from);
        }
    }
}

fn faderlink(remote: &str, args: &[&str]) -> Output {
    faderlink_with_timeout(remote, "1s", args)
}

fn faderlink_with_timeout(remote: &str, timeout: &str, args: &[&str]) -> Output {
    faderlink_command(remote, timeout, args)
        .output()
        .expect("faderlink should run")
}

fn faderlink_command(remote: &str, timeout: &str, args: &[&str]) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_faderlink"));
    command
        .args([
            "--log-level",
            "error",
            "--remote",
            remote,
            "--local-port",
            "0",
            "--monitor-port",
            "0",
            "--timeout",
            timeout,
        ])
        .args(args)
        .env_remove("FADERLINK_REMOTE")
        .env_remove("FADERLINK_LOCAL_PORT")
        .env_remove("FADERLINK_MONITOR_PORT")
        .env_remove("FADERLINK_RESOLUTION");
    command
}

#[test]
fn status_prints_info_strings_as_json() {
    let console = FakeConsole::start();
    let output = faderlink(&console.addr, &["--format", "json", "status"]);

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(stdout.trim()).expect("json output");
    assert_eq!(json["address"], "/info");
    assert_eq!(json["status"][1], "fake");
}

#[test]
fn name_write_then_read() {
    let console = FakeConsole::start();
    let write = faderlink(&console.addr, &["--format", "raw", "name", "2", "--set", "Snare"]);
    assert!(write.status.success(), "{write:?}");

    let read = faderlink(&console.addr, &["--format", "raw", "name", "2"]);
    assert!(read.status.success(), "{read:?}");
    assert_eq!(String::from_utf8_lossy(&read.stdout).trim(), "Snare");
}

#[test]
fn level_reads_fader() {
    let console = FakeConsole::start();
    console.set_level("/main/st/mix/fader", 0.75);

    let output = faderlink(&console.addr, &["--format", "raw", "level", "70"]);
    assert!(output.status.success(), "{output:?}");
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "0.75");
}

#[test]
fn fade_moves_console_fader() {
    let console = FakeConsole::start();
    console.set_level("/ch/01/mix/fader", 0.0);

    let output = faderlink(
        &console.addr,
        &["--format", "json", "--resolution", "10", "fade", "0", "0.5", "--duration", "100ms"],
    );
    assert!(output.status.success(), "{output:?}");
    assert_eq!(console.level("/ch/01/mix/fader"), Some(0.4));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(stdout.trim()).expect("json output");
    assert_eq!(json["group"], "channel");
    assert_eq!(json["duration_ms"], 100);
}

#[test]
fn fade_out_descends() {
    let console = FakeConsole::start();
    console.set_level("/dca/1/fader", 0.3);

    let output = faderlink(
        &console.addr,
        &["--resolution", "10", "fade-out", "72", "--duration", "60ms"],
    );
    assert!(output.status.success(), "{output:?}");
    assert_eq!(console.level("/dca/1/fader"), Some(0.1));
}

#[cfg(unix)]
#[test]
fn interrupted_fade_exits_with_failure() {
    let console = FakeConsole::start();
    console.set_level("/ch/01/mix/fader", 0.0);

    let child = faderlink_command(
        &console.addr,
        "1s",
        &["--format", "json", "fade", "0", "1.0", "--duration", "10s"],
    )
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .spawn()
    .expect("faderlink should start");

    thread::sleep(Duration::from_secs(1));
    let kill = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .expect("kill should run");
    assert!(kill.success());

    let output = child.wait_with_output().expect("faderlink should exit");
    assert_eq!(output.status.code(), Some(1), "{output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(stdout.trim()).expect("json output");
    assert_eq!(json["completed"], false);
    let level = json["level"].as_f64().expect("level");
    assert!(level > 0.0 && level < 1.0, "stopped at {level}");
    assert!(console.level("/ch/01/mix/fader").unwrap_or(0.0) < 1.0);
}

#[test]
fn monitor_stops_after_count() {
    let console = FakeConsole::start();
    console.set_level("/bus/03/mix/fader", 0.25);

    let output = faderlink(&console.addr, &["--format", "raw", "monitor", "50", "--count", "3"]);
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, vec!["bus 3 : 0.25"; 3]);
}

#[test]
fn silent_console_times_out_with_124() {
    let silent = UdpSocket::bind("127.0.0.1:0").expect("silent socket should bind");
    let addr = silent.local_addr().expect("local addr").to_string();

    let output = faderlink_with_timeout(&addr, "200ms", &["status"]);
    assert_eq!(output.status.code(), Some(124));
}

#[test]
fn out_of_range_channel_is_usage_error() {
    let console = FakeConsole::start();
    let output = faderlink(&console.addr, &["level", "80"]);
    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid channel"));
}

#[test]
fn version_prints_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_faderlink"))
        .arg("version")
        .output()
        .expect("version should run");
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("faderlink {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn extended_version_reports_build_details() {
    let output = Command::new(env!("CARGO_BIN_EXE_faderlink"))
        .args(["version", "--extended"])
        .output()
        .expect("version should run");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let fields: HashMap<&str, &str> = stdout
        .lines()
        .filter_map(|line| line.split_once(": "))
        .collect();
    assert_eq!(fields["version"], env!("CARGO_PKG_VERSION"));
    assert_ne!(fields["target"], "unknown");
    assert!(["debug", "release"].contains(&fields["profile"]), "{stdout}");
    assert_eq!(
        fields["defaults"],
        "local_port=10023, monitor_port=10024, resolution=1024 (max 65536)"
    );
    assert!(!stdout.contains("unknown"), "{stdout}");
}
