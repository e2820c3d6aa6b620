use std::io::Write;
use std::process::{Command, Stdio};

fn run_demo(input: &str, extra_args: &[&str]) -> String {
    let mut child = Command::new(env!("CARGO_BIN_EXE_jackify-progress-demo"))
        .args(extra_args)
        .env("RUST_LOG", "info")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to run jackify-progress-demo");

    child
        .stdin
        .as_mut()
        .expect("stdin")
        .write_all(input.as_bytes())
        .expect("write to stdin");

    let output = child.wait_with_output().expect("wait for demo binary");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

#[test]
fn replays_a_download_line_from_stdin() {
    let combined = run_demo(
        "[FILE_PROGRESS] Downloading: ModpackA.7z (37.5%) [12.4MB/s]\n",
        &[],
    );
    assert!(combined.contains("Downloading"));
}

#[test]
fn step_and_data_status_line_drives_overall_percent() {
    let combined = run_demo("[12/14] Installing files (1.1GB/56.3GB)\n", &[]);
    assert!(combined.contains("Installing"));
    assert!(combined.contains("(86%)"));
}

#[test]
fn replays_post_install_sequence_when_requested() {
    let combined = run_demo("", &["--with-post-install"]);
    assert!(combined.contains("Preparing Steam integration") || combined.contains("Creating Steam shortcut"));
    assert!(combined.contains("Steam integration complete") || combined.contains("1/13") || combined.contains("/13"));
}

#[test]
fn bare_carriage_return_updates_are_each_classified() {
    let combined = run_demo(
        "[FILE_PROGRESS] Downloading: ModpackA.7z (10.0%)\r[FILE_PROGRESS] Downloading: ModpackA.7z (20.0%)\r[FILE_PROGRESS] Downloading: ModpackA.7z (30.0%)\n",
        &[],
    );
    assert!(combined.contains("Downloading"));
}

#[test]
fn unparseable_prose_produces_no_banner_line() {
    let combined = run_demo("just some prose the engine printed\n", &[]);
    assert!(!combined.contains("Processing..."));
}
