// protondrive-rclone/tests/client_tests.rs
//
// Runs the client against a small shell script that stands in for rclone.
// The script is passed to /bin/sh as a global argument so it never has to
// be executable itself.

#![cfg(unix)]

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use protondrive_rclone::{RcloneClient, RcloneOptions, ToolError, ToolLine};
use tempfile::NamedTempFile;

const FAKE_RCLONE: &str = r#"
case "$1" in
  version)
    echo "rclone v1.66.0"
    echo "- os/version: fake"
    ;;
  obscure)
    read secret
    echo "obscured-${#secret}"
    ;;
  listremotes)
    echo "protondrive:"
    ;;
  config)
    if [ "$2" = "create" ]; then
      shift 4
      echo "created $*"
    elif [ "$3" = "slow" ]; then
      exec sleep 5
    else
      echo "Couldn't find remote" >&2
      exit 1
    fi
    ;;
  lsd)
    if [ "$2" = "protondrive:" ]; then
      echo "          -1 2024-05-01 10:11:12        -1 Documents"
      echo "          -1 2024-05-01 10:11:12        -1 Photos"
    else
      echo "2FA code expired" >&2
      exit 1
    fi
    ;;
  sync)
    echo "Transferred: 1 / 1, 100%"
    echo "NOTICE: done" >&2
    ;;
  mount)
    echo "mounting $2 on $3"
    exec sleep 30
    ;;
esac
"#;

fn fake_client(timeout: Duration) -> (RcloneClient, NamedTempFile) {
    let mut script = NamedTempFile::new().expect("temp script");
    script.write_all(FAKE_RCLONE.as_bytes()).expect("write script");
    script.flush().expect("flush script");
    let options = RcloneOptions {
        binary: PathBuf::from("/bin/sh"),
        global_args: vec![script.path().display().to_string()],
        command_timeout: timeout,
        stream_buffer: 8,
    };
    (RcloneClient::new(options), script)
}

#[tokio::test]
async fn captures_stdout_and_success() {
    let (client, _script) = fake_client(Duration::from_secs(10));
    let out = client.version().await.expect("version should run");
    assert!(out.success);
    assert_eq!(out.exit_code, Some(0));
    assert!(out.stdout.starts_with("rclone v1.66.0"));
}

#[tokio::test]
async fn non_zero_exit_is_a_value_not_an_error() {
    let (client, _script) = fake_client(Duration::from_secs(10));
    let out = client.delete_remote("protondrive").await.expect("delete should run");
    assert!(!out.success);
    assert_eq!(out.exit_code, Some(1));
    assert_eq!(out.diagnostic(), "Couldn't find remote");
}

#[tokio::test]
async fn obscure_reads_secret_from_stdin() {
    let (client, _script) = fake_client(Duration::from_secs(10));
    let out = client.obscure("secret123").await.expect("obscure should run");
    assert!(out.success);
    assert_eq!(out.stdout.trim(), "obscured-9");
}

#[tokio::test]
async fn create_passes_fields_as_key_value_pairs() {
    let (client, _script) = fake_client(Duration::from_secs(10));
    let mut fields = BTreeMap::new();
    fields.insert("user".to_string(), "a@proton.me".to_string());
    fields.insert("pass".to_string(), "obscured-9".to_string());
    let out = client
        .create_remote("protondrive", "protondrive", &fields)
        .await
        .expect("create should run");
    assert!(out.success);
    assert_eq!(out.stdout.trim(), "created pass=obscured-9 user=a@proton.me");
}

#[tokio::test]
async fn lsd_failure_keeps_diagnostic() {
    let (client, _script) = fake_client(Duration::from_secs(10));
    let ok = client.lsd("protondrive:").await.unwrap();
    assert!(ok.success);
    assert_eq!(ok.stdout.lines().count(), 2);

    let failed = client.lsd("protondrive:missing").await.unwrap();
    assert!(!failed.success);
    assert_eq!(failed.diagnostic(), "2FA code expired");
}

#[tokio::test]
async fn missing_binary_is_not_found() {
    let client = RcloneClient::new(RcloneOptions {
        binary: PathBuf::from("/definitely/not/here/rclone"),
        ..RcloneOptions::default()
    });
    match client.version().await {
        Err(ToolError::NotFound(path)) => assert!(path.contains("rclone")),
        other => panic!("expected NotFound, got {:?}", other.map(|o| o.success)),
    }
}

#[tokio::test]
async fn slow_command_times_out() {
    let (client, _script) = fake_client(Duration::from_millis(200));
    match client.show_remote("slow").await {
        Err(ToolError::Timeout(limit)) => assert_eq!(limit, Duration::from_millis(200)),
        other => panic!("expected Timeout, got {:?}", other.map(|o| o.success)),
    }
}

#[tokio::test]
async fn sync_streams_lines_then_exit() {
    let (client, _script) = fake_client(Duration::from_secs(10));
    let dir = tempfile::tempdir().unwrap();
    let mut stream = client
        .sync(dir.path(), "protondrive:backup", &["-v".to_string()])
        .await
        .expect("sync should start");

    let mut outputs = Vec::new();
    let mut exit = None;
    while let Some(line) = stream.next_line().await {
        match line {
            ToolLine::Output(text) => outputs.push(text),
            ToolLine::Exit { success, code } => exit = Some((success, code)),
        }
    }
    assert!(outputs.iter().any(|l| l.contains("Transferred:")));
    assert!(outputs.iter().any(|l| l.contains("NOTICE")));
    assert_eq!(exit, Some((true, Some(0))));
}

#[tokio::test]
async fn cancelling_a_mount_terminates_the_process() {
    let (client, _script) = fake_client(Duration::from_secs(10));
    let dir = tempfile::tempdir().unwrap();
    let mut stream = client
        .mount("protondrive:", dir.path(), &[])
        .await
        .expect("mount should start");

    let first = tokio::time::timeout(Duration::from_secs(5), stream.next_line())
        .await
        .expect("first line in time");
    assert!(matches!(first, Some(ToolLine::Output(ref l)) if l.starts_with("mounting protondrive:")));

    stream.cancel();
    let last = tokio::time::timeout(Duration::from_secs(5), async {
        let mut last = None;
        while let Some(line) = stream.next_line().await {
            last = Some(line);
        }
        last
    })
    .await
    .expect("process should exit after cancel");
    assert!(matches!(last, Some(ToolLine::Exit { success: false, .. })));
}
