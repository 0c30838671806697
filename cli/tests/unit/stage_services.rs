//! Individual stage services driven against the in-memory host.

#![allow(clippy::expect_used)]

use std::path::Path;
use std::time::Duration;

use deskcast_cli::application::services::cleanup_service::cleanup_stale_state;
use deskcast_cli::application::services::streaming::{
    StreamingOptions, log_tail, start_streaming_server,
};
use deskcast_cli::application::services::tunnel::{TunnelOptions, start_tunnel};
use deskcast_cli::domain::display::DISPLAY_SERVER_PATTERN;
use deskcast_cli::domain::{LaunchMode, LaunchPlan, PollPolicy, ProvisionError};

use crate::mocks::{Behaviour, FakeHost, RecordingReporter, TunnelBehaviour, tunnel_banner};

const SECOND: Duration = Duration::from_secs(1);

fn streaming_opts() -> StreamingOptions<'static> {
    StreamingOptions {
        binary: "sunshine",
        session_log: Path::new("/logs/sunshine.log"),
        direct_log: Path::new("/tmp/sunshine-direct.log"),
        session_settle: SECOND,
        app_settle: Duration::from_secs(3),
    }
}

fn tunnel_opts() -> TunnelOptions<'static> {
    TunnelOptions {
        binary: "cloudflared",
        origin: "https://localhost:47990",
        log: Path::new("/tmp/cloudflared.log"),
        session_settle: SECOND,
        policy: PollPolicy::new(SECOND, Duration::from_secs(15)),
    }
}

// ── Cleanup ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn cleanup_on_a_clean_host_finds_nothing_and_still_settles() {
    let host = FakeHost::healthy();
    let report = cleanup_stale_state(&host, Duration::from_secs(2)).await;

    assert!(report.is_empty(), "{report:?}");
    assert_eq!(*host.sleeps.borrow(), vec![Duration::from_secs(2)]);
    assert!(host.has_call("rm /tmp/.X0-lock"));
}

#[tokio::test]
async fn cleanup_terminates_every_leftover() {
    let host = FakeHost::healthy()
        .with_running(&["sunshine", "cloudflared", "xfce4-session", "Xorg"])
        .with_session("sunshine")
        .with_session("tunnel")
        .with_file("/tmp/.X0-lock", "4242");
    let report = cleanup_stale_state(&host, Duration::ZERO).await;

    assert_eq!(report.killed, ["sunshine", "cloudflared", "xfce4-session"]);
    assert_eq!(report.sessions_closed, ["sunshine", "tunnel"]);
    assert!(report.display_server_killed);
    assert!(host.processes.borrow().is_empty());
    assert!(host.sessions.borrow().is_empty());
    assert!(host.files.borrow().is_empty());
    assert!(host.has_call(&format!("pkill -f {DISPLAY_SERVER_PATTERN}")));
}

// ── Streaming server ─────────────────────────────────────────────────────────

#[tokio::test]
async fn streaming_server_missing_from_path_is_fatal() {
    let host = FakeHost::healthy();
    let reporter = RecordingReporter::default();
    let err = start_streaming_server(&host, &reporter, streaming_opts(), LaunchPlan::default())
        .await
        .expect_err("expected Err");

    assert!(matches!(
        err.downcast_ref::<ProvisionError>(),
        Some(ProvisionError::NotOnPath { binary }) if binary == "sunshine"
    ));
    assert!(!host.has_call("tmux new-session"));
}

#[tokio::test]
async fn streaming_server_replaces_its_old_session() {
    let host = FakeHost::healthy().with_installed(&["sunshine"]);
    let reporter = RecordingReporter::default();
    let launch = start_streaming_server(&host, &reporter, streaming_opts(), LaunchPlan::default())
        .await
        .expect("launch succeeds");

    assert_eq!(launch.mode, LaunchMode::Session);
    assert_eq!(Some(launch.pid), host.processes.borrow().get("sunshine").copied());
    let kill = host.position("tmux kill-session sunshine").expect("old session terminated");
    let start = host.position("tmux new-session sunshine").expect("session started");
    assert!(kill < start);
}

#[tokio::test]
async fn streaming_failure_carries_the_direct_log_tail() {
    let host = FakeHost::new(Behaviour {
        streaming_survives_in_session: false,
        streaming_survives_direct: false,
        ..Behaviour::default()
    })
    .with_installed(&["sunshine"])
    .with_file(
        "/tmp/sunshine-direct.log",
        "Info: starting\nFatal: unable to open display :0\n",
    );
    let reporter = RecordingReporter::default();
    let err = start_streaming_server(&host, &reporter, streaming_opts(), LaunchPlan::default())
        .await
        .expect_err("expected Err");

    match err.downcast_ref::<ProvisionError>() {
        Some(ProvisionError::ProcessNotAlive {
            attempts, log_tail, ..
        }) => {
            assert_eq!(*attempts, 2);
            assert!(log_tail.contains("unable to open display"), "got: {log_tail}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn log_tail_keeps_only_the_last_lines() {
    let content: String = (1..=30).map(|i| format!("line {i}\n")).collect();
    let host = FakeHost::healthy().with_file("/logs/a.log", &content);

    let tail = log_tail(&host, Path::new("/logs/a.log"), 20);
    assert_eq!(tail.lines().count(), 20);
    assert!(tail.starts_with("line 11"));
    assert!(tail.ends_with("line 30"));
}

#[test]
fn log_tail_of_a_missing_file_says_so() {
    let host = FakeHost::healthy();
    let tail = log_tail(&host, Path::new("/logs/missing.log"), 20);
    assert!(tail.contains("does not exist"), "got: {tail}");
}

// ── Tunnel ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn tunnel_url_is_read_once_the_banner_appears() {
    let host = FakeHost::healthy();
    let url = start_tunnel(&host, tunnel_opts()).await.expect("tunnel up");

    assert_eq!(url, "https://abc123.trycloudflare.com");
    assert_eq!(host.sleeps.borrow().len(), 3, "no settle without an old session");
}

#[tokio::test]
async fn tunnel_settles_after_terminating_an_old_session() {
    let host = FakeHost::new(Behaviour {
        tunnel: TunnelBehaviour::WritesAfter {
            sleeps: 0,
            content: tunnel_banner("https://fresh-42.trycloudflare.com"),
        },
        ..Behaviour::default()
    })
    .with_session("tunnel");
    let url = start_tunnel(&host, tunnel_opts()).await.expect("tunnel up");

    assert_eq!(url, "https://fresh-42.trycloudflare.com");
    assert_eq!(*host.sleeps.borrow(), vec![SECOND]);
}

#[tokio::test]
async fn stale_tunnel_log_is_removed_before_the_session_starts() {
    let host = FakeHost::healthy().with_file("/tmp/cloudflared.log", "old");
    start_tunnel(&host, tunnel_opts()).await.expect("tunnel up");

    let rm = host.position("rm /tmp/cloudflared.log").expect("old log removed");
    let start = host.position("tmux new-session tunnel").expect("session started");
    assert!(rm < start);
    assert!(host.processes.borrow().contains_key("cloudflared"));
}
