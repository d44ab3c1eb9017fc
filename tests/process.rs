//! End-to-end tests against the built binary.

use std::net::{TcpListener, TcpStream};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

const ENV_VARS: [&str; 6] = [
    "HTTP_BIND_ADDRESS",
    "HTTP_BIND_PORT",
    "UPSTREAM_ENABLE_PROXY",
    "UPSTREAM_HOST",
    "UPSTREAM_PORT",
    "WEB_FOLDER",
];

fn gateway(args: &[&str]) -> Child {
    let mut command = Command::new(env!("CARGO_BIN_EXE_spa-gateway"));
    for var in ENV_VARS {
        command.env_remove(var);
    }
    command
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap()
}

fn wait_exit(child: &mut Child) -> ExitStatus {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("gateway did not exit");
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[test]
fn bind_failure_exits_non_zero() {
    let web = tempfile::tempdir().unwrap();
    let taken = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port().to_string();

    let mut child = gateway(&[
        "--address",
        "127.0.0.1",
        "--port",
        &port,
        "--web-folder",
        web.path().to_str().unwrap(),
    ]);
    assert_eq!(wait_exit(&mut child).code(), Some(1));
}

#[test]
fn invalid_configuration_exits_non_zero() {
    let mut child = gateway(&["--port", "0"]);
    assert_eq!(wait_exit(&mut child).code(), Some(1));
}

#[cfg(unix)]
#[test]
fn termination_signal_exits_zero() {
    let web = tempfile::tempdir().unwrap();
    std::fs::write(web.path().join("index.html"), "<html></html>").unwrap();
    let port = free_port();
    let port_arg = port.to_string();

    let mut child = gateway(&[
        "--address",
        "127.0.0.1",
        "--port",
        &port_arg,
        "--web-folder",
        web.path().to_str().unwrap(),
    ]);

    let deadline = Instant::now() + Duration::from_secs(10);
    let _open = loop {
        match TcpStream::connect(("127.0.0.1", port)) {
            Ok(stream) => break stream,
            Err(_) if Instant::now() < deadline => std::thread::sleep(Duration::from_millis(20)),
            Err(e) => {
                let _ = child.kill();
                panic!("gateway never listened: {e}");
            }
        }
    };

    let killed = Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(killed.success());

    assert_eq!(wait_exit(&mut child).code(), Some(0));
}
