// Drives the compiled binary through a PTY: real crossterm input, real
// event loop, real stats file.
//
// Needs a TTY, so it is Unix-only and ignored by default.
// Run with: `cargo test --test integration_min_session -- --ignored`.

#![cfg(unix)]

use std::time::Duration;

use expectrl::{spawn, Eof};

#[test]
#[ignore]
fn prompt_session_finishes_and_exits() -> Result<(), Box<dyn std::error::Error>> {
    let home = tempfile::tempdir()?;
    let bin = assert_cmd::cargo::cargo_bin("tadak");
    let cmd = format!(
        "env HOME={} {} -p hi -n 1",
        home.path().display(),
        bin.display()
    );

    let mut p = spawn(cmd)?;
    std::thread::sleep(Duration::from_millis(200));

    // one item limit: typing the prompt ends the session
    p.send("hi")?;
    std::thread::sleep(Duration::from_millis(200));

    p.send("q")?;
    p.expect(Eof)?;

    assert!(home
        .path()
        .join(".local/state/tadak/sessions.db")
        .exists());
    Ok(())
}

#[test]
#[ignore]
fn escape_twice_stops_then_quits() -> Result<(), Box<dyn std::error::Error>> {
    let home = tempfile::tempdir()?;
    let bin = assert_cmd::cargo::cargo_bin("tadak");
    let cmd = format!("env HOME={} {} -p hello", home.path().display(), bin.display());

    let mut p = spawn(cmd)?;
    std::thread::sleep(Duration::from_millis(200));
    p.send("he")?;
    std::thread::sleep(Duration::from_millis(100));

    p.send("\x1b")?; // stop
    std::thread::sleep(Duration::from_millis(200));
    p.send("\x1b")?; // quit from results
    p.expect(Eof)?;
    Ok(())
}
