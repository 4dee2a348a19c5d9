//! Termination signals raise the stop flag. Kept in its own test binary
//! because the handler is process-wide.

use intake::bridge::StopSignal;
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};

#[cfg(unix)]
#[test]
fn test_sigterm_raises_stop_signal() {
    let stop = StopSignal::new();
    stop.stop_on_termination().unwrap();
    assert!(!stop.is_stopped());

    let status = Command::new("kill")
        .args(["-TERM", &std::process::id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let deadline = Instant::now() + Duration::from_secs(10);
    while !stop.is_stopped() {
        assert!(Instant::now() < deadline, "stop flag never raised");
        thread::sleep(Duration::from_millis(10));
    }

    // a second handler is refused
    assert!(StopSignal::new().stop_on_termination().is_err());
}
