#![allow(dead_code)]

pub mod mock_faces;
pub mod mock_link;
pub mod mock_player;
pub mod mock_speaker;

use std::time::{Duration, Instant};

/// Poll `check` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    check()
}
