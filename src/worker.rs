//! Engine calls block for up to several seconds, so they run on a worker
//! thread while the UI keeps painting and polls for the answer once per frame.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

#[derive(Debug, PartialEq, Eq)]
pub enum Poll<T> {
    Waiting,
    Ready(T),
    // The worker panicked or dropped its sender.
    Lost,
}

pub struct Pending<T> {
    rx: Receiver<T>,
}

impl<T: Send + 'static> Pending<T> {
    pub fn spawn(job: impl FnOnce() -> T + Send + 'static) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            // Ignore send errors (the UI may have dropped the request).
            let _ = tx.send(job());
        });
        Self { rx }
    }

    /// Non-blocking check for the result.
    pub fn poll(&self) -> Poll<T> {
        match self.rx.try_recv() {
            Ok(v) => Poll::Ready(v),
            Err(TryRecvError::Empty) => Poll::Waiting,
            Err(TryRecvError::Disconnected) => Poll::Lost,
        }
    }
}

#[cfg(test)]
pub(crate) fn wait<T: Send + 'static>(pending: &Pending<T>) -> Option<T> {
    use std::time::{Duration, Instant};

    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        match pending.poll() {
            Poll::Ready(v) => return Some(v),
            Poll::Lost => return None,
            Poll::Waiting => thread::sleep(Duration::from_millis(5)),
        }
    }
    None
}
