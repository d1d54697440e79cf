//! Serialized console output.
//!
//! Delivery reports and inbound message display share one console; every
//! printer clone locks the same mutex so lines from concurrent workers
//! never interleave.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::MessengerError;

const CHECK_MARK: &str = "\u{2705}";
const X_MARK: &str = "\u{274C}";

#[derive(Clone, Default)]
pub struct Printer {
    lock: Arc<Mutex<()>>,
}

impl Printer {
    pub fn new() -> Self {
        Self::default()
    }

    /// One status line per delivery attempt.
    pub async fn report_delivery(&self, name: &str, outcome: &Result<(), MessengerError>) {
        let _guard = self.lock.lock().await;
        match outcome {
            Ok(()) => println!("{name}: {CHECK_MARK}"),
            Err(error) => println!("could not send message to {name}... {error} {X_MARK}"),
        }
    }

    /// Sender name, content, blank line.
    pub async fn show_message(&self, name: &str, content: &[u8]) {
        let _guard = self.lock.lock().await;
        println!("{name}\n{}\n", String::from_utf8_lossy(content));
    }

    pub async fn line(&self, text: &str) {
        let _guard = self.lock.lock().await;
        println!("{text}");
    }
}
