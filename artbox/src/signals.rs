//! SIGINT and SIGTERM, turned into an orderly window close.

use iced::futures::{Stream, stream};
use log::{info, warn};
use tokio::signal::unix::{Signal, SignalKind, signal};

/// Listeners for the signals that should shut the panel down.
pub struct ShutdownSignals {
    interrupt: Signal,
    terminate: Signal,
}

impl ShutdownSignals {
    /// Register both listeners. Must run inside a tokio runtime.
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Wait for the next signal and return its name.
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            Some(()) = self.interrupt.recv() => "SIGINT",
            Some(()) = self.terminate.recv() => "SIGTERM",
            else => std::future::pending().await,
        }
    }
}

/// A stream yielding `on_signal(name)` once, on the first shutdown signal.
///
/// If the listeners cannot be registered the stream never yields, and
/// the window can still be closed normally.
pub fn shutdown_stream<T: 'static>(on_signal: fn(&'static str) -> T) -> impl Stream<Item = T> {
    stream::once(async move {
        match ShutdownSignals::install() {
            Ok(mut signals) => {
                let name = signals.recv().await;
                info!("received {}, shutting down", name);
                on_signal(name)
            }
            Err(e) => {
                warn!("cannot listen for shutdown signals: {}", e);
                std::future::pending().await
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use iced::futures::StreamExt;
    use std::time::Duration;

    fn raise(name: &str) {
        let status = std::process::Command::new("kill")
            .args([format!("-{name}"), std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());
    }

    // One test, so no other listener in this process races for the signals.
    #[tokio::test]
    async fn test_signals_are_reported_by_name() {
        let mut stream = Box::pin(shutdown_stream(|name| name.to_string()));

        // The listeners register on first poll, so poll before raising.
        let idle = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;
        assert!(idle.is_err());
        raise("INT");

        let first = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .unwrap();
        assert_eq!(first.as_deref(), Some("SIGINT"));
        assert_eq!(stream.next().await, None);

        let mut signals = ShutdownSignals::install().unwrap();
        raise("TERM");
        let name = tokio::time::timeout(Duration::from_secs(5), signals.recv())
            .await
            .unwrap();
        assert_eq!(name, "SIGTERM");
    }
}
