use std::{future::Future, time::Duration};

use tokio::{runtime::Runtime, sync::watch};

/// Process-wide stop flag. Triggered by a signal or by the extension
/// closing the native messaging pipe.
#[derive(Clone)]
pub struct Shutdown {
    sender: watch::Sender<bool>,
}

#[derive(Clone)]
pub struct ShutdownListener {
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> (Self, ShutdownListener) {
        let (sender, receiver) = watch::channel(false);
        (Self { sender }, ShutdownListener { receiver })
    }

    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }
}

impl ShutdownListener {
    /// Resolves once shutdown has been triggered, including when it already was.
    pub async fn notified(&mut self) {
        let _ = self.receiver.wait_for(|stopped| *stopped).await;
    }
}

pub fn install_signal_handlers(shutdown: Shutdown) {
    let ctrlc = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(target: "shutdown", "received interrupt");
            ctrlc.trigger();
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let term = shutdown.clone();
        tokio::spawn(async move {
            if let Ok(mut sig) = signal(SignalKind::terminate()) {
                sig.recv().await;
                tracing::info!(target: "shutdown", "received SIGTERM");
                term.trigger();
            }
        });
    }
}

/// Drives `future` to completion, then tears the runtime down without
/// waiting more than `grace` for blocking threads. The stdin reader sits in
/// a read that cannot be cancelled, so a plain runtime drop would keep the
/// process alive until the browser closes the pipe.
pub fn run_with_grace<F>(runtime: Runtime, grace: Duration, future: F) -> F::Output
where
    F: Future,
{
    let output = runtime.block_on(future);
    runtime.shutdown_timeout(grace);
    output
}
