use std::{sync::Arc, time::Duration};

use serde_json::Value;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::mpsc,
    task::JoinSet,
    time::timeout,
};

use crate::{infrastructure::shutdown::ShutdownListener, tasks::dispatch::Dispatcher};

use super::{
    codec::{read_frame, write_message, BridgeError, MAX_OUTBOUND_FRAME},
    messages::{Inbound, Outbound, ReplyMessage},
    outbox::Outbox,
};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

enum ReaderEvent {
    Frame(Vec<u8>),
    Oversized { size: usize },
    Closed,
    Failed(BridgeError),
}

/// Reads framed messages from the extension, runs each one on its own
/// task, and writes replies plus presenter output back.
pub struct BridgeHost {
    dispatcher: Arc<Dispatcher>,
    outbox: Outbox,
    max_inbound: usize,
}

impl BridgeHost {
    pub fn new(dispatcher: Arc<Dispatcher>, outbox: Outbox, max_inbound: usize) -> Self {
        Self {
            dispatcher,
            outbox,
            max_inbound,
        }
    }

    pub async fn serve<R, W>(
        self,
        reader: R,
        mut writer: W,
        mut outbound: mpsc::UnboundedReceiver<Outbound>,
        mut shutdown: ShutdownListener,
    ) -> Result<(), BridgeError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin,
    {
        let mut frames = spawn_reader(reader, self.max_inbound);
        let mut tasks = JoinSet::new();
        let mut failure = None;

        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    tracing::info!(target: "bridge", "shutdown requested; closing bridge");
                    break;
                }
                event = frames.recv() => match event {
                    Some(ReaderEvent::Frame(payload)) => self.spawn_dispatch(&mut tasks, payload),
                    Some(ReaderEvent::Oversized { size }) => {
                        tracing::warn!(target: "bridge", size, "dropped oversized message");
                        self.outbox.send(Outbound::Reply(ReplyMessage::failed(
                            None,
                            format!("message of {size} bytes exceeds {} bytes", self.max_inbound),
                        )));
                    }
                    Some(ReaderEvent::Failed(err)) => {
                        failure = Some(err);
                        break;
                    }
                    Some(ReaderEvent::Closed) | None => {
                        tracing::info!(target: "bridge", "extension disconnected");
                        break;
                    }
                },
                Some(message) = outbound.recv() => {
                    write_outbound(&mut writer, message).await?;
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(err) = joined {
                        if err.is_panic() {
                            tracing::error!(target: "bridge", "message handler panicked");
                        }
                    }
                }
            }
        }

        if timeout(DRAIN_TIMEOUT, async { while tasks.join_next().await.is_some() {} })
            .await
            .is_err()
        {
            tracing::warn!(
                target: "bridge",
                "pending messages did not finish within {:?}; abandoning them",
                DRAIN_TIMEOUT
            );
            tasks.abort_all();
        }
        while let Ok(message) = outbound.try_recv() {
            write_outbound(&mut writer, message).await?;
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn spawn_dispatch(&self, tasks: &mut JoinSet<()>, payload: Vec<u8>) {
        let inbound = match serde_json::from_slice::<Inbound>(&payload) {
            Ok(inbound) => inbound,
            Err(err) => {
                let id = serde_json::from_slice::<Value>(&payload)
                    .ok()
                    .and_then(|value| value.get("id").and_then(Value::as_u64));
                tracing::warn!(target: "bridge", error = %err, "unrecognized message");
                self.outbox.send(Outbound::Reply(ReplyMessage::failed(
                    id,
                    format!("unrecognized message: {err}"),
                )));
                return;
            }
        };

        let dispatcher = self.dispatcher.clone();
        let outbox = self.outbox.clone();
        tasks.spawn(async move {
            let Inbound { id, command } = inbound;
            let action = command.action();
            let reply = match dispatcher.dispatch(command).await {
                Ok(reply) => match serde_json::to_value(reply) {
                    Ok(data) => ReplyMessage::ok(id, Some(data)),
                    Err(err) => ReplyMessage::failed(id, err.to_string()),
                },
                Err(err) => {
                    tracing::debug!(target: "bridge", action, error = %err, "message failed");
                    ReplyMessage::failed(id, err.to_string())
                }
            };
            outbox.send(Outbound::Reply(reply));
        });
    }
}

fn spawn_reader<R>(mut reader: R, max_inbound: usize) -> mpsc::UnboundedReceiver<ReaderEvent>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (sender, receiver) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        loop {
            let event = match read_frame(&mut reader, max_inbound).await {
                Ok(Some(payload)) => ReaderEvent::Frame(payload),
                Ok(None) => ReaderEvent::Closed,
                Err(BridgeError::FrameTooLarge { size, .. }) => ReaderEvent::Oversized { size },
                Err(err) => ReaderEvent::Failed(err),
            };
            let last = matches!(event, ReaderEvent::Closed | ReaderEvent::Failed(_));
            if sender.send(event).is_err() || last {
                break;
            }
        }
    });
    receiver
}

async fn write_outbound<W>(writer: &mut W, message: Outbound) -> Result<(), BridgeError>
where
    W: AsyncWrite + Unpin,
{
    let payload = serde_json::to_vec(&message)?;
    if payload.len() <= MAX_OUTBOUND_FRAME {
        return super::codec::write_frame(writer, &payload).await;
    }

    tracing::error!(target: "bridge", size = payload.len(), "outbound message too large");
    if let Outbound::Reply(reply) = message {
        let fallback = ReplyMessage::failed(reply.id, "reply exceeds native messaging limit");
        write_message(writer, &Outbound::Reply(fallback)).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::io::{duplex, split, AsyncWriteExt};

    use super::*;
    use crate::{
        bridge::codec::{write_message as send, MAX_INBOUND_FRAME},
        infrastructure::shutdown::Shutdown,
        test_support::{unreachable_endpoint, TestContext},
    };

    async fn read_json<R: AsyncRead + Unpin>(reader: &mut R) -> Value {
        let frame = read_frame(reader, MAX_INBOUND_FRAME).await.unwrap().unwrap();
        serde_json::from_slice(&frame).unwrap()
    }

    #[tokio::test]
    async fn check_over_the_wire_pushes_badge_banner_and_reply() {
        let test = TestContext::with_outbox(&unreachable_endpoint().await).await;
        let (outbox, outbound) = test.take_outbox();
        let host = BridgeHost::new(Arc::new(test.dispatcher()), outbox, MAX_INBOUND_FRAME);

        let (extension, native) = duplex(64 * 1024);
        let (native_read, native_write) = split(native);
        let (mut ext_read, mut ext_write) = split(extension);
        let (shutdown, _) = Shutdown::new();
        let serving = tokio::spawn(host.serve(
            native_read,
            native_write,
            outbound,
            shutdown.subscribe(),
        ));

        send(
            &mut ext_write,
            &json!({
                "id": 1, "action": "checkWebsite", "url": "https://shady-example.com/", "tabId": 5
            }),
        )
        .await
        .unwrap();

        let badge = read_json(&mut ext_read).await;
        assert_eq!(
            badge,
            json!({"type": "setBadge", "tabId": 5, "text": "⚠", "color": "#FF5722"})
        );
        let banner = read_json(&mut ext_read).await;
        assert_eq!(banner["type"], "showWarning");
        assert_eq!(banner["host"], "shady-example.com");
        assert_eq!(banner["confidencePercent"], 30);
        let reply = read_json(&mut ext_read).await;
        assert_eq!(reply["type"], "reply");
        assert_eq!(reply["id"], 1);
        assert_eq!(reply["success"], true);
        assert_eq!(reply["data"]["kind"], "checked");

        ext_write.shutdown().await.unwrap();
        drop(ext_write);
        serving.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn bad_message_gets_error_reply_and_bridge_keeps_going() {
        let test = TestContext::with_outbox(&unreachable_endpoint().await).await;
        let (outbox, outbound) = test.take_outbox();
        let host = BridgeHost::new(Arc::new(test.dispatcher()), outbox, MAX_INBOUND_FRAME);

        let (extension, native) = duplex(64 * 1024);
        let (native_read, native_write) = split(native);
        let (mut ext_read, mut ext_write) = split(extension);
        let (shutdown, _) = Shutdown::new();
        let serving = tokio::spawn(host.serve(
            native_read,
            native_write,
            outbound,
            shutdown.subscribe(),
        ));

        send(&mut ext_write, &json!({"id": 7, "action": "launchRockets"})).await.unwrap();
        let reply = read_json(&mut ext_read).await;
        assert_eq!(reply["id"], 7);
        assert_eq!(reply["success"], false);

        send(&mut ext_write, &json!({"id": 8, "action": "getStats"})).await.unwrap();
        let reply = read_json(&mut ext_read).await;
        assert_eq!(reply["id"], 8);
        assert_eq!(reply["data"]["sitesChecked"], 0);

        shutdown.trigger();
        serving.await.unwrap().unwrap();
    }
}
