use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::inference::engine::{SessionEngine, SessionReport};
use crate::inference::types::{FrameObservation, StatusRecord};

/// Drives one session on its own task.
///
/// Frames are processed strictly in arrival order. Closing the frame channel
/// ends the session; the report comes back through the join handle.
pub struct SessionRunner;

impl SessionRunner {
    pub fn spawn(
        mut engine: SessionEngine,
        mut frames_rx: mpsc::Receiver<FrameObservation>,
        records_tx: mpsc::Sender<StatusRecord>,
    ) -> JoinHandle<SessionReport> {
        tokio::spawn(async move {
            let session_id = engine.session_id();
            let mut downstream_open = true;
            tracing::debug!(session_id = %session_id, "session_runner: start");

            while let Some(frame) = frames_rx.recv().await {
                let records = engine.process_frame(&frame);
                if !downstream_open {
                    continue;
                }
                for record in records {
                    if records_tx.send(record).await.is_err() {
                        // 下游已关闭：继续消费帧以完成统计，不再转发
                        tracing::warn!(session_id = %session_id, "Record receiver dropped");
                        downstream_open = false;
                        break;
                    }
                }
            }

            tracing::debug!(session_id = %session_id, "session_runner: frame channel closed");
            engine.finish()
        })
    }
}

/// Bounded frame/record channel pair for one session.
pub fn channels(
    capacity: usize,
) -> (
    (mpsc::Sender<FrameObservation>, mpsc::Receiver<FrameObservation>),
    (mpsc::Sender<StatusRecord>, mpsc::Receiver<StatusRecord>),
) {
    let capacity = capacity.max(1);
    (mpsc::channel(capacity), mpsc::channel(capacity))
}
