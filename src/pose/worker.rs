use anyhow::{anyhow, bail, Result};
use image::RgbImage;
use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::Duration;

use super::keypoint::Pose;
use super::source::KeypointSource;

struct InferenceRequest {
    frame_id: u64,
    image: RgbImage,
}

struct InferenceResult {
    frame_id: u64,
    subjects: Result<Vec<Pose>>,
}

/// 1フレーム分の推論結果
#[derive(Debug)]
pub enum InferenceOutcome {
    Detected(Vec<Pose>),
    /// タイムアウト。このフレームは検出なし扱い
    TimedOut,
    /// 前の推論がまだ終わっていないので投入しなかった
    Busy,
    Failed(anyhow::Error),
}

/// 推論スレッドとの窓口。同時に投入できる推論は1件だけ
pub struct InferenceWorker {
    tx: mpsc::SyncSender<InferenceRequest>,
    rx: mpsc::Receiver<InferenceResult>,
    in_flight: Option<u64>,
    next_frame_id: u64,
    timeout: Duration,
    _handle: thread::JoinHandle<()>,
}

impl InferenceWorker {
    pub fn spawn<S: KeypointSource + 'static>(mut source: S, timeout: Duration) -> Self {
        let (tx, req_rx) = mpsc::sync_channel::<InferenceRequest>(1);
        let (res_tx, rx) = mpsc::channel::<InferenceResult>();

        let handle = thread::spawn(move || {
            for req in req_rx {
                let subjects = source.detect(&req.image);
                let result = InferenceResult {
                    frame_id: req.frame_id,
                    subjects,
                };
                if res_tx.send(result).is_err() {
                    break;
                }
            }
        });

        Self {
            tx,
            rx,
            in_flight: None,
            next_frame_id: 0,
            timeout,
            _handle: handle,
        }
    }

    /// 推論中でなければ true。タイムアウト済みの遅延結果はここで捨てる
    pub fn is_idle(&mut self) -> bool {
        if let Some(id) = self.in_flight {
            match self.rx.try_recv() {
                Ok(result) if result.frame_id == id => self.in_flight = None,
                Ok(_) | Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => self.in_flight = None,
            }
        }
        self.in_flight.is_none()
    }

    /// 画像を投入し、タイムアウトまで結果を待つ
    pub fn infer(&mut self, image: RgbImage) -> Result<InferenceOutcome> {
        if !self.is_idle() {
            return Ok(InferenceOutcome::Busy);
        }

        let frame_id = self.next_frame_id;
        self.next_frame_id += 1;
        self.tx
            .send(InferenceRequest { frame_id, image })
            .map_err(|_| anyhow!("inference thread stopped"))?;
        self.in_flight = Some(frame_id);

        loop {
            match self.rx.recv_timeout(self.timeout) {
                Ok(result) if result.frame_id == frame_id => {
                    self.in_flight = None;
                    return Ok(match result.subjects {
                        Ok(subjects) => InferenceOutcome::Detected(subjects),
                        Err(e) => InferenceOutcome::Failed(e),
                    });
                }
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => return Ok(InferenceOutcome::TimedOut),
                Err(RecvTimeoutError::Disconnected) => {
                    self.in_flight = None;
                    bail!("inference thread stopped");
                }
            }
        }
    }
}
