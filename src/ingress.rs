//! HTTP endpoint that receives camera frames from the phone page and hands the
//! latest one to the frame loop through a [`FrameSlot`].

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::{mpsc, Arc};
use std::thread;

use crate::frame::{FrameSlot, OfferStatus};

pub fn router(slot: Arc<FrameSlot>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/upload", post(upload))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(slot)
}

/// Body is a raw encoded JPEG/PNG image.
pub async fn upload(State(slot): State<Arc<FrameSlot>>, body: Bytes) -> (StatusCode, &'static str) {
    // No decode while the frame loop holds the slot.
    if slot.is_claimed() {
        return (StatusCode::SERVICE_UNAVAILABLE, "BUSY");
    }
    let image = match image::load_from_memory(&body) {
        Ok(img) => img.to_rgb8(),
        Err(_) => return (StatusCode::BAD_REQUEST, "invalid image"),
    };
    match slot.offer(image) {
        OfferStatus::Stored | OfferStatus::Replaced => (StatusCode::OK, "OK"),
        OfferStatus::Busy => (StatusCode::SERVICE_UNAVAILABLE, "BUSY"),
    }
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn serve(listener: tokio::net::TcpListener, slot: Arc<FrameSlot>, max_body_bytes: usize) -> Result<()> {
    axum::serve(listener, router(slot, max_body_bytes))
        .await
        .context("Ingress server stopped")?;
    Ok(())
}

/// Runs the server on its own thread with a dedicated tokio runtime and
/// returns once the listener is bound.
pub fn spawn(addr: &str, slot: Arc<FrameSlot>, max_body_bytes: usize) -> Result<(SocketAddr, thread::JoinHandle<()>)> {
    let addr = addr.to_string();
    let (ready_tx, ready_rx) = mpsc::channel::<Result<SocketAddr>>();

    let handle = thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                let _ = ready_tx.send(Err(e).context("Failed to build tokio runtime"));
                return;
            }
        };

        runtime.block_on(async move {
            let listener = match tokio::net::TcpListener::bind(&addr).await {
                Ok(l) => l,
                Err(e) => {
                    let _ = ready_tx.send(Err(e).with_context(|| format!("Failed to bind {}", addr)));
                    return;
                }
            };
            let local = match listener.local_addr() {
                Ok(a) => a,
                Err(e) => {
                    let _ = ready_tx.send(Err(e.into()));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(local));
            if let Err(e) = serve(listener, slot, max_body_bytes).await {
                eprintln!("{:#}", e);
            }
        });
    });

    let local = ready_rx
        .recv()
        .context("Ingress thread exited before binding")??;
    Ok((local, handle))
}
