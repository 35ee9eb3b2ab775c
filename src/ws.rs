//! Connection handler for kiosk display clients.
//!
//! Each accepted WebSocket gets a per-connection channel registered in the
//! shared state; the loop below forwards queued events to the socket and
//! watches for the peer going away. The first connection also starts the
//! slideshow scheduler.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tracing::{info, warn};

use crate::tasks::slideshow;
use crate::web::AppState;

pub async fn handle_ws(State(app): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_client(socket, app))
}

async fn run_client(mut socket: WebSocket, app: AppState) {
    ensure_scheduler(&app).await;

    let (client_id, mut events) = app.kiosk.subscribe().await;
    let clients = app.kiosk.client_count().await;
    info!(
        %client_id,
        clients,
        "kiosk client connected"
    );

    loop {
        tokio::select! {
            maybe_event = events.recv() => {
                // The sender half lives in the registry; `None` means we were
                // pruned after a failed broadcast.
                let Some(event) = maybe_event else { break };
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(err) => {
                        warn!(%client_id, error = %err, "failed to serialize kiosk event");
                        continue;
                    }
                };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            maybe_msg = socket.recv() => {
                match maybe_msg {
                    None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                    // Kiosk clients are display-only; inbound frames are ignored.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    app.kiosk.unsubscribe(client_id).await;
    info!(%client_id, "kiosk client disconnected");
}

/// Start the slideshow scheduler exactly once, however many clients race the
/// first connection. The winner performs the initial refresh before the cell
/// resolves, so concurrent losers subscribe against a populated photo set.
async fn ensure_scheduler(app: &AppState) {
    app.scheduler_started
        .get_or_init(|| async {
            app.kiosk.refresh().await;
            info!("first kiosk client; starting slideshow scheduler");
            tokio::spawn(slideshow::run(
                app.kiosk.clone(),
                app.tick_period,
                app.shutdown.clone(),
            ));
        })
        .await;
}
