//! Broadcast scheduler: the one periodic background task.
//!
//! Started lazily by the first kiosk connection and cancelled only at
//! process shutdown. Each tick advances the cursor under the state lock,
//! then fans the new photo out to every connected client with the lock
//! released.

use std::time::Duration;

use anyhow::Result;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::events::KioskEvent;
use crate::state::KioskState;

pub async fn run(state: KioskState, period: Duration, cancel: CancellationToken) -> Result<()> {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // An interval's first tick completes immediately; consume it so the
    // photo pushed at connect time stays on screen for a full period.
    ticker.tick().await;

    info!(
        period = %humantime::format_duration(period),
        "slideshow scheduler started"
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting slideshow task");
                break;
            }
            _ = ticker.tick() => {
                match state.advance().await {
                    Some(event) => {
                        let KioskEvent::UpdateImage { url } = &event;
                        debug!(%url, "slideshow advanced");
                        state.broadcast(event).await;
                    }
                    None => {
                        debug!("no photos; skipping tick");
                    }
                }
            }
        }
    }

    Ok(())
}
