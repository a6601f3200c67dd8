//! Countdown ticker background task

use std::time::Duration;
use tokio::{
    sync::{mpsc, oneshot, watch},
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{engine::CountdownDriver, state::CountdownSnapshot};

/// Requests a host can send to a running ticker
#[derive(Debug)]
pub enum TickerControl {
    /// Close the open modal; the updated snapshot is sent back on the reply channel
    Dismiss(oneshot::Sender<CountdownSnapshot>),
    /// Stop ticking and exit
    Unmount,
}

/// Background task that ticks one countdown once per second
///
/// Every tick recomputes from the stored deadline, runs the resulting
/// effects and publishes the snapshot on `snapshot_tx`. After expiry the
/// task stops ticking but keeps serving controls until it is unmounted or
/// its control channel closes.
pub async fn countdown_ticker_task(
    mut driver: CountdownDriver,
    snapshot_tx: watch::Sender<CountdownSnapshot>,
    mut control_rx: mpsc::UnboundedReceiver<TickerControl>,
) {
    let key = driver.key().to_string();
    info!("Starting countdown ticker for {}", key);

    let mut ticker = interval(Duration::from_secs(1));
    // A late tick shifts the schedule instead of bursting
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick(), if !driver.is_expired() => {
                let snapshot = driver.step();
                debug!("Timer {} at {}", key, snapshot.display);
                if snapshot_tx.send(snapshot).is_err() {
                    warn!("No snapshot receivers left for {}, stopping", key);
                    break;
                }
                if driver.is_expired() {
                    info!("Timer {} expired, ticker idle until unmount", key);
                }
            }

            control = control_rx.recv() => {
                match control {
                    Some(TickerControl::Dismiss(reply)) => {
                        let snapshot = driver.dismiss();
                        // The requester may have given up waiting
                        let _ = reply.send(snapshot.clone());
                        if snapshot_tx.send(snapshot).is_err() {
                            break;
                        }
                    }
                    Some(TickerControl::Unmount) | None => {
                        debug!("Unmounting ticker for {}", key);
                        break;
                    }
                }
            }
        }
    }

    info!("Countdown ticker for {} stopped", key);
}
