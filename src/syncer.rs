//! Background flush: a periodic task that drains the buffered writer to
//! durable storage independently of caller activity.
//!
//! The task competes for the same engine lock as `append`, so ticks are
//! serialized with foreground writes. Flush failures are logged and
//! non-fatal; the next tick retries naturally. The thread stops when the
//! shutdown channel receives a message or disconnects (engine dropped).

use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{select, tick, Receiver};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::writer::Appender;

pub(crate) fn spawn(
    appender: Arc<Mutex<Appender>>,
    period: Duration,
    shutdown: Receiver<()>,
) -> io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("seglog-syncer".into())
        .spawn(move || {
            let ticker = tick(period);
            loop {
                select! {
                    recv(ticker) -> _ => {
                        if let Err(e) = appender.lock().sync() {
                            warn!(error = %e, "background flush failed");
                        }
                    }
                    recv(shutdown) -> _ => {
                        debug!("background syncer stopping");
                        break;
                    }
                }
            }
        })
}
