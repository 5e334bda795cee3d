//! Streaming progress API: observe a job until it reaches a terminal state.
//!
//! ## Why a bounded stream?
//!
//! Batches take minutes when the model is the bottleneck. A stream lets
//! callers drive progress bars or server-sent events without polling logic
//! of their own. Unlike an infinite generator, the stream terminates
//! deterministically: it yields snapshots until the job reaches
//! `completed` or `error`, delivers that final snapshot, and ends.
//!
//! Between state changes the stream re-yields the current snapshot at the
//! configured poll interval, so a consumer forwarding items to a client
//! produces a steady heartbeat even while a slow file converts.
//!
//! After the final snapshot is delivered, the job's progress record is
//! reclaimed on a short grace delay — failed jobs disappear entirely;
//! completed jobs keep their registry entry so the archive can still be
//! downloaded (the idle TTL covers the never-downloaded case).

use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::job::{JobRegistry, ProgressSnapshot};
use futures::stream::Stream;
use tokio::sync::watch;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Observe a job's progress as a bounded stream of snapshots.
///
/// Snapshots are monotonic: the processed count never decreases and the
/// job state never regresses. Fails immediately with
/// [`ConvertError::JobNotFound`] for an unknown id.
pub fn progress_stream(
    registry: &JobRegistry,
    id: &str,
    config: &ConversionConfig,
) -> Result<impl Stream<Item = ProgressSnapshot> + Send, ConvertError> {
    let rx = registry.subscribe(id)?;
    let registry = registry.clone();
    let id = id.to_string();
    let poll = Duration::from_millis(config.poll_interval_ms);
    let grace = Duration::from_millis(config.grace_delay_ms);

    struct StreamState {
        rx: watch::Receiver<ProgressSnapshot>,
        first: bool,
    }

    let state = Some(StreamState { rx, first: true });

    Ok(futures::stream::unfold(state, move |state| {
        let registry = registry.clone();
        let id = id.clone();
        async move {
            let mut state = state?;

            // A closed channel means the pipeline task is gone (it owns the
            // writer); without this the loop would spin re-emitting the same
            // stale snapshot forever.
            let mut writer_gone = false;
            if !state.first {
                // Wait for the next change, or re-emit after the bounded
                // inter-poll delay.
                match timeout(poll, state.rx.changed()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(_)) => writer_gone = true,
                    Err(_) => {} // poll elapsed, heartbeat re-emit
                }
            }
            state.first = false;

            let snapshot = state.rx.borrow_and_update().clone();

            if snapshot.state.is_terminal() {
                debug!("job {id}: final snapshot delivered, scheduling reclaim");
                tokio::spawn(async move {
                    sleep(grace).await;
                    registry.reclaim_if_failed(&id);
                });
                Some((snapshot, None))
            } else if writer_gone {
                // The task died without publishing a terminal state. Deliver
                // what we have once and end the stream rather than spin on a
                // closed channel.
                warn!("job {id}: progress writer dropped mid-job, ending stream");
                Some((snapshot, None))
            } else {
                Some((snapshot, Some(state)))
            }
        }
    }))
}
