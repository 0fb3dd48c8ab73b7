// src/realtime.rs
//! Push feed of result tallies, one broadcast channel per poll.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use futures::stream::{self, Stream, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::PollResults;

pub const CHANNEL_CAPACITY: usize = 16;

#[derive(Default)]
pub struct ResultsHub {
    channels: Mutex<HashMap<Uuid, broadcast::Sender<PollResults>>>,
}

impl ResultsHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn channels(&self) -> MutexGuard<'_, HashMap<Uuid, broadcast::Sender<PollResults>>> {
        self.channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn prune(channels: &mut HashMap<Uuid, broadcast::Sender<PollResults>>) {
        channels.retain(|poll_id, sender| {
            let live = sender.receiver_count() > 0;
            if !live {
                debug!(%poll_id, "Dropped idle results channel");
            }
            live
        });
    }

    pub fn subscribe(&self, poll_id: Uuid) -> broadcast::Receiver<PollResults> {
        let mut channels = self.channels();
        Self::prune(&mut channels);
        channels
            .entry(poll_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Whether anyone still listens to `poll_id`. Channels whose receivers
    /// are all gone, for any poll, are dropped here.
    pub fn is_watched(&self, poll_id: Uuid) -> bool {
        let mut channels = self.channels();
        Self::prune(&mut channels);
        channels.contains_key(&poll_id)
    }

    /// Sends `results` to every subscriber of its poll.
    pub fn publish(&self, results: PollResults) {
        let mut channels = self.channels();
        let poll_id = results.poll_id;
        let Some(sender) = channels.get(&poll_id) else {
            return;
        };
        match sender.send(results) {
            Ok(receivers) => debug!(%poll_id, receivers, "Published results"),
            Err(_) => {
                channels.remove(&poll_id);
                debug!(%poll_id, "Dropped idle results channel");
            }
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels().len()
    }
}

/// `initial` followed by every newer tally from `rx`.
///
/// Votes are never removed, so `total_votes` only grows; a tally that is not
/// ahead of the last one sent was computed before it and is skipped. A lagged
/// receiver skips the messages it missed, since each tally is complete.
pub fn tally_stream(
    initial: PollResults,
    rx: broadcast::Receiver<PollResults>,
) -> impl Stream<Item = PollResults> + Send + 'static {
    let poll_id = initial.poll_id;
    let updates = stream::unfold(
        (rx, initial.total_votes),
        move |(mut rx, last_total)| async move {
            loop {
                match rx.recv().await {
                    Ok(results) if results.total_votes > last_total => {
                        let total = results.total_votes;
                        return Some((results, (rx, total)));
                    }
                    Ok(stale) => {
                        debug!(%poll_id, total = stale.total_votes, "Skipped stale tally");
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(%poll_id, skipped, "Results subscriber lagged");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        },
    );

    stream::once(async move { initial }).chain(updates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn results(poll_id: Uuid, total_votes: i64) -> PollResults {
        PollResults {
            poll_id,
            total_votes,
            results: vec![],
        }
    }

    async fn next_total<S: Stream<Item = PollResults> + Unpin>(stream: &mut S) -> i64 {
        tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("stream stalled")
            .expect("stream ended")
            .total_votes
    }

    #[tokio::test]
    async fn test_subscriber_receives_published_results() {
        let hub = ResultsHub::new();
        let poll_id = Uuid::new_v4();
        let mut rx = hub.subscribe(poll_id);

        hub.publish(results(poll_id, 3));

        assert_eq!(rx.recv().await.unwrap().total_votes, 3);
    }

    #[tokio::test]
    async fn test_other_polls_are_isolated() {
        let hub = ResultsHub::new();
        let watched = Uuid::new_v4();
        let mut rx = hub.subscribe(watched);

        hub.publish(results(Uuid::new_v4(), 1));
        hub.publish(results(watched, 2));

        assert_eq!(rx.recv().await.unwrap().total_votes, 2);
    }

    #[test]
    fn test_idle_channel_dropped_on_publish() {
        let hub = ResultsHub::new();
        let poll_id = Uuid::new_v4();
        let rx = hub.subscribe(poll_id);
        assert!(hub.is_watched(poll_id));

        drop(rx);
        hub.publish(results(poll_id, 1));

        assert_eq!(hub.channel_count(), 0);
    }

    #[test]
    fn test_idle_channel_dropped_on_watch_check() {
        let hub = ResultsHub::new();
        let poll_id = Uuid::new_v4();
        drop(hub.subscribe(poll_id));

        assert!(!hub.is_watched(poll_id));
        assert_eq!(hub.channel_count(), 0);
    }

    #[test]
    fn test_subscribe_prunes_abandoned_polls() {
        let hub = ResultsHub::new();
        for _ in 0..3 {
            drop(hub.subscribe(Uuid::new_v4()));
        }

        let _rx = hub.subscribe(Uuid::new_v4());

        assert_eq!(hub.channel_count(), 1);
    }

    #[tokio::test]
    async fn test_stream_starts_with_initial_tally() {
        let hub = ResultsHub::new();
        let poll_id = Uuid::new_v4();
        let mut stream = Box::pin(tally_stream(results(poll_id, 4), hub.subscribe(poll_id)));

        assert_eq!(next_total(&mut stream).await, 4);
        hub.publish(results(poll_id, 5));
        assert_eq!(next_total(&mut stream).await, 5);
    }

    #[tokio::test]
    async fn test_stream_skips_stale_tallies() {
        let hub = ResultsHub::new();
        let poll_id = Uuid::new_v4();
        let mut stream = Box::pin(tally_stream(results(poll_id, 1), hub.subscribe(poll_id)));
        assert_eq!(next_total(&mut stream).await, 1);

        hub.publish(results(poll_id, 3));
        hub.publish(results(poll_id, 2));
        hub.publish(results(poll_id, 3));
        hub.publish(results(poll_id, 4));

        assert_eq!(next_total(&mut stream).await, 3);
        assert_eq!(next_total(&mut stream).await, 4);
    }

    #[tokio::test]
    async fn test_lagged_stream_keeps_going() {
        let hub = ResultsHub::new();
        let poll_id = Uuid::new_v4();
        let mut stream = Box::pin(tally_stream(results(poll_id, 0), hub.subscribe(poll_id)));
        assert_eq!(next_total(&mut stream).await, 0);

        let overflow = CHANNEL_CAPACITY as i64 + 5;
        for total in 1..=overflow {
            hub.publish(results(poll_id, total));
        }

        // The oldest retained message is the first one after the overflow.
        assert_eq!(next_total(&mut stream).await, 6);
        for _ in 7..=overflow {
            next_total(&mut stream).await;
        }

        hub.publish(results(poll_id, overflow + 1));
        assert_eq!(next_total(&mut stream).await, overflow + 1);
    }
}
