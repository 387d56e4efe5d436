//! Change notification for committed writes.
//!
//! Every write committed through [`Database`] publishes the tables it
//! touched. Callers hold a [`Subscription`] for raw notifications or a
//! [`Watch`] that re-runs its query and hands back a fresh snapshot.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

use crate::error::Result;
use crate::store::Database;

/// Tables that can be observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Exercises,
    WorkoutTemplates,
    TemplateExercises,
    WorkoutDays,
    WorkoutEntries,
    SetEntries,
}

#[derive(Default)]
pub(crate) struct ChangeFeed {
    subscribers: Vec<(Vec<Table>, Sender<Table>)>,
}

impl ChangeFeed {
    pub(crate) fn subscribe(&mut self, tables: &[Table]) -> Subscription {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push((tables.to_vec(), tx));
        Subscription { rx }
    }

    /// Notify every subscriber interested in one of `touched`. Subscribers
    /// whose receiving side was dropped are removed.
    pub(crate) fn publish(&mut self, touched: &[Table]) {
        self.subscribers.retain(|(tables, tx)| {
            touched
                .iter()
                .filter(|t| tables.contains(t))
                .all(|t| tx.send(*t).is_ok())
        });
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.subscribers.len()
    }
}

/// Receiving end of a table subscription.
pub struct Subscription {
    rx: Receiver<Table>,
}

impl Subscription {
    /// Next pending notification, if any.
    pub fn try_next(&self) -> Option<Table> {
        match self.rx.try_recv() {
            Ok(t) => Some(t),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block up to `timeout` for the next notification.
    pub fn next_timeout(&self, timeout: Duration) -> Option<Table> {
        match self.rx.recv_timeout(timeout) {
            Ok(t) => Some(t),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Consume all pending notifications and return how many there were.
    pub fn drain(&self) -> usize {
        std::iter::from_fn(|| self.try_next()).count()
    }
}

/// A query re-evaluated whenever a write touches one of its tables.
pub struct Watch<T, F>
where
    F: Fn(&Database) -> Result<T>,
{
    subscription: Subscription,
    query: F,
    primed: bool,
}

impl<T, F> Watch<T, F>
where
    F: Fn(&Database) -> Result<T>,
{
    pub(crate) fn new(subscription: Subscription, query: F) -> Self {
        Self {
            subscription,
            query,
            primed: false,
        }
    }

    /// Return a full snapshot on the first poll and after every committed
    /// write to a watched table. `None` means nothing changed.
    pub fn poll(&mut self, db: &Database) -> Result<Option<T>> {
        let changed = self.subscription.drain() > 0;
        if self.primed && !changed {
            return Ok(None);
        }
        self.primed = true;
        (self.query)(db).map(Some)
    }

    /// Re-run the query regardless of pending notifications.
    pub fn snapshot(&self, db: &Database) -> Result<T> {
        (self.query)(db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_only_reaches_interested_subscribers() {
        let mut feed = ChangeFeed::default();
        let sets = feed.subscribe(&[Table::SetEntries]);
        let days = feed.subscribe(&[Table::WorkoutDays, Table::WorkoutEntries]);

        feed.publish(&[Table::WorkoutDays, Table::WorkoutEntries]);

        assert_eq!(sets.try_next(), None);
        assert_eq!(days.drain(), 2);
    }

    #[test]
    fn dropped_subscriptions_are_pruned() {
        let mut feed = ChangeFeed::default();
        let keep = feed.subscribe(&[Table::Exercises]);
        drop(feed.subscribe(&[Table::Exercises]));
        assert_eq!(feed.len(), 2);

        feed.publish(&[Table::Exercises]);

        assert_eq!(feed.len(), 1);
        assert_eq!(
            keep.next_timeout(Duration::from_millis(10)),
            Some(Table::Exercises)
        );
    }
}
