//! Gameplay notifications and the subscriber list that receives them.

use std::fmt;

use merge_bubbles_core::ObjectId;

/// Gameplay milestones published to observers.
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    /// A merge finished and the absorbed bubbles left play.
    MergeCompleted {
        /// Bubble that grew.
        survivor: ObjectId,
        /// Bubbles that were absorbed.
        absorbed: Vec<ObjectId>,
    },
    /// A bubble grew past every bubble before it.
    NewLargestObject {
        /// Record holder.
        object: ObjectId,
        /// Record scale.
        scale: f32,
    },
    /// The game was won.
    Won {
        /// Bubbles merged over the game.
        score: u32,
    },
}

/// Receives gameplay notifications.
pub trait Observer {
    /// Handles a single notification.
    fn notify(&mut self, notification: &Notification);
}

impl<F> Observer for F
where
    F: FnMut(&Notification),
{
    fn notify(&mut self, notification: &Notification) {
        self(notification);
    }
}

/// Handle returned by [`Observers::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Ordered list of subscribed observers.
#[derive(Default)]
pub struct Observers {
    next_id: u64,
    entries: Vec<(SubscriptionId, Box<dyn Observer>)>,
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("subscribed", &self.entries.len())
            .finish()
    }
}

impl Observers {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an observer that receives every later notification.
    pub fn subscribe(&mut self, observer: Box<dyn Observer>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, observer));
        id
    }

    /// Removes an observer; returns `false` when `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    /// Number of subscribed observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether nobody is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Delivers `notification` to every observer in subscription order.
    pub fn notify(&mut self, notification: &Notification) {
        for (_, observer) in &mut self.entries {
            observer.notify(notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    #[test]
    fn unsubscribed_observers_stop_hearing() {
        let heard = Rc::new(RefCell::new(Vec::new()));
        let mut observers = Observers::new();

        let first = Rc::clone(&heard);
        let id = observers.subscribe(Box::new(move |_: &Notification| {
            first.borrow_mut().push("first")
        }));
        let second = Rc::clone(&heard);
        let _ = observers.subscribe(Box::new(move |_: &Notification| {
            second.borrow_mut().push("second")
        }));

        observers.notify(&Notification::Won { score: 1 });
        assert!(observers.unsubscribe(id));
        assert!(!observers.unsubscribe(id));
        observers.notify(&Notification::Won { score: 2 });

        assert_eq!(*heard.borrow(), vec!["first", "second", "second"]);
        assert_eq!(observers.len(), 1);
    }
}
