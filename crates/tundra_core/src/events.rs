//! In-process domain event bus.
//!
//! # Responsibility
//! - Carry typed domain events from core mutations to subscribers.
//! - Separate synchronous (in-transaction) delivery from post-commit
//!   delivery.
//!
//! # Invariants
//! - A synchronous subscriber error aborts the publishing operation.
//! - Post-commit subscribers only ever see events of committed
//!   transactions; their failures are logged, never propagated.
//! - Pending events are dropped when the publishing transaction rolls
//!   back.

use crate::model::referent::ReferentKind;
use crate::model::taxonomy::TaxonomyKind;
use log::warn;
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Typed domain event payloads. Plain records, never transport objects.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    ProjectSaved {
        project_id: i64,
        created: bool,
    },
    MembershipSaved {
        membership_id: i64,
        project_id: i64,
        created: bool,
    },
    MembershipRemoved {
        membership_id: i64,
        project_id: i64,
    },
    /// Emitted once per successful move-on-destroy, per taxonomy kind.
    TaxonomyMovedOnDestroy {
        kind: TaxonomyKind,
        project_id: i64,
        deleted_id: i64,
        moved_id: i64,
    },
    /// Emitted when the closure propagator flips a story's mirror.
    StoryClosureChanged {
        user_story_id: i64,
        project_id: i64,
        is_closed: bool,
    },
    ReferentDeleted {
        kind: ReferentKind,
        referent_id: i64,
        project_id: i64,
    },
}

/// Error raised by a synchronous subscriber; aborts the publish.
#[derive(Debug)]
pub struct SubscriberError {
    pub subscriber: String,
    pub message: String,
}

impl Display for SubscriberError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "subscriber `{}` failed: {}", self.subscriber, self.message)
    }
}

impl Error for SubscriberError {}

type SyncHandler = Box<dyn Fn(&DomainEvent) -> Result<(), String>>;
type PostCommitHandler = Box<dyn Fn(&DomainEvent)>;

struct SyncSubscriber {
    name: String,
    handler: SyncHandler,
}

struct PostCommitSubscriber {
    name: String,
    handler: PostCommitHandler,
}

/// Event bus with at-most-once synchronous and post-commit delivery.
///
/// The core is synchronous; interior mutability keeps the bus shareable
/// by reference alongside the database connection.
#[derive(Default)]
pub struct EventBus {
    sync_subscribers: RefCell<Vec<SyncSubscriber>>,
    post_commit_subscribers: RefCell<Vec<PostCommitSubscriber>>,
    pending: RefCell<Vec<DomainEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber running inside the publishing operation.
    /// Returning `Err` aborts that operation.
    pub fn subscribe_sync(
        &self,
        name: impl Into<String>,
        handler: impl Fn(&DomainEvent) -> Result<(), String> + 'static,
    ) {
        self.sync_subscribers.borrow_mut().push(SyncSubscriber {
            name: name.into(),
            handler: Box::new(handler),
        });
    }

    /// Registers a subscriber delivered after the transaction commits.
    pub fn subscribe_post_commit(
        &self,
        name: impl Into<String>,
        handler: impl Fn(&DomainEvent) + 'static,
    ) {
        self.post_commit_subscribers
            .borrow_mut()
            .push(PostCommitSubscriber {
                name: name.into(),
                handler: Box::new(handler),
            });
    }

    /// Publishes one event: synchronous subscribers run immediately, the
    /// event is queued for post-commit delivery.
    pub fn publish(&self, event: DomainEvent) -> Result<(), SubscriberError> {
        for subscriber in self.sync_subscribers.borrow().iter() {
            if let Err(message) = (subscriber.handler)(&event) {
                return Err(SubscriberError {
                    subscriber: subscriber.name.clone(),
                    message,
                });
            }
        }
        self.pending.borrow_mut().push(event);
        Ok(())
    }

    /// Delivers all queued events to post-commit subscribers.
    ///
    /// Call after the publishing transaction committed.
    pub fn commit_pending(&self) {
        let events = std::mem::take(&mut *self.pending.borrow_mut());
        for event in &events {
            for subscriber in self.post_commit_subscribers.borrow().iter() {
                (subscriber.handler)(event);
            }
        }
    }

    /// Drops queued events after a rollback.
    pub fn discard_pending(&self) {
        let dropped = self.pending.borrow_mut().len();
        if dropped > 0 {
            warn!(
                "event=bus_discard module=events status=ok dropped={}",
                dropped
            );
        }
        self.pending.borrow_mut().clear();
    }

    /// Number of events awaiting post-commit delivery.
    pub fn pending_len(&self) -> usize {
        self.pending.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::{DomainEvent, EventBus};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn sample_event() -> DomainEvent {
        DomainEvent::ProjectSaved {
            project_id: 1,
            created: true,
        }
    }

    #[test]
    fn sync_subscriber_error_aborts_publish_and_queues_nothing() {
        let bus = EventBus::new();
        bus.subscribe_sync("rejector", |_| Err("nope".to_string()));

        let err = bus.publish(sample_event()).expect_err("publish must fail");
        assert_eq!(err.subscriber, "rejector");
        assert_eq!(bus.pending_len(), 0);
    }

    #[test]
    fn post_commit_delivery_waits_for_commit() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.subscribe_post_commit("sink", move |event| {
            sink.borrow_mut().push(event.clone());
        });

        bus.publish(sample_event()).expect("publish succeeds");
        assert!(seen.borrow().is_empty());

        bus.commit_pending();
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn discard_pending_suppresses_post_commit_delivery() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(0usize));
        let sink = Rc::clone(&seen);
        bus.subscribe_post_commit("sink", move |_| {
            *sink.borrow_mut() += 1;
        });

        bus.publish(sample_event()).expect("publish succeeds");
        bus.discard_pending();
        bus.commit_pending();
        assert_eq!(*seen.borrow(), 0);
    }
}
