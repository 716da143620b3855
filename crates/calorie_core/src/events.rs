//! Process-scoped application event bus.
//!
//! # Responsibility
//! - Let one screen tell others that entries changed, without a global.
//! - Tie each handler's lifetime to the `Subscription` its owner holds.
//!
//! # Invariants
//! - Handlers run synchronously, in subscription order.
//! - An event published from inside a handler is queued and delivered after
//!   the current event has reached every handler.
//! - A dropped `Subscription` never receives another event.

use log::debug;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

/// Fire-and-forget notifications between screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppEvent {
    EntryCreated,
    EntryDeleted,
}

impl AppEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EntryCreated => "entry_created",
            Self::EntryDeleted => "entry_deleted",
        }
    }
}

type Handler = Box<dyn FnMut(AppEvent)>;

#[derive(Default)]
struct BusState {
    next_id: u64,
    handlers: Vec<(u64, Handler)>,
    removed: Vec<u64>,
    queue: VecDeque<AppEvent>,
    dispatching: bool,
}

/// Cloneable handle to one bus; clones share handlers.
#[derive(Clone, Default)]
pub struct EventBus {
    state: Rc<RefCell<BusState>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` until the returned `Subscription` is dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, handler: impl FnMut(AppEvent) + 'static) -> Subscription {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = state.next_id;
        state.handlers.push((id, Box::new(handler)));
        Subscription {
            id,
            state: Rc::downgrade(&self.state),
        }
    }

    /// Delivers `event` to every live handler.
    pub fn publish(&self, event: AppEvent) {
        {
            let mut state = self.state.borrow_mut();
            state.queue.push_back(event);
            if state.dispatching {
                return;
            }
            state.dispatching = true;
        }

        loop {
            let (event, mut handlers) = {
                let mut state = self.state.borrow_mut();
                let Some(event) = state.queue.pop_front() else {
                    state.dispatching = false;
                    break;
                };
                (event, std::mem::take(&mut state.handlers))
            };

            debug!(
                "event=bus_publish module=events status=ok topic={} handlers={}",
                event.as_str(),
                handlers.len()
            );
            for (id, handler) in handlers.iter_mut() {
                if self.state.borrow().removed.contains(id) {
                    continue;
                }
                handler(event);
            }

            let (added, removed) = {
                let mut state = self.state.borrow_mut();
                (
                    std::mem::take(&mut state.handlers),
                    std::mem::take(&mut state.removed),
                )
            };
            handlers.extend(added);
            let (kept, detached): (Vec<_>, Vec<_>) = handlers
                .into_iter()
                .partition(|(id, _)| !removed.contains(id));
            self.state.borrow_mut().handlers = kept;
            // Handlers may own subscriptions; drop them with the state released.
            drop(detached);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.state.borrow().handlers.len()
    }
}

/// Keeps one bus handler alive.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    state: Weak<RefCell<BusState>>,
}

impl Subscription {
    /// Detaches the handler now instead of at drop.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let detached = {
            let mut state = state.borrow_mut();
            if state.dispatching {
                state.removed.push(self.id);
            }
            let position = state
                .handlers
                .iter()
                .position(|(handler_id, _)| *handler_id == self.id);
            position.map(|position| state.handlers.remove(position))
        };
        drop(detached);
    }
}

/// Process-scoped services shared by screens.
#[derive(Clone, Default)]
pub struct AppContext {
    pub bus: EventBus,
}

impl AppContext {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::{AppEvent, EventBus};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn handlers_receive_events_until_dropped() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let subscription = bus.subscribe(move |event| sink.borrow_mut().push(event));

        bus.publish(AppEvent::EntryCreated);
        drop(subscription);
        bus.publish(AppEvent::EntryDeleted);

        assert_eq!(*seen.borrow(), vec![AppEvent::EntryCreated]);
        assert_eq!(bus.handler_count(), 0);
    }

    #[test]
    fn publish_from_handler_is_queued() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let relay_bus = bus.clone();
        let _relay = bus.subscribe(move |event| {
            if event == AppEvent::EntryCreated {
                relay_bus.publish(AppEvent::EntryDeleted);
            }
        });
        let sink = Rc::clone(&seen);
        let _recorder = bus.subscribe(move |event| sink.borrow_mut().push(event));

        bus.publish(AppEvent::EntryCreated);

        assert_eq!(
            *seen.borrow(),
            vec![AppEvent::EntryCreated, AppEvent::EntryDeleted]
        );
    }

    #[test]
    fn unsubscribe_inside_handler_takes_effect_for_next_event() {
        let bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));
        let slot: Rc<RefCell<Option<super::Subscription>>> = Rc::new(RefCell::new(None));

        let counter = Rc::clone(&count);
        let own_slot = Rc::clone(&slot);
        let subscription = bus.subscribe(move |_| {
            *counter.borrow_mut() += 1;
            own_slot.borrow_mut().take();
        });
        *slot.borrow_mut() = Some(subscription);

        bus.publish(AppEvent::EntryCreated);
        bus.publish(AppEvent::EntryCreated);

        assert_eq!(*count.borrow(), 1);
    }
}
