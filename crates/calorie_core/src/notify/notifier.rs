//! Single-subscriber batch delivery.

use super::{ChangeBatch, ChangeEvent, NotifyError};
use log::{debug, error};
use std::cell::RefCell;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// Receiver side of a display surface.
///
/// `begin_batch` and `end_batch` bracket every delivered batch so the
/// subscriber can apply all events of one batch atomically. `reset` drops
/// whatever the subscriber mirrors before a full reload is delivered.
pub trait ChangeSubscriber {
    fn reset(&mut self) {}
    fn begin_batch(&mut self) {}
    fn apply_event(&mut self, event: &ChangeEvent) -> Result<(), NotifyError>;
    fn end_batch(&mut self) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Shared subscriber owned jointly with its host.
///
/// A cell the host still borrows during delivery is reported as
/// `NotifyError::SubscriberBusy` instead of panicking; `reset` and
/// `begin_batch` are skipped in that case and the batch fails at its first
/// event.
impl<S: ChangeSubscriber + ?Sized> ChangeSubscriber for Rc<RefCell<S>> {
    fn reset(&mut self) {
        if let Ok(mut inner) = self.try_borrow_mut() {
            inner.reset();
        }
    }

    fn begin_batch(&mut self) {
        if let Ok(mut inner) = self.try_borrow_mut() {
            inner.begin_batch();
        }
    }

    fn apply_event(&mut self, event: &ChangeEvent) -> Result<(), NotifyError> {
        self.try_borrow_mut()
            .map_err(|_| NotifyError::SubscriberBusy)?
            .apply_event(event)
    }

    fn end_batch(&mut self) -> Result<(), NotifyError> {
        self.try_borrow_mut()
            .map_err(|_| NotifyError::SubscriberBusy)?
            .end_batch()
    }
}

/// Handle returned by `ChangeNotifier::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl Display for SubscriberId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Delivers change batches to at most one active subscriber.
#[derive(Default)]
pub struct ChangeNotifier {
    active: Option<(SubscriberId, Box<dyn ChangeSubscriber>)>,
    next_id: u64,
    delivered: u64,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the subscriber of this display surface.
    ///
    /// # Errors
    /// - `NotifyError::AlreadySubscribed` while another subscriber is active.
    pub fn subscribe(
        &mut self,
        subscriber: impl ChangeSubscriber + 'static,
    ) -> Result<SubscriberId, NotifyError> {
        if let Some((active_id, _)) = &self.active {
            return Err(NotifyError::AlreadySubscribed(*active_id));
        }
        self.next_id += 1;
        let id = SubscriberId(self.next_id);
        self.active = Some((id, Box::new(subscriber)));
        debug!("event=notifier_subscribe module=notify status=ok subscriber={id}");
        Ok(id)
    }

    /// Detaches the active subscriber and hands it back.
    pub fn unsubscribe(
        &mut self,
        id: SubscriberId,
    ) -> Result<Box<dyn ChangeSubscriber>, NotifyError> {
        match self.active.take() {
            Some((active_id, subscriber)) if active_id == id => {
                debug!("event=notifier_unsubscribe module=notify status=ok subscriber={id}");
                Ok(subscriber)
            }
            other => {
                self.active = other;
                Err(NotifyError::UnknownSubscriber(id))
            }
        }
    }

    pub fn has_subscriber(&self) -> bool {
        self.active.is_some()
    }

    /// Number of non-empty batches delivered so far.
    pub fn delivered_batches(&self) -> u64 {
        self.delivered
    }

    /// Delivers one batch in order.
    ///
    /// Returns `Ok(false)` when there is no subscriber or the batch is empty.
    pub fn deliver(&mut self, batch: &ChangeBatch) -> Result<bool, NotifyError> {
        if batch.is_empty() {
            return Ok(false);
        }
        self.send(batch, false)
    }

    /// Resets the subscriber and delivers `snapshot`, a batch that inserts
    /// the whole current layout into an empty one.
    ///
    /// Used to recover a subscriber that rejected an earlier batch. An empty
    /// snapshot still resets the subscriber.
    pub fn reload(&mut self, snapshot: &ChangeBatch) -> Result<bool, NotifyError> {
        self.send(snapshot, true)
    }

    fn send(&mut self, batch: &ChangeBatch, reset: bool) -> Result<bool, NotifyError> {
        let Some((id, subscriber)) = self.active.as_mut() else {
            return Ok(false);
        };

        if reset {
            subscriber.reset();
        }
        subscriber.begin_batch();
        let applied = batch
            .iter()
            .try_for_each(|event| subscriber.apply_event(event))
            .and_then(|()| subscriber.end_batch());

        match applied {
            Ok(()) => {
                self.delivered += 1;
                debug!(
                    "event=batch_deliver module=notify status=ok subscriber={} events={} reload={}",
                    id,
                    batch.len(),
                    reset
                );
                Ok(true)
            }
            Err(err) => {
                error!(
                    "event=batch_deliver module=notify status=error subscriber={} events={} error={}",
                    id,
                    batch.len(),
                    err
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChangeNotifier, ChangeSubscriber};
    use crate::notify::{ChangeBatch, ChangeEvent, NotifyError};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        log: Vec<String>,
    }

    impl ChangeSubscriber for Recorder {
        fn reset(&mut self) {
            self.log.push("reset".to_string());
        }

        fn begin_batch(&mut self) {
            self.log.push("begin".to_string());
        }

        fn apply_event(&mut self, event: &ChangeEvent) -> Result<(), NotifyError> {
            self.log.push(format!("{event:?}"));
            Ok(())
        }

        fn end_batch(&mut self) -> Result<(), NotifyError> {
            self.log.push("end".to_string());
            Ok(())
        }
    }

    #[test]
    fn deliver_brackets_events() {
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let mut notifier = ChangeNotifier::new();
        notifier.subscribe(Rc::clone(&recorder)).unwrap();

        let batch = ChangeBatch::new(vec![ChangeEvent::SectionInserted(0)]);
        assert!(notifier.deliver(&batch).unwrap());

        let recorded = recorder.borrow();
        let log = &recorded.log;
        assert_eq!(log.first().map(String::as_str), Some("begin"));
        assert_eq!(log.last().map(String::as_str), Some("end"));
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn empty_batch_and_missing_subscriber_are_not_delivered() {
        let mut notifier = ChangeNotifier::new();
        let batch = ChangeBatch::new(vec![ChangeEvent::SectionDeleted(0)]);
        assert!(!notifier.deliver(&batch).unwrap());

        notifier.subscribe(Recorder::default()).unwrap();
        assert!(!notifier.deliver(&ChangeBatch::default()).unwrap());
        assert_eq!(notifier.delivered_batches(), 0);
    }

    #[test]
    fn borrowed_subscriber_reports_busy_instead_of_panicking() {
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let mut notifier = ChangeNotifier::new();
        notifier.subscribe(Rc::clone(&recorder)).unwrap();

        let held = recorder.borrow();
        let batch = ChangeBatch::new(vec![ChangeEvent::SectionInserted(0)]);
        assert_eq!(notifier.deliver(&batch), Err(NotifyError::SubscriberBusy));
        drop(held);

        assert!(notifier.deliver(&batch).unwrap());
        assert_eq!(notifier.delivered_batches(), 1);
    }

    #[test]
    fn reload_resets_before_delivering_snapshot() {
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let mut notifier = ChangeNotifier::new();
        notifier.subscribe(Rc::clone(&recorder)).unwrap();

        assert!(notifier.reload(&ChangeBatch::default()).unwrap());

        let recorded = recorder.borrow();
        assert_eq!(recorded.log, vec!["reset", "begin", "end"]);
    }

    #[test]
    fn second_subscriber_is_rejected_until_first_leaves() {
        let mut notifier = ChangeNotifier::new();
        let first = notifier.subscribe(Recorder::default()).unwrap();

        let err = notifier.subscribe(Recorder::default()).unwrap_err();
        assert_eq!(err, NotifyError::AlreadySubscribed(first));

        notifier.unsubscribe(first).unwrap();
        assert!(!notifier.has_subscriber());
        assert!(notifier.subscribe(Recorder::default()).is_ok());
    }

    #[test]
    fn unsubscribe_with_stale_id_keeps_active_subscriber() {
        let mut notifier = ChangeNotifier::new();
        let first = notifier.subscribe(Recorder::default()).unwrap();
        notifier.unsubscribe(first).unwrap();
        let second = notifier.subscribe(Recorder::default()).unwrap();

        assert!(notifier.unsubscribe(first).is_err());
        assert!(notifier.has_subscriber());
        assert!(notifier.unsubscribe(second).is_ok());
    }
}
