use std::collections::VecDeque;

/// Events retained by a bus built with [`EventBus::new`].
pub const DEFAULT_LOG_CAPACITY: usize = 1024;

/// Subscription handle returned by [`EventBus::subscribe`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Listener<E> = Box<dyn FnMut(&E)>;

/// Single-threaded publish/subscribe fan-out.
///
/// Listeners run synchronously inside [`EventBus::emit`], in subscription order.
/// The most recent emitted events are also kept in a bounded log until
/// drained, which gives tests and tooling a trace without registering a
/// listener. Once the log is full the oldest event is dropped.
pub struct EventBus<E> {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener<E>)>,
    log: VecDeque<E>,
    log_capacity: usize,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
            log: VecDeque::new(),
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

impl<E> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("logged", &self.log.len())
            .finish()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retain at most `capacity` events; zero disables the log. Listeners
    /// are unaffected.
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self.log.truncate(capacity);
        self
    }

    /// Stop retaining emitted events.
    pub fn without_log(self) -> Self {
        self.with_log_capacity(0)
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `true` if the subscription existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn emit(&mut self, event: E) {
        for (_, listener) in &mut self.listeners {
            listener(&event);
        }
        if self.log_capacity == 0 {
            return;
        }
        if self.log.len() == self.log_capacity {
            self.log.pop_front();
        }
        self.log.push_back(event);
    }

    /// Retained events, oldest first.
    pub fn events(&self) -> &VecDeque<E> {
        &self.log
    }

    pub fn drain(&mut self) -> Vec<E> {
        self.log.drain(..).collect()
    }

    /// Drops every listener and the retained log.
    pub fn clear(&mut self) {
        self.listeners.clear();
        self.log.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::EventBus;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn listeners_receive_events_in_subscription_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus: EventBus<u32> = EventBus::new();

        let a = Rc::clone(&seen);
        bus.subscribe(move |e| a.borrow_mut().push(("a", *e)));
        let b = Rc::clone(&seen);
        bus.subscribe(move |e| b.borrow_mut().push(("b", *e)));

        bus.emit(7);
        assert_eq!(*seen.borrow(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let count = Rc::new(RefCell::new(0));
        let mut bus: EventBus<()> = EventBus::new();
        let c = Rc::clone(&count);
        let id = bus.subscribe(move |_| *c.borrow_mut() += 1);

        bus.emit(());
        assert_eq!(bus.listener_count(), 1);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.listener_count(), 0);
        bus.emit(());
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn drain_clears_log() {
        let mut bus: EventBus<&'static str> = EventBus::new();
        bus.emit("m");
        let drained = bus.drain();
        assert_eq!(drained, vec!["m"]);
        assert!(bus.events().is_empty());
    }

    #[test]
    fn log_keeps_only_the_newest_events() {
        let seen = Rc::new(RefCell::new(0u32));
        let mut bus: EventBus<u32> = EventBus::new().with_log_capacity(3);
        let s = Rc::clone(&seen);
        bus.subscribe(move |_| *s.borrow_mut() += 1);

        for i in 0..10_000 {
            bus.emit(i);
        }
        assert_eq!(*seen.borrow(), 10_000);
        assert_eq!(bus.events().len(), 3);
        assert_eq!(bus.drain(), vec![9_997, 9_998, 9_999]);
    }

    #[test]
    fn log_can_be_disabled() {
        let mut bus: EventBus<u8> = EventBus::new().without_log();
        bus.emit(1);
        assert!(bus.events().is_empty());
    }
}
