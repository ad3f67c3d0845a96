use super::{Event, EventId};
use crate::time::SimTime;
use std::{
    cmp::Ordering,
    collections::{BinaryHeap, VecDeque},
};

///
/// The two event collections of the runtime.
///
/// `future` holds every event that is not yet due, ordered by
/// (time, id). `deferred` holds the events of the current time step in
/// dispatch order.
///
#[derive(Debug, Default)]
pub(crate) struct EventQueue {
    future: BinaryHeap<FutureNode>,
    deferred: VecDeque<Event>,
    next_id: EventId,
}

impl EventQueue {
    pub(crate) fn new() -> Self {
        Self {
            future: BinaryHeap::with_capacity(64),
            deferred: VecDeque::with_capacity(32),
            next_id: 0,
        }
    }

    pub(crate) fn len_future(&self) -> usize {
        self.future.len()
    }

    pub(crate) fn len_deferred(&self) -> usize {
        self.deferred.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.future.is_empty() && self.deferred.is_empty()
    }

    pub(crate) fn num_scheduled(&self) -> usize {
        self.next_id
    }

    /// Inserts an event into the future queue, assigning the next id.
    pub(crate) fn push(&mut self, mut event: Event) -> EventId {
        let id = self.next_id;
        self.next_id += 1;

        event.id = id;
        self.future.push(FutureNode(event));
        id
    }

    /// The time of the earliest future event.
    pub(crate) fn peek_time(&self) -> Option<SimTime> {
        self.future.peek().map(|node| node.0.time())
    }

    ///
    /// Moves every future event due at the earliest time into the
    /// deferred queue, in id order. Returns that time.
    ///
    pub(crate) fn defer_next_step(&mut self) -> Option<SimTime> {
        let time = self.peek_time()?;
        while self.peek_time() == Some(time) {
            if let Some(FutureNode(event)) = self.future.pop() {
                self.deferred.push_back(event);
            }
        }
        Some(time)
    }

    pub(crate) fn pop_deferred(&mut self) -> Option<Event> {
        self.deferred.pop_front()
    }

    /// Returns an event to the head of the deferred queue.
    pub(crate) fn unpop_deferred(&mut self, event: Event) {
        self.deferred.push_front(event);
    }

    /// Returns all undispatched deferred events to the future queue.
    pub(crate) fn requeue_deferred(&mut self) {
        self.future.extend(self.deferred.drain(..).map(FutureNode));
    }

    ///
    /// Withdraws all future events matching the predicate, returning them
    /// in id order. Deferred events cannot be withdrawn.
    ///
    pub(crate) fn cancel_where(&mut self, mut predicate: impl FnMut(&Event) -> bool) -> Vec<Event> {
        let (cancelled, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.future)
            .into_vec()
            .into_iter()
            .partition(|node| predicate(&node.0));

        self.future = BinaryHeap::from(kept);

        let mut cancelled: Vec<Event> = cancelled.into_iter().map(|node| node.0).collect();
        cancelled.sort_by_key(Event::id);
        cancelled
    }
}

// Reversed (time, id) order turns the max-heap into a min-heap.
#[derive(Debug)]
struct FutureNode(Event);

impl PartialEq for FutureNode {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for FutureNode {}

impl PartialOrd for FutureNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FutureNode {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.0.time(), other.0.id).cmp(&(self.0.time(), self.0.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityId;
    use crate::runtime::{EventTag, Payload};

    fn event(time: f64, tag: u32) -> Event {
        Event::new(
            SimTime::from(time),
            EntityId::NULL,
            EntityId::NULL,
            EventTag::Custom(tag),
            Payload::none(),
        )
    }

    fn drain(queue: &mut EventQueue) -> Vec<(SimTime, u32)> {
        let mut out = Vec::new();
        while queue.defer_next_step().is_some() {
            while let Some(event) = queue.pop_deferred() {
                let EventTag::Custom(tag) = event.tag() else {
                    unreachable!()
                };
                out.push((event.time(), tag));
            }
        }
        out
    }

    #[test]
    fn time_then_insertion_order() {
        let mut queue = EventQueue::new();
        queue.push(event(5.0, 0));
        queue.push(event(1.0, 1));
        queue.push(event(5.0, 2));
        queue.push(event(3.0, 3));
        queue.push(event(1.0, 4));

        let order: Vec<u32> = drain(&mut queue).into_iter().map(|(_, t)| t).collect();
        assert_eq!(order, vec![1, 4, 3, 0, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn defer_moves_one_time_step() {
        let mut queue = EventQueue::new();
        queue.push(event(2.0, 0));
        queue.push(event(2.0, 1));
        queue.push(event(4.0, 2));

        assert_eq!(queue.defer_next_step(), Some(SimTime::from(2.0)));
        assert_eq!(queue.len_deferred(), 2);
        assert_eq!(queue.len_future(), 1);

        let first = queue.pop_deferred().unwrap();
        queue.unpop_deferred(first);
        queue.requeue_deferred();
        assert_eq!(queue.len_deferred(), 0);
        assert_eq!(queue.len_future(), 3);
        assert_eq!(queue.peek_time(), Some(SimTime::from(2.0)));
    }

    #[test]
    fn cancellation_only_touches_future_events() {
        let mut queue = EventQueue::new();
        let a = queue.push(event(1.0, 0));
        let b = queue.push(event(2.0, 1));
        let c = queue.push(event(2.0, 2));

        queue.defer_next_step();
        let cancelled = queue.cancel_where(|e| e.id() == a || e.id() == c);
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].id(), c);

        assert_eq!(queue.pop_deferred().map(|e| e.id()), Some(a));
        assert_eq!(queue.defer_next_step(), Some(SimTime::from(2.0)));
        assert_eq!(queue.pop_deferred().map(|e| e.id()), Some(b));
        assert!(queue.is_empty());
        assert_eq!(queue.num_scheduled(), 3);
    }
}
