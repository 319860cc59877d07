//! Bounded ring buffer of pending key codes, one per device session

use crate::mapping::KeyCode;
use serde::{Deserialize, Serialize};

/// Slots in a session's key queue.
pub const KEY_QUEUE_CAPACITY: usize = 32;

/// What a full queue does with one more key
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Overwrite the oldest pending key and keep the new one.
    #[default]
    DropOldest,
    /// Discard the incoming key.
    DropNewest,
}

/// Fixed-capacity FIFO of key codes.
///
/// `push` never blocks and never fails; a full queue resolves according to its
/// [`OverflowPolicy`]. Both operations are O(1) and do not allocate.
#[derive(Debug, Clone)]
pub struct KeyEventQueue<const N: usize = KEY_QUEUE_CAPACITY> {
    slots: [KeyCode; N],
    begin: usize,
    size: usize,
    policy: OverflowPolicy,
    dropped: u64,
}

impl<const N: usize> KeyEventQueue<N> {
    pub fn new() -> Self {
        Self::with_policy(OverflowPolicy::default())
    }

    pub fn with_policy(policy: OverflowPolicy) -> Self {
        Self {
            slots: [KeyCode::NONE; N],
            begin: 0,
            size: 0,
            policy,
            dropped: 0,
        }
    }

    pub fn push(&mut self, key: KeyCode) {
        if N == 0 {
            self.dropped += 1;
            return;
        }

        let slot = (self.begin + self.size) % N;
        if self.size < N {
            self.slots[slot] = key;
            self.size += 1;
            return;
        }

        self.dropped += 1;
        match self.policy {
            OverflowPolicy::DropOldest => {
                // full: `slot` is the oldest element
                self.slots[slot] = key;
                self.begin = (self.begin + 1) % N;
            }
            OverflowPolicy::DropNewest => {}
        }
    }

    pub fn pop(&mut self) -> Option<KeyCode> {
        if self.size == 0 {
            return None;
        }
        let key = self.slots[self.begin];
        self.begin = (self.begin + 1) % N;
        self.size -= 1;
        Some(key)
    }

    pub fn peek(&self) -> Option<KeyCode> {
        (self.size > 0).then(|| self.slots[self.begin])
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn is_full(&self) -> bool {
        self.size == N
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Keys lost to overflow since the queue was created.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl<const N: usize> Default for KeyEventQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn drain<const N: usize>(queue: &mut KeyEventQueue<N>) -> Vec<u32> {
        std::iter::from_fn(|| queue.pop()).map(|k| k.0).collect()
    }

    #[test]
    fn pop_on_empty_leaves_state_alone() {
        let mut queue: KeyEventQueue = KeyEventQueue::new();
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.len(), 0);
        queue.push(KeyCode(7));
        assert_eq!(queue.pop(), Some(KeyCode(7)));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn default_capacity_is_32() {
        let queue: KeyEventQueue = KeyEventQueue::default();
        assert_eq!(queue.capacity(), 32);
    }

    #[test]
    fn full_queue_drops_oldest() {
        let mut queue: KeyEventQueue<4> = KeyEventQueue::new();
        for key in 1..=6 {
            queue.push(KeyCode(key));
        }
        assert!(queue.is_full());
        assert_eq!(queue.dropped(), 2);
        assert_eq!(drain(&mut queue), vec![3, 4, 5, 6]);
    }

    #[test]
    fn full_queue_drops_newest_when_asked() {
        let mut queue: KeyEventQueue<4> = KeyEventQueue::with_policy(OverflowPolicy::DropNewest);
        for key in 1..=6 {
            queue.push(KeyCode(key));
        }
        assert_eq!(queue.dropped(), 2);
        assert_eq!(drain(&mut queue), vec![1, 2, 3, 4]);
    }

    #[test]
    fn wraps_around_after_partial_drain() {
        let mut queue: KeyEventQueue<3> = KeyEventQueue::new();
        queue.push(KeyCode(1));
        queue.push(KeyCode(2));
        assert_eq!(queue.pop(), Some(KeyCode(1)));
        queue.push(KeyCode(3));
        queue.push(KeyCode(4));
        queue.push(KeyCode(5));
        assert_eq!(queue.peek(), Some(KeyCode(3)));
        assert_eq!(drain(&mut queue), vec![3, 4, 5]);
    }

    proptest! {
        #[test]
        fn keeps_the_newest_capacity_keys_in_order(
            keys in prop::collection::vec(any::<u32>(), 0..100),
        ) {
            let mut queue: KeyEventQueue = KeyEventQueue::new();
            for &key in &keys {
                queue.push(KeyCode(key));
            }
            let skip = keys.len().saturating_sub(KEY_QUEUE_CAPACITY);
            prop_assert_eq!(drain(&mut queue), keys[skip..].to_vec());
        }

        #[test]
        fn partial_pops_follow_push_order(
            keys in prop::collection::vec(any::<u32>(), 1..=KEY_QUEUE_CAPACITY),
            pops in 0usize..=KEY_QUEUE_CAPACITY,
        ) {
            let mut queue: KeyEventQueue = KeyEventQueue::new();
            for &key in &keys {
                queue.push(KeyCode(key));
            }
            let pops = pops.min(keys.len());
            let popped: Vec<u32> = (0..pops).filter_map(|_| queue.pop()).map(|k| k.0).collect();
            prop_assert_eq!(&popped[..], &keys[..pops]);
            prop_assert_eq!(queue.len(), keys.len() - pops);
        }
    }
}
