//! Binary heap with a custom comparator and element position tracking.

use std::cmp::Ordering;
use std::fmt;

/// Heap element position observer.
///
/// The heap notifies the observer every time an element is placed at a new index, so the caller can keep its own
/// key to position mapping up to date and later evict an element with [`BinaryHeap::remove_at`].
pub trait HeapObserver<T> {
    /// Called once a new element is appended at `index` (before it is sifted up).
    fn on_insert(&mut self, _item: &T, _index: usize) {}

    /// Called when an element is moved to `index`.
    fn on_move(&mut self, _item: &T, _index: usize) {}

    /// Called when an element leaves the heap.
    fn on_remove(&mut self, _item: &T) {}
}

/// Observer that ignores all notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl<T> HeapObserver<T> for NoopObserver {}

/// Binary heap ordered by a comparator.
///
/// The root is the greatest element according to `compare`, so a min-heap is built by passing a reversed comparator.
/// Order among equal elements is unspecified. Insertion, extraction and arbitrary element removal are *O*(log *n*).
pub struct BinaryHeap<T, F, O = NoopObserver>
where
    F: Fn(&T, &T) -> Ordering,
    O: HeapObserver<T>,
{
    items: Vec<T>,
    compare: F,
    observer: O,
}

impl<T, F> BinaryHeap<T, F, NoopObserver>
where
    F: Fn(&T, &T) -> Ordering,
{
    /// Creates an empty heap.
    pub fn new(compare: F) -> Self {
        Self::with_observer(compare, NoopObserver)
    }

    /// Creates an empty heap with space for at least `capacity` elements.
    pub fn with_capacity(capacity: usize, compare: F) -> Self {
        BinaryHeap {
            items: Vec::with_capacity(capacity),
            compare,
            observer: NoopObserver,
        }
    }
}

impl<T, F, O> BinaryHeap<T, F, O>
where
    F: Fn(&T, &T) -> Ordering,
    O: HeapObserver<T>,
{
    /// Creates an empty heap reporting element positions to `observer`.
    pub fn with_observer(compare: F, observer: O) -> Self {
        BinaryHeap {
            items: Vec::new(),
            compare,
            observer,
        }
    }

    /// Number of elements in the heap.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the greatest element without removing it, or [`None`] if the heap is empty.
    pub fn peek(&self) -> Option<&T> {
        self.items.first()
    }

    /// Inserts an element.
    pub fn push(&mut self, item: T) {
        let index = self.items.len();
        self.items.push(item);
        self.observer.on_insert(&self.items[index], index);
        self.sift_up(index);
    }

    /// Removes the greatest element and returns it, or [`None`] if the heap is empty.
    pub fn pop(&mut self) -> Option<T> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.remove_at(0))
        }
    }

    /// Removes the element located at `index` keeping the heap ordered.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn remove_at(&mut self, index: usize) -> T {
        let len = self.items.len();
        assert!(index < len, "heap index out of range (index: {}, len: {})", index, len);

        let item = self.items.swap_remove(index);
        self.observer.on_remove(&item);

        if index < self.items.len() {
            self.observer.on_move(&self.items[index], index);
            // only one of the directions can actually move the swapped-in element
            let index = self.sift_up(index);
            self.sift_down(index);
        }

        return item;
    }

    /// Heap elements in the internal (level) order.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Consumes the heap returning its elements in arbitrary order.
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    fn is_less(&self, a: usize, b: usize) -> bool {
        (self.compare)(&self.items[a], &self.items[b]) == Ordering::Less
    }

    fn sift_up(&mut self, mut index: usize) -> usize {
        while index > 0 {
            let parent = (index - 1) / 2;
            if !self.is_less(parent, index) {
                break;
            }
            self.swap(parent, index);
            index = parent;
        }

        return index;
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.items.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;

            let mut top = index;
            if left < len && self.is_less(top, left) {
                top = left;
            }
            if right < len && self.is_less(top, right) {
                top = right;
            }
            if top == index {
                return;
            }

            self.swap(index, top);
            index = top;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.items.swap(a, b);
        self.observer.on_move(&self.items[a], a);
        self.observer.on_move(&self.items[b], b);
    }
}

impl<T, F, O> fmt::Debug for BinaryHeap<T, F, O>
where
    T: fmt::Debug,
    F: Fn(&T, &T) -> Ordering,
    O: HeapObserver<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

#[cfg(test)]
mod test {
    use std::cmp::Ordering;
    use std::collections::HashMap;

    use rand::seq::SliceRandom;
    use rand::Rng;
    use rstest::*;

    use super::{BinaryHeap, HeapObserver};

    fn assert_heap_ordered<T, F, O>(heap: &BinaryHeap<T, F, O>)
    where
        T: std::fmt::Debug,
        F: Fn(&T, &T) -> Ordering,
        O: HeapObserver<T>,
    {
        let items = heap.as_slice();
        for index in 1..items.len() {
            let parent = (index - 1) / 2;
            assert_ne!(
                (heap.compare)(&items[parent], &items[index]),
                Ordering::Less,
                "heap order violated at {}: {:?}",
                index,
                heap
            );
        }
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn test_heap_pops_extremal_element(#[case] reversed: bool) {
        let mut input = Vec::from_iter(0..200);
        input.extend(0..50);
        input.shuffle(&mut rand::thread_rng());

        let compare = if reversed {
            |a: &i32, b: &i32| a.cmp(b).reverse()
        } else {
            |a: &i32, b: &i32| a.cmp(b)
        };

        let mut heap = BinaryHeap::new(compare);
        for (count, item) in input.iter().enumerate() {
            heap.push(*item);
            assert_eq!(heap.len(), count + 1);
        }
        assert_heap_ordered(&heap);

        let mut actual_result = Vec::new();
        while let Some(item) = heap.pop() {
            assert_heap_ordered(&heap);
            actual_result.push(item);
        }

        let mut expected_result = input.clone();
        expected_result.sort_by(|a, b| compare(a, b).reverse());

        assert_eq!(actual_result, expected_result);
    }

    #[test]
    fn test_heap_interleaved_push_pop() {
        let mut rng = rand::thread_rng();
        let mut heap = BinaryHeap::new(|a: &u64, b: &u64| a.cmp(b));
        let mut model: Vec<u64> = Vec::new();

        for _ in 0..1000 {
            if rng.gen_bool(0.6) || model.is_empty() {
                let item = rng.gen_range(0..100);
                heap.push(item);
                model.push(item);
            } else {
                model.sort();
                assert_eq!(heap.peek(), model.last());
                assert_eq!(heap.pop(), model.pop());
            }
            assert_eq!(heap.len(), model.len());
            assert_heap_ordered(&heap);
        }
    }

    #[test]
    fn test_empty_heap() {
        let mut heap = BinaryHeap::new(|a: &u64, b: &u64| a.cmp(b));

        assert!(heap.is_empty());
        assert_eq!(heap.peek(), None);
        assert_eq!(heap.pop(), None);
    }

    #[rstest]
    #[case(vec![5], 0)]
    #[case(vec![9, 4, 7, 1, 3, 6, 5], 6)]
    #[case(vec![9, 4, 7, 1, 3, 6, 5], 1)]
    #[case(vec![9, 4, 7, 1, 3, 6, 5], 0)]
    // the swapped-in last element is greater than the removed one's parent and has to move up
    #[case(vec![100, 10, 90, 5, 6, 80, 85], 3)]
    fn test_remove_at(#[case] input: Vec<i32>, #[case] index: usize) {
        let mut heap = BinaryHeap::new(|a: &i32, b: &i32| a.cmp(b));
        for item in input.iter() {
            heap.push(*item);
        }

        let expected_item = heap.as_slice()[index];
        let removed = heap.remove_at(index);

        assert_eq!(removed, expected_item);
        assert_eq!(heap.len(), input.len() - 1);
        assert_heap_ordered(&heap);

        let mut remaining = heap.into_vec();
        remaining.sort();
        let mut expected_remaining = input.clone();
        let position = expected_remaining.iter().position(|item| *item == removed).unwrap();
        expected_remaining.remove(position);
        expected_remaining.sort();

        assert_eq!(remaining, expected_remaining);
    }

    #[test]
    #[should_panic(expected = "heap index out of range")]
    fn test_remove_at_out_of_range() {
        let mut heap = BinaryHeap::new(|a: &i32, b: &i32| a.cmp(b));
        heap.push(1);
        heap.remove_at(1);
    }

    #[derive(Default)]
    struct PositionTracker {
        positions: HashMap<u32, usize>,
    }

    impl HeapObserver<(u32, u64)> for PositionTracker {
        fn on_insert(&mut self, item: &(u32, u64), index: usize) {
            self.positions.insert(item.0, index);
        }

        fn on_move(&mut self, item: &(u32, u64), index: usize) {
            self.positions.insert(item.0, index);
        }

        fn on_remove(&mut self, item: &(u32, u64)) {
            self.positions.remove(&item.0);
        }
    }

    #[test]
    fn test_remove_by_tracked_key() {
        let mut rng = rand::thread_rng();
        let mut heap = BinaryHeap::with_observer(
            |a: &(u32, u64), b: &(u32, u64)| a.1.cmp(&b.1).reverse(),
            PositionTracker::default(),
        );

        for key in 0..64 {
            heap.push((key, rng.gen_range(0..1000)));
        }

        let mut keys = Vec::from_iter(0..64u32);
        keys.shuffle(&mut rng);

        for (removed, key) in keys.into_iter().enumerate() {
            for (index, item) in heap.as_slice().iter().enumerate() {
                assert_eq!(heap.observer().positions[&item.0], index);
            }

            let index = heap.observer().positions[&key];
            let item = heap.remove_at(index);

            assert_eq!(item.0, key);
            assert_eq!(heap.len(), 63 - removed);
            assert!(!heap.observer().positions.contains_key(&key));
            assert_heap_ordered(&heap);
        }

        assert!(heap.is_empty());
    }
}
