//! A float-keyed min-heap driving the Dijkstra wavefronts. Frontier sizes
//! are bounded by the tile count of a chunk so the membership probe is a
//! plain linear scan
//!

/// Binary min-heap over an `f32` priority. Ordering between entries of equal
/// priority is unspecified
pub struct PriorityQueue<T> {
	heap: Vec<(f32, T)>,
}

impl<T: Copy> PriorityQueue<T> {
	/// Create an empty queue
	pub fn new() -> Self {
		PriorityQueue { heap: Vec::new() }
	}
	/// Number of queued entries
	pub fn len(&self) -> usize {
		self.heap.len()
	}
	/// Whether the queue holds no entries
	pub fn is_empty(&self) -> bool {
		self.heap.is_empty()
	}
	/// Queue `item` under `priority`
	pub fn push(&mut self, priority: f32, item: T) {
		self.heap.push((priority, item));
		self.sift_up(self.heap.len() - 1);
	}
	/// Remove and return the entry with the smallest priority
	pub fn pop(&mut self) -> Option<T> {
		if self.heap.is_empty() {
			return None;
		}
		let last = self.heap.len() - 1;
		self.heap.swap(0, last);
		let (_, item) = self.heap.pop().unwrap();
		if !self.heap.is_empty() {
			self.sift_down(0);
		}
		Some(item)
	}
	/// Linear probe for a queued entry matching `item` under `predicate`.
	/// The predicate compares payloads only, priorities are ignored
	pub fn contains(&self, predicate: impl Fn(&T, &T) -> bool, item: T) -> bool {
		self.heap.iter().any(|(_, queued)| predicate(queued, &item))
	}

	fn sift_up(&mut self, mut idx: usize) {
		while idx > 0 {
			let parent = (idx - 1) / 2;
			if self.heap[idx].0 < self.heap[parent].0 {
				self.heap.swap(idx, parent);
				idx = parent;
			} else {
				break;
			}
		}
	}

	fn sift_down(&mut self, mut idx: usize) {
		loop {
			let left = 2 * idx + 1;
			let right = 2 * idx + 2;
			let mut smallest = idx;
			if left < self.heap.len() && self.heap[left].0 < self.heap[smallest].0 {
				smallest = left;
			}
			if right < self.heap.len() && self.heap[right].0 < self.heap[smallest].0 {
				smallest = right;
			}
			if smallest == idx {
				break;
			}
			self.heap.swap(idx, smallest);
			idx = smallest;
		}
	}
}

impl<T: Copy> Default for PriorityQueue<T> {
	fn default() -> Self {
		PriorityQueue::new()
	}
}
