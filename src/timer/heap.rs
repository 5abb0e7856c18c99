//! 按截止时间排序的二叉最小堆。
//! A binary min-heap of timers ordered by deadline.
//!
//! Insert and pop are `O(log n)`; the next deadline is `O(1)`. Cancel and
//! reschedule locate their target with a linear scan over the five-part key,
//! so they are `O(n)` plus an `O(log n)` repair. Timer counts per engine are
//! expected to stay small.
//!
//! 插入与弹出为 `O(log n)`，获取下一个截止时间为 `O(1)`。取消与重调度通过线性扫描
//! 五元组键定位目标，因此为 `O(n)` 加上 `O(log n)` 的修复。

use std::fmt;
use tokio::time::{Duration, Instant};

/// Longest delay honoured; anything longer is treated as "practically never".
const MAX_DELAY: Duration = Duration::from_secs(86400 * 365 * 30);

/// `now + delay`, clamped so a huge delay cannot overflow `Instant`.
///
/// 计算 `now + delay`，并进行截断，避免过大的延迟导致 `Instant` 溢出。
pub(crate) fn deadline_after(delay: Duration) -> Instant {
    Instant::now() + delay.min(MAX_DELAY)
}

/// Five-part composite identity of a timer.
///
/// Callers namespace timers with it, e.g. entity type, entity id and sub-slot.
/// Two keys are equal only when all five fields are equal.
///
/// 定时器的五元组复合标识。两个键仅在五个字段全部相等时才相等。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TimerKey(pub i64, pub i64, pub i64, pub i64, pub i64);

impl TimerKey {
    pub const fn new(a: i64, b: i64, c: i64, d: i64, e: i64) -> Self {
        Self(a, b, c, d, e)
    }
}

impl From<(i64, i64, i64, i64, i64)> for TimerKey {
    fn from((a, b, c, d, e): (i64, i64, i64, i64, i64)) -> Self {
        Self(a, b, c, d, e)
    }
}

impl fmt::Display for TimerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{},{},{})", self.0, self.1, self.2, self.3, self.4)
    }
}

/// One scheduled deadline and the two payloads delivered when it fires.
///
/// 一个已调度的截止时间，以及到期时投递的两个载荷。
#[derive(Debug)]
pub struct TimerItem<P> {
    pub key: TimerKey,
    pub deadline: Instant,
    pub first: P,
    pub second: P,
    /// Insertion order, breaks ties between equal deadlines.
    seq: u64,
}

/// Min-heap of [`TimerItem`]s. An item's position in `items` is its heap index.
///
/// [`TimerItem`] 的最小堆。元素在 `items` 中的位置即其堆索引。
#[derive(Debug)]
pub struct TimerHeap<P> {
    items: Vec<TimerItem<P>>,
    next_seq: u64,
}

impl<P> Default for TimerHeap<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> TimerHeap<P> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Schedules a timer `delay` from now.
    ///
    /// The caller must not add a key that is still pending; a duplicate is
    /// accepted but cancel and reschedule only ever see the first match.
    ///
    /// 调度一个在 `delay` 之后到期的定时器。调用方不应重复添加仍在等待中的键。
    pub fn insert(&mut self, key: TimerKey, delay: Duration, first: P, second: P) {
        self.insert_at(key, deadline_after(delay), first, second);
    }

    /// Schedules a timer at an absolute deadline.
    pub fn insert_at(&mut self, key: TimerKey, deadline: Instant, first: P, second: P) {
        let seq = self.bump_seq();
        self.items.push(TimerItem {
            key,
            deadline,
            first,
            second,
            seq,
        });
        self.sift_up(self.items.len() - 1);
    }

    /// Removes the first timer matching `key`. Absent keys are a no-op.
    ///
    /// 移除第一个匹配 `key` 的定时器。键不存在时不做任何操作。
    pub fn cancel(&mut self, key: &TimerKey) -> Option<TimerItem<P>> {
        let index = self.position(key)?;
        Some(self.remove_at(index))
    }

    /// Moves the first timer matching `key` to `now + delay`, keeping its payloads.
    ///
    /// Returns `false` when no timer matches.
    ///
    /// 将第一个匹配 `key` 的定时器移动到 `now + delay`，载荷保持不变。
    pub fn reschedule(&mut self, key: &TimerKey, delay: Duration) -> bool {
        self.reschedule_at(key, deadline_after(delay))
    }

    pub fn reschedule_at(&mut self, key: &TimerKey, deadline: Instant) -> bool {
        let Some(index) = self.position(key) else {
            return false;
        };
        let seq = self.bump_seq();
        let item = &mut self.items[index];
        item.deadline = deadline;
        item.seq = seq;
        self.fix(index);
        true
    }

    /// The earliest-deadline timer, if any.
    pub fn peek_min(&self) -> Option<&TimerItem<P>> {
        self.items.first()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.peek_min().map(|item| item.deadline)
    }

    /// Removes and returns the earliest-deadline timer.
    pub fn pop_min(&mut self) -> Option<TimerItem<P>> {
        if self.items.is_empty() {
            return None;
        }
        Some(self.remove_at(0))
    }

    /// Pops the earliest timer only if its deadline is at or before `now`.
    ///
    /// 仅当最早的定时器截止时间不晚于 `now` 时将其弹出。
    pub fn pop_due(&mut self, now: Instant) -> Option<TimerItem<P>> {
        match self.peek_min() {
            Some(item) if item.deadline <= now => self.pop_min(),
            _ => None,
        }
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    // Linear scan, O(n).
    fn position(&self, key: &TimerKey) -> Option<usize> {
        self.items.iter().position(|item| item.key == *key)
    }

    fn less(&self, i: usize, j: usize) -> bool {
        let (a, b) = (&self.items[i], &self.items[j]);
        (a.deadline, a.seq) < (b.deadline, b.seq)
    }

    fn remove_at(&mut self, index: usize) -> TimerItem<P> {
        // The last item takes the vacated slot and is then repaired in place.
        let item = self.items.swap_remove(index);
        if index < self.items.len() {
            self.fix(index);
        }
        item
    }

    /// Restores heap order after the item at `index` changed.
    fn fix(&mut self, index: usize) {
        if !self.sift_down(index) {
            self.sift_up(index);
        }
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if !self.less(index, parent) {
                break;
            }
            self.items.swap(index, parent);
            index = parent;
        }
    }

    /// Returns `true` if the item moved down.
    fn sift_down(&mut self, start: usize) -> bool {
        let len = self.items.len();
        let mut index = start;
        loop {
            let left = 2 * index + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.less(right, left) {
                right
            } else {
                left
            };
            if !self.less(child, index) {
                break;
            }
            self.items.swap(index, child);
            index = child;
        }
        index > start
    }
}
