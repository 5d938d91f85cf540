use std::cmp;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr;
use std::sync::atomic::{self, AtomicIsize, Ordering};
use std::sync::Arc;

use crossbeam_epoch::{self as epoch, Atomic, Guard, Owned, Shared};
use crossbeam_utils::CachePadded;

use crate::buffer::Buffer;

/// Smallest capacity a buffer can have.
///
/// Minimum capacities requested through [`Deque::with_min_capacity`] are
/// clamped up to this floor and rounded to the next power of two.
const DEFAULT_MIN_CAP: usize = 16;

/// If a buffer of at least this size is retired, thread-local garbage is
/// flushed so that the buffer gets deallocated as soon as possible.
const FLUSH_THRESHOLD_BYTES: usize = 1 << 10;

/// The outcome of a steal attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum Steal<T> {
    /// The deque was observed empty.
    Empty,

    /// A value was stolen from the top of the deque.
    Data(T),

    /// The stealer lost a race against another thread and took nothing.
    ///
    /// The deque may still hold values. Whether to retry here, back off,
    /// or move on to another victim is the caller's decision.
    Retry,
}

impl<T> Steal<T> {
    /// Returns the stolen value, if there was one.
    pub fn success(self) -> Option<T> {
        match self {
            Steal::Data(value) => Some(value),
            _ => None,
        }
    }

    /// Returns `true` if the deque was observed empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, Steal::Empty)
    }

    /// Returns `true` if the steal attempt lost a race.
    pub fn is_retry(&self) -> bool {
        matches!(self, Steal::Retry)
    }
}

/// State shared between the owner handle and all stealers.
///
/// The implementation is the Chase-Lev dynamic circular deque, with the
/// fence placement from Le, Pop, Cohen and Nardelli's weak-memory
/// formulation: a release fence publishes each pushed slot, and a pair
/// of sequentially consistent fences in `pop` and `steal` orders the
/// owner's claim of the bottom element against concurrent steals.
struct Inner<T> {
    /// The next index to steal from.
    top: AtomicIsize,

    /// One past the last index the owner pushed.
    bottom: AtomicIsize,

    /// The current buffer. Replaced on grow and shrink; old buffers are
    /// retired to the epoch collector, never freed in place.
    buffer: CachePadded<Atomic<Buffer<T>>>,

    /// Capacity below which the buffer is never shrunk.
    min_cap: usize,
}

impl<T> Inner<T> {
    /// Steals a value from the top of the deque.
    fn steal(&self) -> Steal<T> {
        let t = self.top.load(Ordering::Acquire);

        // A SeqCst fence is needed between the load of `top` and the
        // load of `bottom`; it pairs with the fence in `pop`. Pinning
        // issues one, except when this thread is already pinned.
        if epoch::is_pinned() {
            atomic::fence(Ordering::SeqCst);
        }
        let guard = epoch::pin();

        let b = self.bottom.load(Ordering::Acquire);

        if t.wrapping_sub(b) >= 0 {
            return Steal::Empty;
        }

        let buffer = self.buffer.load(Ordering::Acquire, &guard);

        // Read the value before committing to it. The slot cannot be
        // reused while `top` still equals `t`, and the buffer cannot be
        // freed while the guard is live.
        let value = unsafe { buffer.deref().read(t) };

        if self
            .top
            .compare_exchange(t, t.wrapping_add(1), Ordering::Release, Ordering::Relaxed)
            .is_err()
        {
            // Another thread advanced `top` first; the read value is
            // theirs (or the owner's) and must not be dropped here.
            mem::forget(value);
            return Steal::Retry;
        }

        Steal::Data(value)
    }

    /// Returns the number of elements in the deque.
    fn len(&self) -> usize {
        let b = self.bottom.load(Ordering::Acquire);
        let t = self.top.load(Ordering::Acquire);
        cmp::max(b.wrapping_sub(t), 0) as usize
    }

    /// Returns `true` if the deque is observed empty.
    fn is_empty(&self) -> bool {
        let b = self.bottom.load(Ordering::Acquire);
        let t = self.top.load(Ordering::Acquire);
        b.wrapping_sub(t) <= 0
    }

    /// Returns the capacity of the current buffer.
    fn capacity(&self) -> usize {
        let guard = epoch::pin();
        let buffer = self.buffer.load(Ordering::Acquire, &guard);
        unsafe { buffer.deref().cap() }
    }
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        let b = self.bottom.load(Ordering::Relaxed);
        let t = self.top.load(Ordering::Relaxed);

        unsafe {
            let buffer = self.buffer.load(Ordering::Relaxed, epoch::unprotected());

            // Drop every element still in the deque.
            let mut i = t;
            while i != b {
                ptr::drop_in_place(buffer.deref().at(i));
                i = i.wrapping_add(1);
            }

            // Free the buffer itself.
            buffer.into_owned().into_box().dealloc();
        }
    }
}

/// The owner handle of a work-stealing deque.
///
/// The owner pushes and pops at the bottom of the deque in LIFO order.
/// Work left at the top can be taken by [`Stealer`] handles created with
/// [`stealer`](Deque::stealer).
///
/// The handle can be moved to another thread, but not shared between
/// threads: the deque relies on `bottom` having a single writer.
///
/// # Examples
///
/// ```rust
/// use yagma::{Deque, Steal};
///
/// let deque = Deque::new();
/// let stealer = deque.stealer();
///
/// deque.push('a');
/// deque.push('b');
///
/// assert_eq!(deque.pop(), Some('b'));
/// assert_eq!(stealer.steal(), Steal::Data('a'));
/// ```
pub struct Deque<T> {
    inner: Arc<CachePadded<Inner<T>>>,

    /// Keeps the handle out of `Sync`, so `push` and `pop` can never run
    /// concurrently with each other.
    _marker: PhantomData<*mut ()>,
}

unsafe impl<T: Send> Send for Deque<T> {}

impl<T> Deque<T> {
    /// Creates a new, empty deque.
    pub fn new() -> Deque<T> {
        Deque::with_min_capacity(DEFAULT_MIN_CAP)
    }

    /// Creates a new, empty deque whose buffer never shrinks below
    /// `min_cap` elements.
    ///
    /// `min_cap` is rounded up to the next power of two; values below a
    /// small floor are clamped upward. The initial buffer is allocated
    /// at the resulting minimum capacity.
    pub fn with_min_capacity(min_cap: usize) -> Deque<T> {
        let min_cap = cmp::max(min_cap, DEFAULT_MIN_CAP).next_power_of_two();
        let buffer = Buffer::alloc(min_cap);

        let inner = Arc::new(CachePadded::new(Inner {
            top: AtomicIsize::new(0),
            bottom: AtomicIsize::new(0),
            buffer: CachePadded::new(Atomic::new(buffer)),
            min_cap,
        }));

        Deque {
            inner,
            _marker: PhantomData,
        }
    }

    /// Creates a new stealer handle for this deque.
    pub fn stealer(&self) -> Stealer<T> {
        Stealer {
            inner: self.inner.clone(),
        }
    }

    /// Pushes a value onto the bottom of the deque.
    ///
    /// Grows the buffer when it is full; the displaced buffer is retired
    /// to the epoch collector and freed once no stealer can read it.
    pub fn push(&self, value: T) {
        let guard = epoch::pin();

        let b = self.inner.bottom.load(Ordering::Relaxed);
        let t = self.inner.top.load(Ordering::Acquire);
        let mut buffer = self.inner.buffer.load(Ordering::Relaxed, &guard);

        unsafe {
            // Is the buffer full?
            if b.wrapping_sub(t) >= buffer.deref().cap() as isize {
                buffer = self.resize(b, t, buffer, 2 * buffer.deref().cap(), &guard);
            }

            buffer.deref().write(b, value);
        }

        // The slot write must not be observable after the `bottom` bump
        // that exposes it: a stealer that sees the new `bottom` must
        // also see the value.
        atomic::fence(Ordering::Release);
        self.inner.bottom.store(b.wrapping_add(1), Ordering::Relaxed);
    }

    /// Pops a value from the bottom of the deque.
    ///
    /// Returns the most recently pushed value still present, or `None`
    /// if the deque is empty.
    pub fn pop(&self) -> Option<T> {
        let b = self.inner.bottom.load(Ordering::Relaxed);
        let t = self.inner.top.load(Ordering::Relaxed);

        // Empty deques return early, skipping the SeqCst fence below.
        if b.wrapping_sub(t) <= 0 {
            return None;
        }

        let guard = epoch::pin();
        let buffer = self.inner.buffer.load(Ordering::Relaxed, &guard);

        // Tentatively claim the bottom element.
        let b = b.wrapping_sub(1);
        self.inner.bottom.store(b, Ordering::Relaxed);

        // Pairs with the fence in `steal`: every stealer either observes
        // the decremented `bottom`, or this thread observes its `top`
        // increment. Weakening this admits both sides taking the same
        // element.
        atomic::fence(Ordering::SeqCst);

        let t = self.inner.top.load(Ordering::Relaxed);
        let len = b.wrapping_sub(t);

        if len < 0 {
            // A stealer emptied the deque first; undo the claim.
            self.inner.bottom.store(t, Ordering::Relaxed);
            return None;
        }

        let mut value = unsafe { Some(buffer.deref().read(b)) };

        if len == 0 {
            // Exactly one element left: race the stealers for it.
            if self
                .inner
                .top
                .compare_exchange(t, t.wrapping_add(1), Ordering::SeqCst, Ordering::Relaxed)
                .is_err()
            {
                // Lost; the value now belongs to the winning stealer.
                mem::forget(value.take());
            }
            self.inner.bottom.store(t.wrapping_add(1), Ordering::Relaxed);
        } else {
            // Shrink once the live range occupies a quarter of the
            // buffer, down to the configured minimum.
            unsafe {
                let cap = buffer.deref().cap();
                if cap / 2 >= self.inner.min_cap && len <= (cap / 4) as isize {
                    self.resize(b, t, buffer, cap / 2, &guard);
                }
            }
        }

        value
    }

    /// Steals a value from the top of the deque.
    ///
    /// Equivalent to [`Stealer::steal`], for owners that also want to
    /// take from the old end.
    pub fn steal(&self) -> Steal<T> {
        self.inner.steal()
    }

    /// Returns the number of elements in the deque.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the deque is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the capacity of the current buffer.
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Replaces the buffer with a freshly allocated one of `new_cap`
    /// slots, copying the live range `[t, b)` over.
    ///
    /// The old buffer is retired, not freed: in-flight stealers may
    /// still read from it under their own pins.
    #[cold]
    unsafe fn resize<'g>(
        &self,
        b: isize,
        t: isize,
        old: Shared<'g, Buffer<T>>,
        new_cap: usize,
        guard: &'g Guard,
    ) -> Shared<'g, Buffer<T>> {
        let new = Buffer::alloc(new_cap);

        // Copy the live range into the new buffer. Slot contents are
        // copied bitwise; exactly one buffer's copy of each index is
        // ever read, decided by the `top`/`bottom` protocol.
        let mut i = t;
        while i != b {
            ptr::copy_nonoverlapping(old.deref().at(i), new.at(i), 1);
            i = i.wrapping_add(1);
        }

        let new = Owned::new(new).into_shared(guard);
        let old = self.inner.buffer.swap(new, Ordering::Release, guard);
        guard.defer_unchecked(move || old.into_owned().into_box().dealloc());

        // Large buffers should not sit in thread-local garbage.
        if mem::size_of::<T>() * new_cap >= FLUSH_THRESHOLD_BYTES {
            guard.flush();
        }

        new
    }
}

impl<T> Default for Deque<T> {
    fn default() -> Deque<T> {
        Deque::new()
    }
}

impl<T> fmt::Debug for Deque<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("Deque { .. }")
    }
}

/// The stealing half of a work-stealing deque.
///
/// Stealers take values from the top of the deque, opposite the owner.
/// They can be cloned freely and shared between threads.
pub struct Stealer<T> {
    inner: Arc<CachePadded<Inner<T>>>,
}

unsafe impl<T: Send> Send for Stealer<T> {}
unsafe impl<T: Send> Sync for Stealer<T> {}

impl<T> Stealer<T> {
    /// Steals a value from the top of the deque.
    ///
    /// Returns [`Steal::Retry`] when a race with the owner or another
    /// stealer was lost; no value is consumed in that case.
    pub fn steal(&self) -> Steal<T> {
        self.inner.steal()
    }

    /// Returns the number of elements in the deque.
    ///
    /// The count is advisory: it may be stale by the time it is
    /// returned.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the deque is observed empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<T> Clone for Stealer<T> {
    fn clone(&self) -> Stealer<T> {
        Stealer {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Stealer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("Stealer { .. }")
    }
}
