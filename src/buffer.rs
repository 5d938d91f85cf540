use std::mem;
use std::ptr;

/// A fixed-capacity circular buffer holding the elements of a deque.
///
/// This is just a pointer to the allocation and its capacity. Dropping a
/// `Buffer` does *not* free the allocation; ownership of the memory is
/// managed by the deque, which deallocates through [`Buffer::dealloc`]
/// once no stealer can reach it anymore.
///
/// Slots are not tracked individually: a slot holds a valid element
/// exactly when its index lies in the live range `[top, bottom)` of the
/// owning deque. Everything outside that range is uninitialized memory
/// and must not be read.
pub(crate) struct Buffer<T> {
    /// Pointer to the allocated memory.
    ptr: *mut T,

    /// Capacity of the buffer. Always a power of two.
    cap: usize,
}

unsafe impl<T> Send for Buffer<T> {}

impl<T> Buffer<T> {
    /// Allocates a new buffer with the specified capacity.
    pub(crate) fn alloc(cap: usize) -> Buffer<T> {
        debug_assert_eq!(cap, cap.next_power_of_two());

        let mut v = Vec::with_capacity(cap);
        let ptr = v.as_mut_ptr();
        mem::forget(v);

        Buffer { ptr, cap }
    }

    /// Deallocates the buffer without dropping any elements.
    pub(crate) unsafe fn dealloc(self) {
        drop(Vec::from_raw_parts(self.ptr, 0, self.cap));
    }

    /// Returns the capacity of the buffer.
    pub(crate) fn cap(&self) -> usize {
        self.cap
    }

    /// Returns a pointer to the slot at `index`.
    ///
    /// Indices are taken modulo the capacity, which is a power of two.
    pub(crate) unsafe fn at(&self, index: isize) -> *mut T {
        self.ptr.offset(index & (self.cap - 1) as isize)
    }

    /// Writes `value` into the slot at `index`.
    ///
    /// The store itself is plain; it becomes visible to stealers only
    /// through the release fence preceding the `bottom` bump in `push`.
    pub(crate) unsafe fn write(&self, index: isize, value: T) {
        ptr::write(self.at(index), value)
    }

    /// Reads the value out of the slot at `index`.
    ///
    /// This is a destructive bitwise read. The caller must have
    /// established exclusive claim to the slot (by winning the CAS on
    /// `top`, or by being the owner of an uncontested `pop`); a value
    /// read on a lost race must be `mem::forget`-discarded, not dropped.
    pub(crate) unsafe fn read(&self, index: isize) -> T {
        ptr::read(self.at(index))
    }
}

impl<T> Clone for Buffer<T> {
    fn clone(&self) -> Buffer<T> {
        Buffer {
            ptr: self.ptr,
            cap: self.cap,
        }
    }
}

impl<T> Copy for Buffer<T> {}
