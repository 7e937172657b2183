use core::{
    cell::UnsafeCell,
    hint::spin_loop,
    mem::{self, MaybeUninit},
    sync::atomic::{AtomicU8, Ordering},
};

const UNINIT: u8 = 0;
const INITING: u8 = 1;
const READY: u8 = 2;

/// A cell written at most once and then shared read-only, usable in `static`s.
///
/// Used for kernel-wide singletons that are built during boot and handed out
/// as `&'static` handles afterwards.
///
/// ```
/// use kernel_sync::SyncOnceCell;
///
/// static CELL: SyncOnceCell<u32> = SyncOnceCell::new();
///
/// assert!(CELL.get().is_none());
/// assert_eq!(CELL.set(7), Ok(&7));
/// assert_eq!(CELL.set(8), Err(8));
/// assert_eq!(CELL.get(), Some(&7));
/// ```
pub struct SyncOnceCell<T> {
    state: AtomicU8,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Default for SyncOnceCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SyncOnceCell<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(UNINIT),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Returns `Some(&T)` if already initialized.
    #[inline]
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        if self.state.load(Ordering::Acquire) == READY {
            // SAFETY: READY guarantees the write is done
            Some(unsafe { (*self.value.get()).assume_init_ref() })
        } else {
            None
        }
    }

    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.load(Ordering::Acquire) == READY
    }

    /// Store `value` if the cell is still empty and return the stored reference.
    ///
    /// # Errors
    /// Hands `value` back unchanged if the cell is already initialized or
    /// another thread is initializing it.
    pub fn set(&self, value: T) -> Result<&T, T> {
        if !self.claim() {
            return Err(value);
        }
        // SAFETY: the INITING state makes us the only writer.
        Ok(unsafe { self.publish(value) })
    }

    /// Initialize at most once and return `&T`.
    ///
    /// If another thread is running its initializer concurrently this call
    /// spins until that value is published. If the initializer panics the cell
    /// is left empty and the next caller runs its own.
    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> &T {
        loop {
            match self.state.load(Ordering::Acquire) {
                READY => {
                    // SAFETY: READY
                    return unsafe { (*self.value.get()).assume_init_ref() };
                }
                UNINIT if self.claim() => {
                    let unclaim = Unclaim(&self.state);
                    let value = init();
                    mem::forget(unclaim);
                    // SAFETY: the INITING state makes us the only writer.
                    return unsafe { self.publish(value) };
                }
                _ => spin_loop(),
            }
        }
    }

    /// Move UNINIT -> INITING; true if this caller won.
    #[inline]
    fn claim(&self) -> bool {
        self.state
            .compare_exchange(UNINIT, INITING, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// # Safety
    /// Caller must have won [`claim`](Self::claim).
    unsafe fn publish(&self, value: T) -> &T {
        let slot = unsafe { &mut *self.value.get() };
        let v: *const T = slot.write(value);
        // Publish value before marking READY
        self.state.store(READY, Ordering::Release);
        unsafe { &*v }
    }
}

/// Returns a claimed cell to UNINIT when the initializer unwinds.
struct Unclaim<'a>(&'a AtomicU8);

impl Drop for Unclaim<'_> {
    fn drop(&mut self) {
        self.0.store(UNINIT, Ordering::Release);
    }
}

impl<T> Drop for SyncOnceCell<T> {
    fn drop(&mut self) {
        if *self.state.get_mut() == READY {
            // SAFETY: READY, and `&mut self` rules out readers.
            unsafe { self.value.get_mut().assume_init_drop() }
        }
    }
}

// Safety: shared after READY; initialization is single-writer.
unsafe impl<T: Send + Sync> Sync for SyncOnceCell<T> {}
unsafe impl<T: Send> Send for SyncOnceCell<T> {}
