use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Fixed pool of export slots. Acquisition never waits: when every slot is
/// taken the caller is turned away.
#[derive(Clone)]
pub struct ExportLimiter {
    sem: Arc<Semaphore>,
    capacity: usize,
}

/// One held export slot, released when dropped.
#[derive(Debug)]
pub struct ExportPermit {
    _permit: OwnedSemaphorePermit,
}

impl ExportLimiter {
    pub fn new(capacity: usize) -> Self {
        Self { sem: Arc::new(Semaphore::new(capacity)), capacity }
    }

    /// Returns `None` if all slots are in use.
    pub fn try_acquire(&self) -> Option<ExportPermit> {
        self.sem.clone().try_acquire_owned().ok().map(|p| ExportPermit { _permit: p })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.sem.available_permits()
    }

    pub fn in_use(&self) -> usize {
        self.capacity.saturating_sub(self.available())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_when_exhausted() {
        let limiter = ExportLimiter::new(2);
        let a = limiter.try_acquire().unwrap();
        let _b = limiter.try_acquire().unwrap();
        assert!(limiter.try_acquire().is_none());
        assert_eq!(limiter.in_use(), 2);

        drop(a);
        assert_eq!(limiter.available(), 1);
        assert!(limiter.try_acquire().is_some());
    }

    #[test]
    fn concurrent_acquire_never_exceeds_capacity() {
        let limiter = ExportLimiter::new(3);
        let barrier = Arc::new(std::sync::Barrier::new(16));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let limiter = limiter.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    let permit = limiter.try_acquire();
                    // Hold until every thread has tried
                    barrier.wait();
                    permit.is_some()
                })
            })
            .collect();
        let granted = handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count();
        assert_eq!(granted, 3);
        assert_eq!(limiter.available(), 3);
    }
}
