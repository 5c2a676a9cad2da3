use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Bounded pool of reusable entities shared by all receivers of a run.
///
/// Decoding overwrites every field of an entity, so reusing entities avoids reallocating their
/// buffers for each record. Entities are handed out as [`PooledEntity`] guards that return
/// them to the pool when dropped, on every exit path including unwinding.
pub struct EntityPool<E> {
    idle: Arc<Mutex<Vec<E>>>,
    capacity: usize,
}

impl<E> Clone for EntityPool<E> {
    fn clone(&self) -> Self {
        Self {
            idle: self.idle.clone(),
            capacity: self.capacity,
        }
    }
}

impl<E> fmt::Debug for EntityPool<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityPool")
            .field("idle", &self.lock().len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<E> EntityPool<E> {
    /// Creates a pool keeping at most `capacity` idle entities.
    pub fn new(capacity: usize) -> Self {
        Self {
            idle: Arc::new(Mutex::new(Vec::with_capacity(capacity))),
            capacity,
        }
    }

    /// Returns the number of idle entities ready for reuse.
    pub fn idle(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<E>> {
        // An entity is always in a valid state, so a poisoned pool is still usable.
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: Default> EntityPool<E> {
    /// Takes an idle entity, or creates a new one when the pool is empty.
    pub fn acquire(&self) -> PooledEntity<E> {
        let entity = self.lock().pop().unwrap_or_default();

        PooledEntity {
            entity,
            pool: self.clone(),
        }
    }

    fn release(&self, entity: E) {
        let mut idle = self.lock();
        if idle.len() < self.capacity {
            idle.push(entity);
        }
    }
}

/// Entity borrowed from an [`EntityPool`], returned to it on drop.
pub struct PooledEntity<E: Default> {
    entity: E,
    pool: EntityPool<E>,
}

impl<E: Default> Deref for PooledEntity<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.entity
    }
}

impl<E: Default> DerefMut for PooledEntity<E> {
    fn deref_mut(&mut self) -> &mut E {
        &mut self.entity
    }
}

impl<E: Default + fmt::Debug> fmt::Debug for PooledEntity<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.entity.fmt(f)
    }
}

impl<E: Default> Drop for PooledEntity<E> {
    fn drop(&mut self) {
        let entity = std::mem::take(&mut self.entity);
        self.pool.release(entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_entities_are_reused() {
        let pool = EntityPool::<String>::new(4);

        {
            let mut entity = pool.acquire();
            entity.push_str("reused");
        }
        assert_eq!(pool.idle(), 1);

        let entity = pool.acquire();
        assert_eq!(*entity, "reused");
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn idle_entities_are_bounded_by_capacity() {
        let pool = EntityPool::<Vec<u8>>::new(2);

        let held: Vec<_> = (0..5).map(|_| pool.acquire()).collect();
        drop(held);

        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn entities_return_on_unwind() {
        let pool = EntityPool::<u32>::new(1);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _entity = pool.acquire();
            panic!("decoder bug");
        }));

        assert!(result.is_err());
        assert_eq!(pool.idle(), 1);
    }
}
