//! Lock helpers that recover poisoned guards and log the recovery.

use std::sync::{LockResult, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

fn recover<G>(result: LockResult<G>, owner: &'static str, op: &'static str, kind: &str) -> G {
    result.unwrap_or_else(|poisoned| {
        warn!(owner, op, lock_kind = kind, "recovered poisoned lock");
        poisoned.into_inner()
    })
}

pub(crate) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    owner: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    recover(lock.read(), owner, op, "read")
}

pub(crate) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    owner: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    recover(lock.write(), owner, op, "write")
}

pub(crate) fn mutex_lock<'a, T>(
    lock: &'a Mutex<T>,
    owner: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T> {
    recover(lock.lock(), owner, op, "mutex")
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn poisoned_mutex_still_yields_its_value() {
        let shared = Arc::new(Mutex::new(7_u32));
        let poisoner = shared.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.lock();
            panic!("poison the lock");
        })
        .join();

        assert!(shared.is_poisoned());
        assert_eq!(*mutex_lock(&shared, "test", "read"), 7);
    }

    #[test]
    fn poisoned_rwlock_accepts_writes() {
        let shared = Arc::new(RwLock::new(Vec::<u8>::new()));
        let poisoner = shared.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.write();
            panic!("poison the lock");
        })
        .join();

        write_lock(&shared, "test", "push").push(1);
        assert_eq!(*read_lock(&shared, "test", "read"), vec![1]);
    }
}
