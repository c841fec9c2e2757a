use std::sync::{Arc, RwLock, RwLockReadGuard};

use lazy_static::lazy_static;

use crate::{
    buffer_pool::BufferPool, common::Catalog, transaction::LockManager, types::Pod,
    utils::HandyRwLock,
};

lazy_static! {
    static ref SINGLETON: Database = Database::new();
}

/// We collect all process-wide state here: the page cache, the table
/// registry and the lock manager. All three use interior mutability, so
/// only read guards are ever handed out.
pub struct Database {
    buffer_pool: Pod<BufferPool>,
    catalog: Pod<Catalog>,
    lock_manager: Pod<LockManager>,
}

impl Database {
    fn new() -> Self {
        Self {
            buffer_pool: Arc::new(RwLock::new(BufferPool::new())),
            catalog: Arc::new(RwLock::new(Catalog::new())),
            lock_manager: Arc::new(RwLock::new(LockManager::new())),
        }
    }

    pub fn global() -> &'static Self {
        &SINGLETON
    }

    pub fn buffer_pool() -> RwLockReadGuard<'static, BufferPool> {
        Self::global().buffer_pool.rl()
    }

    pub fn catalog() -> RwLockReadGuard<'static, Catalog> {
        Self::global().catalog.rl()
    }

    pub fn lock_manager() -> RwLockReadGuard<'static, LockManager> {
        Self::global().lock_manager.rl()
    }
}
