use std::cell::RefCell;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

// statements starting with this are read queries
pub const READ_QUERY_MARKER: &str = "SELECT";

tokio::task_local! {
    static ACTIVE_OBSERVER: Arc<QueryObserver>;
}

thread_local! {
    static THREAD_OBSERVER: RefCell<Option<Arc<QueryObserver>>> = const { RefCell::new(None) };
}

// Query records for one request
#[derive(Debug, Default)]
pub struct QueryObserver {
    select_queries: Mutex<Vec<String>>,
}

impl QueryObserver {
    pub fn new() -> Self {
        Self::default()
    }

    // text is kept exactly as the data layer produced it
    pub fn record(&self, sql: &str) {
        if sql.starts_with(READ_QUERY_MARKER) {
            self.select_queries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(sql.to_owned());
        }
    }

    pub fn records(&self) -> Vec<String> {
        self.select_queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn take_records(&self) -> Vec<String> {
        std::mem::take(&mut *self.select_queries.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Run `future` with `observer` registered until it finishes or is dropped.
pub fn scope<F>(observer: Arc<QueryObserver>, future: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    ACTIVE_OBSERVER.scope(observer, future)
}

#[must_use = "the observer is deregistered as soon as the guard is dropped"]
pub struct ObserverGuard {
    previous: Option<Arc<QueryObserver>>,
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        THREAD_OBSERVER.with(|slot| {
            *slot.borrow_mut() = self.previous.take();
        });
    }
}

// Task-locals don't follow work onto spawn_blocking threads: grab current()
// before moving and enter it on the other side
pub fn enter(observer: Arc<QueryObserver>) -> ObserverGuard {
    let previous = THREAD_OBSERVER.with(|slot| slot.borrow_mut().replace(observer));
    ObserverGuard { previous }
}

pub fn current() -> Option<Arc<QueryObserver>> {
    ACTIVE_OBSERVER
        .try_with(Arc::clone)
        .ok()
        .or_else(|| THREAD_OBSERVER.with(|slot| slot.borrow().clone()))
}

/// Execution hook for the data layer: records `sql`, then runs it untouched.
pub fn intercept<T, E, F>(sql: &str, execute: F) -> Result<T, E>
where
    F: FnOnce(&str) -> Result<T, E>,
{
    if let Some(observer) = current() {
        observer.record(sql);
    }
    execute(sql)
}
