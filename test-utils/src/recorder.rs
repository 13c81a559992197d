use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Collects every value a listener callback is notified with.
#[derive(Clone, Default)]
pub struct Recorder<T> {
    values: Arc<Mutex<Vec<T>>>,
}

impl<T> Recorder<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            values: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns a callback suitable for a listener, recording into this recorder.
    pub fn callback(&self) -> impl Fn(Uuid, Arc<T>) + Send + Sync + 'static {
        let values = self.values.clone();
        move |_id: Uuid, value: Arc<T>| {
            values.lock().unwrap().push((*value).clone());
        }
    }

    pub fn values(&self) -> Vec<T> {
        self.values.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.values.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of recorded values matching `predicate`.
    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&T) -> bool,
    {
        self.values.lock().unwrap().iter().filter(|v| predicate(v)).count()
    }
}
