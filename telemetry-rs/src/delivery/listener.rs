use std::sync::Arc;
use uuid::Uuid;

/// Callback invoked with the listener id and the notified value.
pub type Callback<T> = Arc<dyn Fn(Uuid, Arc<T>) + Send + Sync>;

/// Registration handle wrapping a callback. The id is assigned on registration.
#[derive(Clone)]
pub struct Listener<T> {
    callback: Callback<T>,
    id: Option<Uuid>,
}

impl<T> Listener<T>
where
    T: Send + Sync + 'static,
{
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(Uuid, Arc<T>) + Send + Sync + 'static,
    {
        Listener {
            callback: Arc::new(callback),
            id: None,
        }
    }

    pub fn get_callback(&self) -> Callback<T> {
        self.callback.clone()
    }

    pub fn get_id(&self) -> Option<Uuid> {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: Uuid) {
        self.id = Some(id);
    }
}
