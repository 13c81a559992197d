/// Builds a `Listener` that forwards notifications to `handler.method(id, value)`.
/// `handler` must be a cloneable handle, usually an `Arc`.
#[macro_export]
macro_rules! listener {
    ($handler:ident.$method:ident) => {
        $crate::delivery::Listener::new({
            let handler = $handler.clone();
            move |id, value| {
                handler.$method(id, value);
            }
        })
    };
}
