use tokio::sync::watch;

/// A single observable value: read the current snapshot, replace it, or
/// subscribe for change notifications. Receivers stay valid for the lifetime
/// of the observable; values are cloned out on read.
#[derive(Debug)]
pub struct Observable<T> {
    sender: watch::Sender<T>,
}

impl<T: Clone> Observable<T> {
    pub fn new(initial: T) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    pub fn get(&self) -> T {
        self.sender.borrow().clone()
    }

    pub fn set(&self, value: T) {
        self.sender.send_replace(value);
    }

    pub fn update(&self, mutate: impl FnOnce(&mut T)) {
        self.sender.send_modify(mutate);
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.sender.subscribe()
    }
}

impl<T: Clone + Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
