//! Async event streams for registry observers.
//!
//! Resolution itself is synchronous; observers that want to follow what a
//! registry binds, fails to find, or tears down subscribe with
//! [`Registry::subscribe`](crate::Registry::subscribe) and consume the
//! resulting stream from async code.

use std::pin::Pin;

use futures_core::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::name::CanonicalName;

/// Type alias for a boxed async stream of events.
pub type EventStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

/// Something that happened in a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A missing name was bound and fully initialized.
    Bound {
        namespace: String,
        name: CanonicalName,
    },
    /// No factory bound a missing name.
    NotFound {
        namespace: String,
        name: CanonicalName,
    },
    /// Loaded names were torn down.
    Reloaded {
        namespace: String,
        names: Vec<CanonicalName>,
    },
}

impl RegistryEvent {
    /// The display path of the namespace the event came from.
    pub fn namespace(&self) -> &str {
        match self {
            RegistryEvent::Bound { namespace, .. }
            | RegistryEvent::NotFound { namespace, .. }
            | RegistryEvent::Reloaded { namespace, .. } => namespace,
        }
    }
}

/// A sender for events in an async stream.
#[derive(Debug)]
pub struct EventSender<T> {
    tx: mpsc::Sender<T>,
}

impl<T> EventSender<T> {
    pub fn new(tx: mpsc::Sender<T>) -> Self {
        Self { tx }
    }

    /// Try to send an event without waiting.
    ///
    /// Returns `Err(event)` if the channel is full or closed.
    pub fn try_send(&self, event: T) -> Result<(), T> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(v) => v,
            mpsc::error::TrySendError::Closed(v) => v,
        })
    }

    /// Check if the receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T> Clone for EventSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Builder for event streams.
///
/// # Example
///
/// ```rust
/// use lazyspace::events::StreamBuilder;
///
/// let (sender, _stream) = StreamBuilder::<u32>::new().buffer_size(4).build();
/// assert!(sender.try_send(1).is_ok());
/// ```
pub struct StreamBuilder<T> {
    buffer_size: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Send + 'static> StreamBuilder<T> {
    pub fn new() -> Self {
        Self {
            buffer_size: 100,
            _marker: std::marker::PhantomData,
        }
    }

    /// Set the buffer size for the underlying channel.
    ///
    /// Default is 100. A size of zero is raised to one.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Build the sender and stream pair.
    pub fn build(self) -> (EventSender<T>, EventStream<T>) {
        let (tx, rx) = mpsc::channel(self.buffer_size);
        let sender = EventSender::new(tx);
        let stream: EventStream<T> = Box::pin(ReceiverStream::new(rx));
        (sender, stream)
    }
}

impl<T: Send + 'static> Default for StreamBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
