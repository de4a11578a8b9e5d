//! Property change notification.

use entwine_types::{EntityRef, Value};

/// A field of an entity was persisted with a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChangeEvent {
    /// The saved entity.
    pub entity: EntityRef,
    /// Column name of the changed field.
    pub field: String,
    /// The value now stored.
    pub new_value: Value,
}

/// Receives [`PropertyChangeEvent`]s after a successful save.
///
/// Listeners are called synchronously on the saving thread, once per
/// persisted field, in registration order.
pub trait PropertyChangeListener: Send + Sync {
    /// Called once per persisted field.
    fn property_changed(&self, event: &PropertyChangeEvent);
}

impl<F> PropertyChangeListener for F
where
    F: Fn(&PropertyChangeEvent) + Send + Sync,
{
    fn property_changed(&self, event: &PropertyChangeEvent) {
        self(event);
    }
}
