//! Observable value cells
//!
//! A [`Property`] is a shared, reference-counted value with a changed
//! notification, used to propagate settings and bind UI fields. Clones
//! of a property are handles to the same underlying cell.

use std::cell::RefCell;
use std::rc::Rc;

use super::{CommandQueue, Event, HandlerId};

struct PropertyCell<T> {
    value: RefCell<T>,
    changed: Event<T>,
}

impl<T: Clone + PartialEq + 'static> PropertyCell<T> {
    fn set(&self, value: T) {
        let differs = *self.value.borrow() != value;
        if differs {
            *self.value.borrow_mut() = value.clone();
            self.changed.invoke(&value);
        }
    }
}

/// A shared value cell that notifies on change.
///
/// The changed event fires only when the new value differs from the old
/// one under `PartialEq`. Handler registration defers through the
/// owning [`CommandQueue`], so subscribing from inside a change handler
/// is safe.
pub struct Property<T> {
    cell: Rc<PropertyCell<T>>,
}

impl<T: Clone + PartialEq + 'static> Property<T> {
    /// Create a property holding `initial`
    pub fn new(initial: T, queue: &CommandQueue) -> Self {
        Self {
            cell: Rc::new(PropertyCell {
                value: RefCell::new(initial),
                changed: Event::new(queue),
            }),
        }
    }

    /// Current value
    pub fn get(&self) -> T {
        self.cell.value.borrow().clone()
    }

    /// Set the value; fires the changed event iff the value differs
    pub fn set(&self, value: T) {
        self.cell.set(value);
    }

    /// The changed notification for this property's cell
    pub fn on_changed(&self) -> &Event<T> {
        &self.cell.changed
    }

    /// One-way binding: mirror every change of `source` into `self`.
    ///
    /// Returns the handler id on `source`'s changed event so the mirror
    /// can be detached again.
    pub fn bind(&self, source: &Self) -> HandlerId {
        let cell = Rc::clone(&self.cell);
        source.on_changed().subscribe(move |value: &T| {
            cell.set(value.clone());
        })
    }

    /// Two-way binding: alias the storage cell of `other`.
    ///
    /// Both handles observe and mutate identical state afterwards.
    /// Re-binding replaces the previous alias, it never stacks.
    pub fn bind_two_way(&mut self, other: &Self) {
        self.cell = Rc::clone(&other.cell);
    }
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("value", &self.cell.value.borrow())
            .finish()
    }
}
