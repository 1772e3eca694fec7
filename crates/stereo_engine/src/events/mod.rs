//! Deferred command queue and change events
//!
//! Key principles:
//! - Commands are drained once per frame, in enqueue order (FIFO)
//! - A failing command halts the drain; the rest of the queue is kept
//!   for the next frame, and executed commands are removed only after
//!   they ran
//! - Handler subscribe/unsubscribe goes through the queue, so the
//!   handler registry is never mutated while an invocation iterates it
//!
//! The queue is owned by the session that drains it and handed to the
//! components that need deferral; there is no process-wide singleton.

pub mod property;

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

/// Error raised by a deferred command.
///
/// A command failure halts the current drain; the failed command and
/// everything behind it stay queued for the next frame.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The command reported a failure and should be retried next frame
    #[error("deferred command failed: {0}")]
    Failed(String),
}

/// Readiness gate shared between a command and whoever arms it.
///
/// A command built with a gate is skipped during drains until the gate
/// is set; gating never reorders the commands that are ready.
#[derive(Debug, Clone, Default)]
pub struct ReadyGate(Rc<Cell<bool>>);

impl ReadyGate {
    /// Create a gate that is not yet set
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the gate; the command runs on the next drain
    pub fn set(&self) {
        self.0.set(true);
    }

    /// Whether the gate has been armed
    pub fn is_set(&self) -> bool {
        self.0.get()
    }
}

type CommandAction = Box<dyn FnMut() -> Result<(), CommandError>>;

/// A pending mutation scheduled for the next drain point.
pub struct DeferredCommand {
    gate: Option<ReadyGate>,
    action: CommandAction,
}

impl DeferredCommand {
    /// Create a command that is ready to run on the next drain
    pub fn new(action: impl FnMut() -> Result<(), CommandError> + 'static) -> Self {
        Self {
            gate: None,
            action: Box::new(action),
        }
    }

    /// Create a command held back until `gate` is set
    pub fn gated(gate: ReadyGate, action: impl FnMut() -> Result<(), CommandError> + 'static) -> Self {
        Self {
            gate: Some(gate),
            action: Box::new(action),
        }
    }

    fn is_ready(&self) -> bool {
        self.gate.as_ref().map_or(true, ReadyGate::is_set)
    }
}

impl std::fmt::Debug for DeferredCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredCommand")
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

/// Cloneable handle to a per-session queue of deferred commands.
///
/// All scene mutation happens on the single UI/render thread, so the
/// queue uses `Rc<RefCell<..>>` rather than locks. Commands enqueued
/// while a drain is running are processed on the *next* drain.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    pending: Rc<RefCell<VecDeque<DeferredCommand>>>,
}

impl CommandQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a command for the next drain point
    pub fn push(&self, command: DeferredCommand) {
        self.pending.borrow_mut().push_back(command);
    }

    /// Schedule a closure that is ready immediately
    pub fn push_ready(&self, action: impl FnMut() -> Result<(), CommandError> + 'static) {
        self.push(DeferredCommand::new(action));
    }

    /// Number of commands currently waiting
    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Whether the queue has no pending commands
    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    /// Run every ready command in enqueue order. Call once per frame.
    ///
    /// A command failure stops the drain for this frame: the failed
    /// command and everything after it remain queued ahead of anything
    /// enqueued while the drain was running. Commands that are not
    /// ready are carried over without reordering the ready ones.
    pub fn drain(&self) -> Result<(), CommandError> {
        // Take the snapshot first so command actions may enqueue new
        // commands without re-borrowing the live queue.
        let mut work = std::mem::take(&mut *self.pending.borrow_mut());
        let mut leftover = VecDeque::new();
        let mut halted = None;

        while let Some(mut command) = work.pop_front() {
            if halted.is_some() || !command.is_ready() {
                leftover.push_back(command);
                continue;
            }
            if let Err(err) = (command.action)() {
                log::warn!("deferred command failed, halting drain: {err}");
                leftover.push_back(command);
                halted = Some(err);
            }
        }

        let mut pending = self.pending.borrow_mut();
        let enqueued_during_drain = std::mem::take(&mut *pending);
        leftover.extend(enqueued_during_drain);
        *pending = leftover;

        halted.map_or(Ok(()), Err)
    }
}

/// Identifier of a subscribed event handler
pub type HandlerId = u64;

type HandlerMap<T> = BTreeMap<HandlerId, Box<dyn FnMut(&T)>>;

struct EventInner<T> {
    handlers: RefCell<HandlerMap<T>>,
    next_id: Cell<HandlerId>,
}

/// A change notification with deferred handler registration.
///
/// `invoke` calls handlers in subscription order. `subscribe` and
/// `unsubscribe` only take effect at the next queue drain, which makes
/// them safe to call from inside a handler: the registry is never
/// mutated while it is being iterated.
pub struct Event<T> {
    inner: Rc<EventInner<T>>,
    queue: CommandQueue,
}

impl<T: 'static> Event<T> {
    /// Create an event whose registrations defer through `queue`
    pub fn new(queue: &CommandQueue) -> Self {
        Self {
            inner: Rc::new(EventInner {
                handlers: RefCell::new(BTreeMap::new()),
                next_id: Cell::new(0),
            }),
            queue: queue.clone(),
        }
    }

    /// Register a handler; takes effect at the next drain.
    ///
    /// The returned id is valid immediately and may be passed to
    /// [`Self::unsubscribe`] even before the registration has drained.
    pub fn subscribe(&self, handler: impl FnMut(&T) + 'static) -> HandlerId {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);

        let inner = Rc::clone(&self.inner);
        let mut slot = Some(Box::new(handler) as Box<dyn FnMut(&T)>);
        self.queue.push_ready(move || {
            if let Some(handler) = slot.take() {
                inner.handlers.borrow_mut().insert(id, handler);
            }
            Ok(())
        });

        id
    }

    /// Remove a handler; takes effect at the next drain.
    ///
    /// Removing an id whose registration has not drained yet, or that
    /// was already removed, is a no-op.
    pub fn unsubscribe(&self, id: HandlerId) {
        let inner = Rc::clone(&self.inner);
        self.queue.push_ready(move || {
            inner.handlers.borrow_mut().remove(&id);
            Ok(())
        });
    }

    /// Call every registered handler with `value`, in subscription order.
    ///
    /// The registry is not borrowed while a handler runs, so a handler
    /// may re-invoke the event or query [`Self::handler_count`]; a
    /// reentrant invoke skips the handler that is currently running.
    pub fn invoke(&self, value: &T) {
        let ids: Vec<HandlerId> = self.inner.handlers.borrow().keys().copied().collect();
        for id in ids {
            let handler = self.inner.handlers.borrow_mut().remove(&id);
            if let Some(mut handler) = handler {
                handler(value);
                self.inner.handlers.borrow_mut().entry(id).or_insert(handler);
            }
        }
    }

    /// Number of handlers whose registration has drained
    pub fn handler_count(&self) -> usize {
        self.inner.handlers.borrow().len()
    }
}

impl<T> Clone for Event<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            queue: self.queue.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("handlers", &self.inner.handlers.borrow().len())
            .finish()
    }
}
