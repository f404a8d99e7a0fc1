//! Process-wide rule owner and per-thread contexts.
//!
//! [`initialize`] installs the [`CategoryManager`] every thread evaluates
//! rules against. Each thread then gets its own [`AttributeContext`],
//! created on first use by [`with_context`] and dropped when the thread
//! exits, or earlier through [`destroy_context`] / [`ContextProctor`].
//!
//! Contexts are stored in thread-local storage and lent out to closures, so
//! a closure passed to [`with_context`] must not call back into this module
//! on the same thread.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::attribute::AttributeContainer;
use crate::category::CategoryManager;
use crate::container_list::ContainerHandle;
use crate::context::{AttributeContext, ContextId};

static MANAGER: RwLock<Option<Arc<CategoryManager>>> = RwLock::new(None);

thread_local! {
    static CONTEXT: RefCell<Option<AttributeContext>> = const { RefCell::new(None) };
}

/// Errors from the context registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("attribute context registry is already initialized")]
    AlreadyInitialized,

    #[error("attribute context registry is not initialized")]
    NotInitialized,
}

/// Install the process-wide rule owner.
///
/// Only the first call takes effect. Later calls log a warning, leave the
/// installed manager in place, and return
/// [`RegistryError::AlreadyInitialized`].
pub fn initialize(manager: Arc<CategoryManager>) -> Result<(), RegistryError> {
    let mut slot = MANAGER.write().unwrap_or_else(PoisonError::into_inner);
    if slot.is_some() {
        warn!("attribute context registry already initialized; ignoring");
        return Err(RegistryError::AlreadyInitialized);
    }
    *slot = Some(manager);
    debug!("attribute context registry initialized");
    Ok(())
}

/// Uninstall the rule owner, returning it. Contexts that already exist keep
/// the manager they were created with.
pub fn reset() -> Option<Arc<CategoryManager>> {
    let previous = MANAGER.write().unwrap_or_else(PoisonError::into_inner).take();
    if previous.is_some() {
        debug!("attribute context registry reset");
    }
    previous
}

pub fn is_initialized() -> bool {
    MANAGER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .is_some()
}

/// The installed rule owner, if any.
pub fn category_manager() -> Option<Arc<CategoryManager>> {
    MANAGER.read().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Run `f` with this thread's context, creating it if needed.
pub fn try_with_context<R>(f: impl FnOnce(&mut AttributeContext) -> R) -> Result<R, RegistryError> {
    CONTEXT.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            let manager = category_manager().ok_or(RegistryError::NotInitialized)?;
            let context = AttributeContext::new(manager);
            debug!(
                context = %context.id(),
                thread = ?std::thread::current().id(),
                "created attribute context"
            );
            *slot = Some(context);
        }
        let context = slot.as_mut().ok_or(RegistryError::NotInitialized)?;
        Ok(f(context))
    })
}

/// Run `f` with this thread's context, creating it if needed.
///
/// # Panics
///
/// If [`initialize`] has not been called, or if called from within another
/// closure lent out by this module on the same thread.
pub fn with_context<R>(f: impl FnOnce(&mut AttributeContext) -> R) -> R {
    match try_with_context(f) {
        Ok(result) => result,
        Err(err) => panic!("{err}: call registry::initialize first"),
    }
}

/// Run `f` with this thread's context if it exists; never creates one.
pub fn with_existing_context<R>(f: impl FnOnce(&mut AttributeContext) -> R) -> Option<R> {
    CONTEXT
        .try_with(|cell| cell.borrow_mut().as_mut().map(f))
        .ok()
        .flatten()
}

/// Whether this thread currently has a context.
pub fn has_context() -> bool {
    CONTEXT
        .try_with(|cell| cell.borrow().is_some())
        .unwrap_or(false)
}

/// Drop this thread's context now. Returns whether one existed.
pub fn destroy_context() -> bool {
    let destroyed = CONTEXT
        .try_with(|cell| cell.borrow_mut().take())
        .ok()
        .flatten();
    match destroyed {
        Some(context) => {
            debug!(context = %context.id(), "destroyed attribute context");
            true
        }
        None => false,
    }
}

/// Destroys the current thread's context when dropped.
///
/// Useful on threads that outlive the work that needs the context, such as
/// pooled workers.
#[derive(Debug)]
#[must_use = "the context is destroyed when the proctor is dropped"]
pub struct ContextProctor {
    _not_send: PhantomData<*const ()>,
}

impl ContextProctor {
    pub fn new() -> Self {
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Default for ContextProctor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ContextProctor {
    fn drop(&mut self) {
        destroy_context();
    }
}

/// Attaches a container to the current thread's context for the guard's
/// lifetime.
///
/// If the context the container was attached to is destroyed first, or the
/// container was already removed through [`handle`](Self::handle), the guard
/// does nothing on drop.
#[derive(Debug)]
#[must_use = "the attributes are detached when the guard is dropped"]
pub struct ScopedAttributes {
    context: ContextId,
    handle: ContainerHandle,
    _not_send: PhantomData<*const ()>,
}

impl ScopedAttributes {
    /// Attach `container`, creating the thread's context if needed.
    pub fn try_new(container: Arc<dyn AttributeContainer>) -> Result<Self, RegistryError> {
        let (context, handle) =
            try_with_context(|ctx| (ctx.id(), ctx.add_attributes(container)))?;
        Ok(Self {
            context,
            handle,
            _not_send: PhantomData,
        })
    }

    /// Attach `container`, creating the thread's context if needed.
    ///
    /// # Panics
    ///
    /// Under the same conditions as [`with_context`].
    pub fn new(container: Arc<dyn AttributeContainer>) -> Self {
        match Self::try_new(container) {
            Ok(scoped) => scoped,
            Err(err) => panic!("{err}: call registry::initialize first"),
        }
    }

    pub fn handle(&self) -> ContainerHandle {
        self.handle
    }
}

impl Drop for ScopedAttributes {
    fn drop(&mut self) {
        with_existing_context(|ctx| {
            if ctx.id() == self.context && ctx.containers().contains_handle(self.handle) {
                ctx.remove_attributes(self.handle);
            }
        });
    }
}
