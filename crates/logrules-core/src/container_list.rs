//! Ordered list of attribute containers attached to a context.

use std::fmt;
use std::sync::Arc;

use crate::attribute::{Attribute, AttributeContainer};
use crate::print::Printer;

/// Token identifying one container in an [`AttributeContainerList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerHandle(u64);

/// Containers in insertion order. The list shares, but does not otherwise
/// manage, the containers: callers decide when each one is detached.
#[derive(Debug, Default)]
pub struct AttributeContainerList {
    entries: Vec<(ContainerHandle, Arc<dyn AttributeContainer>)>,
    next_handle: u64,
}

impl AttributeContainerList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a container, returning the handle that removes it.
    pub fn push(&mut self, container: Arc<dyn AttributeContainer>) -> ContainerHandle {
        let handle = ContainerHandle(self.next_handle);
        self.next_handle += 1;
        self.entries.push((handle, container));
        handle
    }

    /// Detach the container behind `handle`, or `None` if it is not attached.
    pub fn remove(&mut self, handle: ContainerHandle) -> Option<Arc<dyn AttributeContainer>> {
        let position = self.entries.iter().position(|(h, _)| *h == handle)?;
        Some(self.entries.remove(position).1)
    }

    pub fn contains_handle(&self, handle: ContainerHandle) -> bool {
        self.entries.iter().any(|(h, _)| *h == handle)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Containers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn AttributeContainer>> {
        self.entries.iter().map(|(_, container)| container)
    }
}

impl AttributeContainer for AttributeContainerList {
    fn has_value(&self, attribute: &Attribute) -> bool {
        self.iter().any(|container| container.has_value(attribute))
    }

    fn print(&self, out: &mut dyn fmt::Write, level: i32, spaces_per_level: i32) -> fmt::Result {
        let mut printer = Printer::new(out, level, spaces_per_level);
        printer.start()?;
        for container in self.iter() {
            printer.nested_item(|out, level, spaces| container.print(out, level, spaces))?;
        }
        printer.end()
    }
}

impl fmt::Display for AttributeContainerList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.print(f, 0, -1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeSet;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_push_and_remove() {
        let mut list = AttributeContainerList::new();
        let a = list.push(Arc::new(AttributeSet::new().with("user", "alice")));
        let b = list.push(Arc::new(AttributeSet::new().with("task", 7)));
        assert_ne!(a, b);
        assert_eq!(list.len(), 2);

        assert!(list.remove(a).is_some());
        assert!(!list.contains_handle(a));
        assert!(list.contains_handle(b));
        assert!(list.remove(a).is_none());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_membership_spans_containers() {
        let mut list = AttributeContainerList::new();
        assert!(!list.has_value(&Attribute::new("user", "alice")));

        list.push(Arc::new(AttributeSet::new().with("user", "alice")));
        let handle = list.push(Arc::new(AttributeSet::new().with("task", 7)));
        assert!(list.has_value(&Attribute::new("user", "alice")));
        assert!(list.has_value(&Attribute::new("task", 7)));

        list.remove(handle);
        assert!(!list.has_value(&Attribute::new("task", 7)));
    }

    #[test]
    fn test_handles_are_not_reused() {
        let mut list = AttributeContainerList::new();
        let first = list.push(Arc::new(AttributeSet::new()));
        list.remove(first);
        let second = list.push(Arc::new(AttributeSet::new()));
        assert_ne!(first, second);
    }

    #[test]
    fn test_print_single_line() {
        let mut list = AttributeContainerList::new();
        list.push(Arc::new(AttributeSet::new().with("user", "alice")));
        list.push(Arc::new(AttributeSet::new()));
        assert_eq!(list.to_string(), "[ [ [ user = \"alice\" ] ] [ ] ]");
    }
}
