//! Event filter chain: interceptors that run before delivery.
//!
//! Filters are installed on a scope -- the whole application or a single
//! target -- and are consulted in install order before any event reaches its
//! target. An interceptor observes the event and decides whether it passes;
//! the first [`FilterDecision::Consumed`] stops the chain and the target
//! never sees the event. Interceptors receive a shared reference and cannot
//! mutate the event.

use std::sync::Arc;

use crate::event::Event;
use crate::target::TargetId;

/// A unique identifier for an installed filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterId(u64);

/// Where a filter is watching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterScope {
    /// Intercept every event, regardless of target.
    Application,
    /// Intercept only events addressed to one target.
    Target(TargetId),
}

impl FilterScope {
    fn matches(self, target: TargetId) -> bool {
        match self {
            Self::Application => true,
            Self::Target(id) => id == target,
        }
    }
}

/// An interceptor's verdict on an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    /// Stop the chain; the target never sees the event.
    Consumed,
    /// Let the next interceptor (or the target) see the event.
    Pass,
}

type BoxedInterceptor = Arc<dyn Fn(&Event) -> FilterDecision>;

struct FilterEntry {
    id: FilterId,
    scope: FilterScope,
    interceptor: BoxedInterceptor,
}

/// The ordered list of installed interceptors.
pub(crate) struct FilterChain {
    /// Entries in install order.
    entries: Vec<FilterEntry>,
    next_id: u64,
}

impl FilterChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    /// Append an interceptor for `scope`, preserving install order.
    pub fn install<F>(&mut self, scope: FilterScope, interceptor: F) -> FilterId
    where
        F: Fn(&Event) -> FilterDecision + 'static,
    {
        let id = FilterId(self.next_id);
        self.next_id += 1;
        self.entries.push(FilterEntry {
            id,
            scope,
            interceptor: Arc::new(interceptor),
        });
        tracing::trace!(target: "eventide_core::filter", ?id, ?scope, "installed filter");
        id
    }

    /// Uninstall a filter. Returns `true` if it was installed.
    pub fn remove(&mut self, id: FilterId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        before != self.entries.len()
    }

    /// Get the number of installed filters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Snapshot the interceptors matching `target`, in install order.
    ///
    /// The loop invokes the snapshot after releasing the chain lock, so an
    /// interceptor may itself install or remove filters; changes only affect
    /// subsequent events.
    pub fn matching(&self, target: TargetId) -> Vec<BoxedInterceptor> {
        self.entries
            .iter()
            .filter(|entry| entry.scope.matches(target))
            .map(|entry| entry.interceptor.clone())
            .collect()
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::event::EventType;
    use crate::target::TargetTable;

    fn targets() -> (TargetId, TargetId) {
        let mut table = TargetTable::new();
        let a = table.insert(Box::new(|_: &Event| true));
        let b = table.insert(Box::new(|_: &Event| true));
        (a, b)
    }

    fn run_chain(chain: &FilterChain, event: &Event) -> FilterDecision {
        for interceptor in chain.matching(event.target()) {
            if interceptor(event) == FilterDecision::Consumed {
                return FilterDecision::Consumed;
            }
        }
        FilterDecision::Pass
    }

    #[test]
    fn test_install_order_preserved() {
        let (a, _) = targets();
        let ty = EventType::register();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let mut chain = FilterChain::new();
        for label in ["first", "second", "third"] {
            let seen = seen.clone();
            chain.install(FilterScope::Application, move |_| {
                seen.borrow_mut().push(label);
                FilterDecision::Pass
            });
        }

        let event = Event::new(ty, a, ());
        assert_eq!(run_chain(&chain, &event), FilterDecision::Pass);
        assert_eq!(*seen.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_consumed_stops_chain() {
        let (a, _) = targets();
        let ty = EventType::register();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let mut chain = FilterChain::new();
        let seen1 = seen.clone();
        chain.install(FilterScope::Application, move |_| {
            seen1.borrow_mut().push("consumer");
            FilterDecision::Consumed
        });
        let seen2 = seen.clone();
        chain.install(FilterScope::Application, move |_| {
            seen2.borrow_mut().push("never");
            FilterDecision::Pass
        });

        let event = Event::new(ty, a, ());
        assert_eq!(run_chain(&chain, &event), FilterDecision::Consumed);
        assert_eq!(*seen.borrow(), vec!["consumer"]);
    }

    #[test]
    fn test_target_scope_matches_only_its_target() {
        let (a, b) = targets();
        let ty = EventType::register();
        let hits = Rc::new(RefCell::new(0));

        let mut chain = FilterChain::new();
        let hits_clone = hits.clone();
        chain.install(FilterScope::Target(a), move |_| {
            *hits_clone.borrow_mut() += 1;
            FilterDecision::Pass
        });

        run_chain(&chain, &Event::new(ty, a, ()));
        run_chain(&chain, &Event::new(ty, b, ()));
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn test_remove() {
        let (a, _) = targets();
        let mut chain = FilterChain::new();
        let id = chain.install(FilterScope::Application, |_| FilterDecision::Consumed);
        assert_eq!(chain.len(), 1);

        assert!(chain.remove(id));
        assert!(!chain.remove(id));
        assert!(chain.matching(a).is_empty());
    }
}
