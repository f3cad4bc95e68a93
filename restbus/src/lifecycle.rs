//! Controller lifecycle events.
//!
//! Every controller action fires a `<action>.pre` event before the resource
//! runs and a `<action>.post` event after the result has been normalized.
//! Pre hooks may short-circuit the whole action with a terminal [`Outcome`];
//! post hooks mutate the outgoing entity or collection in place. The factory
//! uses these hook points for the collection query whitelist.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use restbus_core::{Collection, Entity, Outcome, Parameters};

use crate::methods::MethodSet;
use crate::resource::Resource;

// ============================================================================
// Action and phase
// ============================================================================

/// The controller actions that fire lifecycle events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// POST to a collection route.
    Create,
    /// DELETE on an entity route.
    Delete,
    /// DELETE on a collection route.
    DeleteList,
    /// GET on an entity route.
    Get,
    /// GET on a collection route.
    GetList,
    /// OPTIONS on either route.
    Options,
    /// PATCH on an entity route.
    Patch,
    /// PATCH on a collection route.
    PatchList,
    /// PUT on an entity route.
    Update,
    /// PUT on a collection route.
    ReplaceList,
}

impl Action {
    /// The action's event-name stem.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Delete => "delete",
            Action::DeleteList => "deleteList",
            Action::Get => "get",
            Action::GetList => "getList",
            Action::Options => "options",
            Action::Patch => "patch",
            Action::PatchList => "patchList",
            Action::Update => "update",
            Action::ReplaceList => "replaceList",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a hook runs before or after the resource call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Before the resource runs; hooks may short-circuit.
    Pre,
    /// After result normalization; hooks may mutate the representation.
    Post,
}

impl Phase {
    /// The phase's event-name suffix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Pre => "pre",
            Phase::Post => "post",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Event and hook contract
// ============================================================================

/// Payload slots a lifecycle event may carry, depending on action and phase.
#[derive(Default)]
pub(crate) struct EventSlots<'a> {
    pub(crate) id: Option<&'a Value>,
    pub(crate) data: Option<&'a Value>,
    pub(crate) entity: Option<&'a mut Entity>,
    pub(crate) collection: Option<&'a mut Collection>,
    pub(crate) methods: Option<&'a MethodSet>,
}

/// A lifecycle event in flight.
///
/// Hooks receive it mutably: pre hooks typically reach the [`Resource`] to
/// seed dispatch context, post hooks the entity/collection slots to adjust
/// the outgoing representation.
pub struct LifecycleEvent<'a> {
    action: Action,
    phase: Phase,
    slots: EventSlots<'a>,
    resource: &'a mut Resource,
    query: &'a Parameters,
}

impl<'a> LifecycleEvent<'a> {
    pub(crate) fn new(
        action: Action,
        phase: Phase,
        slots: EventSlots<'a>,
        resource: &'a mut Resource,
        query: &'a Parameters,
    ) -> Self {
        Self {
            action,
            phase,
            slots,
            resource,
            query,
        }
    }

    /// The action firing this event.
    pub fn action(&self) -> Action {
        self.action
    }

    /// The phase firing this event.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The full event name, e.g. `getList.pre`.
    pub fn name(&self) -> String {
        format!("{}.{}", self.action, self.phase)
    }

    /// The entity identifier, for actions that carry one.
    pub fn id(&self) -> Option<&Value> {
        self.slots.id
    }

    /// The raw request payload, for actions that carry one.
    pub fn data(&self) -> Option<&Value> {
        self.slots.data
    }

    /// The normalized entity, on entity-producing post events.
    pub fn entity(&self) -> Option<&Entity> {
        self.slots.entity.as_deref()
    }

    /// Mutable access to the normalized entity.
    pub fn entity_mut(&mut self) -> Option<&mut Entity> {
        self.slots.entity.as_deref_mut()
    }

    /// The normalized collection, on collection-producing post events.
    pub fn collection(&self) -> Option<&Collection> {
        self.slots.collection.as_deref()
    }

    /// Mutable access to the normalized collection.
    pub fn collection_mut(&mut self) -> Option<&mut Collection> {
        self.slots.collection.as_deref_mut()
    }

    /// The allow-list being reported, on options events.
    pub fn methods(&self) -> Option<&MethodSet> {
        self.slots.methods
    }

    /// The resource the controller is about to (or did) dispatch through.
    pub fn resource(&self) -> &Resource {
        self.resource
    }

    /// Mutable access to the resource.
    pub fn resource_mut(&mut self) -> &mut Resource {
        self.resource
    }

    /// The query parameters bound to the current request.
    pub fn query(&self) -> &Parameters {
        self.query
    }
}

/// What a lifecycle hook tells the controller to do next.
#[derive(Debug)]
pub enum HookResult {
    /// Continue with the remaining hooks and the action itself.
    Next,
    /// Short-circuit the action with this outcome.
    ///
    /// Honored only from a pre-phase hook and only for terminal outcomes;
    /// anything else is treated as [`Next`](HookResult::Next).
    Stop(Outcome),
}

/// A hook observing controller lifecycle events.
pub trait LifecycleHook: Send + Sync {
    /// React to the event.
    fn on_event(&self, event: &mut LifecycleEvent<'_>) -> HookResult;
}

impl<F> LifecycleHook for F
where
    F: Fn(&mut LifecycleEvent<'_>) -> HookResult + Send + Sync,
{
    fn on_event(&self, event: &mut LifecycleEvent<'_>) -> HookResult {
        self(event)
    }
}

// ============================================================================
// Registries
// ============================================================================

type HookMap = HashMap<(Action, Phase), Vec<Arc<dyn LifecycleHook>>>;

/// Lifecycle hooks shared between controllers, keyed by identifier.
#[derive(Clone, Default)]
pub struct SharedLifecycleHooks {
    inner: Arc<Mutex<HashMap<String, HookMap>>>,
}

impl SharedLifecycleHooks {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> MutexGuard<'_, HashMap<String, HookMap>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register a hook for an action/phase under an identifier.
    pub fn attach(
        &self,
        identifier: impl Into<String>,
        action: Action,
        phase: Phase,
        hook: Arc<dyn LifecycleHook>,
    ) {
        self.locked()
            .entry(identifier.into())
            .or_default()
            .entry((action, phase))
            .or_default()
            .push(hook);
    }

    fn hooks_for(
        &self,
        identifiers: &[String],
        action: Action,
        phase: Phase,
    ) -> Vec<Arc<dyn LifecycleHook>> {
        let registry = self.locked();
        let mut hooks = Vec::new();
        for identifier in identifiers {
            if let Some(per_event) = registry.get(identifier) {
                if let Some(chain) = per_event.get(&(action, phase)) {
                    hooks.extend(chain.iter().cloned());
                }
            }
        }
        hooks
    }
}

impl fmt::Debug for SharedLifecycleHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.locked();
        f.debug_struct("SharedLifecycleHooks")
            .field("identifiers", &registry.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A controller's lifecycle hook registry.
///
/// Own hooks run in attachment order, then shared hooks in identifier order.
#[derive(Default)]
pub struct LifecycleEvents {
    hooks: HookMap,
    shared: Option<SharedLifecycleHooks>,
    identifiers: Vec<String>,
}

impl LifecycleEvents {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook for an action/phase.
    pub fn attach(&mut self, action: Action, phase: Phase, hook: Arc<dyn LifecycleHook>) {
        self.hooks.entry((action, phase)).or_default().push(hook);
    }

    /// Register a closure for an action/phase.
    pub fn on<F>(&mut self, action: Action, phase: Phase, hook: F)
    where
        F: Fn(&mut LifecycleEvent<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.attach(action, phase, Arc::new(hook));
    }

    /// Wire up the shared registry consulted after own hooks.
    pub fn set_shared(&mut self, shared: SharedLifecycleHooks) {
        self.shared = Some(shared);
    }

    /// Identifiers under which shared hooks apply.
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    /// Append a shared-registry identifier.
    pub fn add_identifier(&mut self, identifier: impl Into<String>) {
        self.identifiers.push(identifier.into());
    }

    pub(crate) fn hooks_for(&self, action: Action, phase: Phase) -> Vec<Arc<dyn LifecycleHook>> {
        let mut hooks: Vec<Arc<dyn LifecycleHook>> = self
            .hooks
            .get(&(action, phase))
            .map(|chain| chain.to_vec())
            .unwrap_or_default();
        if let Some(shared) = &self.shared {
            hooks.extend(shared.hooks_for(&self.identifiers, action, phase));
        }
        hooks
    }
}

impl fmt::Debug for LifecycleEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attached: usize = self.hooks.values().map(Vec::len).sum();
        f.debug_struct("LifecycleEvents")
            .field("identifiers", &self.identifiers)
            .field("hooks", &attached)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_join_action_and_phase() {
        let mut resource = Resource::new();
        let query = Parameters::new();
        let event = LifecycleEvent::new(
            Action::GetList,
            Phase::Pre,
            EventSlots::default(),
            &mut resource,
            &query,
        );
        assert_eq!(event.name(), "getList.pre");
    }

    #[test]
    fn own_hooks_precede_shared_hooks() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static ORDER: AtomicUsize = AtomicUsize::new(0);

        fn marker(expected: usize) -> impl Fn(&mut LifecycleEvent<'_>) -> HookResult {
            move |_| {
                assert_eq!(ORDER.fetch_add(1, Ordering::SeqCst), expected);
                HookResult::Next
            }
        }

        let shared = SharedLifecycleHooks::new();
        shared.attach("widgets", Action::Get, Phase::Pre, Arc::new(marker(1)));

        let mut events = LifecycleEvents::new();
        events.on(Action::Get, Phase::Pre, marker(0));
        events.set_shared(shared);
        events.add_identifier("widgets");

        let mut resource = Resource::new();
        let query = Parameters::new();
        let mut event = LifecycleEvent::new(
            Action::Get,
            Phase::Pre,
            EventSlots::default(),
            &mut resource,
            &query,
        );
        for hook in events.hooks_for(Action::Get, Phase::Pre) {
            hook.on_event(&mut event);
        }
        assert_eq!(ORDER.load(Ordering::SeqCst), 2);
    }
}
