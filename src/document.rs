//! Headless in-memory document
//!
//! `MemoryDocument` implements [`FocusHost`] over a plain element tree. It
//! backs hosts without a real DOM (the CLI, server-side previews) and the
//! test suites.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::focus::{ElementId, ElementInfo, ElementKind, FocusHost, ListenerId, ListenerKind, TabIndex, TimerId};

const ROOT: ElementId = 0;

#[derive(Debug)]
struct Node {
    info: ElementInfo,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

#[derive(Debug)]
pub struct MemoryDocument {
    nodes: RefCell<BTreeMap<ElementId, Node>>,
    active: Cell<Option<ElementId>>,
    next_id: Cell<u64>,
    listeners: RefCell<BTreeMap<ListenerId, ListenerKind>>,
    timers: RefCell<BTreeMap<TimerId, u64>>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// Empty document containing only the root element
    pub fn new() -> Self {
        let mut root = ElementInfo::new(ElementKind::Generic);
        root.id = ROOT;
        let nodes = BTreeMap::from([(
            ROOT,
            Node {
                info: root,
                parent: None,
                children: Vec::new(),
            },
        )]);

        Self {
            nodes: RefCell::new(nodes),
            active: Cell::new(None),
            next_id: Cell::new(ROOT + 1),
            listeners: RefCell::new(BTreeMap::new()),
            timers: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn root(&self) -> ElementId {
        ROOT
    }

    fn issue_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// Append `info` as the last child of `parent` and return its id. An
    /// unknown parent leaves the element disconnected.
    pub fn append(&self, parent: ElementId, mut info: ElementInfo) -> ElementId {
        let id = self.issue_id();
        info.id = id;

        let mut nodes = self.nodes.borrow_mut();
        let parent = match nodes.get_mut(&parent) {
            Some(node) => {
                node.children.push(id);
                Some(parent)
            }
            None => {
                debug!(parent, id, "Appending to unknown parent, element is disconnected");
                None
            }
        };
        nodes.insert(
            id,
            Node {
                info,
                parent,
                children: Vec::new(),
            },
        );
        id
    }

    /// Remove `id` and its subtree. Focus inside the subtree is lost.
    pub fn remove(&self, id: ElementId) {
        if id == ROOT {
            return;
        }
        let mut nodes = self.nodes.borrow_mut();
        let Some(node) = nodes.get(&id) else {
            return;
        };
        if let Some(parent) = node.parent
            && let Some(parent_node) = nodes.get_mut(&parent)
        {
            parent_node.children.retain(|c| *c != id);
        }

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(removed) = nodes.remove(&current) {
                stack.extend(removed.children);
            }
            if self.active.get() == Some(current) {
                self.active.set(None);
            }
        }
    }

    /// Mutate an element's own focus-relevant state
    pub fn update(&self, id: ElementId, f: impl FnOnce(&mut ElementInfo)) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(&id) {
            f(&mut node.info);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn listeners_of(&self, kind: ListenerKind) -> usize {
        self.listeners.borrow().values().filter(|k| **k == kind).count()
    }

    pub fn pending_timers(&self) -> Vec<TimerId> {
        self.timers.borrow().keys().copied().collect()
    }

    /// Consume a due timer. Returns `false` if it was already cleared.
    pub fn fire_timer(&self, id: TimerId) -> bool {
        self.timers.borrow_mut().remove(&id).is_some()
    }

    /// Element state with inert/rendered/visible inherited from ancestors
    fn effective(&self, nodes: &BTreeMap<ElementId, Node>, id: ElementId) -> Option<ElementInfo> {
        let mut info = nodes.get(&id)?.info.clone();
        let mut parent = nodes.get(&id)?.parent;
        while let Some(p) = parent {
            let Some(node) = nodes.get(&p) else { break };
            info.inert |= node.info.inert;
            info.rendered &= node.info.rendered;
            info.visible &= node.info.visible;
            parent = node.parent;
        }
        Some(info)
    }
}

impl FocusHost for MemoryDocument {
    fn active_element(&self) -> Option<ElementId> {
        self.active.get()
    }

    fn focus(&self, id: ElementId) -> bool {
        if !self.is_connected(id) {
            return false;
        }
        let nodes = self.nodes.borrow();
        match self.effective(&nodes, id) {
            Some(info) if info.is_focusable() => {
                trace!(id, "Focus moved");
                self.active.set(Some(id));
                true
            }
            _ => false,
        }
    }

    fn is_connected(&self, id: ElementId) -> bool {
        self.contains(ROOT, id)
    }

    fn contains(&self, container: ElementId, id: ElementId) -> bool {
        let nodes = self.nodes.borrow();
        let mut current = Some(id);
        while let Some(c) = current {
            if c == container {
                return nodes.contains_key(&c);
            }
            current = nodes.get(&c).and_then(|n| n.parent);
        }
        false
    }

    fn descendants(&self, container: ElementId) -> Vec<ElementInfo> {
        let nodes = self.nodes.borrow();
        let Some(start) = self.effective(&nodes, container) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        // (id, inherited inert, inherited rendered, inherited visible)
        let mut stack: Vec<(ElementId, bool, bool, bool)> = nodes[&container]
            .children
            .iter()
            .rev()
            .map(|c| (*c, start.inert, start.rendered, start.visible))
            .collect();

        while let Some((id, inert, rendered, visible)) = stack.pop() {
            let Some(node) = nodes.get(&id) else { continue };
            let mut info = node.info.clone();
            info.inert |= inert;
            info.rendered &= rendered;
            info.visible &= visible;

            for child in node.children.iter().rev() {
                stack.push((*child, info.inert, info.rendered, info.visible));
            }
            out.push(info);
        }
        out
    }

    fn element(&self, id: ElementId) -> Option<ElementInfo> {
        let nodes = self.nodes.borrow();
        self.effective(&nodes, id)
    }

    fn ensure_programmatic_focus(&self, id: ElementId) {
        self.update(id, |info| {
            if info.tab_index == TabIndex::Unset {
                info.tab_index = TabIndex::Programmatic;
            }
        });
    }

    fn add_listener(&self, kind: ListenerKind) -> ListenerId {
        let id = self.issue_id();
        self.listeners.borrow_mut().insert(id, kind);
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.borrow_mut().remove(&id);
    }

    fn set_timeout(&self, delay_ms: u64) -> TimerId {
        let id = self.issue_id();
        self.timers.borrow_mut().insert(id, delay_ms);
        id
    }

    fn clear_timeout(&self, id: TimerId) {
        self.timers.borrow_mut().remove(&id);
    }
}
