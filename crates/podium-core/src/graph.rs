//! # Presentation Graph
//!
//! Arena-based storage for the object hierarchy.
//!
//! ## Responsibilities
//! - **Object Storage**: `Vec<Option<GraphObject>>` arena with `ObjectId`
//!   indices and a free list for slot reuse.
//! - **Hierarchy**: parent-child relationships with cycle prevention.
//! - **Traversal helpers**: roots, ancestor walks, enclosing layer and
//!   component lookup used by the synchronizer and the slide players.

use podium_data::{ObjectCategory, ObjectId};

use crate::object::GraphObject;

/// The presentation graph arena.
#[derive(Clone, Default)]
pub struct PresentationGraph {
    /// The arena of all objects. `Option` allows removal and recycling.
    nodes: Vec<Option<GraphObject>>,
    /// Indices of removed objects that can be reused.
    free_indices: Vec<usize>,
}

impl PresentationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.nodes.clear();
        self.free_indices.clear();
    }

    /// Adds a new object and returns its id.
    pub fn add_object(&mut self, object: GraphObject) -> ObjectId {
        if let Some(id) = self.free_indices.pop() {
            self.nodes[id] = Some(object);
            id
        } else {
            let id = self.nodes.len();
            self.nodes.push(Some(object));
            id
        }
    }

    /// Recursively destroys an object and its children, freeing their slots.
    pub fn destroy_object(&mut self, id: ObjectId) {
        if id >= self.nodes.len() || self.nodes[id].is_none() {
            return;
        }

        let (parent_id, children_ids) = {
            let Some(object) = self.nodes[id].as_ref() else {
                return;
            };
            (object.parent, object.children.clone())
        };

        if let Some(pid) = parent_id {
            self.remove_child(pid, id);
        }

        for child_id in children_ids {
            self.destroy_object(child_id);
        }

        self.nodes[id] = None;
        self.free_indices.push(id);
    }

    /// Establishes a parent-child relationship between two objects.
    ///
    /// Invalid relationships (missing objects, self-parenting, cycles) are
    /// ignored.
    pub fn add_child(&mut self, parent: ObjectId, child: ObjectId) {
        let _ = self.try_add_child(parent, child);
    }

    /// Attempts to establish a parent-child relationship between two objects.
    ///
    /// Returns `true` when the relationship is created and `false` when
    /// rejected (missing objects, self-parenting, or cycle detection).
    pub fn try_add_child(&mut self, parent: ObjectId, child: ObjectId) -> bool {
        if parent == child {
            return false;
        }

        if self.get(parent).is_none() || self.get(child).is_none() {
            return false;
        }

        // Prevent hierarchy cycles by checking whether `child` is an
        // ancestor of `parent`.
        let mut current = Some(parent);
        while let Some(object_id) = current {
            if object_id == child {
                return false;
            }
            current = self.get(object_id).and_then(|n| n.parent);
        }

        let old_parent = self.get(child).and_then(|n| n.parent);
        if let Some(old_parent_id) = old_parent {
            if old_parent_id == parent {
                return true;
            }
            self.remove_child(old_parent_id, child);
        }

        if let Some(p_node) = self.nodes.get_mut(parent).and_then(|n| n.as_mut()) {
            if !p_node.children.contains(&child) {
                p_node.children.push(child);
            }
        } else {
            return false;
        }

        if let Some(c_node) = self.nodes.get_mut(child).and_then(|n| n.as_mut()) {
            c_node.parent = Some(parent);
            true
        } else {
            false
        }
    }

    /// Removes a child from a parent's children list and clears the child's
    /// `parent` field when it points to this parent.
    pub fn remove_child(&mut self, parent: ObjectId, child: ObjectId) {
        if let Some(p_node) = self.nodes.get_mut(parent).and_then(|n| n.as_mut()) {
            if let Some(pos) = p_node.children.iter().position(|&x| x == child) {
                p_node.children.remove(pos);
            }
        }
        if let Some(c_node) = self.nodes.get_mut(child).and_then(|n| n.as_mut()) {
            if c_node.parent == Some(parent) {
                c_node.parent = None;
            }
        }
    }

    pub fn get(&self, id: ObjectId) -> Option<&GraphObject> {
        self.nodes.get(id).and_then(|n| n.as_ref())
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut GraphObject> {
        self.nodes.get_mut(id).and_then(|n| n.as_mut())
    }

    /// Upper bound (exclusive) of ids ever handed out.
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Ids of all live objects without a parent, in arena order.
    pub fn roots(&self) -> Vec<ObjectId> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| match slot {
                Some(obj) if obj.parent.is_none() => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &GraphObject)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|obj| (id, obj)))
    }

    /// Finds an object by name. Names are not required to be unique; the
    /// first match in arena order wins.
    pub fn find_by_name(&self, name: &str) -> Option<ObjectId> {
        self.iter().find(|(_, obj)| obj.name == name).map(|(id, _)| id)
    }

    /// The nearest ancestor of `id` with the given category, if any.
    pub fn enclosing(&self, id: ObjectId, category: ObjectCategory) -> Option<ObjectId> {
        let mut current = self.get(id).and_then(|n| n.parent);
        while let Some(ancestor) = current {
            let obj = self.get(ancestor)?;
            if obj.category() == category {
                return Some(ancestor);
            }
            current = obj.parent;
        }
        None
    }

    /// The nearest component ancestor of `id`, the owner of its timeline
    /// scope. `None` means the object belongs to the presentation scope.
    pub fn enclosing_component(&self, id: ObjectId) -> Option<ObjectId> {
        self.enclosing(id, ObjectCategory::Component)
    }

    /// The layer an object renders into.
    pub fn enclosing_layer(&self, id: ObjectId) -> Option<ObjectId> {
        if self.get(id).map(|o| o.category()) == Some(ObjectCategory::Layer) {
            return Some(id);
        }
        self.enclosing(id, ObjectCategory::Layer)
    }

    /// Depth-first preorder listing of a subtree, root included.
    pub fn subtree(&self, root: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(obj) = self.get(id) {
                out.push(id);
                // Reverse so children pop in authored order.
                for &child in obj.children.iter().rev() {
                    stack.push(child);
                }
            }
        }
        out
    }
}
