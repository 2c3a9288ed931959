//! Addressable node tree
//!
//! Nodes live in an arena owned by [`NodeTree`] and are addressed by
//! [`NodeId`]. Each node lists its children by name; the parent link is a
//! plain id used to rebuild paths and prune upward, never for ownership.
//!
//! ```
//! use oscquery_core::{Access, MethodOptions, NodeTree, OscValue};
//!
//! let mut tree = NodeTree::new();
//! tree.add_method("/avatar/parameters/Foo", MethodOptions::with_type("i", Access::ReadWrite))
//!     .unwrap();
//! tree.set_value_at("/avatar/parameters/Foo", 0, OscValue::Int(5)).unwrap();
//!
//! let foo = tree.resolve("/avatar/parameters/Foo").unwrap();
//! assert_eq!(foo.full_path(), "/avatar/parameters/Foo");
//! ```

use std::collections::{BTreeMap, BTreeSet};

use crate::argument::{Access, Argument, MethodOptions, RangeSpec};
use crate::error::{Error, Result};
use crate::path;
use crate::types::{format_type_string, parse_type_string};
use crate::value::OscValue;
use crate::wire::NodeDescription;

/// Stable handle to a node slot.
///
/// The generation guards against a freed slot being reused by another node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// One entry in the namespace
#[derive(Debug, Clone, Default)]
pub struct Node {
    name: String,
    parent: Option<NodeId>,
    children: BTreeMap<String, NodeId>,
    description: Option<String>,
    access: Option<Access>,
    tags: Option<BTreeSet<String>>,
    critical: Option<bool>,
    arguments: Option<Vec<Argument>>,
}

impl Node {
    fn named(name: &str, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            ..Default::default()
        }
    }

    fn apply(&mut self, opts: MethodOptions) {
        self.description = opts.description;
        self.access = opts.access;
        self.tags = opts.tags;
        self.critical = opts.critical;
        self.arguments = opts.arguments;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn access(&self) -> Option<Access> {
        self.access
    }

    pub fn tags(&self) -> Option<&BTreeSet<String>> {
        self.tags.as_ref()
    }

    pub fn critical(&self) -> Option<bool> {
        self.critical
    }

    pub fn arguments(&self) -> Option<&[Argument]> {
        self.arguments.as_deref()
    }

    /// A method declares arguments; a container does not
    pub fn is_method(&self) -> bool {
        self.arguments.is_some()
    }

    pub fn is_container(&self) -> bool {
        self.arguments.is_none()
    }

    /// No children and nothing declared; eligible for pruning
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
            && self.arguments.is_none()
            && self.description.is_none()
            && self.access.is_none()
            && self.tags.is_none()
            && self.critical.is_none()
    }

    fn arguments_mut(&mut self, path: impl FnOnce() -> String) -> Result<&mut Vec<Argument>> {
        self.arguments
            .as_mut()
            .filter(|args| !args.is_empty())
            .ok_or_else(|| Error::NotAMethod(path()))
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena-backed namespace tree.
///
/// The root has an empty name, no parent and `NoValue` access.
#[derive(Debug, Clone)]
pub struct NodeTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTree {
    pub fn new() -> Self {
        let mut root = Node::named("", None);
        root.access = Some(Access::NoValue);
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(root),
            }],
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, root included
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// A tree never loses its root, so this only checks for a bare root
    pub fn is_empty(&self) -> bool {
        self.len() == 1
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.get_mut(id).ok_or(Error::StaleNode)
    }

    /// Borrowed view of a node
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.get(id).map(|node| NodeRef {
            tree: self,
            id,
            node,
        })
    }

    pub fn root_node(&self) -> NodeRef<'_> {
        NodeRef {
            tree: self,
            id: self.root,
            node: self.slots[self.root.index as usize]
                .node
                .as_ref()
                .unwrap_or_else(|| unreachable!("root slot is never freed")),
        }
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let Some(slot) = self.slots.get_mut(id.index as usize) else {
                continue;
            };
            if slot.generation != id.generation {
                continue;
            }
            if let Some(node) = slot.node.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index);
                stack.extend(node.children.into_values());
            }
        }
    }

    // === Single-node operations ===

    pub fn has_child(&self, id: NodeId, name: &str) -> bool {
        self.child(id, name).is_some()
    }

    /// Exact, case-sensitive lookup of one segment
    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.get(id)?.children.get(name).copied()
    }

    /// Existing child, or a new empty container attached under `name`
    pub fn get_or_create_child(&mut self, id: NodeId, name: &str) -> Result<NodeId> {
        if let Some(child) = self.get(id).ok_or(Error::StaleNode)?.children.get(name) {
            return Ok(*child);
        }
        let child = self.alloc(Node::named(name, Some(id)));
        self.node_mut(id)?.children.insert(name.to_string(), child);
        Ok(child)
    }

    /// Graft the whole of `subtree` under `name`, replacing any existing child
    pub fn add_child(&mut self, id: NodeId, name: &str, subtree: NodeTree) -> Result<NodeId> {
        if self.get(id).is_none() {
            return Err(Error::StaleNode);
        }
        self.remove_child(id, name);

        let mut src = subtree;
        let mut pending = vec![(src.root, Some(id), name.to_string())];
        let mut grafted = None;

        while let Some((src_id, parent, name)) = pending.pop() {
            let Some(mut node) = src.get_mut(src_id).map(std::mem::take) else {
                continue;
            };
            let children = std::mem::take(&mut node.children);
            node.name = name.clone();
            node.parent = parent;

            let new_id = self.alloc(node);
            if let Some(parent) = parent {
                self.node_mut(parent)?.children.insert(name, new_id);
            }
            grafted.get_or_insert(new_id);
            pending.extend(
                children
                    .into_iter()
                    .map(|(child_name, child_id)| (child_id, Some(new_id), child_name)),
            );
        }

        grafted.ok_or(Error::StaleNode)
    }

    /// Detach and discard a child subtree. Returns whether a child existed.
    pub fn remove_child(&mut self, id: NodeId, name: &str) -> bool {
        let removed = self
            .get_mut(id)
            .and_then(|node| node.children.remove(name));
        match removed {
            Some(child) => {
                self.release(child);
                true
            }
            None => false,
        }
    }

    /// Replace description, access, tags, critical and arguments wholesale
    pub fn set_opts(&mut self, id: NodeId, opts: MethodOptions) -> Result<()> {
        if id == self.root {
            return Err(Error::InvalidPath("/".to_string()));
        }
        self.node_mut(id)?.apply(opts);
        Ok(())
    }

    /// Set the value of one declared argument
    pub fn set_value(&mut self, id: NodeId, index: usize, value: OscValue) -> Result<()> {
        let full_path = self.full_path(id).ok_or(Error::StaleNode)?;
        let args = self.node_mut(id)?.arguments_mut(|| full_path)?;
        let len = args.len();
        let arg = args
            .get_mut(index)
            .ok_or(Error::ArgumentIndex { index, len })?;
        let expected = arg.ty.to_string();
        arg.value = Some(value.conform(&arg.ty).ok_or(Error::TypeMismatch { expected })?);
        Ok(())
    }

    /// Clear the value of one declared argument
    pub fn unset_value(&mut self, id: NodeId, index: usize) -> Result<()> {
        let full_path = self.full_path(id).ok_or(Error::StaleNode)?;
        let args = self.node_mut(id)?.arguments_mut(|| full_path)?;
        let len = args.len();
        args.get_mut(index)
            .ok_or(Error::ArgumentIndex { index, len })?
            .value = None;
        Ok(())
    }

    pub fn is_node_empty(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_empty)
    }

    /// Names from the root (exclusive) to `id` (inclusive), joined by `/`
    pub fn full_path(&self, id: NodeId) -> Option<String> {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(id) = current {
            let node = self.get(id)?;
            if node.parent.is_some() {
                names.push(node.name.as_str());
            }
            current = node.parent;
        }
        Some(path::join(names.into_iter().rev()))
    }

    /// Method nodes under `id`, depth-first pre-order, `id` included
    pub fn methods(&self, id: NodeId) -> Methods<'_> {
        Methods {
            tree: self,
            stack: vec![id],
        }
    }

    // === Path operations ===

    /// Walk a slash path from the root; `None` if any segment is missing
    pub fn resolve_path(&self, path: &str) -> Option<NodeId> {
        path::segments(path).try_fold(self.root, |id, name| self.child(id, name))
    }

    pub fn resolve(&self, path: &str) -> Option<NodeRef<'_>> {
        self.resolve_path(path).and_then(|id| self.node(id))
    }

    /// Create containers along `path` as needed and declare the last one
    pub fn add_method(&mut self, path: &str, opts: MethodOptions) -> Result<NodeId> {
        let mut id = self.root;
        for name in path::segments(path) {
            id = self.get_or_create_child(id, name)?;
        }
        if id == self.root {
            return Err(Error::InvalidPath(path.to_string()));
        }
        self.set_opts(id, opts)?;
        Ok(id)
    }

    /// Turn the node at `path` back into a container, then prune it and
    /// any ancestors left empty. Never prunes the root.
    pub fn remove_method(&mut self, path: &str) -> Result<()> {
        let id = self
            .resolve_path(path)
            .ok_or_else(|| Error::PathNotFound(path.to_string()))?;
        self.set_opts(id, MethodOptions::default())?;

        let mut current = id;
        while current != self.root && self.is_node_empty(current) {
            let Some(node) = self.get(current) else {
                break;
            };
            let (Some(parent), name) = (node.parent, node.name.clone()) else {
                break;
            };
            self.remove_child(parent, &name);
            current = parent;
        }
        Ok(())
    }

    pub fn set_value_at(&mut self, path: &str, index: usize, value: OscValue) -> Result<()> {
        let id = self
            .resolve_path(path)
            .ok_or_else(|| Error::PathNotFound(path.to_string()))?;
        self.set_value(id, index, value)
    }

    pub fn unset_value_at(&mut self, path: &str, index: usize) -> Result<()> {
        let id = self
            .resolve_path(path)
            .ok_or_else(|| Error::PathNotFound(path.to_string()))?;
        self.unset_value(id, index)
    }

    // === JSON projection ===

    /// Serialize a node and its subtree
    pub fn describe(&self, id: NodeId) -> Option<NodeDescription> {
        let node = self.get(id)?;
        let full_path = self.full_path(id)?;

        let contents = if node.children.is_empty() {
            None
        } else {
            Some(
                node.children
                    .iter()
                    .filter_map(|(name, child)| Some((name.clone(), self.describe(*child)?)))
                    .collect(),
            )
        };

        let mut desc = NodeDescription {
            full_path,
            contents,
            access: node.access.map(|a| a.code()),
            description: node.description.clone(),
            tags: node.tags.as_ref().map(|t| t.iter().cloned().collect()),
            critical: node.critical,
            ..Default::default()
        };

        if let Some(args) = &node.arguments {
            let types: Vec<_> = args.iter().map(|a| a.ty.clone()).collect();
            desc.type_string = Some(format_type_string(&types));
            desc.range = args
                .iter()
                .any(|a| a.range.is_some())
                .then(|| args.iter().map(|a| a.range.clone()).collect());
            desc.clipmode = args
                .iter()
                .any(|a| a.clipmode.is_some())
                .then(|| args.iter().map(|a| a.clipmode.clone()).collect());

            let readable = node.access.is_some_and(|a| a.is_readable());
            if readable && args.iter().any(|a| a.value.is_some()) {
                desc.value = Some(
                    args.iter()
                        .map(|a| {
                            a.value
                                .as_ref()
                                .map(OscValue::to_json)
                                .unwrap_or(serde_json::Value::Null)
                        })
                        .collect(),
                );
            }
        }

        Some(desc)
    }

    /// Rebuild a tree from a peer's JSON description.
    ///
    /// Each node is named after the last segment of its `FULL_PATH`, falling
    /// back to its key in the parent's `CONTENTS`. The root is always a
    /// container, and when two entries resolve to the same name only the first
    /// is kept.
    pub fn from_description(desc: &NodeDescription) -> NodeTree {
        let mut tree = NodeTree::new();
        let root = tree.root;
        if let Some(root_node) = tree.get_mut(root) {
            fill_node(root_node, desc);
            root_node.access = Some(Access::NoValue);
        }

        let mut pending: Vec<(NodeId, &NodeDescription)> = vec![(root, desc)];
        while let Some((id, desc)) = pending.pop() {
            let Some(contents) = &desc.contents else {
                continue;
            };
            for (key, child_desc) in contents {
                let name = match path::last_segment(&child_desc.full_path) {
                    "" => key.as_str(),
                    segment => segment,
                };
                let taken = tree
                    .get(id)
                    .map_or(true, |parent| parent.children.contains_key(name));
                if taken {
                    continue;
                }
                let mut node = Node::named(name, Some(id));
                fill_node(&mut node, child_desc);
                let child = tree.alloc(node);
                if let Some(parent) = tree.get_mut(id) {
                    parent.children.insert(name.to_string(), child);
                }
                pending.push((child, child_desc));
            }
        }

        tree
    }
}

/// Copy the declared attributes of `desc` onto `node`, zipping the per-index
/// `RANGE`, `CLIPMODE` and `VALUE` arrays with the parsed `TYPE`
fn fill_node(node: &mut Node, desc: &NodeDescription) {
    node.description = desc.description.clone();
    node.access = desc.access.and_then(Access::from_code);
    node.tags = desc.tags.as_ref().map(|t| t.iter().cloned().collect());
    node.critical = desc.critical;
    node.arguments = desc.type_string.as_deref().map(|type_string| {
        parse_type_string(type_string)
            .into_iter()
            .enumerate()
            .map(|(i, ty)| {
                let range: Option<RangeSpec> =
                    desc.range.as_ref().and_then(|r| r.get(i).cloned().flatten());
                let clipmode = desc
                    .clipmode
                    .as_ref()
                    .and_then(|c| c.get(i).cloned().flatten());
                let value = desc
                    .value
                    .as_ref()
                    .and_then(|v| v.get(i))
                    .and_then(|json| OscValue::from_json(&ty, json));
                Argument {
                    ty,
                    range,
                    clipmode,
                    value,
                }
            })
            .collect()
    });
}

/// Read-only view of one node inside its tree
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a NodeTree,
    id: NodeId,
    node: &'a Node,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &'a str {
        &self.node.name
    }

    pub fn full_path(&self) -> String {
        self.tree.full_path(self.id).unwrap_or_default()
    }

    pub fn description(&self) -> Option<&'a str> {
        self.node.description()
    }

    pub fn access(&self) -> Option<Access> {
        self.node.access
    }

    pub fn tags(&self) -> Option<&'a BTreeSet<String>> {
        self.node.tags.as_ref()
    }

    pub fn critical(&self) -> Option<bool> {
        self.node.critical
    }

    pub fn arguments(&self) -> Option<&'a [Argument]> {
        self.node.arguments.as_deref()
    }

    pub fn is_method(&self) -> bool {
        self.node.is_method()
    }

    pub fn is_empty(&self) -> bool {
        self.node.is_empty()
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.node.parent.and_then(|id| self.tree.node(id))
    }

    pub fn child(&self, name: &str) -> Option<NodeRef<'a>> {
        self.node
            .children
            .get(name)
            .and_then(|id| self.tree.node(*id))
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        self.node
            .children
            .values()
            .filter_map(move |id| tree.node(*id))
    }

    pub fn methods(&self) -> Methods<'a> {
        self.tree.methods(self.id)
    }

    pub fn describe(&self) -> Option<NodeDescription> {
        self.tree.describe(self.id)
    }
}

/// Lazy pre-order walk yielding method nodes
#[derive(Debug, Clone)]
pub struct Methods<'a> {
    tree: &'a NodeTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Methods<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            let Some(node) = self.tree.node(id) else {
                continue;
            };
            // reversed so the first child is visited first
            self.stack
                .extend(node.node.children.values().rev().copied());
            if node.is_method() {
                return Some(node);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OscType, TypeToken};

    fn method(ty: &str) -> MethodOptions {
        MethodOptions::with_type(ty, Access::ReadWrite)
    }

    #[test]
    fn test_root_invariants() {
        let tree = NodeTree::new();
        let root = tree.root_node();
        assert_eq!(root.name(), "");
        assert!(root.parent().is_none());
        assert_eq!(root.access(), Some(Access::NoValue));
        assert_eq!(root.full_path(), "/");
        assert!(tree.is_empty());
    }

    #[test]
    fn test_get_or_create_is_stable() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let a = tree.get_or_create_child(root, "a").unwrap();
        let again = tree.get_or_create_child(root, "a").unwrap();
        assert_eq!(a, again);
        assert_eq!(tree.len(), 2);
        assert!(tree.has_child(root, "a"));
        assert!(!tree.has_child(root, "A"));
    }

    #[test]
    fn test_full_path() {
        let mut tree = NodeTree::new();
        let id = tree.add_method("/avatar/parameters/Foo", method("i")).unwrap();
        assert_eq!(tree.full_path(id).unwrap(), "/avatar/parameters/Foo");
    }

    #[test]
    fn test_add_method_on_root_rejected() {
        let mut tree = NodeTree::new();
        assert!(matches!(
            tree.add_method("/", method("i")),
            Err(Error::InvalidPath(_))
        ));
    }

    #[test]
    fn test_set_opts_empty_turns_method_into_container() {
        let mut tree = NodeTree::new();
        let id = tree.add_method("/a", method("f")).unwrap();
        assert!(tree.get(id).unwrap().is_method());
        tree.set_opts(id, MethodOptions::default()).unwrap();
        let node = tree.get(id).unwrap();
        assert!(node.is_container());
        assert!(node.is_empty());
    }

    #[test]
    fn test_set_and_unset_value() {
        let mut tree = NodeTree::new();
        tree.add_method("/a", method("if")).unwrap();
        tree.set_value_at("/a", 1, OscValue::Int(2)).unwrap();
        let args = tree.resolve("/a").unwrap().arguments().unwrap();
        assert_eq!(args[1].value, Some(OscValue::Float(2.0)));

        tree.unset_value_at("/a", 1).unwrap();
        let args = tree.resolve("/a").unwrap().arguments().unwrap();
        assert_eq!(args[1].value, None);
    }

    #[test]
    fn test_set_value_errors() {
        let mut tree = NodeTree::new();
        tree.add_method("/a/b", method("i")).unwrap();

        assert!(matches!(
            tree.set_value_at("/a", 0, OscValue::Int(1)),
            Err(Error::NotAMethod(_))
        ));
        assert_eq!(
            tree.set_value_at("/a/b", 3, OscValue::Int(1)),
            Err(Error::ArgumentIndex { index: 3, len: 1 })
        );
        assert!(matches!(
            tree.set_value_at("/a/b", 0, OscValue::from("x")),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            tree.unset_value_at("/missing", 0),
            Err(Error::PathNotFound(_))
        ));
    }

    #[test]
    fn test_remove_method_cascades() {
        let mut tree = NodeTree::new();
        tree.add_method("/a/b/c", method("i")).unwrap();
        tree.remove_method("/a/b/c").unwrap();
        assert!(tree.is_empty());
        assert!(tree.resolve_path("/a").is_none());
    }

    #[test]
    fn test_remove_method_stops_at_non_empty_ancestor() {
        let mut tree = NodeTree::new();
        tree.add_method("/a/b/c", method("i")).unwrap();
        tree.add_method("/a/d", method("f")).unwrap();
        tree.remove_method("/a/b/c").unwrap();

        assert!(tree.resolve_path("/a/b").is_none());
        assert!(tree.resolve_path("/a/d").is_some());
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_remove_method_keeps_node_with_children() {
        let mut tree = NodeTree::new();
        tree.add_method("/a", method("i")).unwrap();
        tree.add_method("/a/b", method("i")).unwrap();
        tree.remove_method("/a").unwrap();

        let a = tree.resolve("/a").unwrap();
        assert!(!a.is_method());
        assert!(tree.resolve_path("/a/b").is_some());
    }

    #[test]
    fn test_freed_ids_are_stale() {
        let mut tree = NodeTree::new();
        let id = tree.add_method("/a", method("i")).unwrap();
        tree.remove_method("/a").unwrap();
        let reused = tree.add_method("/b", method("i")).unwrap();

        assert!(tree.get(id).is_none());
        assert!(tree.get(reused).is_some());
        assert_eq!(tree.set_value(id, 0, OscValue::Int(1)), Err(Error::StaleNode));
    }

    #[test]
    fn test_methods_preorder() {
        let mut tree = NodeTree::new();
        tree.add_method("/a", method("i")).unwrap();
        tree.add_method("/a/x", method("i")).unwrap();
        tree.add_method("/b/y", method("i")).unwrap();
        tree.add_method("/b/z", method("i")).unwrap();

        let paths: Vec<_> = tree.methods(tree.root()).map(|n| n.full_path()).collect();
        assert_eq!(paths, vec!["/a", "/a/x", "/b/y", "/b/z"]);

        // a fresh walk each call
        assert_eq!(tree.methods(tree.root()).count(), 4);
    }

    #[test]
    fn test_describe_method() {
        let mut tree = NodeTree::new();
        let opts = MethodOptions {
            access: Some(Access::ReadOnly),
            ..MethodOptions::default()
        };
        let id = tree
            .add_method(
                "/a",
                opts.description("thing")
                    .arguments(vec![Argument::new(OscType::Float32)
                        .with_range(crate::Range::bounds(0, 1))
                        .with_clipmode("both")
                        .with_value(0.5f32)]),
            )
            .unwrap();

        let desc = tree.describe(id).unwrap();
        assert_eq!(desc.full_path, "/a");
        assert_eq!(desc.type_string.as_deref(), Some("f"));
        assert_eq!(desc.access, Some(1));
        assert_eq!(desc.description.as_deref(), Some("thing"));
        assert_eq!(desc.clipmode, Some(vec![Some("both".to_string())]));
        assert_eq!(desc.value, Some(vec![serde_json::json!(0.5)]));
        assert!(desc.range.is_some());
        assert!(desc.contents.is_none());
    }

    #[test]
    fn test_describe_hides_unreadable_value() {
        let mut tree = NodeTree::new();
        tree.add_method("/w", MethodOptions::with_type("i", Access::WriteOnly))
            .unwrap();
        tree.set_value_at("/w", 0, OscValue::Int(1)).unwrap();
        let desc = tree.resolve("/w").unwrap().describe().unwrap();
        assert!(desc.value.is_none());
    }

    #[test]
    fn test_description_round_trip() {
        let mut tree = NodeTree::new();
        tree.add_method("/avatar/parameters/Foo", method("i")).unwrap();
        tree.add_method("/avatar/parameters/Bar", method("f[ii]")).unwrap();
        tree.add_method("/avatar/change", MethodOptions::with_type("s", Access::WriteOnly))
            .unwrap();
        tree.set_value_at("/avatar/parameters/Foo", 0, OscValue::Int(5))
            .unwrap();

        let desc = tree.describe(tree.root()).unwrap();
        let json = serde_json::to_string(&desc).unwrap();
        let parsed: NodeDescription = serde_json::from_str(&json).unwrap();
        let rebuilt = NodeTree::from_description(&parsed);

        assert_eq!(rebuilt.len(), tree.len());
        for original in tree.methods(tree.root()) {
            let copy = rebuilt.resolve(&original.full_path()).unwrap();
            assert_eq!(copy.name(), original.name());
            assert_eq!(copy.access(), original.access());
            assert_eq!(copy.arguments(), original.arguments());
        }
        let bar = rebuilt.resolve("/avatar/parameters/Bar").unwrap();
        assert_eq!(
            bar.arguments().unwrap()[1].ty,
            TypeToken::Array(vec![
                TypeToken::Single(OscType::Int32),
                TypeToken::Single(OscType::Int32)
            ])
        );
    }

    #[test]
    fn test_add_child_grafts_subtree() {
        let mut peer = NodeTree::new();
        peer.add_method("/x/y", method("i")).unwrap();

        let mut tree = NodeTree::new();
        let root = tree.root();
        let grafted = tree.add_child(root, "peer", peer).unwrap();

        assert_eq!(tree.full_path(grafted).unwrap(), "/peer");
        assert!(tree.resolve("/peer/x/y").unwrap().is_method());
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn test_remove_child() {
        let mut tree = NodeTree::new();
        tree.add_method("/a/b", method("i")).unwrap();
        let root = tree.root();
        assert!(tree.remove_child(root, "a"));
        assert!(!tree.remove_child(root, "a"));
        assert!(tree.is_empty());
    }
}
