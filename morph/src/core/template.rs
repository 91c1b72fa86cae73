//! Step tree of a transformation.
//!
//! Steps are stored in an arena and referenced by [`StepId`]. A parent owns
//! the ordered list of its children; children keep the id of their parent.
//! Containers that create steps at run time (loops and fan-out) append to the
//! same arena.

use crate::core::definition::{Body, StepDef};
use crate::core::error::DefinitionError;

/// Index of a step in its template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(usize);

impl StepId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A step in its `Attached` state.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) parent: Option<StepId>,
    pub(crate) order: u32,
    pub(crate) name: String,
    pub(crate) def: StepDef,
    pub(crate) children: Vec<StepId>,
    pub(crate) performed: bool,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 1-based position within the parent.
    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn parent(&self) -> Option<StepId> {
        self.parent
    }

    pub fn def(&self) -> &StepDef {
        &self.def
    }

    pub fn has_been_performed(&self) -> bool {
        self.performed
    }

    /// Context attribute the result value is stored under.
    pub fn context_attribute(&self) -> &str {
        self.def
            .settings
            .context_attribute
            .as_deref()
            .unwrap_or(&self.name)
    }
}

/// Ordered, hierarchical set of steps forming one transformation.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    description: Option<String>,
    nodes: Vec<Node>,
    top: Vec<StepId>,
}

impl Template {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            nodes: Vec::new(),
            top: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn template_name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Attach a top-level step and return its id.
    pub fn add(&mut self, def: StepDef) -> Result<StepId, DefinitionError> {
        self.attach(None, def)
    }

    /// Attach a top-level step under an explicit name.
    pub fn add_named(&mut self, def: StepDef, name: &str) -> Result<StepId, DefinitionError> {
        self.attach(None, def.named(name))
    }

    /// Attach a step as the last child of a group.
    pub fn add_to(&mut self, group: StepId, def: StepDef) -> Result<StepId, DefinitionError> {
        let parent = self.try_node(group)?;
        if !matches!(parent.def.body, Body::Group(_)) {
            return Err(DefinitionError::NotAGroup {
                parent: parent.name.clone(),
            });
        }
        self.attach(Some(group), def)
    }

    fn attach(&mut self, parent: Option<StepId>, def: StepDef) -> Result<StepId, DefinitionError> {
        def.validate()?;

        let order = u32::try_from(self.siblings(parent).len() + 1).unwrap_or(u32::MAX);
        let parent_name = self.parent_name(parent).to_string();
        let name = match def.name() {
            Some(name) => name.to_string(),
            None => default_name(&parent_name, order, def.type_name()),
        };
        if name.trim().is_empty() {
            return Err(DefinitionError::BlankName);
        }
        if self
            .siblings(parent)
            .iter()
            .any(|&sibling| self.nodes[sibling.0].name == name)
        {
            return Err(DefinitionError::DuplicateName {
                name,
                parent: parent_name,
            });
        }

        let id = self.push(parent, order, name, def);
        match parent {
            Some(parent) => self.nodes[parent.0].children.push(id),
            None => self.top.push(id),
        }
        Ok(id)
    }

    /// Register a step created at run time, listed as the parent's last child.
    pub(crate) fn attach_child(&mut self, parent: StepId, order: u32, name: String, def: StepDef) -> StepId {
        let id = self.push(Some(parent), order, name, def);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Register a step created at run time without listing it anywhere.
    /// Used for loop iterations, which are driven directly by the orchestrator.
    pub(crate) fn attach_detached(
        &mut self,
        parent: Option<StepId>,
        order: u32,
        name: String,
        def: StepDef,
    ) -> StepId {
        self.push(parent, order, name, def)
    }

    /// Add a node, then the children its group definition owns.
    fn push(&mut self, parent: Option<StepId>, order: u32, name: String, mut def: StepDef) -> StepId {
        let owned = def.take_children();
        let id = StepId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            order,
            name,
            def,
            children: Vec::new(),
            performed: false,
        });
        for child in owned {
            let order = u32::try_from(self.nodes[id.0].children.len() + 1).unwrap_or(u32::MAX);
            let name = match child.name() {
                Some(name) => name.to_string(),
                None => default_name(&self.nodes[id.0].name, order, child.type_name()),
            };
            let child_id = self.push(Some(id), order, name, child);
            self.nodes[id.0].children.push(child_id);
        }
        id
    }

    fn siblings(&self, parent: Option<StepId>) -> &[StepId] {
        match parent {
            Some(parent) => &self.nodes[parent.0].children,
            None => &self.top,
        }
    }

    fn parent_name(&self, parent: Option<StepId>) -> &str {
        match parent {
            Some(parent) => &self.nodes[parent.0].name,
            None => &self.name,
        }
    }

    fn try_node(&self, id: StepId) -> Result<&Node, DefinitionError> {
        self.nodes
            .get(id.0)
            .ok_or(DefinitionError::UnknownStep(id.0))
    }

    /// Panics if `id` does not come from this template.
    pub fn node(&self, id: StepId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: StepId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn get(&self, id: StepId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// First step registered under `name`, in arena order.
    pub fn find(&self, name: &str) -> Option<StepId> {
        self.nodes
            .iter()
            .position(|node| node.name == name)
            .map(StepId)
    }

    pub fn children(&self, id: StepId) -> &[StepId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: StepId) -> Option<StepId> {
        self.nodes[id.0].parent
    }

    pub fn top_level(&self) -> &[StepId] {
        &self.top
    }

    /// Number of steps in the arena, run-time ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// `<parentName>-<order>-<TypeName>`
pub fn default_name(parent: &str, order: u32, type_name: &str) -> String {
    format!("{parent}-{order}-{type_name}")
}
