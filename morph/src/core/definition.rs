//! Step definitions.
//!
//! A [`StepDef`] is a step in its `Defined` state: configuration only, no
//! parent, order or performed flag. Attaching it to a
//! [`Template`](crate::core::template::Template) moves it to `Attached`.
//! Definitions are plain cloneable values, which is what loops and fan-out
//! containers rely on to stamp out fresh step instances.

use std::path::PathBuf;

use crate::core::error::DefinitionError;
use crate::core::path::{PathSource, normalize_separators};
use crate::core::property::{LateBinding, PropertySpec, find_spec};
use crate::core::result::StepRole;
use crate::core::step::{Condition, Operation, Utility};
use crate::core::value::Value;

/// Execution gate of a step.
#[derive(Debug, Clone)]
pub enum Gate {
    /// Run only when the boolean attribute is `true`.
    If(String),
    /// Run unless the boolean attribute is `true`.
    Unless(String),
    /// Run when the embedded condition evaluates to `true`.
    When(Box<StepDef>),
}

/// What keeps a loop going.
#[derive(Debug, Clone)]
pub enum LoopCondition {
    /// Fixed number of iterations, at least 2.
    Times(u32),
    /// Boolean context attribute, re-read before every iteration.
    Attribute(String),
    /// Condition re-evaluated before every iteration.
    Condition(Box<StepDef>),
}

#[derive(Debug, Clone)]
pub struct LoopSpec {
    pub(crate) template: Box<StepDef>,
    pub(crate) condition: LoopCondition,
    pub(crate) next_iteration: u32,
}

impl LoopSpec {
    pub fn template(&self) -> &StepDef {
        &self.template
    }

    pub fn condition(&self) -> &LoopCondition {
        &self.condition
    }

    /// 1-based index of the iteration the next evaluation decides on.
    pub fn next_iteration(&self) -> u32 {
        self.next_iteration
    }
}

/// `(property, attribute)` pair driving the configuration axis of a
/// multiple-operations container.
#[derive(Debug, Clone)]
pub struct PropertyAxis {
    pub(crate) spec: PropertySpec,
    pub(crate) attribute: String,
}

#[derive(Debug, Clone)]
pub struct MultipleOperationsSpec {
    pub(crate) template: Box<StepDef>,
    pub(crate) files: Vec<String>,
    pub(crate) axis: Option<PropertyAxis>,
}

/// Aggregation mode of a multiple-conditions container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MultiMode {
    /// True as soon as one file evaluates to true.
    #[default]
    AtLeastOne,
    /// True only if every file evaluates to true.
    All,
}

#[derive(Debug, Clone)]
pub struct MultipleConditionsSpec {
    pub(crate) template: Box<StepDef>,
    pub(crate) files: Vec<String>,
    pub(crate) mode: MultiMode,
}

/// Narrows file collections down to the files a condition holds for.
#[derive(Debug, Clone)]
pub struct FilterFilesSpec {
    pub(crate) template: Box<StepDef>,
    pub(crate) files: Vec<String>,
}

/// What a step does when performed.
#[derive(Debug, Clone)]
pub enum Body {
    Utility(Box<dyn Utility>),
    Operation(Box<dyn Operation>),
    Condition(Box<dyn Condition>),
    /// Children owned by the definition, attached along with the group.
    Group(Vec<StepDef>),
    Loop(LoopSpec),
    MultipleOperations(MultipleOperationsSpec),
    MultipleConditions(MultipleConditionsSpec),
    FilterFiles(FilterFilesSpec),
}

/// Configuration common to every step.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) name: Option<String>,
    pub(crate) path: PathSource,
    pub(crate) path_explicit: bool,
    pub(crate) dependencies: Vec<String>,
    pub(crate) gate: Option<Gate>,
    pub(crate) save_result: bool,
    pub(crate) context_attribute: Option<String>,
    pub(crate) abort_on_failure: bool,
    pub(crate) abort_message: Option<String>,
    pub(crate) late_bindings: Vec<LateBinding>,
}

impl Settings {
    fn new(path: PathSource) -> Self {
        Self {
            name: None,
            path,
            path_explicit: false,
            dependencies: Vec::new(),
            gate: None,
            save_result: true,
            context_attribute: None,
            abort_on_failure: false,
            abort_message: None,
            late_bindings: Vec::new(),
        }
    }
}

/// A step in its `Defined` state.
#[derive(Debug, Clone)]
pub struct StepDef {
    pub(crate) settings: Settings,
    pub(crate) body: Body,
}

impl StepDef {
    fn with_body(body: Body, path: PathSource) -> Self {
        Self {
            settings: Settings::new(path),
            body,
        }
    }

    fn root() -> PathSource {
        PathSource::Relative(PathBuf::new())
    }

    /// A read-only step; targets the root folder unless told otherwise.
    pub fn utility(utility: impl Utility + 'static) -> Self {
        Self::with_body(Body::Utility(Box::new(utility)), Self::root())
    }

    /// A mutating step; must be pointed at a file before being attached.
    pub fn operation(operation: impl Operation + 'static) -> Self {
        Self::with_body(Body::Operation(Box::new(operation)), PathSource::Unset)
    }

    /// A single-file condition; its value is always a boolean.
    pub fn condition(condition: impl Condition + 'static) -> Self {
        Self::with_body(Body::Condition(Box::new(condition)), Self::root())
    }

    /// An ordered container applying its gate and dependencies to all children.
    pub fn group() -> Self {
        Self::with_body(Body::Group(Vec::new()), Self::root())
    }

    /// Append a child to a group definition.
    ///
    /// Owned children are attached whenever the group is, so a group used as a
    /// loop template brings a fresh copy of its children to every iteration.
    pub fn with_child(mut self, child: StepDef) -> Result<Self, DefinitionError> {
        child.validate()?;
        let parent = self.label();
        let Body::Group(children) = &mut self.body else {
            return Err(DefinitionError::NotAGroup { parent });
        };
        if child
            .name()
            .is_some_and(|name| children.iter().any(|sibling| sibling.name() == Some(name)))
        {
            return Err(DefinitionError::DuplicateName {
                name: child.label(),
                parent,
            });
        }
        children.push(child);
        Ok(self)
    }

    pub fn looping(template: StepDef, condition: LoopCondition) -> Result<Self, DefinitionError> {
        match &condition {
            LoopCondition::Times(n) if *n < 2 => return Err(DefinitionError::InvalidIterations(*n)),
            LoopCondition::Attribute(attribute) if attribute.trim().is_empty() => {
                return Err(DefinitionError::Blank {
                    what: "loop attribute",
                });
            }
            LoopCondition::Condition(def) if !def.is_condition() => {
                return Err(DefinitionError::NotACondition { step: def.label() });
            }
            _ => {}
        }
        if !template.settings.path.is_set() {
            return Err(DefinitionError::PathNotSet {
                step: template.label(),
            });
        }
        template.validate()?;
        Ok(Self::with_body(
            Body::Loop(LoopSpec {
                template: Box::new(template),
                condition,
                next_iteration: 1,
            }),
            Self::root(),
        ))
    }

    /// Fan-out container cloning `template` once per file (and per property
    /// value, see [`StepDef::property_values`]). The template's path is
    /// cleared; each clone gets its own.
    pub fn multiple_operations(mut template: StepDef) -> Result<Self, DefinitionError> {
        if !matches!(template.body, Body::Operation(_)) {
            return Err(DefinitionError::InvalidTemplate {
                step: template.label(),
                reason: "only operations can be fanned out",
            });
        }
        template.settings.path = PathSource::Unset;
        template.settings.path_explicit = false;
        if !template.settings.save_result {
            return Err(DefinitionError::OperationMustSaveResult {
                step: template.label(),
            });
        }
        Ok(Self::with_body(
            Body::MultipleOperations(MultipleOperationsSpec {
                template: Box::new(template),
                files: Vec::new(),
                axis: None,
            }),
            Self::root(),
        ))
    }

    /// Multi-file condition evaluating a cloned single-file condition per file.
    pub fn multiple_conditions(mut template: StepDef) -> Result<Self, DefinitionError> {
        if !matches!(template.body, Body::Condition(_)) {
            return Err(DefinitionError::InvalidTemplate {
                step: template.label(),
                reason: "only single-file conditions can be evaluated per file",
            });
        }
        template.settings.path = PathSource::Unset;
        template.settings.path_explicit = false;
        Ok(Self::with_body(
            Body::MultipleConditions(MultipleConditionsSpec {
                template: Box::new(template),
                files: Vec::new(),
                mode: MultiMode::default(),
            }),
            Self::root(),
        ))
    }

    /// Utility whose value is the subset of its files for which `condition`
    /// evaluates to true.
    pub fn filter_files(mut condition: StepDef) -> Result<Self, DefinitionError> {
        if !matches!(condition.body, Body::Condition(_)) {
            return Err(DefinitionError::InvalidTemplate {
                step: condition.label(),
                reason: "only single-file conditions can filter files",
            });
        }
        condition.settings.path = PathSource::Unset;
        condition.settings.path_explicit = false;
        Ok(Self::with_body(
            Body::FilterFiles(FilterFilesSpec {
                template: Box::new(condition),
                files: Vec::new(),
            }),
            Self::root(),
        ))
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.settings.name = Some(name.into());
        self
    }

    /// Target a path relative to the root folder. Both `/` and `\` are
    /// accepted as separators.
    pub fn relative(mut self, path: &str) -> Self {
        self.settings.path = PathSource::Relative(PathBuf::from(normalize_separators(path)));
        self.settings.path_explicit = true;
        self
    }

    /// Target the absolute file held by a context attribute.
    pub fn absolute(mut self, attribute: impl Into<String>) -> Self {
        self.settings.path = PathSource::Attribute {
            attribute: attribute.into(),
            suffix: None,
        };
        self.settings.path_explicit = true;
        self
    }

    /// Like [`StepDef::absolute`], plus a relative suffix appended at resolution.
    pub fn absolute_with(mut self, attribute: impl Into<String>, suffix: &str) -> Self {
        self.settings.path = PathSource::Attribute {
            attribute: attribute.into(),
            suffix: Some(normalize_separators(suffix)),
        };
        self.settings.path_explicit = true;
        self
    }

    pub fn depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings
            .dependencies
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn execute_if(mut self, attribute: impl Into<String>) -> Self {
        self.settings.gate = Some(Gate::If(attribute.into()));
        self
    }

    pub fn execute_unless(mut self, attribute: impl Into<String>) -> Self {
        self.settings.gate = Some(Gate::Unless(attribute.into()));
        self
    }

    /// Gate on an embedded condition, evaluated in isolation right before
    /// this step would run. Its result never reaches the context.
    pub fn execute_when(mut self, condition: StepDef) -> Result<Self, DefinitionError> {
        if !condition.is_condition() {
            return Err(DefinitionError::NotACondition {
                step: condition.label(),
            });
        }
        self.settings.gate = Some(Gate::When(Box::new(condition)));
        Ok(self)
    }

    pub fn save_result(mut self, save: bool) -> Self {
        self.settings.save_result = save;
        self
    }

    /// Context attribute the result value is stored under; defaults to the name.
    pub fn context_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.settings.context_attribute = Some(attribute.into());
        self
    }

    pub fn abort_on_failure(mut self, abort: bool) -> Self {
        self.settings.abort_on_failure = abort;
        self
    }

    /// Abort the whole run on failure, reporting `message`.
    pub fn abort_with(mut self, message: impl Into<String>) -> Self {
        self.settings.abort_on_failure = true;
        self.settings.abort_message = Some(message.into());
        self
    }

    /// Bind `property` to the value of a context attribute, applied right
    /// before execution. Unknown properties are rejected here.
    pub fn set_from_context(
        mut self,
        property: &str,
        attribute: impl Into<String>,
    ) -> Result<Self, DefinitionError> {
        let attribute = attribute.into();
        if attribute.trim().is_empty() {
            return Err(DefinitionError::Blank {
                what: "context attribute",
            });
        }
        let spec = find_spec(self.properties(), property).ok_or_else(|| {
            DefinitionError::UnknownProperty {
                property: property.to_string(),
                step_type: self.type_name(),
            }
        })?;
        self.settings
            .late_bindings
            .retain(|binding| binding.property != property);
        self.settings.late_bindings.push(LateBinding {
            property: property.to_string(),
            attribute,
            spec,
        });
        Ok(self)
    }

    /// File-collection attributes a fan-out container or filter draws its
    /// files from.
    pub fn files<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let attributes = attributes.into_iter().map(Into::into);
        match &mut self.body {
            Body::MultipleOperations(spec) => spec.files.extend(attributes),
            Body::MultipleConditions(spec) => spec.files.extend(attributes),
            Body::FilterFiles(spec) => spec.files.extend(attributes),
            _ => {}
        }
        self
    }

    /// Configuration axis of a multiple-operations container: one clone per
    /// value of the set held by `attribute`, each with `property` set to it.
    pub fn property_values(
        mut self,
        property: &str,
        attribute: impl Into<String>,
    ) -> Result<Self, DefinitionError> {
        let attribute = attribute.into();
        if attribute.trim().is_empty() {
            return Err(DefinitionError::Blank {
                what: "property attribute",
            });
        }
        let type_name = self.type_name();
        let Body::MultipleOperations(spec) = &mut self.body else {
            return Err(DefinitionError::UnknownProperty {
                property: property.to_string(),
                step_type: type_name,
            });
        };
        let property_spec = find_spec(spec.template.properties(), property).ok_or_else(|| {
            DefinitionError::UnknownProperty {
                property: property.to_string(),
                step_type: spec.template.type_name(),
            }
        })?;
        spec.axis = Some(PropertyAxis {
            spec: property_spec,
            attribute,
        });
        Ok(self)
    }

    pub fn mode(mut self, mode: MultiMode) -> Self {
        if let Body::MultipleConditions(spec) = &mut self.body {
            spec.mode = mode;
        }
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.settings.name.as_deref()
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn path(&self) -> &PathSource {
        &self.settings.path
    }

    pub fn dependencies(&self) -> &[String] {
        &self.settings.dependencies
    }

    pub fn role(&self) -> StepRole {
        match self.body {
            Body::Operation(_) => StepRole::Operation,
            _ => StepRole::Utility,
        }
    }

    /// Whether the step can gate others: its value is always a boolean.
    pub fn is_condition(&self) -> bool {
        matches!(self.body, Body::Condition(_) | Body::MultipleConditions(_))
    }

    pub fn type_name(&self) -> &'static str {
        match &self.body {
            Body::Utility(leaf) => leaf.type_name(),
            Body::Operation(leaf) => leaf.type_name(),
            Body::Condition(leaf) => leaf.type_name(),
            Body::Group(_) => "Group",
            Body::Loop(_) => "Loop",
            Body::MultipleOperations(_) => "MultipleOperations",
            Body::MultipleConditions(_) => "MultipleConditions",
            Body::FilterFiles(_) => "FilterFiles",
        }
    }

    pub fn description(&self) -> String {
        match &self.body {
            Body::Utility(leaf) => leaf.description(),
            Body::Operation(leaf) => leaf.description(),
            Body::Condition(leaf) => leaf.description(),
            Body::Group(_) => "Group of steps".to_string(),
            Body::Loop(spec) => match &spec.condition {
                LoopCondition::Times(n) => format!("Loop {n} times"),
                LoopCondition::Attribute(attribute) => format!("Loop while {attribute} is true"),
                LoopCondition::Condition(def) => {
                    format!("Loop while {} is true", def.label())
                }
            },
            Body::MultipleOperations(spec) => format!(
                "Perform operation {} against multiple files",
                spec.template.type_name()
            ),
            Body::MultipleConditions(spec) => format!(
                "Evaluate condition {} against multiple files",
                spec.template.type_name()
            ),
            Body::FilterFiles(spec) => format!("Filter files using {}", spec.template.type_name()),
        }
    }

    fn properties(&self) -> &'static [PropertySpec] {
        match &self.body {
            Body::Utility(leaf) => leaf.properties(),
            Body::Operation(leaf) => leaf.properties(),
            Body::Condition(leaf) => leaf.properties(),
            _ => &[],
        }
    }

    /// Name if set, type name otherwise. Only for messages.
    /// Move the owned children out, leaving an empty group behind.
    pub(crate) fn take_children(&mut self) -> Vec<StepDef> {
        match &mut self.body {
            Body::Group(children) => std::mem::take(children),
            _ => Vec::new(),
        }
    }

    pub(crate) fn label(&self) -> String {
        self.settings
            .name
            .clone()
            .unwrap_or_else(|| self.type_name().to_string())
    }

    /// Assign an already coerced value to a leaf property.
    pub(crate) fn set_leaf_property(&mut self, property: &str, value: Value) -> anyhow::Result<()> {
        match &mut self.body {
            Body::Utility(leaf) => leaf.set_property(property, value),
            Body::Operation(leaf) => leaf.set_property(property, value),
            Body::Condition(leaf) => leaf.set_property(property, value),
            _ => anyhow::bail!("{} has no properties", self.type_name()),
        }
    }

    /// Checks run when a definition is attached.
    pub(crate) fn validate(&self) -> Result<(), DefinitionError> {
        if self
            .settings
            .name
            .as_ref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(DefinitionError::BlankName);
        }
        if let Body::Operation(_) = self.body {
            if !self.settings.save_result {
                return Err(DefinitionError::OperationMustSaveResult { step: self.label() });
            }
            if !self.settings.path.is_set() {
                return Err(DefinitionError::PathNotSet { step: self.label() });
            }
        }
        Ok(())
    }
}
