use std::path::Path;

use anyhow::{Result, bail};

use crate::core::context::Context;
use crate::core::definition::StepDef;
use crate::core::property::{PropertySpec, PropertyType};
use crate::core::result::{ManualInstructionRecord, UtilityResult};
use crate::core::step::{Leaf, Utility};
use crate::core::value::Value;
use crate::steps::render::render;

const PROPERTIES: &[PropertySpec] = &[PropertySpec::new("description", PropertyType::Text)];

/// Records a change that has to be made by hand.
///
/// The step's file is the document explaining the change. Instructions are
/// collected over the run and reported once it finishes.
#[derive(Debug, Clone)]
pub struct ManualInstruction {
    description: String,
}

impl ManualInstruction {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }

    /// An instruction pointing at `document`, relative to the root folder.
    /// Its result is not saved to the context.
    pub fn step(description: impl Into<String>, document: &str) -> StepDef {
        StepDef::utility(Self::new(description))
            .relative(document)
            .save_result(false)
    }
}

impl Leaf for ManualInstruction {
    fn type_name(&self) -> &'static str {
        "ManualInstruction"
    }

    fn description(&self) -> String {
        format!("Manual instruction: {}", self.description)
    }

    fn properties(&self) -> &'static [PropertySpec] {
        PROPERTIES
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<()> {
        match (name, value) {
            ("description", Value::Text(description)) => self.description = description,
            (name, value) => bail!("cannot set {name} of ManualInstruction to {value}"),
        }
        Ok(())
    }
}

impl Utility for ManualInstruction {
    fn execute(&self, file: &Path, ctx: &Context) -> Result<UtilityResult> {
        if !file.is_file() {
            bail!("instruction document {} does not exist", file.display());
        }
        let description = render(&self.description, ctx)?;
        let record = ManualInstructionRecord {
            description: description.clone(),
            resource: file.to_path_buf(),
        };
        Ok(UtilityResult::value(description.clone())
            .with_details(description)
            .with_instruction(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::result::UtilityKind;
    use crate::test_support::temp_tree;

    #[test]
    fn records_rendered_description_and_document() {
        let tree = temp_tree(&[("docs/jakarta.md", "# steps")]);
        let document = tree.path().join("docs/jakarta.md");
        let mut ctx = Context::new();
        ctx.put("module", "web");

        let result = ManualInstruction::new("Migrate {{ module }} imports")
            .execute(&document, &ctx)
            .expect("execute");
        assert_eq!(result.kind(), UtilityKind::Value);
        assert_eq!(
            result.instruction(),
            Some(&ManualInstructionRecord {
                description: "Migrate web imports".to_string(),
                resource: document,
            })
        );
    }

    #[test]
    fn missing_document_fails() {
        let tree = temp_tree(&[]);
        let err = ManualInstruction::new("x")
            .execute(&tree.path().join("missing.md"), &Context::new())
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn step_is_not_saved() {
        let def = ManualInstruction::step("x", "docs/a.md");
        assert!(!def.settings.save_result);
    }
}
