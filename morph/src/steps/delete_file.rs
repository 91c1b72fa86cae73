use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};

use crate::core::context::Context;
use crate::core::result::OperationResult;
use crate::core::step::{Leaf, Operation};

/// Deletes the step's file, or folder with everything in it.
#[derive(Debug, Clone, Default)]
pub struct DeleteFile;

impl Leaf for DeleteFile {
    fn type_name(&self) -> &'static str {
        "DeleteFile"
    }

    fn description(&self) -> String {
        "Delete file or folder".to_string()
    }
}

impl Operation for DeleteFile {
    fn execute(&self, file: &Path, _ctx: &Context) -> Result<OperationResult> {
        if !file.exists() {
            return Ok(OperationResult::no_op(format!("{} was not deleted", file.display()))
                .with_warning(format!("{} does not exist", file.display())));
        }
        if file.is_dir() {
            fs::remove_dir_all(file).with_context(|| format!("remove directory {}", file.display()))?;
        } else {
            fs::remove_file(file).with_context(|| format!("remove {}", file.display()))?;
        }
        Ok(OperationResult::success(format!("{} has been deleted", file.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::result::OperationKind;
    use crate::test_support::temp_tree;

    #[test]
    fn deletes_and_warns_when_absent() {
        let tree = temp_tree(&[("a.txt", "x")]);
        let file = tree.path().join("a.txt");
        let deleted = DeleteFile.execute(&file, &Context::new()).expect("execute");
        assert_eq!(deleted.kind(), OperationKind::Success);
        assert!(!file.exists());

        let again = DeleteFile.execute(&file, &Context::new()).expect("execute");
        assert_eq!(again.kind(), OperationKind::Warning);
        assert_eq!(again.warnings().len(), 1);
    }
}
