use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use regex::Regex;

use crate::core::context::Context;
use crate::core::property::{PropertySpec, PropertyType};
use crate::core::result::UtilityResult;
use crate::core::step::{Leaf, Utility};
use crate::core::value::Value;

const PROPERTIES: &[PropertySpec] = &[PropertySpec::new("pattern", PropertyType::Text)];

/// Finds files under the step's folder whose name matches a regex.
///
/// The value is the sorted list of matches; nothing matching is a `NULL`
/// result.
#[derive(Debug, Clone)]
pub struct FindFiles {
    pattern: Regex,
    recursive: bool,
    include_folders: bool,
}

impl FindFiles {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: compile(pattern)?,
            recursive: false,
            include_folders: false,
        })
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn include_folders(mut self, include: bool) -> Self {
        self.include_folders = include;
        self
    }

    fn collect(&self, folder: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
        let entries = fs::read_dir(folder).with_context(|| format!("read directory {}", folder.display()))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("read entry in {}", folder.display()))?;
            let path = entry.path();
            let is_dir = entry
                .file_type()
                .with_context(|| format!("inspect {}", path.display()))?
                .is_dir();
            let matches = self.pattern.is_match(&entry.file_name().to_string_lossy());
            if matches && (!is_dir || self.include_folders) {
                found.push(path.clone());
            }
            if is_dir && self.recursive {
                self.collect(&path, found)?;
            }
        }
        Ok(())
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).with_context(|| format!("invalid file name pattern {pattern:?}"))
}

impl Leaf for FindFiles {
    fn type_name(&self) -> &'static str {
        "FindFiles"
    }

    fn description(&self) -> String {
        let scope = if self.recursive { "recursively" } else { "directly" };
        format!("Find files named like {} {scope} under folder", self.pattern)
    }

    fn properties(&self) -> &'static [PropertySpec] {
        PROPERTIES
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<()> {
        match (name, value) {
            ("pattern", Value::Text(pattern)) => self.pattern = compile(&pattern)?,
            (name, value) => bail!("cannot set {name} of FindFiles to {value}"),
        }
        Ok(())
    }
}

impl Utility for FindFiles {
    fn execute(&self, file: &Path, _ctx: &Context) -> Result<UtilityResult> {
        let mut found = Vec::new();
        self.collect(file, &mut found)?;
        if found.is_empty() {
            return Ok(UtilityResult::null().with_details(format!(
                "No files named like {} have been found under {}",
                self.pattern,
                file.display()
            )));
        }
        found.sort();
        let details = format!("{} files have been found under {}", found.len(), file.display());
        Ok(UtilityResult::value(found).with_details(details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::result::UtilityKind;
    use crate::test_support::temp_tree;

    #[test]
    fn finds_matching_files_recursively() {
        let tree = temp_tree(&[
            ("pom.xml", "<project/>"),
            ("a/pom.xml", "<project/>"),
            ("a/readme.md", "hi"),
        ]);
        let ctx = Context::new();
        let shallow = FindFiles::new(r"^pom\.xml$")
            .expect("pattern")
            .execute(tree.path(), &ctx)
            .expect("execute");
        assert_eq!(
            shallow.value_ref(),
            Some(&Value::Files(vec![tree.path().join("pom.xml")]))
        );

        let deep = FindFiles::new(r"^pom\.xml$")
            .expect("pattern")
            .recursive(true)
            .execute(tree.path(), &ctx)
            .expect("execute");
        let mut expected = vec![tree.path().join("a/pom.xml"), tree.path().join("pom.xml")];
        expected.sort();
        assert_eq!(deep.value_ref(), Some(&Value::Files(expected)));
    }

    #[test]
    fn nothing_found_is_null() {
        let tree = temp_tree(&[("a.txt", "x")]);
        let result = FindFiles::new("nothing")
            .expect("pattern")
            .execute(tree.path(), &Context::new())
            .expect("execute");
        assert_eq!(result.kind(), UtilityKind::Null);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(FindFiles::new("(").is_err());
        let mut find = FindFiles::new("a").expect("pattern");
        assert!(find.set_property("pattern", Value::Text("(".into())).is_err());
    }
}
