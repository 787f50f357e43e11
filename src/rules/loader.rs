//! 规则加载器
//!
//! 从规则目录（可递归）读取所有指定扩展名的文件并插入模式图。
//! 单条规则的模板写错只记录日志并跳过；结构违规与文件无法解析则中止整个加载。

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::core::error::{BrainError, Result};
use crate::pattern::PatternGraph;
use crate::rules::RuleFile;
use crate::template::parse_template;

pub struct RuleLoader {
    dir: PathBuf,
    extension: String,
    recursive: bool,
}

impl RuleLoader {
    pub fn new(dir: impl AsRef<Path>, extension: &str, recursive: bool) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            extension: extension.trim_start_matches('.').to_string(),
            recursive,
        }
    }

    /// 目录下的规则文件，按路径排序保证插入顺序稳定
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Err(BrainError::RuleSource(format!(
                "Rules directory {} not found",
                self.dir.display()
            )));
        }
        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut files: Vec<PathBuf> = WalkDir::new(&self.dir)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(self.extension.as_str()))
            .collect();
        files.sort();
        Ok(files)
    }

    /// 加载全部规则文件，返回成功插入的规则数
    pub fn load_into(&self, graph: &mut PatternGraph) -> Result<usize> {
        let mut total = 0;
        for path in self.files()? {
            let content = std::fs::read_to_string(&path)?;
            let loaded = load_str(&content, graph)
                .map_err(|e| match e {
                    BrainError::RuleSource(msg) => {
                        BrainError::RuleSource(format!("{}: {}", path.display(), msg))
                    }
                    other => other,
                })?;
            tracing::debug!("Loaded {} rules from {}", loaded, path.display());
            total += loaded;
        }
        tracing::info!("Loaded {} rules from {}", total, self.dir.display());
        Ok(total)
    }
}

/// 从一段 TOML 文本加载规则
pub fn load_str(content: &str, graph: &mut PatternGraph) -> Result<usize> {
    let file: RuleFile =
        toml::from_str(content).map_err(|e| BrainError::RuleSource(e.to_string()))?;
    let mut loaded = 0;
    for rule in file.rules {
        let template = match parse_template(&rule.template) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!("Skipping rule [{}]: {}", rule.pattern, e);
                continue;
            }
        };
        graph.insert(&rule.pattern, &rule.topic, &rule.that, template)?;
        loaded += 1;
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: &str = r#"
[[rule]]
pattern = "HELLO"
template = "Hi there"

[[rule]]
pattern = "BROKEN"
template = "<think>oops"

[[rule]]
pattern = "YES"
that = "DO YOU LIKE *"
template = "Good"
"#;

    #[test]
    fn test_load_str_skips_bad_template() {
        let mut graph = PatternGraph::new();
        assert_eq!(load_str(RULES, &mut graph).unwrap(), 2);
        assert_eq!(graph.rule_count(), 2);
    }

    #[test]
    fn test_bad_toml_is_rule_source_error() {
        let mut graph = PatternGraph::new();
        let err = load_str("[[rule]\npattern=", &mut graph).unwrap_err();
        assert!(matches!(err, BrainError::RuleSource(_)));
    }

    #[test]
    fn test_load_dir_recursive_and_flat() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("a.toml"), RULES).unwrap();
        std::fs::write(
            nested.join("b.toml"),
            "[[rule]]\npattern = \"BYE\"\ntemplate = \"Bye\"\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut graph = PatternGraph::new();
        let loaded = RuleLoader::new(dir.path(), ".toml", true)
            .load_into(&mut graph)
            .unwrap();
        assert_eq!(loaded, 3);

        let mut graph = PatternGraph::new();
        let loaded = RuleLoader::new(dir.path(), "toml", false)
            .load_into(&mut graph)
            .unwrap();
        assert_eq!(loaded, 2);
    }

    #[test]
    fn test_structural_violation_aborts_load() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.toml"), RULES).unwrap();
        std::fs::write(
            dir.path().join("b.toml"),
            "[[rule]]\npattern = \"A __TOPIC__\"\ntemplate = \"x\"\n",
        )
        .unwrap();

        let mut graph = PatternGraph::new();
        let err = RuleLoader::new(dir.path(), ".toml", false)
            .load_into(&mut graph)
            .unwrap_err();
        assert!(matches!(err, BrainError::StructuralViolation(_)));

        let mut graph = PatternGraph::new();
        let err = load_str("[[rule]]\npattern = \"?!\"\ntemplate = \"x\"\n", &mut graph).unwrap_err();
        assert!(matches!(err, BrainError::StructuralViolation(_)));
        assert_eq!(graph.rule_count(), 0);
    }

    #[test]
    fn test_missing_dir() {
        let mut graph = PatternGraph::new();
        let loader = RuleLoader::new("/definitely/not/here", ".toml", true);
        assert!(loader.load_into(&mut graph).is_err());
    }
}
