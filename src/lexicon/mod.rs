//! 词汇查表服务
//!
//! 匹配与模板求值只通过 Lexicon trait 调用：集合成员判断、映射查找、机器人属性。
//! Collections 是基于文本文件的实现：集合目录（每行一项）、映射目录（`key:value`）、属性文件（`key:value`）。

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::core::error::Result;

/// 词汇查表 trait
pub trait Lexicon: Send + Sync {
    /// token 是否属于集合 set_name
    fn contains(&self, set_name: &str, token: &str) -> bool;

    /// 在映射 map_name 中查 key
    fn lookup(&self, map_name: &str, key: &str) -> Option<String>;

    /// 机器人属性（如 name、location）
    fn bot_property(&self, name: &str) -> Option<String>;
}

/// 内存中的集合 / 映射 / 属性表；集合与映射名不区分大小写，集合成员与映射键按大写比较
#[derive(Debug, Default, Clone)]
pub struct Collections {
    sets: HashMap<String, HashSet<String>>,
    maps: HashMap<String, HashMap<String, String>>,
    properties: HashMap<String, String>,
}

impl Collections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_set<I, S>(&mut self, name: &str, entries: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = self.sets.entry(name.to_lowercase()).or_default();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if !entry.is_empty() {
                set.insert(entry.to_uppercase());
            }
        }
    }

    pub fn add_map<I, K, V>(&mut self, name: &str, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let map = self.maps.entry(name.to_lowercase()).or_default();
        for (k, v) in entries {
            map.insert(k.as_ref().trim().to_uppercase(), v.into());
        }
    }

    pub fn set_property(&mut self, name: &str, value: impl Into<String>) {
        self.properties.insert(name.to_lowercase(), value.into());
    }

    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    pub fn map_count(&self) -> usize {
        self.maps.len()
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// 加载集合目录：每个 `<name><extension>` 文件为一个集合，每行一项
    pub fn load_sets_dir(&mut self, dir: &Path, extension: &str) -> Result<usize> {
        let mut total = 0;
        for (name, content) in read_named_files(dir, extension)? {
            self.add_set(&name, content.lines());
            total += 1;
        }
        Ok(total)
    }

    /// 加载映射目录：每个文件为一个映射，每行 `key:value`
    pub fn load_maps_dir(&mut self, dir: &Path, extension: &str) -> Result<usize> {
        let mut total = 0;
        for (name, content) in read_named_files(dir, extension)? {
            self.add_map(&name, parse_pairs(&content));
            total += 1;
        }
        Ok(total)
    }

    /// 加载属性文件：每行 `key:value`，返回属性条数
    pub fn load_properties(&mut self, path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path)?;
        let pairs = parse_pairs(&content);
        let total = pairs.len();
        for (k, v) in pairs {
            self.set_property(&k, v);
        }
        Ok(total)
    }
}

impl Lexicon for Collections {
    fn contains(&self, set_name: &str, token: &str) -> bool {
        self.sets
            .get(&set_name.to_lowercase())
            .is_some_and(|s| s.contains(&token.to_uppercase()))
    }

    fn lookup(&self, map_name: &str, key: &str) -> Option<String> {
        self.maps
            .get(&map_name.to_lowercase())?
            .get(&key.trim().to_uppercase())
            .cloned()
    }

    fn bot_property(&self, name: &str) -> Option<String> {
        self.properties.get(&name.to_lowercase()).cloned()
    }
}

/// 读取目录下指定扩展名的文件，返回（文件名主干, 内容）
fn read_named_files(dir: &Path, extension: &str) -> Result<Vec<(String, String)>> {
    let wanted = extension.trim_start_matches('.');
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(wanted) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        files.push((stem.to_string(), std::fs::read_to_string(&path)?));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// 解析 `key:value` 行；空行与 `#` 注释忽略
fn parse_pairs(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| {
            let (k, v) = l.split_once(':')?;
            Some((k.trim().to_string(), v.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_membership_is_case_insensitive() {
        let mut c = Collections::new();
        c.add_set("Colors", ["red", "Green"]);
        assert!(c.contains("colors", "RED"));
        assert!(c.contains("COLORS", "green"));
        assert!(!c.contains("colors", "blue"));
        assert!(!c.contains("animals", "red"));
    }

    #[test]
    fn test_map_and_property_lookup() {
        let mut c = Collections::new();
        c.add_map("capital", [("france", "Paris")]);
        c.set_property("Name", "Honey");
        assert_eq!(c.lookup("capital", "France"), Some("Paris".to_string()));
        assert_eq!(c.lookup("capital", "Spain"), None);
        assert_eq!(c.bot_property("name"), Some("Honey".to_string()));
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let sets = dir.path().join("sets");
        let maps = dir.path().join("maps");
        std::fs::create_dir_all(&sets).unwrap();
        std::fs::create_dir_all(&maps).unwrap();
        std::fs::write(sets.join("animals.txt"), "cat\ndog\n\n").unwrap();
        std::fs::write(sets.join("ignored.md"), "bird").unwrap();
        std::fs::write(maps.join("sound.txt"), "# comment\ncat:meow\ndog: woof\n").unwrap();
        let props = dir.path().join("properties.txt");
        std::fs::write(&props, "name:Honey\nversion:1.0\n").unwrap();

        let mut c = Collections::new();
        assert_eq!(c.load_sets_dir(&sets, ".txt").unwrap(), 1);
        assert_eq!(c.load_maps_dir(&maps, ".txt").unwrap(), 1);
        assert_eq!(c.load_properties(&props).unwrap(), 2);
        assert!(c.contains("animals", "dog"));
        assert!(!c.contains("ignored", "bird"));
        assert_eq!(c.lookup("sound", "dog"), Some("woof".to_string()));
        assert_eq!(c.bot_property("version"), Some("1.0".to_string()));
    }
}
