//! 模式图快照
//!
//! 带格式标识与版本号的 JSON 封装。加载时区分「文件不存在」与「损坏/不兼容」，
//! 以便加载流程决定是否回退到规则源解析；保存时先写同目录临时文件再 rename，崩溃不会破坏旧快照。

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{BrainError, Result};
use crate::pattern::graph::PatternGraph;

const SNAPSHOT_FORMAT: &str = "honeycomb-graph";
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    format: &'a str,
    version: u32,
    graph: &'a PatternGraph,
}

#[derive(Deserialize)]
struct SnapshotHeader {
    format: String,
    version: u32,
}

#[derive(Deserialize)]
struct Snapshot {
    graph: PatternGraph,
}

/// 原子地写出快照
pub fn save(graph: &PatternGraph, path: &Path) -> Result<()> {
    let start = std::time::Instant::now();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    {
        let file = std::fs::File::create(&tmp)?;
        let mut writer = std::io::BufWriter::new(file);
        serde_json::to_writer(
            &mut writer,
            &SnapshotRef {
                format: SNAPSHOT_FORMAT,
                version: SNAPSHOT_VERSION,
                graph,
            },
        )?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }
    std::fs::rename(&tmp, path)?;
    tracing::info!(
        "Brain snapshot saved to {:?} ({} rules) in {:.2}s",
        path,
        graph.rule_count(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// 读取快照；不存在返回 SnapshotAbsent，其余失败一律 SnapshotCorrupt
pub fn load(path: &Path) -> Result<PatternGraph> {
    let start = std::time::Instant::now();
    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(BrainError::SnapshotAbsent(path.to_path_buf()))
        }
        Err(e) => return Err(BrainError::SnapshotCorrupt(format!("{:?}: {}", path, e))),
    };

    let header: SnapshotHeader = serde_json::from_str(&data)
        .map_err(|e| BrainError::SnapshotCorrupt(format!("{:?}: {}", path, e)))?;
    if header.format != SNAPSHOT_FORMAT {
        return Err(BrainError::SnapshotCorrupt(format!(
            "{:?}: unexpected format [{}]",
            path, header.format
        )));
    }
    if header.version != SNAPSHOT_VERSION {
        return Err(BrainError::SnapshotCorrupt(format!(
            "{:?}: unsupported version {} (expected {})",
            path, header.version, SNAPSHOT_VERSION
        )));
    }

    let snapshot: Snapshot = serde_json::from_str(&data)
        .map_err(|e| BrainError::SnapshotCorrupt(format!("{:?}: {}", path, e)))?;
    snapshot.graph.validate()?;
    tracing::info!(
        "Brain snapshot loaded from {:?} ({} rules) in {:.2}s",
        path,
        snapshot.graph.rule_count(),
        start.elapsed().as_secs_f64()
    );
    Ok(snapshot.graph)
}
