//! Honeycomb - Rust 规则对话引擎
//!
//! 入口：初始化日志、加载配置、构建 Brain，逐行读取标准输入并输出回复。

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use honeycomb::{config::load_config, observability, BrainBuilder};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = load_config(config_path).context("Failed to load config")?;
    let brain = BrainBuilder::from_config(&config)
        .build()
        .context("Failed to build brain")?;

    let client_id = config.bot.client_id.clone();
    if let Some(greeting) = &config.bot.initial_question {
        println!("{}", greeting);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().ok();
        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let reply = brain.ask_or_default(&client_id, line).await;
        println!("{}", reply);
    }

    tracing::info!("Bye from {}", config.bot.name);
    Ok(())
}
