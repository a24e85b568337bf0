//! Navigator - 多智能体编排系统
//!
//! 入口：初始化日志与配置，注册内置工具，进入交互式 REPL。
//! 每个目标走一轮完整编排（计划 → 校验 → 工具 → 合成 → 评分 → 指标）。

use std::io::{BufRead, Write};

use anyhow::Context;
use navigator::config::load_config;
use navigator::core::{build_tool_registry, create_llm_from_config, Orchestrator};
use navigator::metrics::{format_summary, MetricsStore};
use navigator::observability;

fn print_banner() {
    println!("\n{}", "=".repeat(60));
    println!("NAVIGATOR - Multi-Agent Orchestration System");
    println!("{}", "=".repeat(60));
}

/// 已注册工具按类别输出
fn print_tools_loaded(tool_names: &[String]) {
    let search: Vec<&str> = tool_names
        .iter()
        .filter(|t| t.contains("tavily"))
        .map(String::as_str)
        .collect();
    let weather: Vec<&str> = tool_names
        .iter()
        .filter(|t| t.contains("weather"))
        .map(String::as_str)
        .collect();
    let github: Vec<&str> = tool_names
        .iter()
        .filter(|t| {
            ["issue", "repo", "pull", "branch", "file"]
                .iter()
                .any(|k| t.contains(k))
        })
        .map(String::as_str)
        .collect();

    println!("\nLoaded tools:");
    if !search.is_empty() {
        println!("   Search: {}", search.join(", "));
    }
    if !weather.is_empty() {
        println!("   Weather: {}", weather.join(", "));
    }
    if !github.is_empty() {
        println!("   GitHub: {}", github.join(", "));
    }
    println!("\n   Total: {} tools", tool_names.len());
}

fn print_help() {
    println!("\nExamples:");
    println!(" Search:");
    println!("      - Find the latest AI news");
    println!("      - Search for Python best practices");
    println!();
    println!(" GitHub:");
    println!("      - Create an issue in owner/repo titled 'Bug fix needed'");
    println!("      - List issues for deepmehta27/mcp-navigator");
    println!("      - Get file contents from my-username/my-repo");
    println!();
    println!(" Weather:");
    println!("      - What's the weather in San Francisco?");
    println!("      - Weather in NYC");
    println!();
    println!(" Multi-step:");
    println!("      - Search for trending AI repos and create GitHub issue summary");
    println!("      - Weather in Tokyo and list issues in travel-planner repo");
    println!();
    println!("Commands:");
    println!("   metrics       - View performance metrics");
    println!("   metrics 5     - View last 5 runs");
    println!("   help          - Show this help message");
    println!("   clear         - Clear screen");
    println!("   exit          - Quit the application");
    println!("\n{}", "-".repeat(60));
}

fn print_metrics(store: &MetricsStore, last_n: Option<usize>) {
    match store.stats(last_n) {
        Ok(Some(summary)) => println!("{}", format_summary(&summary)),
        Ok(None) => println!("\nNo metrics recorded yet."),
        Err(e) => println!("\nFailed to read metrics: {}", e),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    observability::init();

    let cfg = load_config(None).context("Failed to load config")?;

    print_banner();

    let registry = build_tool_registry(&cfg);
    let llm = create_llm_from_config(&cfg);
    let orchestrator = Orchestrator::new(llm, registry, &cfg);

    let tool_names = orchestrator.tool_names();
    print_tools_loaded(&tool_names);

    // metrics 命令只读，与编排器内的存储指向同一文件
    let metrics = MetricsStore::new(&cfg.metrics.storage_path);

    print_help();

    let stdin = std::io::stdin();
    loop {
        print!("\nYou [{}]: ", chrono::Local::now().format("%H:%M"));
        std::io::stdout().flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!("\nGoodbye!\n");
            break;
        }
        let user_input = line.trim();
        if user_input.is_empty() {
            continue;
        }

        let cmd = user_input.to_lowercase();
        if cmd == "exit" {
            println!("\nGoodbye! Thanks for using Navigator.\n");
            break;
        } else if cmd == "help" {
            print_help();
            continue;
        } else if cmd == "clear" {
            print!("\x1b[2J\x1b[H");
            print_banner();
            print_tools_loaded(&tool_names);
            continue;
        } else if cmd.starts_with("metrics") {
            let last_n = user_input
                .split_whitespace()
                .nth(1)
                .and_then(|s| s.parse::<usize>().ok());
            print_metrics(&metrics, last_n);
            continue;
        }

        println!("\n{}", "=".repeat(60));
        println!("Processing: {}", user_input);
        println!("{}", "=".repeat(60));

        match orchestrator.run(user_input).await {
            Ok(result) => {
                println!("\n{}", "-".repeat(60));
                println!("FINAL ANSWER");
                println!("{}", "-".repeat(60));
                println!("{}", result.final_answer);
                println!("{}\n", "-".repeat(60));
            }
            Err(e) => {
                println!("\nError: {}\n", e);
            }
        }
    }

    Ok(())
}
