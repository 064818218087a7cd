use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::rebase::{ConflictResolution, RebaseAction};

#[derive(Parser, Debug)]
#[command(
    name = "rebase-panel",
    version,
    about = "远程 Git 后端的控制面板 - 浏览历史、对比提交、执行交互式 rebase",
    long_about = "rebase-panel 通过 JSON-RPC 连接到运行 git 的后端进程，支持分页浏览提交历史、选择区间对比文件差异，以及驱动交互式 rebase（计划、执行、冲突解决、编辑器文件交接）。每个 rebase 子命令都会先同步后端当前的 rebase 状态。"
)]
pub struct Args {
    /// Backend JSON-RPC endpoint (default: http://localhost:8999/)
    #[arg(long, global = true, value_name = "URL")]
    pub url: Option<String>,

    /// Commits per history page
    #[arg(long = "page-size", global = true, value_name = "N")]
    pub page_size: Option<usize>,

    /// 只显示指定分支的历史
    #[arg(long, global = true, value_name = "BRANCH")]
    pub branch: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// TOML 配置文件
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// 输出调试信息
    #[arg(short, long, global = true, default_value_t = false)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// 显示提交历史
    Log {
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },

    /// List files changed between two commits, or diff one of them
    Diff {
        from: String,
        to: String,
        /// 显示该文件两侧的内容
        #[arg(long, value_name = "PATH")]
        file: Option<String>,
    },

    /// 显示后端的 rebase 与工作区状态
    Status,

    /// Interactive rebase operations
    #[command(subcommand)]
    Rebase(RebaseCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum RebaseCommand {
    /// 生成 rebase 计划并显示
    Start { from: String, to: String },

    /// Plan and execute in one go
    Run {
        from: String,
        to: String,
        /// 修改某一步的动作，如 --set 1=squash
        #[arg(long = "set", value_name = "IDX=ACTION", value_parser = parse_step_action)]
        set: Vec<(usize, RebaseAction)>,
    },

    /// 继续已暂停的 rebase
    Continue,

    /// 中止 rebase
    Abort,

    /// Resolve the active conflict
    Resolve {
        /// ours, theirs or manual
        resolution: ConflictResolution,
        /// manual 模式下使用的文件内容
        #[arg(long = "content-file", value_name = "PATH")]
        content_file: Option<PathBuf>,
    },

    /// Save the git editor file the backend is waiting on
    Editor {
        /// 替换编辑器内容后再保存
        #[arg(long = "content-file", value_name = "PATH")]
        content_file: Option<PathBuf>,
    },

    /// 提交暂存的修改（edit 停顿时使用）
    Commit {
        #[arg(short, long)]
        message: Option<String>,
    },

    /// 修改上一次提交
    Amend,
}

fn parse_step_action(value: &str) -> Result<(usize, RebaseAction), String> {
    let (index, action) = value
        .split_once('=')
        .ok_or_else(|| format!("expected IDX=ACTION, got '{}'", value))?;
    let index = index
        .trim()
        .parse()
        .map_err(|_| format!("invalid step index '{}'", index))?;
    let action = RebaseAction::parse(action)
        .ok_or_else(|| format!("unknown action '{}' (pick, drop, squash, edit)", action))?;
    Ok((index, action))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from([
            "rebase-panel",
            "log",
            "--pages",
            "3",
            "--url",
            "http://host:1/",
            "--debug",
        ]);
        assert_eq!(args.command, Command::Log { pages: 3 });
        assert_eq!(args.url.as_deref(), Some("http://host:1/"));
        assert!(args.debug);
    }

    #[test]
    fn test_rebase_run_with_actions() {
        let args = Args::parse_from([
            "rebase-panel",
            "rebase",
            "run",
            "c1",
            "c5",
            "--set",
            "1=squash",
            "--set",
            "2=d",
        ]);
        match args.command {
            Command::Rebase(RebaseCommand::Run { from, to, set }) => {
                assert_eq!((from.as_str(), to.as_str()), ("c1", "c5"));
                assert_eq!(set, vec![(1, RebaseAction::Squash), (2, RebaseAction::Drop)]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_parses_resolution() {
        let args = Args::parse_from(["rebase-panel", "rebase", "resolve", "theirs"]);
        assert_eq!(
            args.command,
            Command::Rebase(RebaseCommand::Resolve {
                resolution: ConflictResolution::Theirs,
                content_file: None
            })
        );
        assert!(Args::try_parse_from(["rebase-panel", "rebase", "resolve", "mine"]).is_err());
    }

    #[test]
    fn test_bad_step_action() {
        assert!(parse_step_action("x=pick").is_err());
        assert!(parse_step_action("1=reword").is_err());
        assert!(parse_step_action("squash").is_err());
    }
}
