use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8999/";
pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub backend_url: String,
    pub page_size: usize,
    pub request_timeout_secs: u64,
    pub branch: Option<String>,
    pub log_level: String,
    pub debug: bool,
}

/// `--config` 指定的 TOML 文件，所有字段可选
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    backend_url: Option<String>,
    page_size: Option<usize>,
    request_timeout_secs: Option<u64>,
    branch: Option<String>,
    log_level: Option<String>,
    debug: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            branch: None,
            log_level: "warn".to_string(),
            debug: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        // 默认配置
        let mut config = Config::default();

        // 加载配置文件
        #[cfg(not(test))]
        config.load_from_env_file();
        // 加载环境变量（覆盖配置文件）
        config.load_from_env();

        config
    }

    pub fn load_from_env_file(&mut self) {
        // 尝试从用户主目录加载
        if let Ok(home) = env::var("HOME") {
            let user_env_path = PathBuf::from(format!("{}/.rebase-panel/.env", home));
            if user_env_path.exists() {
                dotenvy::from_path(user_env_path).ok();
            }
        }

        // 尝试从当前目录加载
        dotenvy::dotenv().ok();
    }

    pub fn load_from_env(&mut self) {
        if let Ok(url) = env::var("REBASE_PANEL_URL") {
            self.backend_url = url;
        }
        if let Some(page_size) = parse_env("REBASE_PANEL_PAGE_SIZE") {
            self.page_size = page_size;
        }
        if let Some(timeout) = parse_env("REBASE_PANEL_TIMEOUT_SECS") {
            self.request_timeout_secs = timeout;
        }
        if let Ok(branch) = env::var("REBASE_PANEL_BRANCH") {
            self.branch = Some(branch).filter(|b| !b.is_empty());
        }
        if let Ok(level) = env::var("REBASE_PANEL_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Ok(debug) = env::var("REBASE_PANEL_DEBUG") {
            self.debug = matches!(debug.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    pub fn merge_toml_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let file: FileConfig = toml::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        if let Some(url) = file.backend_url {
            self.backend_url = url;
        }
        if let Some(page_size) = file.page_size {
            self.page_size = page_size;
        }
        if let Some(timeout) = file.request_timeout_secs {
            self.request_timeout_secs = timeout;
        }
        if let Some(branch) = file.branch {
            self.branch = Some(branch).filter(|b| !b.is_empty());
        }
        if let Some(level) = file.log_level {
            self.log_level = level;
        }
        if let Some(debug) = file.debug {
            self.debug = debug;
        }
        Ok(())
    }

    pub fn update_from_args(&mut self, args: &crate::cli::args::Args) -> anyhow::Result<()> {
        // 配置文件先于命令行参数
        if let Some(path) = &args.config {
            self.merge_toml_file(path)?;
        }

        // 命令行参数优先级最高
        if let Some(url) = &args.url {
            self.backend_url = url.clone();
        }
        if let Some(page_size) = args.page_size {
            self.page_size = page_size;
        }
        if let Some(timeout) = args.timeout {
            self.request_timeout_secs = timeout;
        }
        if let Some(branch) = &args.branch {
            self.branch = Some(branch.clone()).filter(|b| !b.is_empty());
        }
        if args.debug {
            self.debug = true;
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let url = url::Url::parse(&self.backend_url)
            .with_context(|| format!("Invalid backend URL: {}", self.backend_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!(
                "Unsupported backend URL scheme '{}'. Please set REBASE_PANEL_URL to an http(s) address",
                url.scheme()
            );
        }
        if self.page_size == 0 {
            anyhow::bail!("Page size must be at least 1");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("Request timeout must be at least 1 second");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let value = env::var(key).ok()?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!("Ignoring invalid {}={}", key, value);
            None
        }
    }
}
