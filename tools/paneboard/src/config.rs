use crate::errors::BoardError;
use crate::logging::DEFAULT_DISK_BUDGET_BYTES;
use crate::runtime::FileSystem;
use crate::types::{BorderStyle, ColorPair, PaneColor, SizeRequest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_CONFIG_RELATIVE: &str = ".paneboard/config.toml";
pub const DEFAULT_SHELL: &str = "sh";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
    pub execution: ExecutionConfig,
    pub dashboards: BTreeMap<String, DashboardSection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub enabled: bool,
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub dir: Option<PathBuf>,
    pub budget_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionConfig {
    pub shell: String,
    pub command_timeout_seconds: Option<u64>,
}

/// `[dashboard.<name>]` exactly as written in the file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DashboardSection {
    pub width: Option<u16>,
    pub height: Option<Dimension>,
    pub shrink: Option<bool>,
    #[serde(alias = "box")]
    pub pane: Option<BTreeMap<String, PaneSection>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Dimension {
    Cells(u16),
    Keyword(String),
}

/// `[dashboard.<name>.pane.<key>]`; the key only orders placement.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct PaneSection {
    pub name: Option<String>,
    pub cmd: Option<String>,
    pub rate_sec: Option<u64>,
    pub width: Option<u16>,
    pub height: Option<u16>,
    pub wrap: Option<bool>,
    pub border: Option<String>,
    pub timeout_sec: Option<u64>,
    pub color_border_fg: Option<String>,
    pub color_border_bg: Option<String>,
    pub color_content_fg: Option<String>,
    pub color_content_bg: Option<String>,
}

/// Immutable per-pane settings, shared by the pane and its refresh loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneConfig {
    pub id: String,
    pub cache_key: String,
    pub name: Option<String>,
    pub command: String,
    pub shell: String,
    pub refresh_interval: Duration,
    pub size: SizeRequest,
    pub border_colors: ColorPair,
    pub content_colors: ColorPair,
    pub wrap: bool,
    pub border_style: BorderStyle,
    pub timeout: Option<Duration>,
}

impl PaneConfig {
    pub fn new(id: &str, command: &str) -> Self {
        Self {
            id: id.to_string(),
            cache_key: id.to_string(),
            name: None,
            command: command.to_string(),
            shell: DEFAULT_SHELL.to_string(),
            refresh_interval: Duration::ZERO,
            size: SizeRequest::Auto,
            border_colors: ColorPair::new(PaneColor::White, PaneColor::Default),
            content_colors: ColorPair::new(PaneColor::White, PaneColor::Default),
            wrap: true,
            border_style: BorderStyle::Box,
            timeout: None,
        }
    }

    pub fn auto_refreshes(&self) -> bool {
        !self.refresh_interval.is_zero()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub name: String,
    pub width: Option<u16>,
    pub height: Option<u16>,
    pub shrink: bool,
    pub panes: Vec<Arc<PaneConfig>>,
}

impl DashboardConfig {
    pub fn size_requests(&self) -> Vec<SizeRequest> {
        self.panes.iter().map(|pane| pane.size).collect()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig {
                enabled: true,
                dir: None,
            },
            logging: LoggingConfig {
                dir: None,
                budget_bytes: DEFAULT_DISK_BUDGET_BYTES,
            },
            execution: ExecutionConfig {
                shell: DEFAULT_SHELL.to_string(),
                command_timeout_seconds: None,
            },
            dashboards: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialAppConfig {
    cache: Option<PartialCacheConfig>,
    logging: Option<PartialLoggingConfig>,
    execution: Option<PartialExecutionConfig>,
    dashboard: Option<BTreeMap<String, DashboardSection>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialCacheConfig {
    enabled: Option<bool>,
    dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialLoggingConfig {
    dir: Option<PathBuf>,
    budget_bytes: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialExecutionConfig {
    shell: Option<String>,
    command_timeout_seconds: Option<u64>,
}

/// Reads `config_path`, or `~/.paneboard/config.toml` when none is given.
/// A missing default file yields the defaults; a missing explicit file is an
/// error.
pub fn load_config(
    config_path: Option<&Path>,
    home: Option<&Path>,
    fs: &dyn FileSystem,
) -> Result<AppConfig, BoardError> {
    let mut cfg = AppConfig::default();
    if let Some(home) = home {
        cfg.cache.dir = Some(home.join(".paneboard/cache"));
        cfg.logging.dir = Some(home.join(".paneboard/logs"));
    }

    let path = match (config_path, home) {
        (Some(path), _) => Some(path.to_path_buf()),
        (None, Some(home)) => {
            let candidate = home.join(DEFAULT_CONFIG_RELATIVE);
            fs.exists(&candidate).then_some(candidate)
        }
        (None, None) => None,
    };

    if let Some(path) = path {
        let file_contents = fs.read_to_string(&path).map_err(|e| match e {
            BoardError::NotFound(_) => {
                BoardError::Io(format!("config file {} does not exist", path.display()))
            }
            other => other,
        })?;
        let partial: PartialAppConfig = toml::from_str(&file_contents)
            .map_err(|e| BoardError::ConfigParse(e.to_string()))?;
        merge_partial_config(&mut cfg, partial);
    }

    validate_config(&cfg)?;
    Ok(cfg)
}

fn merge_partial_config(cfg: &mut AppConfig, partial: PartialAppConfig) {
    if let Some(cache) = partial.cache {
        if let Some(enabled) = cache.enabled {
            cfg.cache.enabled = enabled;
        }
        if let Some(dir) = cache.dir {
            cfg.cache.dir = Some(dir);
        }
    }

    if let Some(logging) = partial.logging {
        if let Some(dir) = logging.dir {
            cfg.logging.dir = Some(dir);
        }
        if let Some(value) = logging.budget_bytes {
            cfg.logging.budget_bytes = value;
        }
    }

    if let Some(execution) = partial.execution {
        if let Some(shell) = execution.shell {
            cfg.execution.shell = shell;
        }
        if let Some(value) = execution.command_timeout_seconds {
            cfg.execution.command_timeout_seconds = (value > 0).then_some(value);
        }
    }

    if let Some(dashboards) = partial.dashboard {
        cfg.dashboards = dashboards;
    }
}

fn validate_config(cfg: &AppConfig) -> Result<(), BoardError> {
    if cfg.execution.shell.trim().is_empty() {
        return Err(BoardError::InvalidConfig(
            "execution.shell must not be empty".to_string(),
        ));
    }
    Ok(())
}

pub fn dashboard_names(cfg: &AppConfig) -> Vec<String> {
    cfg.dashboards.keys().cloned().collect()
}

/// Validates one dashboard and turns it into pane configs in key order.
pub fn resolve_dashboard(cfg: &AppConfig, name: &str) -> Result<DashboardConfig, BoardError> {
    let section = cfg
        .dashboards
        .get(name)
        .ok_or_else(|| BoardError::NotFound(format!("dashboard '{name}'")))?;

    let (height, auto_size) = match &section.height {
        None => (None, false),
        Some(Dimension::Cells(value)) => (Some(*value), false),
        Some(Dimension::Keyword(word)) if word.trim().eq_ignore_ascii_case("auto") => {
            (None, true)
        }
        Some(Dimension::Keyword(word)) => {
            return Err(BoardError::InvalidConfig(format!(
                "dashboard.{name}.height must be a number or \"auto\", got \"{word}\""
            )))
        }
    };
    if section.width == Some(0) || height == Some(0) {
        return Err(BoardError::InvalidConfig(format!(
            "dashboard.{name} width and height must be greater than zero"
        )));
    }

    let mut panes = Vec::new();
    for (key, pane) in section.pane.iter().flatten() {
        panes.push(Arc::new(resolve_pane(
            name,
            key,
            pane,
            auto_size,
            &cfg.execution,
        )?));
    }
    if panes.is_empty() {
        return Err(BoardError::InvalidConfig(format!(
            "dashboard.{name} has no panes"
        )));
    }

    Ok(DashboardConfig {
        name: name.to_string(),
        width: section.width,
        height,
        shrink: section.shrink.unwrap_or(false),
        panes,
    })
}

fn resolve_pane(
    dashboard: &str,
    key: &str,
    pane: &PaneSection,
    auto_size: bool,
    execution: &ExecutionConfig,
) -> Result<PaneConfig, BoardError> {
    let command = pane
        .cmd
        .as_deref()
        .map(str::trim)
        .filter(|cmd| !cmd.is_empty())
        .ok_or_else(|| {
            BoardError::InvalidConfig(format!("dashboard.{dashboard}.pane.{key}.cmd is required"))
        })?;

    let size = if auto_size {
        SizeRequest::Auto
    } else {
        match (pane.width, pane.height) {
            (Some(width), Some(height)) => SizeRequest::Fixed { width, height },
            _ => {
                return Err(BoardError::InvalidConfig(format!(
                    "dashboard.{dashboard}.pane.{key} needs width and height unless the dashboard height is \"auto\""
                )))
            }
        }
    };

    let border_style = match pane.border.as_deref().map(str::trim) {
        None | Some("box") => BorderStyle::Box,
        Some("transparent") => BorderStyle::Transparent,
        Some(other) => {
            return Err(BoardError::InvalidConfig(format!(
                "dashboard.{dashboard}.pane.{key}.border must be \"box\" or \"transparent\", got \"{other}\""
            )))
        }
    };

    let color = |value: &Option<String>, fallback: PaneColor| {
        value.as_deref().map_or(fallback, PaneColor::from_name)
    };

    Ok(PaneConfig {
        id: key.to_string(),
        cache_key: format!("{dashboard}_{key}"),
        name: pane.name.clone(),
        command: command.to_string(),
        shell: execution.shell.clone(),
        refresh_interval: Duration::from_secs(pane.rate_sec.unwrap_or(0)),
        size,
        border_colors: ColorPair::new(
            color(&pane.color_border_fg, PaneColor::White),
            color(&pane.color_border_bg, PaneColor::Default),
        ),
        content_colors: ColorPair::new(
            color(&pane.color_content_fg, PaneColor::White),
            color(&pane.color_content_bg, PaneColor::Default),
        ),
        wrap: pane.wrap.unwrap_or(true),
        border_style,
        timeout: pane
            .timeout_sec
            .or(execution.command_timeout_seconds)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs),
    })
}

#[cfg(test)]
mod tests {
    use super::{dashboard_names, load_config, resolve_dashboard};
    use crate::errors::BoardError;
    use crate::runtime::{FakeClock, FakeFileSystem, FileSystem};
    use crate::types::{BorderStyle, PaneColor, SizeRequest};
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    const SAMPLE: &str = r#"
[execution]
command_timeout_seconds = 30

[dashboard.ops]
width = 120
height = 40

[dashboard.ops.pane.02-disk]
cmd = "df -h"
width = 60
height = 10
wrap = false
border = "transparent"
timeout-sec = 5

[dashboard.ops.pane.01-load]
name = "load"
cmd = "uptime"
rate-sec = 10
width = 40
height = 10
color-border-fg = "cyan"
color-content-bg = "blue"

[dashboard.wall]
height = "auto"
shrink = true

[dashboard.wall.box.a]
cmd = "date"
"#;

    fn fs_with(path: &str, contents: &str) -> FakeFileSystem {
        let fs = FakeFileSystem::new(Arc::new(FakeClock::default()));
        fs.write_string(Path::new(path), contents).expect("seed");
        fs
    }

    #[test]
    fn parses_dashboards_and_orders_panes_by_key() {
        let fs = fs_with("/cfg.toml", SAMPLE);
        let cfg = load_config(Some(Path::new("/cfg.toml")), Some(Path::new("/home/u")), &fs)
            .expect("config");
        assert_eq!(dashboard_names(&cfg), vec!["ops", "wall"]);

        let ops = resolve_dashboard(&cfg, "ops").expect("ops");
        assert_eq!(ops.width, Some(120));
        assert_eq!(ops.height, Some(40));
        let ids = ops.panes.iter().map(|p| p.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["01-load", "02-disk"]);

        let load = &ops.panes[0];
        assert_eq!(load.cache_key, "ops_01-load");
        assert_eq!(load.name.as_deref(), Some("load"));
        assert_eq!(load.refresh_interval, Duration::from_secs(10));
        assert_eq!(load.border_colors.fg, PaneColor::Cyan);
        assert_eq!(load.content_colors.bg, PaneColor::Blue);
        assert_eq!(load.timeout, Some(Duration::from_secs(30)));

        let disk = &ops.panes[1];
        assert!(!disk.wrap);
        assert!(!disk.auto_refreshes());
        assert_eq!(disk.border_style, BorderStyle::Transparent);
        assert_eq!(disk.timeout, Some(Duration::from_secs(5)));
        assert_eq!(
            disk.size,
            SizeRequest::Fixed {
                width: 60,
                height: 10
            }
        );
    }

    #[test]
    fn auto_height_and_box_alias_resolve() {
        let fs = fs_with("/cfg.toml", SAMPLE);
        let cfg = load_config(Some(Path::new("/cfg.toml")), None, &fs).expect("config");
        let wall = resolve_dashboard(&cfg, "wall").expect("wall");
        assert!(wall.shrink);
        assert_eq!(wall.panes[0].size, SizeRequest::Auto);
        assert_eq!(wall.panes[0].border_colors.fg, PaneColor::White);
    }

    #[test]
    fn unknown_dashboard_is_not_found() {
        let fs = fs_with("/cfg.toml", SAMPLE);
        let cfg = load_config(Some(Path::new("/cfg.toml")), None, &fs).expect("config");
        assert!(matches!(
            resolve_dashboard(&cfg, "nope"),
            Err(BoardError::NotFound(_))
        ));
    }

    #[test]
    fn missing_cmd_and_size_are_invalid() {
        let fs = fs_with(
            "/cfg.toml",
            "[dashboard.a.pane.x]\nwidth = 5\nheight = 5\n[dashboard.b.pane.y]\ncmd = \"true\"\n",
        );
        let cfg = load_config(Some(Path::new("/cfg.toml")), None, &fs).expect("config");
        assert!(matches!(
            resolve_dashboard(&cfg, "a"),
            Err(BoardError::InvalidConfig(_))
        ));
        assert!(matches!(
            resolve_dashboard(&cfg, "b"),
            Err(BoardError::InvalidConfig(_))
        ));
    }

    #[test]
    fn bad_height_keyword_is_invalid() {
        let fs = fs_with(
            "/cfg.toml",
            "[dashboard.a]\nheight = \"tall\"\n[dashboard.a.pane.x]\ncmd = \"true\"\n",
        );
        let cfg = load_config(Some(Path::new("/cfg.toml")), None, &fs).expect("config");
        assert!(matches!(
            resolve_dashboard(&cfg, "a"),
            Err(BoardError::InvalidConfig(_))
        ));
    }

    #[test]
    fn missing_default_file_yields_defaults_under_home() {
        let fs = FakeFileSystem::new(Arc::new(FakeClock::default()));
        let cfg = load_config(None, Some(Path::new("/home/u")), &fs).expect("config");
        assert!(cfg.dashboards.is_empty());
        assert_eq!(
            cfg.cache.dir.as_deref(),
            Some(Path::new("/home/u/.paneboard/cache"))
        );
        assert_eq!(
            cfg.logging.dir.as_deref(),
            Some(Path::new("/home/u/.paneboard/logs"))
        );
    }

    #[test]
    fn missing_explicit_file_and_bad_toml_are_errors() {
        let fs = fs_with("/bad.toml", "[dashboard\n");
        assert!(load_config(Some(Path::new("/missing.toml")), None, &fs).is_err());
        assert!(matches!(
            load_config(Some(Path::new("/bad.toml")), None, &fs),
            Err(BoardError::ConfigParse(_))
        ));
    }
}
