//! Desktop actions — launching apps and URLs, web search, desktops, hotkeys, system stats.

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::{Action, ActionArgs, ActionError, ActionSpec, ArgSpec};
use crate::capability::{find_program, run_program, spawn_program};

const SEARCH_URL: &str = "https://duckduckgo.com/";

/// Program that opens URLs and documents with the desktop default handler.
fn opener() -> Option<std::path::PathBuf> {
    if cfg!(target_os = "macos") {
        find_program(&["open"])
    } else {
        find_program(&["xdg-open", "gio"])
    }
}

/// Open a URL in the default browser. `Ok(false)` when no opener is installed.
pub(crate) fn open_in_browser(url: &str) -> anyhow::Result<bool> {
    let Some(program) = opener() else {
        return Ok(false);
    };
    let is_gio = program
        .file_name()
        .map(|n| n == "gio")
        .unwrap_or(false);
    if is_gio {
        spawn_program(&program, &["open", url])?;
    } else {
        spawn_program(&program, &[url])?;
    }
    Ok(true)
}

// ── open_app ──

static OPEN_APP: ActionSpec = ActionSpec {
    name: "open_app",
    description: "Launch an application by name",
    args: &[ArgSpec::text("name")],
};

pub struct OpenApp;

#[derive(Deserialize)]
struct OpenAppArgs {
    name: String,
}

#[async_trait]
impl Action for OpenApp {
    fn spec(&self) -> &'static ActionSpec {
        &OPEN_APP
    }

    async fn run(&self, args: ActionArgs) -> Result<String, ActionError> {
        let args: OpenAppArgs = args.parse()?;
        let name = args.name.trim();
        if name.is_empty() {
            return Err(anyhow::anyhow!("application name is empty").into());
        }

        if cfg!(target_os = "macos") {
            let open = find_program(&["open"]).context("'open' is not available")?;
            run_program(&open, &["-a", name]).await?;
        } else {
            let program = which::which(name)
                .with_context(|| format!("Failed to open app: {} not found", name))?;
            spawn_program(&program, &[])?;
        }
        info!(app = name, "opened application");
        Ok(format!("Opened {}", name))
    }
}

// ── open_url ──

static OPEN_URL: ActionSpec = ActionSpec {
    name: "open_url",
    description: "Open a web page in the default browser",
    args: &[ArgSpec::text("url")],
};

pub struct OpenUrl;

#[derive(Deserialize)]
struct OpenUrlArgs {
    url: String,
}

#[async_trait]
impl Action for OpenUrl {
    fn spec(&self) -> &'static ActionSpec {
        &OPEN_URL
    }

    async fn run(&self, args: ActionArgs) -> Result<String, ActionError> {
        let args: OpenUrlArgs = args.parse()?;
        let url = args.url.trim();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(anyhow::anyhow!("Only http and https URLs are allowed").into());
        }
        if open_in_browser(url)? {
            Ok(format!("Opened {}", url))
        } else {
            Ok(format!("No URL opener available; visit {}", url))
        }
    }
}

// ── search ──

static SEARCH: ActionSpec = ActionSpec {
    name: "search",
    description: "Search the web in the default browser",
    args: &[ArgSpec::text("query")],
};

pub struct Search;

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
}

pub(crate) fn search_url(query: &str) -> anyhow::Result<reqwest::Url> {
    reqwest::Url::parse_with_params(SEARCH_URL, &[("q", query)]).context("Failed to build search URL")
}

#[async_trait]
impl Action for Search {
    fn spec(&self) -> &'static ActionSpec {
        &SEARCH
    }

    async fn run(&self, args: ActionArgs) -> Result<String, ActionError> {
        let args: SearchArgs = args.parse()?;
        let url = search_url(args.query.trim())?;
        if open_in_browser(url.as_str())? {
            Ok(format!("Searching for {}", args.query))
        } else {
            Ok(format!("No URL opener available; search at {}", url))
        }
    }
}

// ── system_stats ──

static SYSTEM_STATS: ActionSpec = ActionSpec {
    name: "system_stats",
    description: "Report CPU, memory, and disk usage",
    args: &[],
};

pub struct SystemStats;

#[async_trait]
impl Action for SystemStats {
    fn spec(&self) -> &'static ActionSpec {
        &SYSTEM_STATS
    }

    async fn run(&self, _args: ActionArgs) -> Result<String, ActionError> {
        use sysinfo::{Disks, System};

        // CPU usage needs two refreshes some time apart
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        let cpu = sys.global_cpu_usage();
        let mem = percent(sys.used_memory(), sys.total_memory());

        let disks = Disks::new_with_refreshed_list();
        let root = disks
            .iter()
            .find(|d| {
                let mount = d.mount_point().to_string_lossy();
                mount == "/" || mount == "C:\\"
            })
            .or_else(|| disks.iter().next());
        let disk = root
            .map(|d| {
                let total = d.total_space();
                format!("{:.0}%", percent(total.saturating_sub(d.available_space()), total))
            })
            .unwrap_or_else(|| "n/a".to_string());

        Ok(format!("CPU {:.0}%, MEM {:.0}%, DISK {}", cpu, mem, disk))
    }
}

fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    used as f64 / total as f64 * 100.0
}

// ── switch_desktop ──

static SWITCH_DESKTOP: ActionSpec = ActionSpec {
    name: "switch_desktop",
    description: "Switch to virtual desktop number idx (0-based on Linux)",
    args: &[ArgSpec::integer("idx")],
};

pub struct SwitchDesktop;

#[derive(Deserialize)]
struct SwitchDesktopArgs {
    idx: i64,
}

/// macOS key codes for the digits 1-9 (Ctrl+N switches Spaces).
const MAC_DIGIT_KEY_CODES: [u8; 9] = [18, 19, 20, 21, 23, 22, 26, 28, 25];

#[async_trait]
impl Action for SwitchDesktop {
    fn spec(&self) -> &'static ActionSpec {
        &SWITCH_DESKTOP
    }

    async fn run(&self, args: ActionArgs) -> Result<String, ActionError> {
        let args: SwitchDesktopArgs = args.parse()?;
        if args.idx < 0 {
            return Err(anyhow::anyhow!("desktop index must not be negative").into());
        }

        if cfg!(target_os = "macos") {
            let Some(code) = MAC_DIGIT_KEY_CODES.get(args.idx as usize) else {
                return Err(anyhow::anyhow!("desktop index must be 0-8 on macOS").into());
            };
            let osascript = find_program(&["osascript"]).context("osascript is not available")?;
            let script = format!(
                "tell application \"System Events\" to key code {} using control down",
                code
            );
            run_program(&osascript, &["-e", script.as_str()]).await?;
            Ok("ok".to_string())
        } else if cfg!(target_os = "windows") {
            Ok("windows multi-desktop control requires additional tools".to_string())
        } else {
            let Some(wmctrl) = find_program(&["wmctrl"]) else {
                return Ok("wmctrl not available".to_string());
            };
            let idx = args.idx.to_string();
            run_program(&wmctrl, &["-s", idx.as_str()]).await?;
            Ok("ok".to_string())
        }
    }
}

// ── hotkeys ──

static HOTKEYS: ActionSpec = ActionSpec {
    name: "hotkeys",
    description: "Press a key combination, comma separated (e.g. \"ctrl,alt,t\")",
    args: &[ArgSpec::text("keys_csv")],
};

pub struct Hotkeys;

#[derive(Deserialize)]
struct HotkeysArgs {
    keys_csv: String,
}

/// `"ctrl, alt ,t"` -> `"ctrl+alt+t"`, the xdotool chord syntax.
fn chord(keys_csv: &str) -> Option<String> {
    let keys: Vec<&str> = keys_csv
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .collect();
    if keys.is_empty() {
        None
    } else {
        Some(keys.join("+"))
    }
}

#[async_trait]
impl Action for Hotkeys {
    fn spec(&self) -> &'static ActionSpec {
        &HOTKEYS
    }

    async fn run(&self, args: ActionArgs) -> Result<String, ActionError> {
        let args: HotkeysArgs = args.parse()?;
        let chord = chord(&args.keys_csv).context("no keys given")?;
        let Some(xdotool) = find_program(&["xdotool"]) else {
            return Ok("xdotool not available".to_string());
        };
        run_program(&xdotool, &["key", chord.as_str()]).await?;
        Ok("ok".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chord_normalizes_keys() {
        assert_eq!(chord("ctrl, alt ,t").as_deref(), Some("ctrl+alt+t"));
        assert_eq!(chord(" , "), None);
    }

    #[test]
    fn test_search_url_encodes_query() {
        let url = search_url("rust & tokio").unwrap();
        assert!(url.as_str().starts_with("https://duckduckgo.com/?q="));
        assert!(url.as_str().contains("rust+%26+tokio"));
    }

    #[test]
    fn test_percent_handles_zero_total() {
        assert_eq!(percent(5, 0), 0.0);
        assert_eq!(percent(1, 4), 25.0);
    }

    #[tokio::test]
    async fn test_open_url_rejects_other_schemes() {
        let mut registry = super::super::ActionRegistry::new();
        registry.register(std::sync::Arc::new(OpenUrl));
        let args = serde_json::json!({"url": "file:///etc/passwd"});
        let err = registry
            .invoke("open_url", args.as_object().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Failed(_)));
    }

    #[tokio::test]
    async fn test_negative_desktop_rejected() {
        let mut registry = super::super::ActionRegistry::new();
        registry.register(std::sync::Arc::new(SwitchDesktop));
        let args = serde_json::json!({"idx": -1});
        assert!(registry
            .invoke("switch_desktop", args.as_object().unwrap())
            .await
            .is_err());
    }
}
