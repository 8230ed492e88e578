use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use chrono::Utc;
use log::{debug, warn};
use uuid::Uuid;
use crate::error::AppError;

const DEFAULT_API_URL: &str = "http://127.0.0.1:7860";
const DEFAULT_OUTPUT_DIR: &str = "outputs";
const DEFAULT_INTERROGATE_MODEL: &str = "deepdanbooru";

/// Where the app runs. Cloud and docker installs have no local file browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Windows,
    Mac,
    Linux,
    Cloud,
    Docker,
}

impl Device {
    pub fn host() -> Self {
        match env::consts::OS {
            "windows" => Self::Windows,
            "macos" => Self::Mac,
            _ => Self::Linux,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "windows" => Some(Self::Windows),
            "mac" | "macos" => Some(Self::Mac),
            "linux" => Some(Self::Linux),
            "cloud" => Some(Self::Cloud),
            "docker" => Some(Self::Docker),
            _ => None,
        }
    }

    pub fn can_open_folders(&self) -> bool {
        !matches!(self, Self::Cloud | Self::Docker)
    }

    /// Program that opens a folder in the platform file browser.
    pub fn file_browser(&self) -> Option<&'static str> {
        match self {
            Self::Windows => Some("explorer"),
            Self::Mac => Some("open"),
            Self::Linux => Some("xdg-open"),
            Self::Cloud | Self::Docker => None,
        }
    }

    /// Show `dir` in the platform file browser. No-op on headless devices.
    pub fn open_folder(&self, dir: &Path) -> Result<(), AppError> {
        let Some(program) = self.file_browser() else {
            return Ok(());
        };

        let mut command = Command::new(program);
        command.arg(dir);
        spawn_reaped(command)
            .map_err(|e| AppError::ConfigError(format!("Failed to launch {}: {}", program, e)))?;
        Ok(())
    }
}

/// Start `command` and wait on it from a helper thread so the child is
/// reaped once it exits.
pub fn spawn_reaped(mut command: Command) -> io::Result<JoinHandle<io::Result<ExitStatus>>> {
    let mut child = command.spawn()?;

    Ok(thread::spawn(move || {
        let status = child.wait();
        if let Err(e) = &status {
            warn!("Failed to wait on child process: {}", e);
        }
        status
    }))
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    pub output_dir: PathBuf,
    pub device: Device,
    pub interrogate_model: String,
    /// Strip color tags from prompt analysis results.
    pub post_filter: bool,
    pub timeout: Option<Duration>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file loaded: {}", e);
        }

        let conf = Self::from_lookup(|key| env::var(key).ok())?;
        std::fs::create_dir_all(&conf.output_dir)?;

        Ok(conf)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let api_url = lookup("LINEART_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(AppError::ConfigError(format!(
                "LINEART_API_URL must be an http(s) URL, got '{}'",
                api_url
            )));
        }

        let output_dir = lookup("LINEART_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        let device = match lookup("LINEART_DEVICE") {
            Some(value) => Device::parse(&value).ok_or_else(|| {
                AppError::ConfigError(format!("Unknown LINEART_DEVICE '{}'", value))
            })?,
            None => Device::host(),
        };

        let interrogate_model = lookup("LINEART_INTERROGATE_MODEL")
            .unwrap_or_else(|| DEFAULT_INTERROGATE_MODEL.to_string());

        let post_filter = match lookup("LINEART_POST_FILTER") {
            Some(value) => value.trim().parse::<bool>().map_err(|_| {
                AppError::ConfigError(format!("LINEART_POST_FILTER must be true or false, got '{}'", value))
            })?,
            None => true,
        };

        let timeout = match lookup("LINEART_TIMEOUT_SECS") {
            Some(value) => {
                let secs: u64 = value.trim().parse().map_err(|_| {
                    AppError::ConfigError(format!("LINEART_TIMEOUT_SECS must be a number, got '{}'", value))
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            api_url,
            output_dir,
            device,
            interrogate_model,
            post_filter,
            timeout,
        })
    }

    /// Fresh, unique PNG path inside the output directory.
    pub fn make_output_path(&self) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let suffix = Uuid::new_v4().simple().to_string();
        self.output_dir.join(format!("{}_{}.png", stamp, &suffix[..8]))
    }
}
