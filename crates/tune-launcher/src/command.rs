//! Serializes resolved arguments into a shell command line.

use crate::args::TrainStage;
use crate::error::{LaunchError, LaunchResult};
use crate::resolver::{split_list, Resolution};
use crate::value::{display_json, ArgValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Posix,
    Windows,
}

impl Platform {
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Posix
        }
    }

    #[must_use]
    pub const fn quote(self) -> char {
        match self {
            Self::Posix => '\'',
            Self::Windows => '"',
        }
    }
}

impl FromStr for Platform {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "posix" | "unix" | "linux" | "macos" => Ok(Self::Posix),
            "windows" | "win32" => Ok(Self::Windows),
            other => Err(LaunchError::Config(format!("unknown platform: {other}"))),
        }
    }
}

/// Accelerator family, which decides the device visibility variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accelerator {
    Cuda,
    Npu,
    Cpu,
}

impl Accelerator {
    /// Probe the host for accelerator device nodes.
    #[must_use]
    pub fn detect() -> Self {
        if std::env::var_os("ASCEND_HOME_PATH").is_some() || Path::new("/dev/davinci0").exists() {
            Self::Npu
        } else if Path::new("/dev/nvidia0").exists() || Path::new("/proc/driver/nvidia").exists() {
            Self::Cuda
        } else {
            Self::Cpu
        }
    }

    /// Number of visible devices of this family.
    #[must_use]
    pub fn device_count(self) -> usize {
        let prefix = match self {
            Self::Cuda => "nvidia",
            Self::Npu => "davinci",
            Self::Cpu => return 0,
        };
        std::fs::read_dir("/dev").map_or(0, |entries| {
            entries
                .filter_map(Result::ok)
                .filter(|e| {
                    e.file_name()
                        .to_str()
                        .and_then(|name| name.strip_prefix(prefix))
                        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
                })
                .count()
        })
    }

    #[must_use]
    pub const fn visible_devices_var(self) -> Option<&'static str> {
        match self {
            Self::Cuda => Some("CUDA_VISIBLE_DEVICES"),
            Self::Npu => Some("ASCEND_RT_VISIBLE_DEVICES"),
            Self::Cpu => None,
        }
    }
}

impl FromStr for Accelerator {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cuda" | "gpu" => Ok(Self::Cuda),
            "npu" | "ascend" => Ok(Self::Npu),
            "cpu" | "none" => Ok(Self::Cpu),
            other => Err(LaunchError::Config(format!("unknown accelerator: {other}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandSettings {
    /// Training CLI executable.
    pub cli: String,
    pub platform: Platform,
    pub accelerator: Accelerator,
}

/// Environment variable carrying the data-parallel process count.
pub const DDP_ENV: &str = "NPROC_PER_NODE";

/// A fully assembled training command.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchCommand {
    pub platform: Platform,
    /// `KEY=VALUE` assignments: device visibility, DDP, then user extras.
    pub envs: Vec<String>,
    pub program: String,
    pub stage: TrainStage,
    pub params: Vec<String>,
    pub output_dir: PathBuf,
    pub logging_dir: PathBuf,
    pub log_file: PathBuf,
}

impl LaunchCommand {
    /// Detached form: runs in the background with output sent to the log file.
    #[must_use]
    pub fn render(&self) -> String {
        let log = self.log_file.display();
        match self.platform {
            Platform::Posix => {
                let mut parts = self.envs.clone();
                parts.push(format!("nohup {} {}", self.program, self.stage));
                parts.extend(self.params.iter().cloned());
                parts.push(format!("> {log} 2>&1 &"));
                parts.join(" ")
            }
            Platform::Windows => format!(
                "{}start /b {} {} {} > {log} 2>&1",
                self.windows_env_prefix(),
                self.program,
                self.stage,
                self.params.join(" ")
            ),
        }
    }

    /// Foreground form: output goes to the caller.
    #[must_use]
    pub fn render_foreground(&self) -> String {
        match self.platform {
            Platform::Posix => {
                let mut parts = self.envs.clone();
                parts.push(format!("{} {}", self.program, self.stage));
                parts.extend(self.params.iter().cloned());
                parts.join(" ")
            }
            Platform::Windows => {
                format!("{}{} {} {}", self.windows_env_prefix(), self.program, self.stage, self.params.join(" "))
            }
        }
    }

    fn windows_env_prefix(&self) -> String {
        self.envs.iter().map(|env| format!("set {env} && ")).collect()
    }
}

impl std::fmt::Display for LaunchCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// Build the launch command for a resolved submission.
pub fn build_command(resolution: &Resolution, settings: &CommandSettings) -> LaunchResult<LaunchCommand> {
    let resolved = &resolution.resolved;
    let args = &resolution.args;
    let other = &resolution.other;
    let q = settings.platform.quote();
    let sep = format!("{q} {q}");

    let mut params = Vec::new();
    for (key, value) in &resolved.overrides {
        let rendered = match value {
            Value::Array(items) => items.iter().map(display_json).collect::<Vec<_>>().join(&sep),
            Value::String(s) if resolved.is_list(key) => split_list(s).join(&sep),
            other => display_json(other),
        };
        params.push(format!("--{key} {q}{rendered}{q}"));
    }
    if !resolved.free_form_suffix.trim().is_empty() {
        params.push(resolved.free_form_suffix.clone());
    }

    let output_dir = args.output_dir.clone();
    let logging_dir = args.logging_dir();
    params.push(format!(
        "--add_version False --output_dir {} --logging_dir {} --ignore_args_error True",
        output_dir.display(),
        logging_dir.display()
    ));

    let devices = other.devices();
    if devices.len() > 1 && devices.iter().any(|d| d == "cpu") {
        return Err(LaunchError::MixedDevices(devices.join(",")));
    }

    let mut envs = Vec::new();
    let gpus = devices.join(",");
    if !gpus.is_empty() && gpus != "cpu" {
        if let Some(var) = settings.accelerator.visible_devices_var() {
            envs.push(format!("{var}={gpus}"));
        }
    }

    if other.use_ddp() {
        let num = match other.ddp_num() {
            Some(ArgValue::Int(n)) if *n > 0 => *n,
            Some(v) => return Err(LaunchError::InvalidDdp(display_json(&v.to_json()))),
            None => return Err(LaunchError::InvalidDdp("nothing".to_string())),
        };
        envs.push(format!("{DDP_ENV}={num}"));
    }

    envs.extend(other.envs().split_whitespace().map(str::to_string));

    Ok(LaunchCommand {
        platform: settings.platform,
        envs,
        program: settings.cli.clone(),
        stage: resolved.train_stage,
        params,
        log_file: logging_dir.join("run.log"),
        output_dir,
        logging_dir,
    })
}
