use crate::error::{MegatronError, MegatronResult};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_EXPORT_TOOL: &str = "swift";

/// Inputs of a checkpoint conversion.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Checkpoint to read: a hub id or directory for HF, a directory for mcore.
    pub source: String,
    pub output_dir: PathBuf,
    pub torch_dtype: Option<String>,
    /// Export tool executable.
    pub tool: String,
}

impl ConversionRequest {
    pub fn new(source: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output_dir: output_dir.into(),
            torch_dtype: None,
            tool: DEFAULT_EXPORT_TOOL.to_string(),
        }
    }

    #[must_use]
    pub fn with_torch_dtype(mut self, torch_dtype: impl Into<String>) -> Self {
        self.torch_dtype = Some(torch_dtype.into());
        self
    }

    #[must_use]
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = tool.into();
        self
    }
}

/// An export-tool invocation that performs the conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionPlan {
    pub program: String,
    pub args: Vec<String>,
    pub output_dir: PathBuf,
}

impl ConversionPlan {
    /// Ready-to-run process for the plan.
    #[must_use]
    pub fn command(&self) -> std::process::Command {
        let mut cmd = std::process::Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for ConversionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

fn check_output_dir(output_dir: &Path) -> MegatronResult<()> {
    if output_dir.as_os_str().is_empty() {
        return Err(MegatronError::Conversion("output directory is empty".to_string()));
    }
    let occupied = match std::fs::read_dir(output_dir) {
        Ok(mut entries) => entries.next().is_some(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => return Err(e.into()),
    };
    if occupied {
        return Err(MegatronError::Conversion(format!(
            "output directory is not empty: {}",
            output_dir.display()
        )));
    }
    Ok(())
}

fn plan(request: &ConversionRequest, source_flag: &str, target_flag: &str) -> MegatronResult<ConversionPlan> {
    if request.source.trim().is_empty() {
        return Err(MegatronError::Conversion("source checkpoint is empty".to_string()));
    }
    check_output_dir(&request.output_dir)?;

    let mut args = vec![
        "export".to_string(),
        source_flag.to_string(),
        request.source.clone(),
        target_flag.to_string(),
        "true".to_string(),
        "--output_dir".to_string(),
        request.output_dir.display().to_string(),
    ];
    if let Some(dtype) = &request.torch_dtype {
        args.push("--torch_dtype".to_string());
        args.push(dtype.clone());
    }
    Ok(ConversionPlan { program: request.tool.clone(), args, output_dir: request.output_dir.clone() })
}

/// Plan a HuggingFace to Megatron-core conversion.
pub fn convert_hf2mcore(request: &ConversionRequest) -> MegatronResult<ConversionPlan> {
    plan(request, "--model", "--to_mcore")
}

/// Plan a Megatron-core to HuggingFace conversion. The source must be a local directory.
pub fn convert_mcore2hf(request: &ConversionRequest) -> MegatronResult<ConversionPlan> {
    if !Path::new(&request.source).is_dir() {
        return Err(MegatronError::Conversion(format!(
            "mcore checkpoint directory not found: {}",
            request.source
        )));
    }
    plan(request, "--mcore_model", "--to_hf")
}
