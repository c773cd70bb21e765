//! Declared fields of the training form.
//!
//! Each field carries its widget kind, default, allowed choices and labels,
//! so type handling is decided by the schema rather than by the value.

use crate::args::{TrainArguments, TrainStage};
use crate::locale::{Lang, Localized};
use crate::value::FieldValue;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    Dropdown,
    MultiSelect,
    Textbox,
    Checkbox,
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub id: &'static str,
    pub widget: WidgetKind,
    pub default: FieldValue,
    pub choices: Vec<String>,
    /// The flag takes several space separated values on the command line.
    pub is_list: bool,
    pub label: Localized,
    pub info: Option<Localized>,
}

impl FieldSpec {
    fn new(id: &'static str, widget: WidgetKind, label: Localized) -> Self {
        let default = match widget {
            WidgetKind::Checkbox => FieldValue::Bool(false),
            WidgetKind::MultiSelect => FieldValue::List(Vec::new()),
            WidgetKind::Dropdown | WidgetKind::Textbox => FieldValue::text(""),
        };
        Self { id, widget, default, choices: Vec::new(), is_list: false, label, info: None }
    }

    fn info(mut self, info: Localized) -> Self {
        self.info = Some(info);
        self
    }

    fn list(mut self) -> Self {
        self.is_list = true;
        self
    }

    fn choices(mut self, choices: &[&str]) -> Self {
        self.choices = choices.iter().map(|c| (*c).to_string()).collect();
        self
    }

    fn default_value(mut self, value: FieldValue) -> Self {
        self.default = value;
        self
    }

    /// Parse user text for this field according to its widget.
    #[must_use]
    pub fn parse_input(&self, raw: &str) -> FieldValue {
        match self.widget {
            WidgetKind::Checkbox => FieldValue::Bool(matches!(raw.to_lowercase().as_str(), "true" | "1" | "yes" | "on")),
            WidgetKind::MultiSelect => FieldValue::List(
                raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect(),
            ),
            WidgetKind::Dropdown | WidgetKind::Textbox => FieldValue::text(raw),
        }
    }

    #[must_use]
    pub fn label(&self, lang: Lang) -> &'static str {
        self.label.get(lang)
    }
}

/// Ordered `(field_id, value)` pairs of one form submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormSubmission {
    pub values: Vec<(String, FieldValue)>,
}

impl FormSubmission {
    #[must_use]
    pub fn new(values: Vec<(String, FieldValue)>) -> Self {
        Self { values }
    }

    pub fn push(&mut self, id: impl Into<String>, value: FieldValue) {
        self.values.push((id.into(), value));
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&FieldValue> {
        self.values.iter().find(|(k, _)| k == id).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// The training form: every field, in display order.
#[derive(Debug, Clone)]
pub struct TrainForm {
    fields: Vec<FieldSpec>,
}

impl TrainForm {
    /// Build the form for a machine with `device_count` accelerators.
    #[must_use]
    pub fn new(device_count: usize) -> Self {
        let defaults = TrainArguments::default_values();
        let mut fields = argument_fields();
        for field in &mut fields {
            if let Some(value) = defaults.get(field.id) {
                field.default = default_for(field.widget, value);
            }
            if field.choices.is_empty() {
                field.choices = TrainArguments::choices(field.id).iter().map(|c| (*c).to_string()).collect();
            }
        }
        fields.extend(launch_fields(device_count));
        Self { fields }
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, id: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.id == id)
    }

    #[must_use]
    pub fn is_list(&self, id: &str) -> bool {
        self.field(id).is_some_and(|f| f.is_list)
    }

    /// A full submission: every field at its default unless `overrides` sets it.
    #[must_use]
    pub fn submission(&self, overrides: &[(String, FieldValue)]) -> FormSubmission {
        let values = self
            .fields
            .iter()
            .map(|f| {
                let value = overrides
                    .iter()
                    .rev()
                    .find(|(id, _)| id == f.id)
                    .map_or_else(|| f.default.clone(), |(_, v)| v.clone());
                (f.id.to_string(), value)
            })
            .collect();
        FormSubmission::new(values)
    }

    /// Prefill values from a cached record, skipping unknown and empty keys.
    #[must_use]
    pub fn prefill(&self, record: &Map<String, Value>) -> Vec<(String, FieldValue)> {
        record
            .iter()
            .filter(|(k, _)| self.field(k).is_some())
            .filter_map(|(k, v)| FieldValue::from_record_value(v).map(|fv| (k.clone(), fv)))
            .collect()
    }
}

fn default_for(widget: WidgetKind, value: &Value) -> FieldValue {
    match (widget, value) {
        (WidgetKind::Checkbox, Value::Bool(b)) => FieldValue::Bool(*b),
        (_, Value::Array(items)) => {
            FieldValue::List(items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        }
        (_, Value::Null) => FieldValue::text(""),
        (_, Value::String(s)) => FieldValue::text(s.clone()),
        (_, other) => FieldValue::text(other.to_string()),
    }
}

fn argument_fields() -> Vec<FieldSpec> {
    use WidgetKind::{Checkbox, Dropdown, MultiSelect, Textbox};
    vec![
        FieldSpec::new("model", Dropdown, Localized::new("Model id or path", "模型id或路径"))
            .info(Localized::new("The actual model id or model path", "实际的模型id或路径")),
        FieldSpec::new("model_type", Dropdown, Localized::new("Select Model Type", "选择模型类型")),
        FieldSpec::new("dataset", MultiSelect, Localized::new("Dataset id or path", "数据集id或路径")).list(),
        FieldSpec::new("custom_train_dataset_path", Textbox, Localized::new("Custom dataset path", "自定义数据集路径")).list(),
        FieldSpec::new("val_dataset", MultiSelect, Localized::new("Validation dataset", "验证集")).list(),
        FieldSpec::new("train_stage", Dropdown, Localized::new("Train Stage", "训练Stage"))
            .info(Localized::new(
                "Please choose matched dataset, RLHF settings is at the bottom of the page",
                "请注意选择与此匹配的数据集，人类对齐配置在页面下方",
            ))
            .choices(&TrainStage::ALL)
            .default_value(FieldValue::text(TrainStage::default().as_str())),
        FieldSpec::new("train_type", Dropdown, Localized::new("Train type", "训练方式"))
            .info(Localized::new("Select the training type", "选择训练的方式")),
        FieldSpec::new("tuner_backend", Dropdown, Localized::new("Tuner backend", "Tuner backend"))
            .info(Localized::new("The tuner backend", "tuner实现框架")),
        FieldSpec::new("seed", Textbox, Localized::new("Seed", "随机数种子"))
            .info(Localized::new("Select a random seed", "选择随机数种子")),
        FieldSpec::new("torch_dtype", Dropdown, Localized::new("Training Precision", "训练精度"))
            .info(Localized::new("Select the training precision", "选择训练精度")),
        FieldSpec::new("use_liger_kernel", Checkbox, Localized::new("Use Liger kernel", "使用Liger kernel"))
            .info(Localized::new("Liger kernel can reduce memory usage", "Liger kernel可以有效降低显存使用")),
        FieldSpec::new("learning_rate", Textbox, Localized::new("Learning rate", "学习率")),
        FieldSpec::new("num_train_epochs", Textbox, Localized::new("Train epoch", "数据集迭代轮次")),
        FieldSpec::new("per_device_train_batch_size", Textbox, Localized::new("Train batch size", "训练batch size")),
        FieldSpec::new("gradient_accumulation_steps", Textbox, Localized::new("Gradient accumulation steps", "梯度累计步数")),
        FieldSpec::new("max_length", Textbox, Localized::new("Max length", "句子最大长度")),
        FieldSpec::new("lora_rank", Textbox, Localized::new("LoRA rank", "LoRA的秩")),
        FieldSpec::new("lora_alpha", Textbox, Localized::new("LoRA alpha", "LoRA alpha")),
        FieldSpec::new("target_modules", Textbox, Localized::new("LoRA target modules", "LoRA目标模块")).list(),
        FieldSpec::new("deepspeed", Dropdown, Localized::new("DeepSpeed", "DeepSpeed"))
            .choices(&["", "zero0", "zero1", "zero2", "zero3", "zero2_offload", "zero3_offload"]),
        FieldSpec::new("rlhf_type", Dropdown, Localized::new("RLHF type", "人类对齐算法类型")),
        FieldSpec::new("output_dir", Textbox, Localized::new("Output dir", "存储目录")),
        FieldSpec::new("logging_dir", Textbox, Localized::new("Logging dir", "日志路径")),
        FieldSpec::new("more_params", Textbox, Localized::new("Other params", "其他高级参数"))
            .info(Localized::new("Fill in with json format or --xxx xxx cmd format", "以json格式或--xxx xxx命令行格式填入")),
    ]
}

fn launch_fields(device_count: usize) -> Vec<FieldSpec> {
    use WidgetKind::{Checkbox, MultiSelect, Textbox};
    let mut devices: Vec<String> = (0..device_count).map(|i| i.to_string()).collect();
    devices.push("cpu".to_string());
    let default_device = if device_count > 0 { "0" } else { "cpu" };
    vec![
        FieldSpec::new("use_ddp", Checkbox, Localized::new("Use DDP", "使用DDP"))
            .info(Localized::new("Use Distributed Data Parallel to train", "是否使用数据并行训练")),
        FieldSpec::new("ddp_num", Textbox, Localized::new("Number of DDP sharding", "DDP分片数量"))
            .info(Localized::new("The data parallel size of DDP", "启用多少进程的数据并行"))
            .default_value(FieldValue::text("2")),
        FieldSpec {
            choices: devices,
            ..FieldSpec::new("gpu_id", MultiSelect, Localized::new("Choose GPU", "选择可用GPU"))
                .info(Localized::new("Select GPU to train", "选择训练使用的GPU号，如CUDA不可用只能选择CPU"))
                .default_value(FieldValue::List(vec![default_device.to_string()]))
        },
        FieldSpec::new("envs", Textbox, Localized::new("Extra env vars", "环境变量")),
        FieldSpec::new("dry_run", Checkbox, Localized::new("Dry-run", "仅生成运行命令"))
            .info(Localized::new("Generate run command only, for manually running", "仅生成运行命令，开发者自行运行")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_defaults_follow_argument_schema() {
        let form = TrainForm::new(2);
        assert_eq!(form.field("seed").unwrap().default, FieldValue::text("42"));
        assert_eq!(form.field("model").unwrap().default, FieldValue::text(""));
        assert_eq!(form.field("use_liger_kernel").unwrap().default, FieldValue::Bool(false));
        assert_eq!(
            form.field("target_modules").unwrap().default,
            FieldValue::List(vec!["all-linear".to_string()])
        );
        assert!(form.field("train_type").unwrap().choices.contains(&"full".to_string()));
    }

    #[test]
    fn test_device_choices() {
        let form = TrainForm::new(2);
        let gpu = form.field("gpu_id").unwrap();
        assert_eq!(gpu.choices, vec!["0", "1", "cpu"]);
        assert_eq!(gpu.default, FieldValue::List(vec!["0".to_string()]));

        let cpu_only = TrainForm::new(0);
        assert_eq!(cpu_only.field("gpu_id").unwrap().default, FieldValue::List(vec!["cpu".to_string()]));
    }

    #[test]
    fn test_submission_applies_overrides_in_form_order() {
        let form = TrainForm::new(1);
        let sub = form.submission(&[
            ("dataset".to_string(), FieldValue::List(vec!["alpaca".to_string()])),
            ("model".to_string(), FieldValue::text("Qwen/Qwen2.5-7B")),
        ]);
        assert_eq!(sub.values.len(), form.fields().len());
        assert_eq!(sub.values[0].0, "model");
        assert_eq!(sub.get("model"), Some(&FieldValue::text("Qwen/Qwen2.5-7B")));
        assert_eq!(sub.get("ddp_num"), Some(&FieldValue::text("2")));
    }

    #[test]
    fn test_parse_input_by_widget() {
        let form = TrainForm::new(2);
        assert_eq!(form.field("use_ddp").unwrap().parse_input("True"), FieldValue::Bool(true));
        assert_eq!(
            form.field("gpu_id").unwrap().parse_input("0, 1"),
            FieldValue::List(vec!["0".to_string(), "1".to_string()])
        );
        assert_eq!(form.field("seed").unwrap().parse_input("7"), FieldValue::text("7"));
    }
}
