//! Turns a form submission into explicit CLI overrides plus validated arguments.

use crate::args::{ArgsValidator, TrainArguments, TrainStage};
use crate::error::{LaunchError, LaunchResult};
use crate::form::{FormSubmission, TrainForm};
use crate::locale::{Lang, DATASET_ALERT};
use crate::value::{display_json, ArgValue, FieldValue};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, warn};

/// Fields that never become CLI overrides, even when changed.
pub const IGNORED_FIELDS: &[&str] = &["logging_dir", "more_params", "train_stage", "envs"];

/// Launch-only fields that are still remembered in the config cache.
pub const RECORDED_LAUNCH_FIELDS: &[&str] = &["more_params", "train_stage", "use_ddp", "ddp_num", "gpu_id", "envs"];

const DATASET_KEYS: [&str; 2] = ["dataset", "custom_train_dataset_path"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedArguments {
    /// Explicit overrides merged with the free-form JSON, in submission order.
    pub overrides: Map<String, Value>,
    /// Fields whose value holds several space separated items.
    pub list_flags: BTreeSet<String>,
    /// Free-form JSON overrides as parsed.
    pub free_form: Map<String, Value>,
    /// Text appended verbatim to the command line.
    pub free_form_suffix: String,
    pub train_stage: TrainStage,
}

impl ResolvedArguments {
    #[must_use]
    pub fn is_list(&self, key: &str) -> bool {
        self.list_flags.contains(key)
    }

    /// Overrides as handed to the validator, list fields split back into items.
    #[must_use]
    pub fn validator_input(&self) -> Map<String, Value> {
        self.overrides
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) if self.is_list(key) => Value::from(split_list(s)),
                    other => other.clone(),
                };
                (key.clone(), value)
            })
            .collect()
    }
}

/// Everything that is not an explicit CLI override.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OtherParams {
    values: HashMap<String, ArgValue>,
}

impl OtherParams {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ArgValue) {
        self.values.insert(key.into(), value);
    }

    /// Selected devices with blanks removed.
    #[must_use]
    pub fn devices(&self) -> Vec<String> {
        match self.values.get("gpu_id") {
            Some(ArgValue::List(items)) => items.iter().filter(|d| !d.is_empty()).cloned().collect(),
            Some(ArgValue::Str(s)) => s.split(',').map(str::trim).filter(|d| !d.is_empty()).map(str::to_string).collect(),
            Some(ArgValue::Int(i)) => vec![i.to_string()],
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn use_ddp(&self) -> bool {
        self.flag("use_ddp")
    }

    #[must_use]
    pub fn dry_run(&self) -> bool {
        self.flag("dry_run")
    }

    #[must_use]
    pub fn ddp_num(&self) -> Option<&ArgValue> {
        self.values.get("ddp_num")
    }

    /// Extra environment assignments, trimmed.
    #[must_use]
    pub fn envs(&self) -> String {
        match self.values.get("envs") {
            Some(ArgValue::Str(s)) => s.trim().to_string(),
            Some(ArgValue::Int(i)) => i.to_string(),
            Some(ArgValue::Float(f)) => f.to_string(),
            _ => String::new(),
        }
    }

    fn flag(&self, key: &str) -> bool {
        self.values.get(key).is_some_and(ArgValue::is_truthy)
    }
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub resolved: ResolvedArguments,
    pub args: TrainArguments,
    pub other: OtherParams,
    /// Model the submission named, before any checkpoint renaming.
    pub model: Option<String>,
    /// Values worth remembering for the next submission of this model.
    pub record: Map<String, Value>,
}

/// Resolve a submission against the argument defaults.
pub fn resolve(
    submission: &FormSubmission,
    defaults: &Map<String, Value>,
    form: &TrainForm,
    validator: &dyn ArgsValidator,
    lang: Lang,
) -> LaunchResult<Resolution> {
    let mut resolved = ResolvedArguments::default();
    let mut other = OtherParams::default();
    let mut record = Map::new();
    let mut explicit = Map::new();

    for (key, raw) in submission.iter() {
        let value = ArgValue::coerce(raw);
        let is_override = !IGNORED_FIELDS.contains(&key)
            && defaults.get(key).is_some_and(|default| !value.matches_default(default))
            && value.is_truthy();

        if is_override {
            if matches!(value, ArgValue::List(_)) || form.is_list(key) {
                resolved.list_flags.insert(key.to_string());
            }
            let json = match &value {
                ArgValue::List(items) => Value::String(items.join(" ")),
                v => v.to_json(),
            };
            explicit.insert(key.to_string(), json);
        } else {
            other.insert(key, value.clone());
        }

        if key == "more_params" && raw.is_truthy() {
            parse_free_form(raw, &mut resolved);
        }
        if key == "train_stage" {
            match raw {
                FieldValue::Text(stage) if !stage.is_empty() => resolved.train_stage = stage.parse()?,
                _ => {}
            }
        }
        if defaults.contains_key(key) || RECORDED_LAUNCH_FIELDS.contains(&key) {
            record.insert(key.to_string(), raw.to_record_value());
        }
    }

    debug!(
        explicit = ?explicit.keys().collect::<Vec<_>>(),
        other = other.values.len(),
        "Resolved form submission"
    );

    explicit.extend(resolved.free_form.clone());
    resolved.overrides = explicit;

    if !DATASET_KEYS.iter().any(|k| resolved.overrides.contains_key(*k)) {
        return Err(LaunchError::NoDataset(DATASET_ALERT.get(lang).to_string()));
    }

    let model = resolved.overrides.get("model").and_then(Value::as_str).map(str::to_string);
    if let Some(model) = &model {
        let path = Path::new(model);
        if path.is_dir() && path.join("args.json").exists() {
            rename_key(&mut resolved.overrides, "model", "resume_from_checkpoint");
        }
    }

    if let Some(deepspeed) = resolved.overrides.shift_remove("deepspeed") {
        let deepspeed = display_json(&deepspeed);
        if !deepspeed.is_empty() {
            append_suffix(&mut resolved.free_form_suffix, &format!("--deepspeed {deepspeed}"));
        }
    }

    let args = match validator.validate(&resolved.validator_input()) {
        Ok(args) => args,
        Err(LaunchError::MissingModel) if resolved.overrides.contains_key("resume_from_checkpoint") => {
            warn!("Checkpoint has no recorded model, retrying with it as --model");
            rename_key(&mut resolved.overrides, "resume_from_checkpoint", "model");
            validator.validate(&resolved.validator_input())?
        }
        Err(e) => return Err(e),
    };

    Ok(Resolution { resolved, args, other, model, record })
}

fn parse_free_form(raw: &FieldValue, resolved: &mut ResolvedArguments) {
    let FieldValue::Text(text) = raw else {
        return;
    };
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => resolved.free_form = map,
        _ => {
            warn!(text = %text, "Free-form overrides are not a JSON object, appending them verbatim");
            append_suffix(&mut resolved.free_form_suffix, text);
        }
    }
}

fn append_suffix(suffix: &mut String, text: &str) {
    if !suffix.is_empty() {
        suffix.push(' ');
    }
    suffix.push_str(text);
}

fn rename_key(map: &mut Map<String, Value>, from: &str, to: &str) {
    if let Some(value) = map.shift_remove(from) {
        map.insert(to.to_string(), value);
    }
}

pub(crate) fn split_list(s: &str) -> Vec<String> {
    s.split(' ').filter(|p| !p.trim().is_empty()).map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::TrainArgsValidator;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn text(id: &str, v: &str) -> (String, FieldValue) {
        (id.to_string(), FieldValue::text(v))
    }

    fn run(form: &TrainForm, overrides: &[(String, FieldValue)]) -> LaunchResult<Resolution> {
        let sub = form.submission(overrides);
        resolve(&sub, &TrainArguments::default_values(), form, &TrainArgsValidator, Lang::En)
    }

    fn base() -> Vec<(String, FieldValue)> {
        vec![
            text("model", "Qwen/Qwen2.5-7B"),
            ("dataset".to_string(), FieldValue::List(vec!["alpaca".to_string()])),
        ]
    }

    #[test]
    fn test_defaults_are_never_overrides() {
        let form = TrainForm::new(1);
        let res = run(&form, &base()).unwrap();
        assert_eq!(res.resolved.overrides.keys().cloned().collect::<Vec<_>>(), vec!["model", "dataset"]);
        assert_eq!(res.other.get("seed"), Some(&ArgValue::Int(42)));
        assert_eq!(res.other.get("num_train_epochs"), Some(&ArgValue::Float(3.0)));
    }

    #[test]
    fn test_changed_values_become_typed_overrides() {
        let form = TrainForm::new(1);
        let mut o = base();
        o.push(text("seed", "7"));
        o.push(text("learning_rate", "1e-4"));
        o.push(text("use_liger_kernel", "true"));
        let res = run(&form, &o).unwrap();
        assert_eq!(res.resolved.overrides["seed"], json!(7));
        assert_eq!(res.resolved.overrides["learning_rate"], json!(1e-4));
        assert_eq!(res.args.seed, 7);
        assert_eq!(res.args.learning_rate, Some(1e-4));
    }

    #[test]
    fn test_ignored_fields_stay_out_of_overrides() {
        let form = TrainForm::new(1);
        let mut o = base();
        o.push(text("logging_dir", "/tmp/logs"));
        o.push(text("train_stage", "pt"));
        o.push(text("envs", "A=1"));
        let res = run(&form, &o).unwrap();
        assert!(!res.resolved.overrides.contains_key("logging_dir"));
        assert_eq!(res.resolved.train_stage, TrainStage::Pt);
        assert_eq!(res.other.envs(), "A=1");
    }

    #[test]
    fn test_missing_dataset_fails() {
        let form = TrainForm::new(1);
        let err = run(&form, &[text("model", "m")]).unwrap_err();
        assert!(matches!(err, LaunchError::NoDataset(ref msg) if msg == "Please input or select a dataset"));
    }

    #[test]
    fn test_free_form_json_wins_over_explicit() {
        let form = TrainForm::new(1);
        let mut o = base();
        o.push(text("learning_rate", "0.5"));
        o.push(text("more_params", r#"{"learning_rate": 0.1}"#));
        let res = run(&form, &o).unwrap();
        assert_eq!(res.resolved.overrides["learning_rate"], json!(0.1));
        assert!(res.resolved.free_form_suffix.is_empty());
    }

    #[test]
    fn test_free_form_text_becomes_suffix() {
        let form = TrainForm::new(1);
        let mut o = base();
        o.push(text("more_params", "not-json"));
        let res = run(&form, &o).unwrap();
        assert_eq!(res.resolved.free_form_suffix, "not-json");
    }

    #[test]
    fn test_free_form_supplies_dataset() {
        let form = TrainForm::new(1);
        let res = run(&form, &[text("model", "m"), text("more_params", r#"{"dataset": "x y"}"#)]).unwrap();
        assert_eq!(res.args.dataset, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_list_values_round_trip() {
        let form = TrainForm::new(1);
        let mut o = base();
        o[1] = ("dataset".to_string(), FieldValue::List(vec!["a".to_string(), "b".to_string(), "c".to_string()]));
        let res = run(&form, &o).unwrap();
        assert!(res.resolved.is_list("dataset"));
        assert_eq!(res.resolved.overrides["dataset"], json!("a b c"));
        assert_eq!(res.resolved.validator_input()["dataset"], json!(["a", "b", "c"]));
        assert_eq!(res.args.dataset, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_deepspeed_moves_to_suffix() {
        let form = TrainForm::new(1);
        let mut o = base();
        o.push(text("deepspeed", "zero2"));
        o.push(text("more_params", "--foo bar"));
        let res = run(&form, &o).unwrap();
        assert!(!res.resolved.overrides.contains_key("deepspeed"));
        assert_eq!(res.resolved.free_form_suffix, "--foo bar --deepspeed zero2");
    }

    #[test]
    fn test_checkpoint_model_resumes() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("args.json"), r#"{"model": "Qwen/Qwen2.5-7B"}"#).unwrap();
        let ckpt = temp.path().to_string_lossy().to_string();
        let form = TrainForm::new(1);
        let res = run(&form, &[text("model", &ckpt), ("dataset".to_string(), FieldValue::List(vec!["d".to_string()]))]).unwrap();
        assert!(!res.resolved.overrides.contains_key("model"));
        assert_eq!(res.resolved.overrides["resume_from_checkpoint"], json!(ckpt));
        assert_eq!(res.args.model.as_deref(), Some("Qwen/Qwen2.5-7B"));
        assert_eq!(res.model.as_deref(), Some(ckpt.as_str()));
    }

    #[test]
    fn test_checkpoint_without_model_retries_once() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("args.json"), "{}").unwrap();
        let ckpt = temp.path().to_string_lossy().to_string();
        let form = TrainForm::new(1);
        let res = run(&form, &[text("model", &ckpt), ("dataset".to_string(), FieldValue::List(vec!["d".to_string()]))]).unwrap();
        assert_eq!(res.resolved.overrides["model"], json!(ckpt));
        assert!(!res.resolved.overrides.contains_key("resume_from_checkpoint"));
        assert_eq!(res.args.model.as_deref(), Some(ckpt.as_str()));
    }

    struct CountingValidator {
        calls: AtomicUsize,
    }

    impl ArgsValidator for CountingValidator {
        fn validate(&self, _kwargs: &Map<String, Value>) -> LaunchResult<TrainArguments> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(LaunchError::InvalidArgs("bad combination".to_string()))
        }
    }

    #[test]
    fn test_other_validation_failures_propagate_without_retry() {
        let form = TrainForm::new(1);
        let validator = CountingValidator { calls: AtomicUsize::new(0) };
        let sub = form.submission(&base());
        let err = resolve(&sub, &TrainArguments::default_values(), &form, &validator, Lang::En).unwrap_err();
        assert!(matches!(err, LaunchError::InvalidArgs(_)));
        assert_eq!(validator.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_record_keeps_argument_and_launch_fields() {
        let form = TrainForm::new(1);
        let res = run(&form, &base()).unwrap();
        assert_eq!(res.record["model"], json!("Qwen/Qwen2.5-7B"));
        assert_eq!(res.record["ddp_num"], json!("2"));
        assert_eq!(res.record["more_params"], Value::Null);
        assert!(!res.record.contains_key("dry_run"));
    }
}
