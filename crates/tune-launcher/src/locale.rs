//! Localized strings for the training form.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lang {
    #[default]
    En,
    Zh,
}

impl FromStr for Lang {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" => Ok(Self::En),
            "zh" => Ok(Self::Zh),
            other => Err(format!("unsupported language: {other} (expected en or zh)")),
        }
    }
}

/// A string available in every supported language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Localized {
    pub en: &'static str,
    pub zh: &'static str,
}

impl Localized {
    #[must_use]
    pub const fn new(en: &'static str, zh: &'static str) -> Self {
        Self { en, zh }
    }

    #[must_use]
    pub const fn get(&self, lang: Lang) -> &'static str {
        match lang {
            Lang::En => self.en,
            Lang::Zh => self.zh,
        }
    }
}

pub const SUBMIT_ALERT: Localized = Localized::new(
    "Task started, please check the tensorboard or log file, closing this page does not affect training",
    "任务已开始，请查看tensorboard或日志记录，关闭本页面不影响训练过程",
);

pub const DATASET_ALERT: Localized =
    Localized::new("Please input or select a dataset", "请选择或填入一个数据集");

pub const DRY_RUN_NOTICE: Localized = Localized::new(
    "Current is dryrun mode so you can only view the training cmd, please duplicate this space to do training or use with inference.",
    "当前为仅生成命令模式，只能查看训练命令，请复制此空间进行训练或推理。",
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lang_parse() {
        assert_eq!("EN".parse::<Lang>().unwrap(), Lang::En);
        assert_eq!("zh".parse::<Lang>().unwrap(), Lang::Zh);
        assert!("fr".parse::<Lang>().is_err());
    }

    #[test]
    fn test_localized_get() {
        assert_eq!(DATASET_ALERT.get(Lang::En), "Please input or select a dataset");
        assert_eq!(DATASET_ALERT.get(Lang::Zh), "请选择或填入一个数据集");
    }
}
