//! Message provider (C11): language-keyed violation text and report chrome.
//!
//! Rules never hard-code human-readable strings; they ask `RuleContext`'s
//! `messages` for them, so the same scan can render in Simplified Chinese
//! (the default) or English by swapping one `Language` value.

use crate::rule::Tag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Zh,
    En,
}

impl Language {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "zh" | "zh-CN" | "zh_CN" => Some(Language::Zh),
            "en" | "en-US" | "en_US" => Some(Language::En),
            _ => None,
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::Zh
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Messages {
    pub language: Language,
}

impl Messages {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    pub fn deep_relative_import(&self, specifier: &str) -> String {
        match self.language {
            Language::Zh => format!("相对导入路径过深: `{specifier}`"),
            Language::En => format!("relative import path is too deep: `{specifier}`"),
        }
    }

    pub fn alias_suggestion(&self) -> &'static str {
        match self.language {
            Language::Zh => "改用路径别名（如 tsconfig `paths`）代替逐级相对路径",
            Language::En => "use a path alias (e.g. a tsconfig `paths` entry) instead of a long relative chain",
        }
    }

    pub fn barrel_suggestion(&self) -> &'static str {
        match self.language {
            Language::Zh => "从就近的聚合导出（barrel）文件导入",
            Language::En => "import from a nearer aggregate-export (barrel) file",
        }
    }

    pub fn circular_dependency(&self, chain: &str) -> String {
        match self.language {
            Language::Zh => format!("检测到循环依赖: {chain}"),
            Language::En => format!("circular dependency detected: {chain}"),
        }
    }

    pub fn unresolved_import(&self, specifier: &str) -> String {
        match self.language {
            Language::Zh => format!("无法解析的导入: `{specifier}`"),
            Language::En => format!("could not resolve import: `{specifier}`"),
        }
    }

    pub fn swallowed_error(&self) -> String {
        match self.language {
            Language::Zh => "捕获的异常被忽略，既未处理也未重新抛出".to_string(),
            Language::En => "caught error is swallowed: neither handled nor rethrown".to_string(),
        }
    }

    pub fn catastrophic_regex(&self, pattern: &str) -> String {
        match self.language {
            Language::Zh => format!("正则表达式存在潜在的灾难性回溯: `{pattern}`"),
            Language::En => format!("regular expression may exhibit catastrophic backtracking: `{pattern}`"),
        }
    }

    pub fn deep_clone_in_loop(&self, code: &str) -> String {
        match self.language {
            Language::Zh => format!("在热路径中进行深拷贝开销较大: `{code}`"),
            Language::En => format!("deep-cloning on a hot path is expensive: `{code}`"),
        }
    }

    pub fn n2_array_lookup(&self, method: &str) -> String {
        match self.language {
            Language::Zh => format!("在热路径中使用 `{method}` 可能导致 O(n²) 查找"),
            Language::En => format!("using `{method}` on a hot path can lead to an O(n²) lookup"),
        }
    }

    pub fn tag_label(&self, tag: &Tag) -> String {
        match self.language {
            Language::Zh => match tag {
                Tag::Base => "基础".to_string(),
                Tag::Performance => "性能".to_string(),
                Tag::Untagged => "未分类".to_string(),
                Tag::Custom(s) => s.clone(),
            },
            Language::En => match tag {
                Tag::Base => "base".to_string(),
                Tag::Performance => "performance".to_string(),
                Tag::Untagged => "untagged".to_string(),
                Tag::Custom(s) => s.clone(),
            },
        }
    }

    pub fn field_file(&self) -> &'static str {
        match self.language {
            Language::Zh => "文件",
            Language::En => "File",
        }
    }

    pub fn field_description(&self) -> &'static str {
        match self.language {
            Language::Zh => "描述",
            Language::En => "Description",
        }
    }

    pub fn field_code(&self) -> &'static str {
        match self.language {
            Language::Zh => "代码",
            Language::En => "Code",
        }
    }

    pub fn field_suggestion(&self) -> &'static str {
        match self.language {
            Language::Zh => "建议",
            Language::En => "Suggestion",
        }
    }

    pub fn suggestion_separator(&self) -> &'static str {
        match self.language {
            Language::Zh => "；",
            Language::En => "; ",
        }
    }

    pub fn no_paths_provided(&self) -> &'static str {
        match self.language {
            Language::Zh => "未提供任何路径",
            Language::En => "no paths provided",
        }
    }

    pub fn all_paths_missing(&self) -> &'static str {
        match self.language {
            Language::Zh => "所有路径均不存在",
            Language::En => "all paths missing",
        }
    }

    pub fn no_rules_enabled(&self) -> &'static str {
        match self.language {
            Language::Zh => "没有启用任何规则",
            Language::En => "no rules enabled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_zh() {
        assert_eq!(Language::default(), Language::Zh);
    }

    #[test]
    fn parses_known_language_codes() {
        assert_eq!(Language::from_str("en"), Some(Language::En));
        assert_eq!(Language::from_str("zh-CN"), Some(Language::Zh));
        assert_eq!(Language::from_str("fr"), None);
    }
}
