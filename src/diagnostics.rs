//! Maps provider error text to the diagnostic shown to the user.
//!
//! Classification is plain substring matching on the error message, checked
//! in a fixed order; the first matching category wins.

use crate::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    RateLimit,
    TokenQuota,
    DailyQuota,
    Generic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

const RATE_LIMIT_MARKERS: &[&str] = &["RPM", "429", "RESOURCE_EXHAUSTED"];
const TOKEN_QUOTA_MARKERS: &[&str] = &["TPM"];
const DAILY_QUOTA_MARKERS: &[&str] = &["RPD"];

pub const RATE_LIMIT_MESSAGE: &str = "【RPM Exceeded】当前 API 请求频率过高。系统已尝试使用 Flash 模型并包含自动重试机制。请降低运行频率，等待 1 分钟左右再试。";
pub const TOKEN_QUOTA_MESSAGE: &str =
    "【TPM Exceeded】单次处理的字符过多。请尝试缩短您的 Prompt 描述。";
pub const DAILY_QUOTA_MESSAGE: &str =
    "【RPD Exceeded】单日请求配额已用完。请明天再试或更换 API Key。";

fn contains_any(message: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| message.contains(marker))
}

pub fn classify(message: &str) -> Diagnostic {
    let (kind, message) = if contains_any(message, RATE_LIMIT_MARKERS) {
        (DiagnosticKind::RateLimit, RATE_LIMIT_MESSAGE.to_string())
    } else if contains_any(message, TOKEN_QUOTA_MARKERS) {
        (DiagnosticKind::TokenQuota, TOKEN_QUOTA_MESSAGE.to_string())
    } else if contains_any(message, DAILY_QUOTA_MARKERS) {
        (DiagnosticKind::DailyQuota, DAILY_QUOTA_MESSAGE.to_string())
    } else {
        (
            DiagnosticKind::Generic,
            format!("【生成异常】{}。建议稍后重试或简化指令。", message),
        )
    };

    Diagnostic { kind, message }
}

pub fn diagnose(error: &Error) -> Diagnostic {
    classify(&error.to_string())
}
