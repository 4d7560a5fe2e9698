use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::decoders::EntityKind;

/// 文件级（结构性）错误：一旦出现，整个解码中止且不返回部分结果。
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("文件 {path:?} 不存在")]
    FileNotFound { path: PathBuf },
    #[error("读取文件 {path:?} 失败: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("读取 DXF 数据流失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("第 {line} 行的组码/值对无效: {message}")]
    MalformedTag { line: usize, message: String },
    #[error("未找到 {section} 段")]
    SectionNotFound { section: &'static str },
    #[error("不支持的 DXF 格式: {0}")]
    UnsupportedFormat(String),
}

impl DecodeError {
    pub(crate) fn malformed(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedTag {
            line,
            message: message.into(),
        }
    }
}

/// 单个实体的解码失败。只影响该实体，其余实体继续解码。
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityError {
    #[error("{kind} 缺少必需的组码 {code}")]
    Incomplete { kind: EntityKind, code: i32 },
    #[error("{kind} 组码 {code} 的值 \"{value}\" 无效")]
    InvalidValue {
        kind: EntityKind,
        code: i32,
        value: String,
    },
    #[error("{kind} 遇到重复的组码 {code}")]
    Duplicate { kind: EntityKind, code: i32 },
    #[error("暂不支持的实体类型 {kind}")]
    Unsupported { kind: String },
}

impl EntityError {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

/// 附加在成功结果上的逐实体诊断记录。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// 实体在 ENTITIES 段中的序号（从 0 开始，包含被跳过的实体）。
    pub index: usize,
    /// 实体起始组码所在行号（从 1 开始）。
    pub line: usize,
    pub entity: String,
    pub error: EntityError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "实体 #{} ({}，第 {} 行): {}",
            self.index, self.entity, self.line, self.error
        )
    }
}
