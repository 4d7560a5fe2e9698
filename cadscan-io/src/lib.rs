//! 独立的 DXF 实体解码器。
//!
//! 流水线：[`tokenizer`] 读取组码/值对 → [`section`] 定位 ENTITIES 段 →
//! [`reconstruct`] 切分实体记录 → [`decoders`] 按类型解码 → [`assembler`] 汇总结果。

pub mod assembler;
pub mod code_page;
pub mod decoders;
pub mod error;
pub mod mtext;
pub mod reconstruct;
pub mod section;
pub mod tokenizer;

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use assembler::Decoded;
pub use decoders::EntityKind;
pub use error::{DecodeError, Diagnostic, EntityError};
pub use section::DrawingHeader;

use crate::code_page::encoding_from_code_page;
use crate::reconstruct::EntityReconstructor;
use crate::tokenizer::TagReader;

/// 解码行为开关。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeOptions {
    /// 是否把不支持的实体类型记录为诊断。
    #[serde(default = "DecodeOptions::default_report_unsupported")]
    pub report_unsupported: bool,
    /// 是否同时提取图纸空间（组码 67 = 1）的实体。
    #[serde(default)]
    pub include_paper_space: bool,
    /// 强制使用的回退代码页（例如 `ANSI_936`），设置后忽略文件头中的 `$DWGCODEPAGE`。
    #[serde(default)]
    pub fallback_encoding: Option<String>,
}

impl DecodeOptions {
    fn default_report_unsupported() -> bool {
        true
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            report_unsupported: Self::default_report_unsupported(),
            include_paper_space: false,
            fallback_encoding: None,
        }
    }
}

pub trait DrawingLoader {
    fn load(&self, path: &Path) -> Result<Decoded, DecodeError>;
}

#[derive(Debug, Clone, Default)]
pub struct DxfDecoder {
    options: DecodeOptions,
}

impl DxfDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DecodeOptions) -> Self {
        Self { options }
    }

    /// 打开并解码文件。文件句柄只在本次调用内持有。
    pub fn decode_file(&self, path: &Path) -> Result<Decoded, DecodeError> {
        let file = File::open(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => DecodeError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => DecodeError::Read {
                path: path.to_path_buf(),
                source,
            },
        })?;
        info!(path = %path.display(), "开始解码 DXF 文件");
        self.decode_buffered(BufReader::new(file))
    }

    pub fn decode_reader<R: Read>(&self, reader: R) -> Result<Decoded, DecodeError> {
        self.decode_buffered(BufReader::new(reader))
    }

    pub fn decode_str(&self, text: &str) -> Result<Decoded, DecodeError> {
        self.decode_buffered(text.as_bytes())
    }

    fn decode_buffered<R: BufRead>(&self, reader: R) -> Result<Decoded, DecodeError> {
        let forced = self
            .options
            .fallback_encoding
            .as_deref()
            .map(encoding_from_code_page);
        if let Some(encoding) = forced {
            debug!(
                encoding = encoding.map(|e| e.name()).unwrap_or("UTF-8"),
                "使用配置指定的回退编码"
            );
        }

        let tags = TagReader::with_encoding(reader, forced.flatten());
        let section = section::locate_entities(tags, forced.is_none())?;
        let header = section.header().clone();
        assembler::assemble(EntityReconstructor::new(section), header, &self.options)
    }
}

impl DrawingLoader for DxfDecoder {
    fn load(&self, path: &Path) -> Result<Decoded, DecodeError> {
        self.decode_file(path)
    }
}

/// 以默认选项解码文件。
pub fn decode(path: impl AsRef<Path>) -> Result<Decoded, DecodeError> {
    DxfDecoder::new().decode_file(path.as_ref())
}

/// 以默认选项解码内存中的 DXF 文本。
pub fn decode_str(text: &str) -> Result<Decoded, DecodeError> {
    DxfDecoder::new().decode_str(text)
}
