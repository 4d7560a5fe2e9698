use std::io::{self, BufRead};

use encoding_rs::Encoding;

use crate::error::DecodeError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const BINARY_SENTINEL: &[u8] = b"AutoCAD Binary DXF";

/// 一个组码/值对。`line` 为组码所在的物理行号（从 1 开始）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub code: i32,
    pub value: String,
    pub line: usize,
}

impl Tag {
    pub fn new(code: i32, value: impl Into<String>, line: usize) -> Self {
        Self {
            code,
            value: value.into(),
            line,
        }
    }

    #[inline]
    pub fn trimmed(&self) -> &str {
        self.value.trim()
    }

    /// 判断是否为 `(0, name)` 形式的结构标记，例如 `SECTION`、`ENDSEC`。
    #[inline]
    pub fn is_marker(&self, name: &str) -> bool {
        self.code == 0 && self.trimmed() == name
    }
}

/// 逐行读取 ASCII DXF 的组码/值对。
///
/// 惰性、单次遍历：每次 `next` 只读取两行。遇到第一个错误后迭代结束。
pub struct TagReader<R> {
    reader: R,
    buffer: Vec<u8>,
    line_number: usize,
    encoding: Option<&'static Encoding>,
    /// 上一行以 `\r` 结束，下一个 `\n` 属于同一个换行符。
    skip_lf: bool,
    finished: bool,
}

impl<R: BufRead> TagReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            line_number: 0,
            encoding: None,
            skip_lf: false,
            finished: false,
        }
    }

    pub fn with_encoding(reader: R, encoding: Option<&'static Encoding>) -> Self {
        let mut tags = Self::new(reader);
        tags.encoding = encoding;
        tags
    }

    /// 设置非 UTF-8 行的回退编码；`None` 表示按 Latin-1 逐字节映射。
    pub fn set_encoding(&mut self, encoding: Option<&'static Encoding>) {
        self.encoding = encoding;
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// 读取一行原始字节到 `buffer`，不含换行符。`\n`、`\r\n` 与单独的 `\r` 都视为换行。
    fn read_raw_line(&mut self) -> io::Result<bool> {
        self.buffer.clear();
        let mut read_any = false;
        loop {
            let available = self.reader.fill_buf()?;
            if available.is_empty() {
                return Ok(read_any);
            }
            if self.skip_lf {
                self.skip_lf = false;
                if available[0] == b'\n' {
                    self.reader.consume(1);
                    continue;
                }
            }
            read_any = true;
            match available.iter().position(|&b| b == b'\n' || b == b'\r') {
                Some(pos) => {
                    self.buffer.extend_from_slice(&available[..pos]);
                    self.skip_lf = available[pos] == b'\r';
                    self.reader.consume(pos + 1);
                    return Ok(true);
                }
                None => {
                    let len = available.len();
                    self.buffer.extend_from_slice(available);
                    self.reader.consume(len);
                }
            }
        }
    }

    fn read_line(&mut self) -> Result<Option<String>, DecodeError> {
        if !self.read_raw_line()? {
            return Ok(None);
        }
        self.line_number += 1;

        let mut bytes: &[u8] = &self.buffer;
        if self.line_number == 1 {
            if bytes.starts_with(BINARY_SENTINEL) {
                return Err(DecodeError::UnsupportedFormat(
                    "二进制 DXF 暂不支持，仅支持 ASCII 组码格式".to_string(),
                ));
            }
            if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
                bytes = rest;
            }
        }

        let line = match std::str::from_utf8(bytes) {
            Ok(text) => text.to_owned(),
            Err(_) => match self.encoding {
                Some(encoding) => encoding.decode_without_bom_handling(bytes).0.into_owned(),
                None => bytes.iter().map(|&b| b as char).collect(),
            },
        };
        Ok(Some(line))
    }

    fn read_tag(&mut self) -> Result<Option<Tag>, DecodeError> {
        let code_line = match self.read_line()? {
            Some(line) => line,
            None => return Ok(None),
        };
        let line = self.line_number;
        let code = code_line.trim().parse::<i32>().map_err(|_| {
            DecodeError::malformed(
                line,
                format!("组码 \"{}\" 无法解析为整数", code_line.trim()),
            )
        })?;
        let value = self.read_line()?.ok_or_else(|| {
            DecodeError::malformed(line, format!("文件在组码 {code} 之后结束，缺少对应的值行"))
        })?;
        Ok(Some(Tag { code, value, line }))
    }
}

impl<R: BufRead> Iterator for TagReader<R> {
    type Item = Result<Tag, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_tag() {
            Ok(Some(tag)) => Some(Ok(tag)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}
