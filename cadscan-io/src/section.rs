use std::io::BufRead;

use serde::Serialize;
use tracing::{debug, warn};

use crate::code_page::{encoding_from_code_page, version_uses_utf8};
use crate::error::DecodeError;
use crate::tokenizer::{Tag, TagReader};

/// HEADER 段中与解码相关的变量。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrawingHeader {
    /// `$ACADVER`，例如 `AC1015`。
    pub acad_version: Option<String>,
    /// `$DWGCODEPAGE`，例如 `ANSI_936`。
    pub code_page: Option<String>,
}

/// ENTITIES 段的组码子流，不含首尾的段标记。
pub struct EntitySection<R> {
    tags: TagReader<R>,
    header: DrawingHeader,
    closed: bool,
}

impl<R> EntitySection<R> {
    pub fn header(&self) -> &DrawingHeader {
        &self.header
    }
}

impl<R: BufRead> Iterator for EntitySection<R> {
    type Item = Result<Tag, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        match self.tags.next() {
            Some(Ok(tag)) if tag.is_marker("ENDSEC") => {
                self.closed = true;
                None
            }
            Some(Ok(tag)) => Some(Ok(tag)),
            Some(Err(err)) => {
                self.closed = true;
                Some(Err(err))
            }
            None => {
                self.closed = true;
                Some(Err(DecodeError::malformed(
                    self.tags.line_number(),
                    "ENTITIES 段未找到 ENDSEC 终止标记",
                )))
            }
        }
    }
}

/// 跳过其余段，定位 ENTITIES 段。
///
/// 经过 HEADER 段时记录 `$ACADVER`/`$DWGCODEPAGE`；`honor_code_page` 为真时
/// 据此切换后续行的回退编码（AC1021 及以上版本固定 UTF-8，不切换）。
pub fn locate_entities<R: BufRead>(
    mut tags: TagReader<R>,
    honor_code_page: bool,
) -> Result<EntitySection<R>, DecodeError> {
    let mut header = DrawingHeader::default();
    let mut pending: Option<Tag> = None;

    loop {
        let tag = match pending.take() {
            Some(tag) => tag,
            None => match tags.next() {
                Some(result) => result?,
                None => return Err(entities_not_found()),
            },
        };
        if tag.is_marker("EOF") {
            return Err(entities_not_found());
        }
        if !tag.is_marker("SECTION") {
            continue;
        }

        let name_tag = match tags.next() {
            Some(result) => result?,
            None => return Err(entities_not_found()),
        };
        if name_tag.code != 2 {
            warn!(
                line = name_tag.line,
                code = name_tag.code,
                "SECTION 之后缺少名称（组码 2），忽略该标记"
            );
            pending = Some(name_tag);
            continue;
        }

        match name_tag.trimmed() {
            "ENTITIES" => {
                debug!(line = name_tag.line, "定位到 ENTITIES 段");
                return Ok(EntitySection {
                    tags,
                    header,
                    closed: false,
                });
            }
            "HEADER" => {
                read_header(&mut tags, &mut header)?;
                if honor_code_page {
                    apply_code_page(&mut tags, &header);
                }
            }
            other => {
                debug!(section = other, "跳过段");
                skip_section(&mut tags)?;
            }
        }
    }
}

fn entities_not_found() -> DecodeError {
    DecodeError::SectionNotFound {
        section: "ENTITIES",
    }
}

fn skip_section<R: BufRead>(tags: &mut TagReader<R>) -> Result<(), DecodeError> {
    for tag in tags.by_ref() {
        if tag?.is_marker("ENDSEC") {
            return Ok(());
        }
    }
    Err(entities_not_found())
}

fn read_header<R: BufRead>(
    tags: &mut TagReader<R>,
    header: &mut DrawingHeader,
) -> Result<(), DecodeError> {
    let mut variable: Option<String> = None;
    for tag in tags.by_ref() {
        let tag = tag?;
        match tag.code {
            0 if tag.is_marker("ENDSEC") => {
                debug!(
                    version = header.acad_version.as_deref().unwrap_or("?"),
                    code_page = header.code_page.as_deref().unwrap_or("?"),
                    "HEADER 段读取完成"
                );
                return Ok(());
            }
            9 => variable = Some(tag.trimmed().to_string()),
            1 if variable.as_deref() == Some("$ACADVER") => {
                header.acad_version = Some(tag.trimmed().to_string());
            }
            3 if variable.as_deref() == Some("$DWGCODEPAGE") => {
                header.code_page = Some(tag.trimmed().to_string());
            }
            _ => {}
        }
    }
    Err(entities_not_found())
}

fn apply_code_page<R: BufRead>(tags: &mut TagReader<R>, header: &DrawingHeader) {
    let Some(code_page) = header.code_page.as_deref() else {
        return;
    };
    if header
        .acad_version
        .as_deref()
        .is_some_and(version_uses_utf8)
    {
        return;
    }
    let encoding = encoding_from_code_page(code_page);
    debug!(
        code_page,
        encoding = encoding.map(|e| e.name()).unwrap_or("UTF-8"),
        "按 $DWGCODEPAGE 切换回退编码"
    );
    tags.set_encoding(encoding);
}
