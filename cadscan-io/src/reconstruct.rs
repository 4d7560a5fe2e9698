use tracing::warn;

use crate::error::DecodeError;
use crate::tokenizer::Tag;

/// 一个实体实例的全部组码（不含起始的 0 组码）。
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntity {
    /// 实体类型名，取自 0 组码的值，例如 `LINE`。
    pub kind: String,
    /// 在 ENTITIES 段中的序号（从 0 开始）。
    pub index: usize,
    /// 0 组码所在行号。
    pub line: usize,
    pub tags: Vec<Tag>,
}

impl RawEntity {
    /// 组码 67 为 1 表示实体位于图纸空间。
    pub fn is_paper_space(&self) -> bool {
        self.tags
            .iter()
            .any(|tag| tag.code == 67 && tag.trimmed() == "1")
    }
}

/// 以 0 组码为边界，把段内组码流切分为实体记录，保持文件顺序。
pub struct EntityReconstructor<I> {
    tags: I,
    pending: Option<Tag>,
    next_index: usize,
    failed: bool,
}

impl<I> EntityReconstructor<I>
where
    I: Iterator<Item = Result<Tag, DecodeError>>,
{
    pub fn new(tags: I) -> Self {
        Self {
            tags,
            pending: None,
            next_index: 0,
            failed: false,
        }
    }

    fn fail(&mut self, err: DecodeError) -> Option<Result<RawEntity, DecodeError>> {
        self.failed = true;
        Some(Err(err))
    }
}

impl<I> Iterator for EntityReconstructor<I>
where
    I: Iterator<Item = Result<Tag, DecodeError>>,
{
    type Item = Result<RawEntity, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let head = loop {
            let tag = match self.pending.take() {
                Some(tag) => tag,
                None => match self.tags.next()? {
                    Ok(tag) => tag,
                    Err(err) => return self.fail(err),
                },
            };
            if tag.code == 0 {
                break tag;
            }
            warn!(
                line = tag.line,
                code = tag.code,
                "实体起始标记之前出现游离组码，已忽略"
            );
        };

        let mut tags = Vec::new();
        loop {
            match self.tags.next() {
                Some(Ok(tag)) if tag.code == 0 => {
                    self.pending = Some(tag);
                    break;
                }
                Some(Ok(tag)) => tags.push(tag),
                Some(Err(err)) => return self.fail(err),
                None => break,
            }
        }

        let index = self.next_index;
        self.next_index += 1;
        Some(Ok(RawEntity {
            kind: head.trimmed().to_string(),
            index,
            line: head.line,
            tags,
        }))
    }
}
