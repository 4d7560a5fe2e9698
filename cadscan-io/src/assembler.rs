use cadscan_core::drawing::ExtractionResult;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::DecodeOptions;
use crate::decoders::{DecodedEntity, decode_entity};
use crate::error::{DecodeError, Diagnostic};
use crate::reconstruct::RawEntity;
use crate::section::DrawingHeader;

/// 解码成功的产出：提取结果以及逐实体诊断。
#[derive(Debug, Clone, Default, Serialize)]
pub struct Decoded {
    pub header: DrawingHeader,
    pub result: ExtractionResult,
    pub diagnostics: Vec<Diagnostic>,
}

impl Decoded {
    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// 因字段缺失或取值无效而未能解码的实体数（不含不支持的类型）。
    pub fn failed_entities(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|diagnostic| !diagnostic.error.is_unsupported())
            .count()
    }

    pub fn into_result(self) -> ExtractionResult {
        self.result
    }
}

/// 依附于前一个实体的子记录，不单独报告为不支持的类型。
fn is_subordinate(kind: &str) -> bool {
    matches!(kind, "VERTEX" | "SEQEND" | "ATTRIB")
}

/// 驱动实体记录流，把解码成功的实体放入对应集合，失败的记录为诊断。
///
/// 只有结构性错误（来自分词器或段定位）会中止并返回 `Err`。
pub fn assemble<I>(
    records: I,
    header: DrawingHeader,
    options: &DecodeOptions,
) -> Result<Decoded, DecodeError>
where
    I: Iterator<Item = Result<RawEntity, DecodeError>>,
{
    let mut result = ExtractionResult::new();
    let mut diagnostics = Vec::new();
    let mut paper_space = 0usize;

    for record in records {
        let record = record?;
        if !options.include_paper_space && record.is_paper_space() {
            trace!(index = record.index, kind = %record.kind, "跳过图纸空间实体");
            paper_space += 1;
            continue;
        }

        match decode_entity(&record) {
            Ok(entity) => {
                trace!(index = record.index, kind = %record.kind, "实体解码成功");
                match entity {
                    DecodedEntity::Line(line) => result.lines.push(line),
                    DecodedEntity::Circle(circle) => result.circles.push(circle),
                    DecodedEntity::Arc(arc) => result.arcs.push(arc),
                    DecodedEntity::Polyline(polyline) => result.polylines.push(polyline),
                    DecodedEntity::Text(text) => result.texts.push(text),
                }
            }
            Err(error) if error.is_unsupported() => {
                if !options.report_unsupported || is_subordinate(&record.kind) {
                    continue;
                }
                debug!(index = record.index, kind = %record.kind, "跳过不支持的实体类型");
                diagnostics.push(Diagnostic {
                    index: record.index,
                    line: record.line,
                    entity: record.kind,
                    error,
                });
            }
            Err(error) => {
                let diagnostic = Diagnostic {
                    index: record.index,
                    line: record.line,
                    entity: record.kind,
                    error,
                };
                warn!(%diagnostic, "实体解码失败，已跳过");
                diagnostics.push(diagnostic);
            }
        }
    }

    info!(
        lines = result.lines.len(),
        circles = result.circles.len(),
        arcs = result.arcs.len(),
        polylines = result.polylines.len(),
        texts = result.texts.len(),
        diagnostics = diagnostics.len(),
        paper_space,
        "DXF 实体提取完成"
    );

    Ok(Decoded {
        header,
        result,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoders::EntityKind;
    use crate::error::EntityError;
    use crate::tokenizer::Tag;

    fn record(index: usize, kind: &str, pairs: &[(i32, &str)]) -> Result<RawEntity, DecodeError> {
        Ok(RawEntity {
            kind: kind.to_string(),
            index,
            line: index * 10 + 1,
            tags: pairs
                .iter()
                .map(|(code, value)| Tag::new(*code, *value, 0))
                .collect(),
        })
    }

    fn circle(index: usize, radius: Option<&str>) -> Result<RawEntity, DecodeError> {
        let mut pairs = vec![(10, "0"), (20, "0")];
        if let Some(radius) = radius {
            pairs.push((40, radius));
        }
        record(index, "CIRCLE", &pairs)
    }

    #[test]
    fn failed_entity_does_not_stop_siblings() {
        let records = vec![
            circle(0, Some("1")),
            circle(1, None),
            record(2, "LINE", &[(10, "0"), (20, "0"), (11, "1"), (21, "1")]),
            circle(3, Some("2")),
        ];
        let decoded =
            assemble(records.into_iter(), DrawingHeader::default(), &DecodeOptions::default())
                .expect("decode");
        assert_eq!(decoded.result.circles.len(), 2);
        assert_eq!(decoded.result.lines.len(), 1);
        assert_eq!(decoded.diagnostics.len(), 1);
        let diagnostic = &decoded.diagnostics[0];
        assert_eq!(diagnostic.index, 1);
        assert_eq!(diagnostic.line, 11);
        assert_eq!(
            diagnostic.error,
            EntityError::Incomplete {
                kind: EntityKind::Circle,
                code: 40
            }
        );
        assert_eq!(decoded.failed_entities(), 1);
        assert_eq!(decoded.result.circles[1].radius, 2.0);
    }

    #[test]
    fn unsupported_types_follow_options() {
        let records = || {
            vec![
                record(0, "HATCH", &[]),
                record(1, "POLYLINE", &[]),
                record(2, "VERTEX", &[]),
                record(3, "SEQEND", &[]),
            ]
            .into_iter()
        };
        let reported = assemble(records(), DrawingHeader::default(), &DecodeOptions::default())
            .expect("decode");
        let kinds: Vec<&str> = reported
            .diagnostics
            .iter()
            .map(|d| d.entity.as_str())
            .collect();
        assert_eq!(kinds, ["HATCH", "POLYLINE"]);
        assert_eq!(reported.failed_entities(), 0);

        let quiet = DecodeOptions {
            report_unsupported: false,
            ..DecodeOptions::default()
        };
        let silent = assemble(records(), DrawingHeader::default(), &quiet).expect("decode");
        assert!(!silent.has_diagnostics());
    }

    #[test]
    fn paper_space_entities_are_skipped_by_default() {
        let records = || {
            vec![
                record(0, "CIRCLE", &[(67, "1"), (10, "0"), (20, "0"), (40, "1")]),
                circle(1, Some("3")),
            ]
            .into_iter()
        };
        let model = assemble(records(), DrawingHeader::default(), &DecodeOptions::default())
            .expect("decode");
        assert_eq!(model.result.circles.len(), 1);
        assert_eq!(model.result.circles[0].radius, 3.0);

        let all = DecodeOptions {
            include_paper_space: true,
            ..DecodeOptions::default()
        };
        let both = assemble(records(), DrawingHeader::default(), &all).expect("decode");
        assert_eq!(both.result.circles.len(), 2);
    }

    #[test]
    fn structural_error_discards_partial_result() {
        let records = vec![
            circle(0, Some("1")),
            Err(DecodeError::malformed(9, "组码无法解析")),
        ];
        let err = assemble(records.into_iter(), DrawingHeader::default(), &DecodeOptions::default())
            .unwrap_err();
        assert!(matches!(err, DecodeError::MalformedTag { line: 9, .. }));
    }
}
