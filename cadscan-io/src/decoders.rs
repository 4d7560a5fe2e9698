use std::fmt;

use cadscan_core::drawing::{Arc, Circle, ColorIndex, Line, Polyline, TextLabel};
use cadscan_core::geometry::Point2;
use serde::Serialize;

use crate::error::EntityError;
use crate::mtext::strip_mtext_formatting;
use crate::reconstruct::RawEntity;
use crate::tokenizer::Tag;

/// 支持解码的实体类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityKind {
    Line,
    Circle,
    Arc,
    LwPolyline,
    Text,
    MText,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Line,
        EntityKind::Circle,
        EntityKind::Arc,
        EntityKind::LwPolyline,
        EntityKind::Text,
        EntityKind::MText,
    ];

    pub fn from_type_name(name: &str) -> Option<Self> {
        match name.trim() {
            "LINE" => Some(Self::Line),
            "CIRCLE" => Some(Self::Circle),
            "ARC" => Some(Self::Arc),
            "LWPOLYLINE" => Some(Self::LwPolyline),
            "TEXT" => Some(Self::Text),
            "MTEXT" => Some(Self::MText),
            _ => None,
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            Self::Line => "LINE",
            Self::Circle => "CIRCLE",
            Self::Arc => "ARC",
            Self::LwPolyline => "LWPOLYLINE",
            Self::Text => "TEXT",
            Self::MText => "MTEXT",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// 单个实体的解码产物，按目标集合区分。
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedEntity {
    Line(Line),
    Circle(Circle),
    Arc(Arc),
    Polyline(Polyline),
    Text(TextLabel),
}

/// 按实体类型分派到对应的解码规则。未知类型返回 `Unsupported`。
pub fn decode_entity(record: &RawEntity) -> Result<DecodedEntity, EntityError> {
    let kind = EntityKind::from_type_name(&record.kind).ok_or_else(|| EntityError::Unsupported {
        kind: record.kind.clone(),
    })?;
    let tags = record.tags.as_slice();
    match kind {
        EntityKind::Line => decode_line(tags).map(DecodedEntity::Line),
        EntityKind::Circle => decode_circle(tags).map(DecodedEntity::Circle),
        EntityKind::Arc => decode_arc(tags).map(DecodedEntity::Arc),
        EntityKind::LwPolyline => decode_lwpolyline(tags).map(DecodedEntity::Polyline),
        EntityKind::Text => decode_text(tags).map(DecodedEntity::Text),
        EntityKind::MText => decode_mtext(tags).map(DecodedEntity::Text),
    }
}

pub fn decode_line(tags: &[Tag]) -> Result<Line, EntityError> {
    const KIND: EntityKind = EntityKind::Line;
    let mut start_x = None;
    let mut start_y = None;
    let mut end_x = None;
    let mut end_y = None;
    let mut color = ColorIndex::BY_LAYER;
    for tag in tags {
        match tag.code {
            10 => assign(&mut start_x, tag, KIND)?,
            20 => assign(&mut start_y, tag, KIND)?,
            11 => assign(&mut end_x, tag, KIND)?,
            21 => assign(&mut end_y, tag, KIND)?,
            62 => color = parse_color(tag, KIND)?,
            _ => {}
        }
    }

    let start = Point2::new(require(start_x, KIND, 10)?, require(start_y, KIND, 20)?);
    let end = Point2::new(require(end_x, KIND, 11)?, require(end_y, KIND, 21)?);
    Ok(Line { start, end, color })
}

pub fn decode_circle(tags: &[Tag]) -> Result<Circle, EntityError> {
    const KIND: EntityKind = EntityKind::Circle;
    let mut center_x = None;
    let mut center_y = None;
    let mut radius = None;
    let mut color = ColorIndex::BY_LAYER;
    for tag in tags {
        match tag.code {
            10 => assign(&mut center_x, tag, KIND)?,
            20 => assign(&mut center_y, tag, KIND)?,
            40 => {
                assign(&mut radius, tag, KIND)?;
                ensure_positive_radius(radius, tag, KIND)?;
            }
            62 => color = parse_color(tag, KIND)?,
            _ => {}
        }
    }

    let center = Point2::new(require(center_x, KIND, 10)?, require(center_y, KIND, 20)?);
    let radius = require(radius, KIND, 40)?;
    Ok(Circle {
        center,
        radius,
        color,
    })
}

/// 角度按原值（角度制）保存，不做归一化。
pub fn decode_arc(tags: &[Tag]) -> Result<Arc, EntityError> {
    const KIND: EntityKind = EntityKind::Arc;
    let mut center_x = None;
    let mut center_y = None;
    let mut radius = None;
    let mut start_angle = None;
    let mut end_angle = None;
    let mut color = ColorIndex::BY_LAYER;
    for tag in tags {
        match tag.code {
            10 => assign(&mut center_x, tag, KIND)?,
            20 => assign(&mut center_y, tag, KIND)?,
            40 => {
                assign(&mut radius, tag, KIND)?;
                ensure_positive_radius(radius, tag, KIND)?;
            }
            50 => assign(&mut start_angle, tag, KIND)?,
            51 => assign(&mut end_angle, tag, KIND)?,
            62 => color = parse_color(tag, KIND)?,
            _ => {}
        }
    }

    let center = Point2::new(require(center_x, KIND, 10)?, require(center_y, KIND, 20)?);
    Ok(Arc {
        center,
        radius: require(radius, KIND, 40)?,
        start_angle: require(start_angle, KIND, 50)?,
        end_angle: require(end_angle, KIND, 51)?,
        color,
    })
}

/// 顶点按 10/20 出现顺序成对累积；组码 70 的第 0 位表示闭合。
pub fn decode_lwpolyline(tags: &[Tag]) -> Result<Polyline, EntityError> {
    const KIND: EntityKind = EntityKind::LwPolyline;
    let mut points = Vec::new();
    let mut pending_x: Option<f64> = None;
    let mut pending_y: Option<f64> = None;
    let mut is_closed = false;
    let mut color = ColorIndex::BY_LAYER;
    for tag in tags {
        match tag.code {
            10 => {
                let x = parse_f64(tag, KIND)?;
                if let Some(y) = pending_y.take() {
                    points.push(Point2::new(x, y));
                } else if pending_x.replace(x).is_some() {
                    // 上一个顶点只有 X 没有 Y
                    return Err(EntityError::Incomplete { kind: KIND, code: 20 });
                }
            }
            20 => {
                let y = parse_f64(tag, KIND)?;
                if let Some(x) = pending_x.take() {
                    points.push(Point2::new(x, y));
                } else if pending_y.replace(y).is_some() {
                    return Err(EntityError::Incomplete { kind: KIND, code: 10 });
                }
            }
            70 => {
                let flags = parse_int(tag, KIND)?;
                is_closed = flags & 0x01 != 0;
            }
            62 => color = parse_color(tag, KIND)?,
            _ => {}
        }
    }

    if pending_x.is_some() {
        return Err(EntityError::Incomplete { kind: KIND, code: 20 });
    }
    if pending_y.is_some() || points.is_empty() {
        return Err(EntityError::Incomplete { kind: KIND, code: 10 });
    }

    Ok(Polyline {
        points,
        is_closed,
        color,
    })
}

/// 单行文字：内容（组码 1）原样保留，缺省为空串。
pub fn decode_text(tags: &[Tag]) -> Result<TextLabel, EntityError> {
    const KIND: EntityKind = EntityKind::Text;
    let mut insert_x = None;
    let mut insert_y = None;
    let mut content = String::new();
    let mut color = ColorIndex::BY_LAYER;
    for tag in tags {
        match tag.code {
            1 => content = tag.value.clone(),
            10 => assign(&mut insert_x, tag, KIND)?,
            20 => assign(&mut insert_y, tag, KIND)?,
            62 => color = parse_color(tag, KIND)?,
            _ => {}
        }
    }

    let insert = Point2::new(require(insert_x, KIND, 10)?, require(insert_y, KIND, 20)?);
    Ok(TextLabel {
        content,
        insert,
        color,
    })
}

/// 多行文字：组码 3（续段）与 1（末段）按出现顺序拼接后去除格式控制符。
///
/// `101 Embedded Object` 之后是 R2018+ 写入的分栏数据，其中的 10/20 等组码不属于实体本身。
pub fn decode_mtext(tags: &[Tag]) -> Result<TextLabel, EntityError> {
    const KIND: EntityKind = EntityKind::MText;
    let mut insert_x = None;
    let mut insert_y = None;
    let mut raw = String::new();
    let mut color = ColorIndex::BY_LAYER;
    for tag in tags {
        match tag.code {
            1 | 3 => raw.push_str(&tag.value),
            10 => assign(&mut insert_x, tag, KIND)?,
            20 => assign(&mut insert_y, tag, KIND)?,
            62 => color = parse_color(tag, KIND)?,
            101 => break,
            _ => {}
        }
    }

    let insert = Point2::new(require(insert_x, KIND, 10)?, require(insert_y, KIND, 20)?);
    Ok(TextLabel {
        content: strip_mtext_formatting(&raw),
        insert,
        color,
    })
}

fn invalid(tag: &Tag, kind: EntityKind) -> EntityError {
    EntityError::InvalidValue {
        kind,
        code: tag.code,
        value: tag.trimmed().to_string(),
    }
}

fn parse_f64(tag: &Tag, kind: EntityKind) -> Result<f64, EntityError> {
    tag.trimmed()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| invalid(tag, kind))
}

fn parse_int(tag: &Tag, kind: EntityKind) -> Result<i32, EntityError> {
    tag.trimmed()
        .parse::<i32>()
        .map_err(|_| invalid(tag, kind))
}

fn parse_color(tag: &Tag, kind: EntityKind) -> Result<ColorIndex, EntityError> {
    tag.trimmed()
        .parse::<i16>()
        .map(ColorIndex::new)
        .map_err(|_| invalid(tag, kind))
}

fn assign(slot: &mut Option<f64>, tag: &Tag, kind: EntityKind) -> Result<(), EntityError> {
    if slot.is_some() {
        return Err(EntityError::Duplicate {
            kind,
            code: tag.code,
        });
    }
    *slot = Some(parse_f64(tag, kind)?);
    Ok(())
}

fn require(slot: Option<f64>, kind: EntityKind, code: i32) -> Result<f64, EntityError> {
    slot.ok_or(EntityError::Incomplete { kind, code })
}

fn ensure_positive_radius(
    radius: Option<f64>,
    tag: &Tag,
    kind: EntityKind,
) -> Result<(), EntityError> {
    match radius {
        Some(value) if value > 0.0 => Ok(()),
        _ => Err(invalid(tag, kind)),
    }
}
