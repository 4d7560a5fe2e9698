pub mod geometry {
    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示，序列化为 `[x, y]`。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        /// 以 `angle_deg`（角度制）方向偏移 `distance`，用于圆弧端点计算。
        #[inline]
        pub fn polar(self, distance: f64, angle_deg: f64) -> Self {
            let rad = angle_deg.to_radians();
            Self(self.0 + DVec2::new(rad.cos(), rad.sin()) * distance)
        }
    }

    /// 轴对齐边界框，用于估算提取结果的范围。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        #[inline]
        pub fn width(&self) -> f64 {
            if self.is_empty() {
                0.0
            } else {
                self.max.x() - self.min.x()
            }
        }

        #[inline]
        pub fn height(&self) -> f64 {
            if self.is_empty() {
                0.0
            } else {
                self.max.y() - self.min.y()
            }
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            let center = (self.min.as_vec2() + self.max.as_vec2()) * 0.5;
            Point2::from_vec(center)
        }
    }
}

pub mod drawing {
    use std::fmt;

    use serde::{Deserialize, Serialize};

    use crate::geometry::{Bounds2D, Point2};

    /// AutoCAD 颜色索引（ACI）。解码器只透传原始值，不做图层颜色解析。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ColorIndex(i16);

    impl ColorIndex {
        /// 随块（BYBLOCK）。
        pub const BY_BLOCK: ColorIndex = ColorIndex(0);
        /// 随层（BYLAYER）。组码 62 缺省时使用该值。
        pub const BY_LAYER: ColorIndex = ColorIndex(256);

        #[inline]
        pub fn new(raw: i16) -> Self {
            Self(raw)
        }

        #[inline]
        pub fn raw(self) -> i16 {
            self.0
        }

        #[inline]
        pub fn is_by_layer(self) -> bool {
            self == Self::BY_LAYER
        }

        #[inline]
        pub fn is_by_block(self) -> bool {
            self == Self::BY_BLOCK
        }
    }

    impl Default for ColorIndex {
        fn default() -> Self {
            Self::BY_LAYER
        }
    }

    impl fmt::Display for ColorIndex {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match *self {
                Self::BY_LAYER => write!(f, "BYLAYER"),
                Self::BY_BLOCK => write!(f, "BYBLOCK"),
                ColorIndex(raw) => write!(f, "{raw}"),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point2,
        pub end: Point2,
        pub color: ColorIndex,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point2,
        pub radius: f64,
        pub color: ColorIndex,
    }

    /// 圆弧。角度为角度制，按文件中出现的原始值保存，不做 [0, 360) 归一化。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Arc {
        pub center: Point2,
        pub radius: f64,
        pub start_angle: f64,
        pub end_angle: f64,
        pub color: ColorIndex,
    }

    impl Arc {
        #[inline]
        pub fn start_point(&self) -> Point2 {
            self.center.polar(self.radius, self.start_angle)
        }

        #[inline]
        pub fn end_point(&self) -> Point2 {
            self.center.polar(self.radius, self.end_angle)
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Polyline {
        pub points: Vec<Point2>,
        pub is_closed: bool,
        pub color: ColorIndex,
    }

    /// 文字标签。单行文字（TEXT）内容保持原样；多行文字（MTEXT）已去除格式控制符。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct TextLabel {
        pub content: String,
        pub insert: Point2,
        pub color: ColorIndex,
    }

    /// 一次解码的完整产出：五个互相独立、按文件出现顺序排列的集合。
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct ExtractionResult {
        #[serde(default)]
        pub lines: Vec<Line>,
        #[serde(default)]
        pub circles: Vec<Circle>,
        #[serde(default)]
        pub arcs: Vec<Arc>,
        #[serde(default)]
        pub polylines: Vec<Polyline>,
        #[serde(default)]
        pub texts: Vec<TextLabel>,
    }

    impl ExtractionResult {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn entity_count(&self) -> usize {
            self.lines.len()
                + self.circles.len()
                + self.arcs.len()
                + self.polylines.len()
                + self.texts.len()
        }

        pub fn is_empty(&self) -> bool {
            self.entity_count() == 0
        }

        /// 计算全部实体的 2D 轴对齐范围；文字退化为插入点。
        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            for line in &self.lines {
                bounds.include_point(line.start);
                bounds.include_point(line.end);
            }
            for circle in &self.circles {
                let radius = circle.radius.abs();
                let center = circle.center;
                bounds.include_point(Point2::new(center.x() - radius, center.y() - radius));
                bounds.include_point(Point2::new(center.x() + radius, center.y() + radius));
            }
            for arc in &self.arcs {
                arc_bounds(arc, &mut bounds);
            }
            for polyline in &self.polylines {
                for point in &polyline.points {
                    bounds.include_point(*point);
                }
            }
            for text in &self.texts {
                bounds.include_point(text.insert);
            }
            if bounds.is_empty() { None } else { Some(bounds) }
        }
    }

    fn normalize_degrees(angle: f64) -> f64 {
        let mut result = angle % 360.0;
        if result < 0.0 {
            result += 360.0;
        }
        result
    }

    fn canonical_interval(start: f64, end: f64) -> (f64, f64) {
        let start = normalize_degrees(start);
        let mut end = normalize_degrees(end);
        if (end - start).abs() < 1e-9 {
            end = start + 360.0;
        } else if end < start {
            end += 360.0;
        }
        (start, end)
    }

    fn arc_bounds(arc: &Arc, bounds: &mut Bounds2D) {
        let radius = arc.radius.abs();
        if radius <= f64::EPSILON {
            bounds.include_point(arc.center);
            return;
        }

        let (start, end) = canonical_interval(arc.start_angle, arc.end_angle);
        bounds.include_point(arc.center.polar(radius, start));
        bounds.include_point(arc.center.polar(radius, end));

        const QUADRANTS: [f64; 4] = [0.0, 90.0, 180.0, 270.0];
        for base in QUADRANTS {
            let mut candidate = base;
            while candidate < start {
                candidate += 360.0;
            }
            if candidate <= end {
                bounds.include_point(arc.center.polar(radius, candidate));
            }
        }
    }

}
