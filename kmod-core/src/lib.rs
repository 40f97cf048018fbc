pub mod geometry {
    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 判定两点重合的距离阈值（毫米），用于抑制分段衔接处的重复点。
    pub const POINT_EPSILON: f64 = 1e-6;

    /// 二维点，内部以 `glam::DVec2` 表示，单位为毫米。
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
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn vector_to(self, other: Point2) -> Vector2 {
            Vector2(other.0 - self.0)
        }

        #[inline]
        pub fn distance(self, other: Point2) -> f64 {
            self.vector_to(other).length()
        }

        /// 两点距离小于 [`POINT_EPSILON`] 时视为同一点。
        #[inline]
        pub fn is_close(self, other: Point2) -> bool {
            self.distance(other) < POINT_EPSILON
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_points(start: Point2, end: Point2) -> Self {
            Self(end.0 - start.0)
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 轴对齐边界框，用于估算多段线范围。
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

        /// 由点序列构造边界框；空序列返回 `None`。
        pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point2>) -> Option<Self> {
            let mut bounds = Self::empty();
            for point in points {
                bounds.include_point(*point);
            }
            if bounds.is_empty() { None } else { Some(bounds) }
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
        pub fn size(&self) -> Vector2 {
            Vector2::from_points(self.min, self.max)
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            let center = (self.min.as_vec2() + self.max.as_vec2()) * 0.5;
            Point2::from_vec(center)
        }
    }
}

pub mod node {
    use serde::{Deserialize, Serialize};

    /// S 表达式树中的节点：原子记号或列表。列表的首元素通常是标签。
    ///
    /// 带引号的字符串在读取阶段已去掉引号，与裸记号一样以 `Scalar` 保存。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum Node {
        Scalar(String),
        List(Vec<Node>),
    }

    impl Node {
        #[inline]
        pub fn scalar(value: impl Into<String>) -> Self {
            Self::Scalar(value.into())
        }

        #[inline]
        pub fn list(items: impl IntoIterator<Item = Node>) -> Self {
            Self::List(items.into_iter().collect())
        }

        #[inline]
        pub fn as_scalar(&self) -> Option<&str> {
            match self {
                Node::Scalar(value) => Some(value),
                Node::List(_) => None,
            }
        }

        #[inline]
        pub fn as_list(&self) -> Option<&[Node]> {
            match self {
                Node::Scalar(_) => None,
                Node::List(items) => Some(items),
            }
        }

        /// 列表首元素的文本；原子或首元素不是原子时返回 `None`。
        pub fn tag(&self) -> Option<&str> {
            self.as_list()
                .and_then(|items| items.first())
                .and_then(Node::as_scalar)
        }

        /// 标签之后的其余元素。
        pub fn args(&self) -> &[Node] {
            match self {
                Node::List(items) if !items.is_empty() => &items[1..],
                _ => &[],
            }
        }

        /// 查找第一个标签为 `tag` 的子列表。
        pub fn find(&self, tag: &str) -> Option<&Node> {
            self.args().iter().find(|child| child.tag() == Some(tag))
        }

        pub fn find_all<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
            self.args().iter().filter(move |child| child.tag() == Some(tag))
        }

        /// 原子按浮点数解析；列表或非数字记号返回 `None`。
        pub fn as_f64(&self) -> Option<f64> {
            self.as_scalar()
                .and_then(|value| value.trim().parse::<f64>().ok())
        }
    }

    impl From<&str> for Node {
        fn from(value: &str) -> Self {
            Self::Scalar(value.to_string())
        }
    }

    impl From<String> for Node {
        fn from(value: String) -> Self {
            Self::Scalar(value)
        }
    }

    impl From<f64> for Node {
        fn from(value: f64) -> Self {
            Self::Scalar(value.to_string())
        }
    }

    impl From<Vec<Node>> for Node {
        fn from(value: Vec<Node>) -> Self {
            Self::List(value)
        }
    }
}

pub mod value {
    use std::collections::BTreeMap;

    use serde::Serialize;

    use crate::geometry::Point2;
    use crate::node::Node;

    pub type AttrMap = BTreeMap<String, AttrValue>;

    /// 属性强制转换后的结果。序列化时不带变体标签，便于与下游模式层对接。
    #[derive(Debug, Clone, PartialEq, Serialize)]
    #[serde(untagged)]
    pub enum AttrValue {
        Number(f64),
        Numbers(Vec<f64>),
        Points(Vec<Point2>),
        Map(AttrMap),
        Text(String),
        Texts(Vec<String>),
        /// 未能识别的形状，原样返回。
        Raw(Vec<Node>),
    }

    impl AttrValue {
        #[inline]
        pub fn as_number(&self) -> Option<f64> {
            match self {
                AttrValue::Number(value) => Some(*value),
                _ => None,
            }
        }

        #[inline]
        pub fn as_numbers(&self) -> Option<&[f64]> {
            match self {
                AttrValue::Numbers(values) => Some(values),
                _ => None,
            }
        }

        #[inline]
        pub fn as_points(&self) -> Option<&[Point2]> {
            match self {
                AttrValue::Points(points) => Some(points),
                _ => None,
            }
        }

        #[inline]
        pub fn as_map(&self) -> Option<&AttrMap> {
            match self {
                AttrValue::Map(map) => Some(map),
                _ => None,
            }
        }

        #[inline]
        pub fn as_text(&self) -> Option<&str> {
            match self {
                AttrValue::Text(text) => Some(text),
                _ => None,
            }
        }

        #[inline]
        pub fn as_texts(&self) -> Option<&[String]> {
            match self {
                AttrValue::Texts(texts) => Some(texts),
                _ => None,
            }
        }

        /// 在 `Map` 中按键取值。
        pub fn get(&self, key: &str) -> Option<&AttrValue> {
            self.as_map().and_then(|map| map.get(key))
        }
    }
}

/// 三点圆弧离散化。
pub mod arc {
    use std::f64::consts::TAU;

    use crate::geometry::{POINT_EPSILON, Point2, Vector2};

    /// 每段弧长的目标值（毫米）。
    pub const ARC_SEGMENT_LENGTH_MM: f64 = 0.1;
    pub const DEFAULT_MIN_SEGMENTS: usize = 8;
    pub const DEFAULT_MAX_SEGMENTS: usize = 64;

    const DETERMINANT_EPSILON: f64 = 1e-9;
    const SWEEP_EPSILON: f64 = 1e-9;
    const DIRECTION_TOLERANCE: f64 = 1e-6;

    /// 分段策略：按弧长折算段数，并限制在 `[min_segments, max_segments]` 内。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct ArcSegmentation {
        segment_length: f64,
        min_segments: usize,
        max_segments: usize,
    }

    impl ArcSegmentation {
        /// 构造分段策略。非正或非有限的段长回退为默认值，最少 1 段，上限不小于下限。
        pub fn new(segment_length: f64, min_segments: usize, max_segments: usize) -> Self {
            let segment_length = if segment_length.is_finite() && segment_length > 0.0 {
                segment_length
            } else {
                ARC_SEGMENT_LENGTH_MM
            };
            let min_segments = min_segments.max(1);
            Self {
                segment_length,
                min_segments,
                max_segments: max_segments.max(min_segments),
            }
        }

        #[inline]
        pub fn segment_length(&self) -> f64 {
            self.segment_length
        }

        #[inline]
        pub fn min_segments(&self) -> usize {
            self.min_segments
        }

        #[inline]
        pub fn max_segments(&self) -> usize {
            self.max_segments
        }

        /// 给定弧长对应的段数。
        pub fn segment_count(&self, arc_length: f64) -> usize {
            let raw = (arc_length / self.segment_length).ceil();
            if !raw.is_finite() || raw < 0.0 {
                return self.min_segments;
            }
            (raw as usize).clamp(self.min_segments, self.max_segments)
        }
    }

    impl Default for ArcSegmentation {
        fn default() -> Self {
            Self::new(
                ARC_SEGMENT_LENGTH_MM,
                DEFAULT_MIN_SEGMENTS,
                DEFAULT_MAX_SEGMENTS,
            )
        }
    }

    /// 经过三点的圆，附带起点角与带符号的扫掠角（逆时针为正）。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct ArcSweep {
        pub center: Point2,
        pub radius: f64,
        pub start_angle: f64,
        pub sweep_angle: f64,
    }

    impl ArcSweep {
        /// 由起点、弧上一点、终点求解圆弧。三点共线、半径过小或扫掠角过小时返回 `None`。
        pub fn from_three_points(start: Point2, mid: Point2, end: Point2) -> Option<Self> {
            let center = circle_center(start, mid, end)?;
            let radius = center.distance(start);
            if radius < POINT_EPSILON {
                return None;
            }

            let start_angle = angle_of(center, start);
            let mid_angle = angle_of(center, mid);
            let end_angle = angle_of(center, end);

            let ccw_start_mid = normalize_angle(mid_angle - start_angle);
            let ccw_mid_end = normalize_angle(end_angle - mid_angle);
            let ccw_start_end = normalize_angle(end_angle - start_angle);

            // 逆时针时两段之和恰为起止夹角，顺时针时多出一整圈。
            let is_ccw = (ccw_start_mid + ccw_mid_end - ccw_start_end).abs() < DIRECTION_TOLERANCE;
            let sweep_angle = if is_ccw {
                ccw_start_end
            } else {
                -normalize_angle(start_angle - end_angle)
            };

            if sweep_angle.abs() < SWEEP_EPSILON {
                return None;
            }

            Some(Self {
                center,
                radius,
                start_angle,
                sweep_angle,
            })
        }

        #[inline]
        pub fn is_counter_clockwise(&self) -> bool {
            self.sweep_angle > 0.0
        }

        #[inline]
        pub fn length(&self) -> f64 {
            self.sweep_angle.abs() * self.radius
        }

        #[inline]
        pub fn point_at(&self, angle: f64) -> Point2 {
            let offset = Vector2::new(self.radius * angle.cos(), self.radius * angle.sin());
            self.center.translate(offset)
        }
    }

    /// 按默认分段策略离散化三点圆弧。
    pub fn tessellate_arc(start: Point2, mid: Point2, end: Point2) -> Vec<Point2> {
        tessellate_arc_with(start, mid, end, &ArcSegmentation::default())
    }

    /// 离散化三点圆弧。退化输入（共线、重合、零半径、零扫掠）回退为 `[start, end]`；
    /// 输出以 `start` 开头，且最后一点严格等于 `end`。
    pub fn tessellate_arc_with(
        start: Point2,
        mid: Point2,
        end: Point2,
        segmentation: &ArcSegmentation,
    ) -> Vec<Point2> {
        let Some(sweep) = ArcSweep::from_three_points(start, mid, end) else {
            return vec![start, end];
        };

        let segments = segmentation.segment_count(sweep.length());
        let mut points = Vec::with_capacity(segments + 1);
        points.push(start);
        for i in 1..=segments {
            let angle = sweep.start_angle + sweep.sweep_angle * (i as f64) / (segments as f64);
            points.push(sweep.point_at(angle));
        }

        // 三角函数往返会累积误差，终点以声明值为准。
        if let Some(last) = points.last_mut() {
            *last = end;
        }
        points
    }

    /// 通过两条中垂线方程求圆心；行列式接近 0（三点共线或重合）时返回 `None`。
    pub fn circle_center(start: Point2, mid: Point2, end: Point2) -> Option<Point2> {
        let (x1, y1) = (start.x(), start.y());
        let (x2, y2) = (mid.x(), mid.y());
        let (x3, y3) = (end.x(), end.y());

        let temp = x2 * x2 + y2 * y2;
        let bc = (x1 * x1 + y1 * y1 - temp) / 2.0;
        let cd = (temp - x3 * x3 - y3 * y3) / 2.0;
        let det = (x1 - x2) * (y2 - y3) - (x2 - x3) * (y1 - y2);

        if det.abs() < DETERMINANT_EPSILON {
            return None;
        }

        let cx = (bc * (y2 - y3) - cd * (y1 - y2)) / det;
        let cy = ((x1 - x2) * cd - (x2 - x3) * bc) / det;
        Some(Point2::new(cx, cy))
    }

    #[inline]
    fn angle_of(center: Point2, point: Point2) -> f64 {
        let v = center.vector_to(point).as_vec2();
        v.y.atan2(v.x)
    }

    #[inline]
    fn normalize_angle(angle: f64) -> f64 {
        let wrapped = angle.rem_euclid(TAU);
        if wrapped >= TAU { 0.0 } else { wrapped }
    }

}
