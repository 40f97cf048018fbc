pub mod effects;

pub mod errors {
    use thiserror::Error;

    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum EffectsError {
        #[error("font.size expects 2 values, got {0}")]
        SizeArity(usize),
        #[error("font.{field} must be a finite number")]
        NotFinite { field: String },
        #[error("font.{field} has an unexpected shape")]
        UnexpectedShape { field: String },
    }
}

pub mod attr {
    use kmod_core::arc::{ArcSegmentation, tessellate_arc_with};
    use kmod_core::geometry::Point2;
    use kmod_core::node::Node;
    use kmod_core::value::{AttrMap, AttrValue};
    use once_cell::sync::Lazy;
    use regex::Regex;
    use tracing::{debug, trace, warn};

    use crate::effects::{EffectsValidator, FontEffectsSchema};

    /// 带符号的十进制/科学计数记号，例如 `-1.5`、`.25`、`1e-3`。
    static NUMERIC_TOKEN: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)^[-+]?[0-9]*\.?[0-9]+(e[-+]?[0-9]+)?$").expect("数值记号正则")
    });

    /// 仅由数字和小数点组成的记号。
    static UNSIGNED_DECIMAL: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^[0-9.]+$").expect("无符号小数正则"));

    /// 属性强制转换引擎：根据属性键决定原始节点的语义类型。
    ///
    /// 引擎本身只持有不可变配置，可在多处并发使用。
    #[derive(Debug, Clone)]
    pub struct AttributeEngine<V = FontEffectsSchema> {
        segmentation: ArcSegmentation,
        validator: V,
    }

    impl AttributeEngine {
        pub fn new() -> Self {
            Self::with_validator(ArcSegmentation::default(), FontEffectsSchema)
        }
    }

    impl Default for AttributeEngine {
        fn default() -> Self {
            Self::new()
        }
    }

    impl<V: EffectsValidator> AttributeEngine<V> {
        pub fn with_validator(segmentation: ArcSegmentation, validator: V) -> Self {
            Self {
                segmentation,
                validator,
            }
        }

        /// 替换圆弧分段策略。
        pub fn with_segmentation(mut self, segmentation: ArcSegmentation) -> Self {
            self.segmentation = segmentation;
            self
        }

        /// 在同级条目中查找第一个标签等于 `key` 的列表，并转换其余部分。
        /// 未找到时返回 `None`，与“存在但为空”区分。
        pub fn get_attribute(&self, entries: &[Node], key: &str) -> Option<AttrValue> {
            entries
                .iter()
                .find(|entry| entry.tag() == Some(key))
                .map(|entry| self.coerce(entry.args(), key))
        }

        /// 按属性键转换标签之后的元素。规则按顺序匹配，先命中者生效。
        pub fn coerce(&self, value: &[Node], key: &str) -> AttrValue {
            match (key, value) {
                ("effects", _) => self.coerce_effects(value),
                ("pts", _) => AttrValue::Points(self.coerce_points(value)),
                ("stroke", _) => AttrValue::Map(self.coerce_stroke(value)),
                ("at" | "size" | "start" | "mid" | "end", _) => {
                    AttrValue::Numbers(numeric_tokens(value))
                }
                ("tags", _) => AttrValue::Texts(
                    value
                        .iter()
                        .filter_map(Node::as_scalar)
                        .map(str::to_string)
                        .collect(),
                ),
                ("generator_version" | "version", [first, ..]) => underlying(first),
                (_, [_, _]) => AttrValue::Raw(value.to_vec()),
                ("uuid", [first, ..]) => underlying(first),
                (_, [Node::Scalar(token)]) if UNSIGNED_DECIMAL.is_match(token) => {
                    match leading_decimal(token) {
                        Some(number) => AttrValue::Number(number),
                        None => AttrValue::Text(token.clone()),
                    }
                }
                (_, [single]) => underlying(single),
                (_, items) if items.iter().all(|item| item.as_scalar().is_some()) => {
                    AttrValue::Texts(
                        items
                            .iter()
                            .filter_map(Node::as_scalar)
                            .map(str::to_string)
                            .collect(),
                    )
                }
                _ => AttrValue::Raw(value.to_vec()),
            }
        }

        fn coerce_effects(&self, value: &[Node]) -> AttrValue {
            let mut effects = AttrMap::new();
            for font in value.iter().filter(|entry| entry.tag() == Some("font")) {
                effects.insert("font".to_string(), AttrValue::Map(font_fields(font)));
            }
            match self.validator.validate(effects) {
                Ok(validated) => AttrValue::Map(validated),
                Err(err) => {
                    warn!(error = %err, "effects 校验失败，丢弃 font 字段");
                    AttrValue::Map(AttrMap::new())
                }
            }
        }

        fn coerce_points(&self, value: &[Node]) -> Vec<Point2> {
            let mut points: Vec<Point2> = Vec::new();
            for entry in value {
                match entry.tag() {
                    Some("xy") => match parse_point(entry) {
                        Some(point) => push_point(&mut points, point),
                        None => debug!(?entry, "xy 坐标无法解析，已跳过"),
                    },
                    Some("arc") => {
                        let start = entry.find("start").and_then(parse_point);
                        let mid = entry.find("mid").and_then(parse_point);
                        let end = entry.find("end").and_then(parse_point);
                        let (Some(start), Some(mid), Some(end)) = (start, mid, end) else {
                            debug!(?entry, "arc 缺少 start/mid/end，已跳过");
                            continue;
                        };
                        let arc_points = tessellate_arc_with(start, mid, end, &self.segmentation);
                        if arc_points.len() == 2 {
                            trace!(?start, ?mid, ?end, "圆弧退化为直线段");
                        }
                        for point in arc_points {
                            push_point(&mut points, point);
                        }
                    }
                    other => debug!(tag = ?other, "pts 中无法识别的子项，已跳过"),
                }
            }
            points
        }

        fn coerce_stroke(&self, value: &[Node]) -> AttrMap {
            value
                .iter()
                .filter_map(|entry| {
                    let key = entry.tag()?;
                    Some((key.to_string(), self.coerce(entry.args(), key)))
                })
                .collect()
        }
    }

    /// 使用默认配置的 [`AttributeEngine::get_attribute`]。
    pub fn get_attribute(entries: &[Node], key: &str) -> Option<AttrValue> {
        AttributeEngine::new().get_attribute(entries, key)
    }

    /// 使用默认配置的 [`AttributeEngine::coerce`]。
    pub fn coerce(value: &[Node], key: &str) -> AttrValue {
        AttributeEngine::new().coerce(value, key)
    }

    fn underlying(node: &Node) -> AttrValue {
        match node {
            Node::Scalar(token) => AttrValue::Text(token.clone()),
            Node::List(items) => AttrValue::Raw(items.clone()),
        }
    }

    /// 取纯数字记号的数值前缀，`1.5.3` 读作 `1.5`。
    fn leading_decimal(token: &str) -> Option<f64> {
        let end = token
            .match_indices('.')
            .nth(1)
            .map_or(token.len(), |(index, _)| index);
        token[..end].parse().ok()
    }

    fn numeric_tokens(value: &[Node]) -> Vec<f64> {
        value
            .iter()
            .filter_map(Node::as_scalar)
            .filter(|token| NUMERIC_TOKEN.is_match(token))
            .filter_map(|token| token.parse::<f64>().ok())
            .collect()
    }

    /// font 字段：名称加单个值时为数值（非数字则保留文本），否则为数值列表。
    /// 旧格式的裸标志（如 `bold`）按 `(bold yes)` 记录。
    fn font_fields(font: &Node) -> AttrMap {
        let mut fields = AttrMap::new();
        for field in font.args() {
            match field {
                Node::Scalar(flag) => {
                    fields.insert(flag.clone(), AttrValue::Text("yes".to_string()));
                }
                Node::List(items) => match items.as_slice() {
                    [Node::Scalar(name), single] => {
                        let value = match single {
                            Node::Scalar(token) => match token.parse::<f64>() {
                                Ok(number) => AttrValue::Number(number),
                                Err(_) => AttrValue::Text(token.clone()),
                            },
                            Node::List(nested) => AttrValue::Raw(nested.clone()),
                        };
                        fields.insert(name.clone(), value);
                    }
                    [Node::Scalar(name), rest @ ..] => {
                        let numbers = rest
                            .iter()
                            .map(|node| node.as_f64().unwrap_or(f64::NAN))
                            .collect();
                        fields.insert(name.clone(), AttrValue::Numbers(numbers));
                    }
                    _ => debug!(?field, "font 字段缺少名称，已跳过"),
                },
            }
        }
        fields
    }

    fn parse_point(node: &Node) -> Option<Point2> {
        let args = node.args();
        let x = args.first()?.as_f64().filter(|x| x.is_finite())?;
        let y = args.get(1)?.as_f64().filter(|y| y.is_finite())?;
        Some(Point2::new(x, y))
    }

    fn push_point(points: &mut Vec<Point2>, point: Point2) {
        if points.last().is_some_and(|last| last.is_close(point)) {
            return;
        }
        points.push(point);
    }

}

pub use attr::{AttributeEngine, coerce, get_attribute};
