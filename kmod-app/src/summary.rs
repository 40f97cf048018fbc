use kmod_core::geometry::Bounds2D;
use kmod_core::node::Node;
use kmod_core::value::AttrValue;
use kmod_engine::AttributeEngine;
use kmod_io::Footprint;
use tracing::debug;

/// 逐条打印的图元与焊盘条目。
const INSPECTED_TAGS: [&str; 7] = [
    "fp_line",
    "fp_arc",
    "fp_circle",
    "fp_rect",
    "fp_poly",
    "fp_text",
    "pad",
];

const INSPECTED_KEYS: [&str; 8] = [
    "layer", "at", "size", "start", "mid", "end", "stroke", "effects",
];

const HEADER_KEYS: [&str; 4] = ["version", "generator_version", "descr", "tags"];

/// 汇总封装的属性转换结果，每个条目一行。
pub fn render_footprint(engine: &AttributeEngine, footprint: &Footprint) -> Vec<String> {
    let mut lines = vec![format!("封装：{}", footprint.name)];
    for key in HEADER_KEYS {
        if let Some(value) = engine.get_attribute(&footprint.entries, key) {
            lines.push(format!("  {key} = {}", describe(&value)));
        }
    }

    let mut inspected = 0usize;
    for entry in &footprint.entries {
        let Some(tag) = entry.tag().filter(|tag| INSPECTED_TAGS.contains(tag)) else {
            continue;
        };
        inspected += 1;
        lines.push(format!("  - {tag}: {}", describe_entry(engine, entry.args())));
    }
    debug!(name = %footprint.name, inspected, "封装汇总完成");
    lines
}

fn describe_entry(engine: &AttributeEngine, args: &[Node]) -> String {
    let mut fields: Vec<String> = INSPECTED_KEYS
        .iter()
        .filter_map(|key| {
            engine
                .get_attribute(args, key)
                .map(|value| format!("{key}={}", describe(&value)))
        })
        .collect();

    if let Some(pts) = engine.get_attribute(args, "pts") {
        let points = pts.as_points().unwrap_or_default();
        fields.push(format!("pts={} 点", points.len()));
        if let Some(bounds) = Bounds2D::from_points(points) {
            fields.push(format!(
                "范围=({:.3}, {:.3})-({:.3}, {:.3})",
                bounds.min().x(),
                bounds.min().y(),
                bounds.max().x(),
                bounds.max().y()
            ));
        }
    }

    if fields.is_empty() {
        "（无可识别属性）".to_string()
    } else {
        fields.join(", ")
    }
}

pub fn describe(value: &AttrValue) -> String {
    match value {
        AttrValue::Number(number) => number.to_string(),
        AttrValue::Numbers(numbers) => {
            let items: Vec<String> = numbers.iter().map(f64::to_string).collect();
            format!("[{}]", items.join(", "))
        }
        AttrValue::Points(points) => format!("{} 点", points.len()),
        AttrValue::Map(map) => {
            let items: Vec<String> = map
                .iter()
                .map(|(key, value)| format!("{key}: {}", describe(value)))
                .collect();
            format!("{{{}}}", items.join(", "))
        }
        AttrValue::Text(text) => format!("\"{text}\""),
        AttrValue::Texts(texts) => {
            let items: Vec<String> = texts.iter().map(|text| format!("\"{text}\"")).collect();
            format!("[{}]", items.join(", "))
        }
        AttrValue::Raw(nodes) => {
            let items: Vec<String> = nodes.iter().map(render_node).collect();
            items.join(" ")
        }
    }
}

fn render_node(node: &Node) -> String {
    match node {
        Node::Scalar(token) => token.clone(),
        Node::List(items) => {
            let items: Vec<String> = items.iter().map(render_node).collect();
            format!("({})", items.join(" "))
        }
    }
}
