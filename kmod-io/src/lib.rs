use std::fs;
use std::iter::Peekable;
use std::path::Path;
use std::str::Chars;

use kmod_core::node::Node;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid document structure: {0}")]
    InvalidDocument(String),
}

pub trait FootprintLoader {
    fn load(&self, path: &Path) -> Result<Footprint, IoError>;
}

/// `.kicad_mod` 文件加载入口。
pub struct KicadModFacade;

impl KicadModFacade {
    pub fn new() -> Self {
        Self
    }
}

impl Default for KicadModFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl FootprintLoader for KicadModFacade {
    fn load(&self, path: &Path) -> Result<Footprint, IoError> {
        let data = fs::read_to_string(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let footprint = parse_footprint(&data)?;
        info!(
            path = %path.display(),
            name = %footprint.name,
            entries = footprint.entries.len(),
            "已读取封装"
        );
        Ok(footprint)
    }
}

/// 封装根节点：名称及其后的全部子条目（`layer`、`fp_line`、`pad` 等）。
#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    pub name: String,
    pub entries: Vec<Node>,
}

impl Footprint {
    /// 接受 `(footprint "name" ...)` 以及旧版本的 `(module name ...)`。
    pub fn from_node(root: Node) -> Result<Self, IoError> {
        let Node::List(mut items) = root else {
            return Err(IoError::InvalidDocument("根节点必须是列表".to_string()));
        };
        match items.first().and_then(Node::as_scalar) {
            Some("footprint") | Some("module") => {}
            Some(other) => {
                return Err(IoError::UnsupportedFeature(format!(
                    "暂不支持的根节点 {other}"
                )));
            }
            None => return Err(IoError::InvalidDocument("根节点缺少标签".to_string())),
        }
        if items.len() < 2 {
            return Err(IoError::InvalidDocument("封装缺少名称".to_string()));
        }
        let mut rest = items.split_off(1).into_iter();
        let name = match rest.next() {
            Some(Node::Scalar(name)) => name,
            _ => return Err(IoError::InvalidDocument("封装名称必须是原子记号".to_string())),
        };
        Ok(Self {
            name,
            entries: rest.collect(),
        })
    }

    /// 标签为 `tag` 的全部子条目。
    pub fn entries_tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.entries
            .iter()
            .filter(move |entry| entry.tag() == Some(tag))
    }
}

/// 解析 `.kicad_mod` 文本。
pub fn parse_footprint(source: &str) -> Result<Footprint, IoError> {
    Footprint::from_node(parse_sexpr(source)?)
}

/// 将 S 表达式文本解析为单个根节点。
pub fn parse_sexpr(source: &str) -> Result<Node, IoError> {
    SexprParser::new(source)
        .parse()
        .map_err(|err| IoError::InvalidDocument(err.message))
}

#[derive(Debug)]
struct SexprError {
    message: String,
}

impl SexprError {
    fn invalid(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Open,
    Close,
    Atom(String),
}

struct SexprParser<'a> {
    reader: SexprReader<'a>,
}

impl<'a> SexprParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            reader: SexprReader::new(source),
        }
    }

    fn parse(mut self) -> Result<Node, SexprError> {
        let mut stack: Vec<Vec<Node>> = Vec::new();
        let mut root: Option<Node> = None;

        while let Some(token) = self.reader.next_token()? {
            match token {
                Token::Open => {
                    if root.is_some() && stack.is_empty() {
                        return Err(SexprError::invalid(format!(
                            "第 {} 行：根节点之后仍有内容",
                            self.reader.line
                        )));
                    }
                    stack.push(Vec::new());
                }
                Token::Close => {
                    let items = stack.pop().ok_or_else(|| {
                        SexprError::invalid(format!("第 {} 行出现多余的右括号", self.reader.line))
                    })?;
                    let node = Node::List(items);
                    match stack.last_mut() {
                        Some(parent) => parent.push(node),
                        None => root = Some(node),
                    }
                }
                Token::Atom(value) => match stack.last_mut() {
                    Some(parent) => parent.push(Node::Scalar(value)),
                    None => {
                        return Err(SexprError::invalid(format!(
                            "第 {} 行：记号 \"{value}\" 不在任何列表内",
                            self.reader.line
                        )));
                    }
                },
            }
        }

        if !stack.is_empty() {
            return Err(SexprError::invalid(format!(
                "文件在第 {} 行结束，仍有 {} 个列表未闭合",
                self.reader.line,
                stack.len()
            )));
        }
        let root = root.ok_or_else(|| SexprError::invalid("文档为空"))?;
        debug!(line_count = self.reader.line, "S 表达式解析完成");
        Ok(root)
    }
}

struct SexprReader<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> SexprReader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, SexprError> {
        self.skip_whitespace();
        let Some(ch) = self.chars.next() else {
            return Ok(None);
        };
        match ch {
            '(' => Ok(Some(Token::Open)),
            ')' => Ok(Some(Token::Close)),
            '"' => self.read_quoted().map(|value| Some(Token::Atom(value))),
            first => Ok(Some(Token::Atom(self.read_bare(first)))),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if !ch.is_whitespace() {
                break;
            }
            if ch == '\n' {
                self.line += 1;
            }
            self.chars.next();
        }
    }

    fn read_quoted(&mut self) -> Result<String, SexprError> {
        let start_line = self.line;
        let mut value = String::new();
        loop {
            match self.chars.next() {
                Some('"') => return Ok(value),
                Some('\\') => match self.chars.next() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(other) => value.push(other),
                    None => break,
                },
                Some(ch) => {
                    if ch == '\n' {
                        self.line += 1;
                    }
                    value.push(ch);
                }
                None => break,
            }
        }
        Err(SexprError::invalid(format!(
            "第 {start_line} 行开始的字符串缺少结束引号"
        )))
    }

    fn read_bare(&mut self, first: char) -> String {
        let mut value = String::from(first);
        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' {
                break;
            }
            value.push(ch);
            self.chars.next();
        }
        value
    }
}
