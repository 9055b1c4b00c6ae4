//! 派生路径模型
//!
//! 路径分量：普通索引 / 硬化索引 / 范围占位符 `{idx}`。
//! 路径模板最多一个占位符，且只能在末尾；绑定具体索引后得到 `ResolvedPath`。

use std::fmt;
use std::str::FromStr;

use crate::error::PathError;

/// 最大索引 2^31 - 1
pub const MAX_INDEX: u32 = 0x7FFF_FFFF;

/// BIP32 硬化标志位
pub const HARDENED_FLAG: u32 = 0x8000_0000;

/// 范围占位符的文本形式
pub const RANGE_TOKEN: &str = "{idx}";

/// 路径分量
///
/// 派生的 `Ord` 按 (硬化标志, 数值) 排序：同数值的硬化与非硬化分量是不同的地址。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathComponent {
    Index(u32),
    HardenedIndex(u32),
    RangePlaceholder,
}

impl PathComponent {
    pub fn index(value: u32) -> Result<Self, PathError> {
        check_range(value)?;
        Ok(PathComponent::Index(value))
    }

    pub fn hardened(value: u32) -> Result<Self, PathError> {
        check_range(value)?;
        Ok(PathComponent::HardenedIndex(value))
    }

    /// 数值部分（占位符为 None）
    pub fn value(&self) -> Option<u32> {
        match self {
            PathComponent::Index(v) | PathComponent::HardenedIndex(v) => Some(*v),
            PathComponent::RangePlaceholder => None,
        }
    }

    pub fn is_hardened(&self) -> bool {
        matches!(self, PathComponent::HardenedIndex(_))
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, PathComponent::RangePlaceholder)
    }

    /// 同硬化属性、替换数值
    pub fn with_value(&self, value: u32) -> Result<Self, PathError> {
        match self {
            PathComponent::HardenedIndex(_) => PathComponent::hardened(value),
            _ => PathComponent::index(value),
        }
    }
}

impl fmt::Display for PathComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathComponent::Index(v) => write!(f, "{}", v),
            PathComponent::HardenedIndex(v) => write!(f, "{}'", v),
            PathComponent::RangePlaceholder => f.write_str(RANGE_TOKEN),
        }
    }
}

fn check_range(value: u32) -> Result<(), PathError> {
    if value > MAX_INDEX {
        return Err(PathError::InvalidIndex(value.to_string()));
    }
    Ok(())
}

/// 解析单个索引分量
///
/// 末尾的 `'`（或 `h` / `H`）表示硬化。空串、非数字、超出 2^31-1 均返回 `InvalidIndex`。
pub fn parse_index(text: &str) -> Result<PathComponent, PathError> {
    let (digits, hardened) = match text.strip_suffix(|c: char| matches!(c, '\'' | 'h' | 'H')) {
        Some(rest) => (rest, true),
        None => (text, false),
    };

    // u32::from_str 接受前导 '+'，这里只允许纯数字
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PathError::InvalidIndex(text.to_string()));
    }

    let value: u32 = digits
        .parse()
        .map_err(|_| PathError::InvalidIndex(text.to_string()))?;
    if value > MAX_INDEX {
        return Err(PathError::InvalidIndex(text.to_string()));
    }

    Ok(if hardened {
        PathComponent::HardenedIndex(value)
    } else {
        PathComponent::Index(value)
    })
}

/// 解析分量，允许 `{idx}` 占位符
pub fn parse_component(text: &str) -> Result<PathComponent, PathError> {
    if text == RANGE_TOKEN {
        Ok(PathComponent::RangePlaceholder)
    } else {
        parse_index(text)
    }
}

fn validate_components(components: &[PathComponent]) -> Result<(), PathError> {
    if components.is_empty() {
        return Err(PathError::MalformedPath(
            "path must have at least one component".to_string(),
        ));
    }

    let placeholders = components.iter().filter(|c| c.is_placeholder()).count();
    if placeholders > 1 {
        return Err(PathError::MalformedPath(format!(
            "{} ranging placeholders, at most one allowed",
            placeholders
        )));
    }
    if placeholders == 1 && !components[components.len() - 1].is_placeholder() {
        return Err(PathError::MalformedPath(
            "ranging placeholder must be the final component".to_string(),
        ));
    }

    for component in components {
        if let Some(value) = component.value() {
            check_range(value)?;
        }
    }
    Ok(())
}

fn split_path(text: &str) -> Vec<&str> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("m/")
        .or_else(|| if trimmed == "m" { Some("") } else { None })
        .unwrap_or(trimmed);
    if body.is_empty() {
        Vec::new()
    } else {
        body.split('/').collect()
    }
}

fn write_path(f: &mut fmt::Formatter<'_>, components: &[PathComponent]) -> fmt::Result {
    f.write_str("m")?;
    for component in components {
        write!(f, "/{}", component)?;
    }
    Ok(())
}

/// 路径模板（固定根 `m`，可含一个末尾占位符）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathTemplate {
    components: Vec<PathComponent>,
}

impl PathTemplate {
    pub fn new(components: Vec<PathComponent>) -> Result<Self, PathError> {
        validate_components(&components)?;
        Ok(Self { components })
    }

    pub fn components(&self) -> &[PathComponent] {
        &self.components
    }

    pub fn depth(&self) -> usize {
        self.components.len()
    }

    /// 是否含范围占位符
    pub fn is_ranging(&self) -> bool {
        self.components
            .last()
            .map(PathComponent::is_placeholder)
            .unwrap_or(false)
    }

    /// 将占位符绑定到具体索引
    pub fn bind(&self, index: u32) -> Result<ResolvedPath, PathError> {
        if !self.is_ranging() {
            return Err(PathError::MalformedPath(format!(
                "{} has no ranging placeholder",
                self
            )));
        }
        let tail = PathComponent::index(index)?;
        let mut components = self.components.clone();
        let last = components.len() - 1;
        components[last] = tail;
        ResolvedPath::new(components)
    }

    /// 无占位符的模板直接解析为单一路径
    pub fn resolve(&self) -> Result<ResolvedPath, PathError> {
        if self.is_ranging() {
            return Err(PathError::MalformedPath(format!(
                "{} still contains a ranging placeholder",
                self
            )));
        }
        ResolvedPath::new(self.components.clone())
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_path(f, &self.components)
    }
}

impl FromStr for PathTemplate {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let components = split_path(s)
            .into_iter()
            .map(parse_component)
            .collect::<Result<Vec<_>, _>>()?;
        PathTemplate::new(components)
    }
}

/// 已解析路径：不含占位符，可直接用于一次派生
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedPath {
    components: Vec<PathComponent>,
}

impl ResolvedPath {
    pub fn new(components: Vec<PathComponent>) -> Result<Self, PathError> {
        validate_components(&components)?;
        if components.iter().any(PathComponent::is_placeholder) {
            return Err(PathError::MalformedPath(
                "resolved path cannot contain a ranging placeholder".to_string(),
            ));
        }
        Ok(Self { components })
    }

    pub fn components(&self) -> &[PathComponent] {
        &self.components
    }

    pub fn last(&self) -> PathComponent {
        // new() 保证非空
        self.components[self.components.len() - 1]
    }

    /// 替换末尾分量的数值（保留硬化属性）
    pub fn with_last_value(&self, value: u32) -> Result<Self, PathError> {
        let mut components = self.components.clone();
        let last = components.len() - 1;
        components[last] = components[last].with_value(value)?;
        Ok(Self { components })
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_path(f, &self.components)
    }
}

impl FromStr for ResolvedPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let components = split_path(s)
            .into_iter()
            .map(parse_index)
            .collect::<Result<Vec<_>, _>>()?;
        ResolvedPath::new(components)
    }
}
