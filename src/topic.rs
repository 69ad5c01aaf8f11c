//! topic 和 topic filter 模型
//! topic 是发布消息使用的具体路径，filter 是订阅使用的匹配模式（可含通配符）

use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Empty topic filter")]
    EmptyFilter,
    #[error("Multi-level wildcard must be the whole last level: {0}")]
    InvalidMultiWildcard(String),
    #[error("Single-level wildcard must be a whole level: {0}")]
    InvalidSingleWildcard(String),
}

/// topic 是否可以用于 publish
/// 不可以为空，不可以含有通配符，$ 开头的 topic 保留给 broker 自己
pub fn valid_topic(topic: &str) -> bool {
    !topic.is_empty()
        && !topic.starts_with('$')
        && !topic.contains('+')
        && !topic.contains('#')
}

/// 订阅的 filter 的每一层
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Level {
    Concrete(String),
    SingleWildcard,
    MultiWildcard,
}

impl Level {
    fn parse(path: &str) -> Result<Self, Error> {
        match path {
            "+" => Ok(Level::SingleWildcard),
            "#" => Ok(Level::MultiWildcard),
            s if s.contains('+') => Err(Error::InvalidSingleWildcard(s.into())),
            s if s.contains('#') => Err(Error::InvalidMultiWildcard(s.into())),
            s => Ok(Level::Concrete(s.into())),
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            Level::Concrete(s) => path == s,
            Level::SingleWildcard | Level::MultiWildcard => true,
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        match self {
            Level::Concrete(s) => s,
            Level::SingleWildcard => "+",
            Level::MultiWildcard => "#",
        }
    }
}

/// 解析好的订阅 filter
/// 相等性按解析后的层级比较，而不是原始字符串
/// 序列化成原始字符串，反序列化时重新走 parse 校验
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TopicFilter {
    path: String,
    levels: Vec<Level>,
}

impl TopicFilter {
    /// 解析并校验一个 filter
    ///
    /// * 不可以订阅空 filter
    /// * `#` 只能单独出现在最后一层
    /// * `+` 只能单独占一层
    pub fn parse(path: &str) -> Result<Self, Error> {
        if path.is_empty() {
            return Err(Error::EmptyFilter);
        }

        let mut levels = Vec::new();
        for entry in path.split('/') {
            let level = Level::parse(entry)?;
            // # 字符只能在最后一层
            if let Some(Level::MultiWildcard) = levels.last() {
                return Err(Error::InvalidMultiWildcard(path.into()));
            }
            levels.push(level);
        }

        Ok(Self {
            path: path.into(),
            levels,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// filter 是否含有通配符
    pub fn has_wildcards(&self) -> bool {
        self.levels
            .iter()
            .any(|l| !matches!(l, Level::Concrete(_)))
    }

    pub(crate) fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// 匹配发布消息使用的 topic
    ///
    /// * `#` 匹配所有子级，也匹配父级本身（`a/#` 匹配 `a`）
    /// * `+` 匹配且只匹配一层
    /// * 以 `$` 开头的 topic 不可以被通配符开头的 filter 匹配
    pub fn matches(&self, topic: &str) -> bool {
        if topic.starts_with('$') && !matches!(self.levels.first(), Some(Level::Concrete(_))) {
            return false;
        }

        let mut topics = topic.split('/');
        for level in &self.levels {
            if let Level::MultiWildcard = level {
                return true;
            }
            match topics.next() {
                Some(t) if level.matches(t) => continue,
                // 不匹配，或者 topic 层级不够了
                _ => return false,
            }
        }

        // filter 层级不够了
        topics.next().is_none()
    }
}

impl PartialEq for TopicFilter {
    fn eq(&self, other: &Self) -> bool {
        self.levels == other.levels
    }
}

impl Eq for TopicFilter {}

impl std::hash::Hash for TopicFilter {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.levels.hash(state);
    }
}

impl fmt::Display for TopicFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl std::str::FromStr for TopicFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TopicFilter {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<TopicFilter> for String {
    fn from(filter: TopicFilter) -> Self {
        filter.path
    }
}
