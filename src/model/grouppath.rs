//! Group paths: the dot-separated hierarchy stored in the group record.
//!
//! A literal dot inside a segment is escaped as `\.`; splitting treats
//! a dot preceded by a backslash as part of the segment.

/// A group path such as `Work.Servers` or `Work.example\.com`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupPath(String);

impl GroupPath {
    /// Build a path from unescaped segments.
    pub fn new(segments: &[&str]) -> Self {
        let mut path = GroupPath::default();
        for segment in segments {
            path = path.append(segment);
        }
        path
    }

    /// The escaped textual form stored in the record.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unescaped segments.  An empty path has one empty segment.
    pub fn segments(&self) -> Vec<String> {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = self.0.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\\' if chars.peek() == Some(&'.') => {
                    current.push('.');
                    chars.next();
                }
                '.' => segments.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
        segments.push(current);
        segments
    }

    /// The segment at `index`, or `None` past the end.
    pub fn segment(&self, index: usize) -> Option<String> {
        self.segments().into_iter().nth(index)
    }

    /// The parent path; the root's parent is the root.
    pub fn up(&self) -> GroupPath {
        let mut segments = self.segments();
        segments.pop();
        let refs: Vec<&str> = segments.iter().map(String::as_str).collect();
        GroupPath::new(&refs)
    }

    /// Append one unescaped segment.  Empty segments are not appended.
    pub fn append(&self, segment: &str) -> GroupPath {
        if segment.is_empty() {
            return self.clone();
        }
        let escaped = segment.replace('.', "\\.");
        if self.0.is_empty() {
            GroupPath(escaped)
        } else {
            GroupPath(format!("{}.{}", self.0, escaped))
        }
    }
}

impl From<&str> for GroupPath {
    fn from(text: &str) -> Self {
        GroupPath(text.to_string())
    }
}

impl From<String> for GroupPath {
    fn from(text: String) -> Self {
        GroupPath(text)
    }
}

impl From<GroupPath> for String {
    fn from(path: GroupPath) -> Self {
        path.0
    }
}

impl std::fmt::Display for GroupPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
