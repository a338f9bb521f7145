use std::sync::OnceLock;

use regex::Regex;

use crate::error::ReconcileError;

/// Elements that never take a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "input", "base", "link", "meta", "hr", "br", "wbr", "source", "img", "embed", "track", "area", "col",
];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    Comment,
    Cdata,
    Declaration,
    Processing,
    Opening,
    Closing,
}

/// A literal holding exactly one tag-like construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flow {
    pub kind: FlowKind,
    /// Lower-cased tag name, for opening and closing tags only.
    pub tag: Option<String>,
}

impl Flow {
    fn bare(kind: FlowKind) -> Self {
        Self { kind, tag: None }
    }

    pub fn is_opening(&self, tag: &str) -> bool {
        self.kind == FlowKind::Opening && self.tag.as_deref() == Some(tag)
    }

    pub fn is_closing(&self, tag: &str) -> bool {
        self.kind == FlowKind::Closing && self.tag.as_deref() == Some(tag)
    }
}

/// True when the literal is a single `<...>` construct: it starts with `<`,
/// ends with `>` and holds no other angle brackets.
pub fn is_flow(value: &str) -> bool {
    value.starts_with('<')
        && value.ends_with('>')
        && value.matches('<').count() == 1
        && value.matches('>').count() == 1
}

/// Classifies an HTML literal. `Ok(None)` means it is not a flow literal and
/// should be left alone.
///
/// A flow literal that looks like a tag but has no readable tag name fails
/// with [`ReconcileError::MalformedFragment`] (without a position; callers
/// attach one).
pub fn classify(value: &str) -> Result<Option<Flow>, ReconcileError> {
    if !is_flow(value) {
        return Ok(None);
    }
    let flow = if value.starts_with("<!--") {
        Flow::bare(FlowKind::Comment)
    } else if value.starts_with("<![CDATA[") {
        Flow::bare(FlowKind::Cdata)
    } else if value.starts_with("<!") {
        Flow::bare(FlowKind::Declaration)
    } else if value.starts_with("<?") {
        Flow::bare(FlowKind::Processing)
    } else {
        let kind = if value[1..].starts_with('/') {
            FlowKind::Closing
        } else {
            FlowKind::Opening
        };
        let tag = tag_name(value).ok_or_else(|| ReconcileError::MalformedFragment {
            value: value.to_string(),
            position: None,
        })?;
        Flow { kind, tag: Some(tag) }
    };
    Ok(Some(flow))
}

fn tag_name(value: &str) -> Option<String> {
    static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = TAG_REGEX.get_or_init(|| Regex::new(r"^</?([A-Za-z][A-Za-z0-9-]*)[\s/>]").expect("Invalid tag regex"));
    regex
        .captures(value)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
}
