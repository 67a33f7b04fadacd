//! String Interner - Deduplicate strings to save memory
//!
//! Tag names ("div", "span", "li") and attribute names ("itemprop", "href")
//! are stored once and referenced by ID.

use std::collections::HashMap;

/// Interned string ID - just 4 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct InternedString(pub u32);

impl InternedString {
    /// Empty string
    pub const EMPTY: InternedString = InternedString(0);
}

/// String interner for deduplicating names
#[derive(Debug)]
pub struct StringInterner {
    strings: Vec<Box<str>>,
    map: HashMap<Box<str>, u32>,
}

impl StringInterner {
    /// Create a new string interner with common names pre-interned
    pub fn new() -> Self {
        let mut interner = Self {
            strings: Vec::with_capacity(128),
            map: HashMap::with_capacity(128),
        };

        interner.intern("");

        const COMMON_TAGS: &[&str] = &[
            "html", "head", "body", "base", "title", "div", "span", "p", "a",
            "img", "ul", "ol", "li", "table", "tr", "td", "form", "input",
            "select", "option", "textarea", "button", "template", "meta",
            "link", "time", "audio", "video", "source", "section", "article",
        ];

        const COMMON_ATTRS: &[&str] = &[
            "id", "class", "href", "src", "content", "datetime", "name",
            "value", "type", "checked", "selected", "disabled",
            "itemscope", "itemtype", "itemprop", "itemid", "itemref",
        ];

        for tag in COMMON_TAGS {
            interner.intern(tag);
        }
        for attr in COMMON_ATTRS {
            interner.intern(attr);
        }

        interner
    }

    /// Intern a string, returning its ID.
    /// If the string is already interned, returns the existing ID.
    pub fn intern(&mut self, s: &str) -> InternedString {
        if let Some(&idx) = self.map.get(s) {
            return InternedString(idx);
        }

        let idx = self.strings.len() as u32;
        self.strings.push(s.into());
        self.map.insert(s.into(), idx);
        InternedString(idx)
    }

    /// Look up a string without interning it
    pub fn lookup(&self, s: &str) -> Option<InternedString> {
        self.map.get(s).map(|&idx| InternedString(idx))
    }

    /// Get the string for an interned ID
    #[inline]
    pub fn get(&self, id: InternedString) -> &str {
        self.strings.get(id.0 as usize).map(|s| &**s).unwrap_or("")
    }

    /// Number of interned strings
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Approximate memory used by the interner
    pub fn memory_usage(&self) -> usize {
        let bytes: usize = self.strings.iter().map(|s| s.len() * 2).sum();
        bytes + self.map.capacity() * (std::mem::size_of::<Box<str>>() + std::mem::size_of::<u32>())
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}
