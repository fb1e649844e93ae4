//! Name sanitization
//!
//! Maps a rendered path component to a name that is safe to hand to the
//! kernel and to the tools that browse the mount.

/// Characters replaced by default
pub const DEFAULT_FORBIDDEN: &str = "<>|:\\?*'\"";

/// Default replacement character
pub const DEFAULT_REPLACEMENT: char = '_';

/// Characters that can never appear in a component regardless of configuration
const ALWAYS_FORBIDDEN: [char; 2] = ['/', '\0'];

/// Replaces forbidden characters in path components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitizer {
    forbidden: Vec<char>,
    replacement: char,
}

impl Sanitizer {
    pub fn new(forbidden: impl IntoIterator<Item = char>, replacement: char) -> Self {
        let mut forbidden: Vec<char> = forbidden.into_iter().collect();
        forbidden.extend(ALWAYS_FORBIDDEN);
        forbidden.sort_unstable();
        forbidden.dedup();
        Self {
            forbidden,
            replacement,
        }
    }

    pub fn replacement(&self) -> char {
        self.replacement
    }

    pub fn is_forbidden(&self, c: char) -> bool {
        self.forbidden.binary_search(&c).is_ok()
    }

    /// Replace every forbidden character in `name`.
    ///
    /// The names `.` and `..` are rewritten in full since the kernel gives them
    /// their own meaning.
    pub fn sanitize(&self, name: &str) -> String {
        if name == "." || name == ".." {
            return std::iter::repeat(self.replacement)
                .take(name.len())
                .collect();
        }
        name.chars()
            .map(|c| if self.is_forbidden(c) { self.replacement } else { c })
            .collect()
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(DEFAULT_FORBIDDEN.chars(), DEFAULT_REPLACEMENT)
    }
}
