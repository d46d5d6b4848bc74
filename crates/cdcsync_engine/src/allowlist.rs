//! Ordered set of monitored entity names.

/// The names a module monitors, in the order they are enumerated.
///
/// Insertion order is preserved and duplicates are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allowlist {
    names: Vec<String>,
}

impl Allowlist {
    /// Creates an empty allowlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a name at the end. Returns false if it was already present.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.names.push(name);
        true
    }

    /// Removes a name. Returns false if it was not present.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.names.len();
        self.names.retain(|n| n != name);
        self.names.len() != before
    }

    /// Returns true if the name is monitored.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Returns the number of names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if nothing is monitored.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterates names in allowlist order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Allowlist {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut allowlist = Allowlist::new();
        for name in iter {
            allowlist.insert(name);
        }
        allowlist
    }
}

impl<'a> IntoIterator for &'a Allowlist {
    type Item = &'a str;
    type IntoIter = std::iter::Map<std::slice::Iter<'a, String>, fn(&'a String) -> &'a str>;

    fn into_iter(self) -> Self::IntoIter {
        self.names
            .iter()
            .map(String::as_str as fn(&'a String) -> &'a str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_order_and_dedupes() {
        let allowlist: Allowlist = ["WP_DEBUG", "PHP_VERSION", "WP_DEBUG"].into_iter().collect();
        assert_eq!(allowlist.len(), 2);
        assert_eq!(
            allowlist.iter().collect::<Vec<_>>(),
            vec!["WP_DEBUG", "PHP_VERSION"]
        );
    }

    #[test]
    fn insert_and_remove() {
        let mut allowlist = Allowlist::new();
        assert!(allowlist.is_empty());
        assert!(allowlist.insert("A"));
        assert!(!allowlist.insert("A"));
        assert!(allowlist.insert("B"));

        assert!(allowlist.remove("A"));
        assert!(!allowlist.remove("A"));
        assert!(!allowlist.contains("A"));
        assert!(allowlist.contains("B"));
        assert_eq!(allowlist.len(), 1);
    }

    #[test]
    fn borrowed_iteration() {
        let allowlist: Allowlist = ["X", "Y"].into_iter().collect();
        let mut seen = Vec::new();
        for name in &allowlist {
            seen.push(name);
        }
        assert_eq!(seen, vec!["X", "Y"]);
    }
}
