#![forbid(unsafe_code)]

//! Identifier registry: maps ID attribute values to the element declaring them.

use crate::document::{Document, NodeId};
use solna_core::Error;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct IdRegistry {
    ids: HashMap<String, NodeId>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` to `node`. Re-registering the same pair is a no-op; binding
    /// a value that already names a different node is an error.
    pub fn register(&mut self, value: &str, node: NodeId) -> Result<(), Error> {
        match self.ids.get(value) {
            Some(&existing) if existing == node => Ok(()),
            Some(_) => Err(Error::ReferenceResolution(format!(
                "duplicate ID {value:?}"
            ))),
            None => {
                self.ids.insert(value.to_owned(), node);
                Ok(())
            }
        }
    }

    pub fn lookup(&self, value: &str) -> Option<NodeId> {
        self.ids.get(value).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.ids.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Build a registry from every no-namespace attribute in `attr_names`
    /// found on the elements attached to `doc`.
    pub fn scan(doc: &Document, attr_names: &[&str]) -> Result<Self, Error> {
        let mut reg = Self::new();
        for node in doc.descendants(doc.root()) {
            let Some(elem) = doc.element(node) else {
                continue;
            };
            for attr in &elem.attributes {
                if attr.name.namespace_uri.is_none()
                    && attr_names.contains(&attr.name.local_name.as_str())
                {
                    reg.register(&attr.value, node)?;
                }
            }
        }
        Ok(reg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    #[test]
    fn test_register_same_node_twice() {
        let mut reg = IdRegistry::new();
        reg.register("a", NodeId::new(1)).unwrap();
        reg.register("a", NodeId::new(1)).unwrap();
        assert_eq!(reg.lookup("a"), Some(NodeId::new(1)));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_register_duplicate_rejected() {
        let mut reg = IdRegistry::new();
        reg.register("a", NodeId::new(1)).unwrap();
        let err = reg.register("a", NodeId::new(2)).unwrap_err();
        assert!(matches!(err, Error::ReferenceResolution(_)));
    }

    #[test]
    fn test_scan() {
        let doc = parse(r#"<r Id="one"><c ID="two"/><c id="three"/><c Ref="four"/></r>"#).unwrap();
        let reg = IdRegistry::scan(&doc, &["Id", "ID", "id"]).unwrap();
        assert_eq!(reg.len(), 3);
        assert_eq!(reg.lookup("one"), doc.document_element());
        assert!(reg.lookup("four").is_none());
    }

    #[test]
    fn test_scan_duplicate() {
        let doc = parse(r#"<r><c ID="x"/><c ID="x"/></r>"#).unwrap();
        assert!(IdRegistry::scan(&doc, &["ID"]).is_err());
    }
}
