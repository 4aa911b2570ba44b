//! Tag table mapping wire `$type` tags to expression variants.
//!
//! Several variants may share one tag: `If` and `Choose` are both written as
//! `"Operation"` and told apart by a recognizer over the decoded payload.
//! Resolution tries entries for a tag by descending priority (later
//! registrations first among equal priorities), takes the first whose
//! recognizer accepts the payload, and otherwise falls back to the first
//! entry without a recognizer.

use std::sync::LazyLock;

use crate::ast::{ExprKind, TypeName};

/// Predicate over a decoded wire object.
pub type Recognizer = fn(&serde_json::Value) -> bool;

#[derive(Debug, Clone)]
pub struct TypeEntry {
    pub tag: &'static str,
    pub kind: ExprKind,
    /// Value type an instance of this entry produces (`ANY` if unknown).
    pub type_name: TypeName,
    pub recognizer: Option<Recognizer>,
    pub priority: u8,
}

impl TypeEntry {
    pub fn new(tag: &'static str, kind: ExprKind, type_name: TypeName) -> Self {
        TypeEntry {
            tag,
            kind,
            type_name,
            recognizer: None,
            priority: 0,
        }
    }

    pub fn recognized_by(mut self, recognizer: Recognizer, priority: u8) -> Self {
        self.recognizer = Some(recognizer);
        self.priority = priority;
        self
    }

    fn accepts(&self, raw: &serde_json::Value) -> bool {
        self.recognizer.is_some_and(|recognize| recognize(raw))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<TypeEntry>,
}

static GLOBAL: LazyLock<Registry> = LazyLock::new(Registry::with_defaults);

fn operation_named(raw: &serde_json::Value, expected: &str) -> bool {
    raw.get("name")
        .and_then(serde_json::Value::as_str)
        .is_some_and(|name| name.to_lowercase() == expected)
}

impl Registry {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The table for every built-in node type.
    pub fn with_defaults() -> Self {
        let mut registry = Registry::new();
        registry.register(TypeEntry::new("Empty", ExprKind::Empty, TypeName::NULL));
        registry.register(TypeEntry::new(
            "CriteriaGroup",
            ExprKind::CriteriaGroup,
            TypeName::BOOLEAN,
        ));
        registry.register(TypeEntry::new(
            "Criterion",
            ExprKind::Criterion,
            TypeName::BOOLEAN,
        ));
        registry.register(TypeEntry::new(
            "NestedField",
            ExprKind::NestedField,
            TypeName::ANY,
        ));
        registry.register(TypeEntry::new(
            "Parameter",
            ExprKind::Parameter,
            TypeName::ANY,
        ));
        registry.register(TypeEntry::new(
            "Operation",
            ExprKind::Operation,
            TypeName::ANY,
        ));
        registry.register(
            TypeEntry::new("Operation", ExprKind::If, TypeName::ANY)
                .recognized_by(|raw| operation_named(raw, "if"), 1),
        );
        registry.register(
            TypeEntry::new("Operation", ExprKind::Choose, TypeName::ANY)
                .recognized_by(|raw| operation_named(raw, "choose"), 1),
        );
        registry
    }

    /// The process-wide table, built on first use and read-only afterwards.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    pub fn register(&mut self, entry: TypeEntry) {
        self.entries.push(entry);
    }

    /// Entries for `tag` in resolution order.
    pub fn entries_for<'r>(&'r self, tag: &str) -> Vec<&'r TypeEntry> {
        let mut entries: Vec<&TypeEntry> =
            self.entries.iter().rev().filter(|e| e.tag == tag).collect();
        // stable sort: equal priorities stay last-registered-first
        entries.sort_by(|a, b| b.priority.cmp(&a.priority));
        entries
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.entries.iter().any(|e| e.tag == tag)
    }

    /// Picks the variant for a wire object carrying `tag`.
    pub fn resolve(&self, tag: &str, raw: &serde_json::Value) -> Option<ExprKind> {
        let entries = self.entries_for(tag);
        let matched = entries
            .iter()
            .find(|e| e.accepts(raw))
            .or_else(|| entries.iter().find(|e| e.recognizer.is_none()));
        if matched.is_none() && !entries.is_empty() {
            tracing::debug!(tag, "no registry entry accepted payload");
        }
        matched.map(|e| e.kind)
    }

    /// Variant an operation called `name` should be built as.
    pub fn recognize_operation(&self, name: &str) -> ExprKind {
        let raw = serde_json::json!({ "name": name });
        self.resolve("Operation", &raw).unwrap_or(ExprKind::Operation)
    }

    pub fn entry_of(&self, kind: ExprKind) -> Option<&TypeEntry> {
        self.entries.iter().rev().find(|e| e.kind == kind)
    }

    /// Wire tag written for `kind`.
    pub fn tag_of(&self, kind: ExprKind) -> Option<&'static str> {
        self.entry_of(kind).map(|e| e.tag)
    }

    /// Declared value type of `kind`.
    pub fn type_of(&self, kind: ExprKind) -> TypeName {
        self.entry_of(kind).map(|e| e.type_name).unwrap_or(TypeName::ANY)
    }

    /// Distinct registered variants in registration order.
    pub fn kinds(&self) -> Vec<ExprKind> {
        let mut kinds = Vec::new();
        for entry in &self.entries {
            if !kinds.contains(&entry.kind) {
                kinds.push(entry.kind);
            }
        }
        kinds
    }
}
