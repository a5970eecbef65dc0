// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! The field-selection tree and its compiler.
//!
//! A [Fields] value describes which response fields (including nested
//! relations) a query asks the server for. [Fields::compile] turns the tree
//! into the server's comma-separated selector mini-language: bare keys,
//! `key[nested,selection]`, transformer suffixes (`key~rename(x)`,
//! `key~size`), and `:`-prefixed virtual presets. Output is sorted
//! alphabetically, so two logically-equal selections compile to the same
//! string regardless of construction order.

use crate::error::{Error, Result};
use itertools::Itertools;
use std::collections::BTreeMap;

/// The sigil marking a virtual/preset selector before compilation.
pub const PRESET_SIGIL: char = '$';

/// The one preset tracker-style endpoints accept: select everything.
pub const PRESET_ALL: &str = "$all";

/// A serialization directive attached to a key, independent of nesting.
#[derive(Clone, Debug, PartialEq)]
pub enum Transformer {
    /// Emit `key~rename(to)`: the server returns the field under `to`.
    Rename(String),
    /// Emit `key~size`: the server returns the collection's size instead of
    /// its members.
    Size,
}

/// What a selected key maps to.
#[derive(Clone, Debug, PartialEq)]
pub enum Field {
    /// `true` includes the scalar field; `false` omits the key entirely.
    Include(bool),
    /// A nested sub-selection. An empty selection is shorthand for
    /// [Field::Include] `(true)`.
    Select(Fields),
    /// A transformer directive plus the remaining sub-selection.
    Transform(Transformer, Fields),
}

/// A recursive field-selection tree over keys.
///
/// Keys are unique by construction, which is what dedupes the compiled
/// output.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fields(BTreeMap<String, Field>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select everything (`:all`).
    pub fn all() -> Self {
        Self::new().field(PRESET_ALL)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Include a scalar field.
    pub fn field(self, key: impl Into<String>) -> Self {
        self.set(key, Field::Include(true))
    }

    /// Include several scalar fields at once.
    pub fn names<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for key in keys {
            self = self.field(key);
        }
        self
    }

    /// Include a relation with its own sub-selection.
    pub fn nested(self, key: impl Into<String>, fields: Fields) -> Self {
        self.set(key, Field::Select(fields))
    }

    /// Include a field renamed in the response.
    pub fn rename(self, key: impl Into<String>, to: impl Into<String>) -> Self {
        self.set(
            key,
            Field::Transform(Transformer::Rename(to.into()), Fields::new()),
        )
    }

    /// Include the size of a collection field.
    pub fn size(self, key: impl Into<String>) -> Self {
        self.set(key, Field::Transform(Transformer::Size, Fields::new()))
    }

    pub fn set(mut self, key: impl Into<String>, field: Field) -> Self {
        self.0.insert(key.into(), field);
        self
    }

    /// Compile to the server's field-selection string.
    pub fn compile(&self) -> String {
        self.0
            .iter()
            .filter_map(|(key, field)| compile_entry(key, field))
            .sorted()
            .join(",")
    }

    /// Compile for tracker-style endpoints, which support only the
    /// select-everything shorthand among the virtual presets.
    ///
    /// Fails synchronously, naming every offending key, before any network
    /// I/O could happen.
    pub fn compile_strict(&self) -> Result<String> {
        let mut offending = Vec::new();
        self.collect_presets(&mut offending);
        if offending.is_empty() {
            Ok(self.compile())
        } else {
            offending.sort();
            Err(Error::InvalidSelectors { keys: offending })
        }
    }

    fn collect_presets(&self, offending: &mut Vec<String>) {
        for (key, field) in &self.0 {
            if key.starts_with(PRESET_SIGIL) && key != PRESET_ALL {
                offending.push(key.clone());
            }
            match field {
                Field::Select(nested) | Field::Transform(_, nested) => {
                    nested.collect_presets(offending)
                }
                Field::Include(_) => {}
            }
        }
    }
}

fn compile_entry(key: &str, field: &Field) -> Option<String> {
    let (key, field) = match field {
        Field::Transform(transformer, rest) => {
            let rewritten = match transformer {
                Transformer::Rename(to) => format!("{}~rename({})", key, to),
                Transformer::Size => format!("{}~size", key),
            };
            (rewritten, Field::Select(rest.clone()))
        }
        other => (key.to_string(), other.clone()),
    };

    match field {
        Field::Include(false) => None,
        Field::Include(true) => Some(rewrite_preset(&key)),
        Field::Select(nested) if nested.is_empty() => Some(rewrite_preset(&key)),
        Field::Select(nested) => Some(format!("{}[{}]", key, nested.compile())),
        // Transformers were rewritten above.
        Field::Transform(..) => None,
    }
}

// A leading `$` sigil serializes as the server's `:` marker.
fn rewrite_preset(key: &str) -> String {
    match key.strip_prefix(PRESET_SIGIL) {
        Some(rest) => format!(":{}", rest),
        None => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_compile_sorted_and_falsy_keys_vanish() {
        let fields = Fields::new()
            .field("c")
            .field("a")
            .set("b", Field::Include(false));
        assert_eq!(fields.compile(), "a,c");
    }

    #[test]
    fn nested_selections_bracket() {
        let fields = Fields::new().nested("a", Fields::new().names(vec!["c", "b"]));
        assert_eq!(fields.compile(), "a[b,c]");
    }

    #[test]
    fn empty_nested_selection_is_shorthand_for_include() {
        let fields = Fields::new().nested("a", Fields::new());
        assert_eq!(fields.compile(), "a");
    }

    #[test]
    fn rename_transformer() {
        let fields = Fields::new().rename("a", "x");
        assert_eq!(fields.compile(), "a~rename(x)");
    }

    #[test]
    fn size_transformer() {
        let fields = Fields::new().size("organisationUnits");
        assert_eq!(fields.compile(), "organisationUnits~size");
    }

    #[test]
    fn transformer_keeps_remaining_selection() {
        let fields = Fields::new().set(
            "a",
            Field::Transform(
                Transformer::Rename("x".to_string()),
                Fields::new().field("b"),
            ),
        );
        assert_eq!(fields.compile(), "a~rename(x)[b]");
    }

    #[test]
    fn preset_sigil_rewrites_to_colon() {
        assert_eq!(Fields::all().compile(), ":all");
        let fields = Fields::new().field("$owner").field("id");
        assert_eq!(fields.compile(), ":owner,id");
    }

    #[test]
    fn deep_nesting_compiles_recursively() {
        let fields = Fields::new().field("id").nested(
            "organisationUnits",
            Fields::new()
                .field("id")
                .nested("children", Fields::new().field("name")),
        );
        assert_eq!(
            fields.compile(),
            "id,organisationUnits[children[name],id]"
        );
    }

    #[test]
    fn strict_accepts_all_and_rejects_other_presets() {
        assert_eq!(Fields::all().compile_strict().unwrap(), ":all");

        let fields = Fields::new()
            .field("$owner")
            .nested("enrollments", Fields::new().field("$identifiable"));
        let err = fields.compile_strict().unwrap_err();
        match err {
            Error::InvalidSelectors { keys } => {
                assert_eq!(keys, vec!["$identifiable", "$owner"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn compile_is_stable_under_reconstruction() {
        let first = Fields::new().names(vec!["b", "a", "c"]).compile();
        let rebuilt = first
            .split(',')
            .fold(Fields::new(), |fields, key| fields.field(key))
            .compile();
        assert_eq!(first, rebuilt);
    }
}
