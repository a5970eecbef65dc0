// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! The filter description and its compiler.
//!
//! A [Filters] value maps field names to one or more filter clauses; each
//! clause compiles independently to a `field:op`, `field:op:value` or
//! `field:op:[a,b,c]` token, and every token of every clause survives into
//! the output (the server ANDs repeated `filter` parameters). Output is
//! sorted alphabetically for byte-stable requests.

use crate::client::Params;
use crate::fields::Fields;
use itertools::Itertools;
use std::collections::BTreeMap;

/// Operators taking an ordered list operand.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ArrayOperator {
    In,
    NotIn,
}

impl ArrayOperator {
    fn token(self) -> &'static str {
        match self {
            ArrayOperator::In => "in",
            ArrayOperator::NotIn => "!in",
        }
    }
}

/// Operators taking no operand.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UnaryOperator {
    Null,
    NotNull,
    Empty,
}

impl UnaryOperator {
    fn token(self) -> &'static str {
        match self {
            UnaryOperator::Null => "null",
            UnaryOperator::NotNull => "!null",
            UnaryOperator::Empty => "empty",
        }
    }
}

/// Operators taking a single string operand.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ValueOperator {
    Eq,
    NotEq,
    Ne,
    Like,
    NotLike,
    LikePrefix,
    NotLikePrefix,
    LikeSuffix,
    NotLikeSuffix,
    ILike,
    ILikePrefix,
    NotILikePrefix,
    ILikeSuffix,
    NotILikeSuffix,
    Gt,
    Ge,
    Lt,
    Le,
    Token,
    NotToken,
}

impl ValueOperator {
    fn token(self) -> &'static str {
        match self {
            ValueOperator::Eq => "eq",
            ValueOperator::NotEq => "!eq",
            ValueOperator::Ne => "ne",
            ValueOperator::Like => "like",
            ValueOperator::NotLike => "!like",
            ValueOperator::LikePrefix => "$like",
            ValueOperator::NotLikePrefix => "!$like",
            ValueOperator::LikeSuffix => "like$",
            ValueOperator::NotLikeSuffix => "!like$",
            ValueOperator::ILike => "ilike",
            ValueOperator::ILikePrefix => "$ilike",
            ValueOperator::NotILikePrefix => "!$ilike",
            ValueOperator::ILikeSuffix => "ilike$",
            ValueOperator::NotILikeSuffix => "!ilike$",
            ValueOperator::Gt => "gt",
            ValueOperator::Ge => "ge",
            ValueOperator::Lt => "lt",
            ValueOperator::Le => "le",
            ValueOperator::Token => "token",
            ValueOperator::NotToken => "!token",
        }
    }
}

/// One filter clause. The three operator families have distinct encodings
/// and distinct emptiness rules.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    /// `field:op:[a,b,c]`.
    Array(ArrayOperator, Vec<String>),
    /// `field:op`, operand-free.
    Unary(UnaryOperator),
    /// `field:op:value`; omitted entirely when the operand is absent or the
    /// empty string.
    Value(ValueOperator, Option<String>),
}

impl Filter {
    pub fn in_<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter::Array(
            ArrayOperator::In,
            values.into_iter().map(Into::into).collect(),
        )
    }

    pub fn not_in<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter::Array(
            ArrayOperator::NotIn,
            values.into_iter().map(Into::into).collect(),
        )
    }

    pub fn null() -> Self {
        Filter::Unary(UnaryOperator::Null)
    }

    pub fn not_null() -> Self {
        Filter::Unary(UnaryOperator::NotNull)
    }

    pub fn empty() -> Self {
        Filter::Unary(UnaryOperator::Empty)
    }

    pub fn eq(value: impl Into<String>) -> Self {
        Filter::Value(ValueOperator::Eq, Some(value.into()))
    }

    pub fn ne(value: impl Into<String>) -> Self {
        Filter::Value(ValueOperator::Ne, Some(value.into()))
    }

    pub fn like(value: impl Into<String>) -> Self {
        Filter::Value(ValueOperator::Like, Some(value.into()))
    }

    pub fn ilike(value: impl Into<String>) -> Self {
        Filter::Value(ValueOperator::ILike, Some(value.into()))
    }

    pub fn gt(value: impl Into<String>) -> Self {
        Filter::Value(ValueOperator::Gt, Some(value.into()))
    }

    pub fn ge(value: impl Into<String>) -> Self {
        Filter::Value(ValueOperator::Ge, Some(value.into()))
    }

    pub fn lt(value: impl Into<String>) -> Self {
        Filter::Value(ValueOperator::Lt, Some(value.into()))
    }

    pub fn le(value: impl Into<String>) -> Self {
        Filter::Value(ValueOperator::Le, Some(value.into()))
    }

    pub fn token(value: impl Into<String>) -> Self {
        Filter::Value(ValueOperator::Token, Some(value.into()))
    }

    fn compile(&self, field: &str) -> Option<String> {
        match self {
            Filter::Array(op, values) => {
                Some(format!("{}:{}:[{}]", field, op.token(), values.join(",")))
            }
            Filter::Unary(op) => Some(format!("{}:{}", field, op.token())),
            Filter::Value(_, None) => None,
            Filter::Value(op, Some(value)) => {
                if value.is_empty() {
                    None
                } else {
                    Some(format!("{}:{}:{}", field, op.token(), value))
                }
            }
        }
    }
}

/// A mapping from field name to filter clauses. Repeated clauses on one
/// field all survive compilation (AND semantics at the transport level).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filters(BTreeMap<String, Vec<Filter>>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Add a clause for `field`, keeping any clauses already present.
    pub fn with(mut self, field: impl Into<String>, filter: Filter) -> Self {
        self.0.entry(field.into()).or_default().push(filter);
        self
    }

    /// Compile every clause into `filter` parameter values, alphabetically
    /// sorted, dropping clauses whose emptiness rules leave nothing to send.
    pub fn compile(&self) -> Vec<String> {
        self.0
            .iter()
            .flat_map(|(field, clauses)| {
                clauses.iter().filter_map(move |clause| clause.compile(field))
            })
            .sorted()
            .collect()
    }
}

/// The `fields`/`filter` query parameters for one request, optionally
/// namespaced by a model name (`dataElements:fields=...`) for endpoints
/// carrying several selections at once.
pub fn fields_filter_params(
    model: Option<&str>,
    fields: Option<&Fields>,
    filters: Option<&Filters>,
) -> Params {
    let key = |name: &str| match model {
        Some(model) => format!("{}:{}", model, name),
        None => name.to_string(),
    };

    let mut params = Params::new();
    if let Some(fields) = fields {
        let compiled = fields.compile();
        if !compiled.is_empty() {
            params.push(key("fields"), compiled);
        }
    }
    if let Some(filters) = filters {
        let compiled = filters.compile();
        if !compiled.is_empty() {
            params.push(key("filter"), compiled);
        }
    }
    params
}
