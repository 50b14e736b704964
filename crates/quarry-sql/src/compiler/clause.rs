//! Clause validation and rewriting.
//!
//! Clauses are passed through token by token. Keywords and allowed
//! functions are kept, literals are re-quoted, and every other word must
//! name a field of the queried tables; it is replaced by the quoted,
//! table-qualified column. Nothing else is interpreted, except the
//! `HOLDS` operator on list fields.

use std::collections::BTreeSet;

use quarry_common::constants::{
    field_table_name, FIELD_TABLE_ROW_ID, FIELD_TABLE_VALUE, FULL_SUFFIX, ROW_ID_COLUMN,
};
use quarry_common::CompileError;

use super::lexer::{next_significant, tokenize, Token};
use super::scope::{FieldRef, RefKind, Scope, Unresolved};
use crate::ident::{qualified, quote_ident, quote_literal};

/// Keywords a clause may contain.
const KEYWORDS: [&str; 19] = [
    "AND", "OR", "NOT", "LIKE", "GLOB", "IN", "IS", "NULL", "BETWEEN", "ASC", "DESC", "TRUE",
    "FALSE", "CASE", "WHEN", "THEN", "ELSE", "END", "ESCAPE",
];

/// Functions a clause may call.
const FUNCTIONS: [&str; 25] = [
    "COUNT", "SUM", "AVG", "MIN", "MAX", "TOTAL", "GROUP_CONCAT", "CONCAT", "LOWER", "UPPER",
    "LENGTH", "SUBSTR", "SUBSTRING", "TRIM", "LTRIM", "RTRIM", "REPLACE", "INSTR", "ROUND",
    "ABS", "COALESCE", "IFNULL", "NULLIF", "DATE", "STRFTIME",
];

/// Keyword only valid directly after a list field.
const HOLDS: &str = "HOLDS";

/// How one clause is checked.
pub(crate) struct ClauseContext<'a> {
    /// Clause name, as used in error messages.
    pub clause: &'static str,
    pub scope: &'a Scope<'a>,
    /// Output aliases the clause may name, for `group by` and `order by`.
    pub aliases: &'a [String],
    pub allow_holds: bool,
}

/// A rewritten clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Rewritten {
    pub sql: String,
    /// Indices of the tables the clause references.
    pub tables: BTreeSet<usize>,
}

impl ClauseContext<'_> {
    fn invalid(&self, message: impl Into<String>) -> CompileError {
        CompileError::invalid_clause(self.clause, message)
    }

    fn unresolved(&self, reason: Unresolved, name: &str) -> CompileError {
        match (reason, self.clause) {
            (Unresolved::Ambiguous, _) => CompileError::AmbiguousField {
                field: name.to_string(),
            },
            (Unresolved::Unknown, "fields") => CompileError::unknown_field(name),
            (Unresolved::Unknown, _) => self.invalid(format!("unknown field \"{name}\"")),
        }
    }

    /// Validates and rewrites one clause.
    pub(crate) fn rewrite(&self, text: &str) -> Result<Rewritten, CompileError> {
        let tokens = tokenize(text).map_err(|message| self.invalid(message))?;
        let mut out = String::with_capacity(text.len() * 2);
        let mut tables = BTreeSet::new();

        let mut i = 0;
        while i < tokens.len() {
            match &tokens[i] {
                Token::Space => out.push(' '),
                Token::Str(value) => out.push_str(&quote_literal(value)),
                Token::Number(value) => out.push_str(value),
                Token::Symbol(symbol) => out.push_str(symbol),
                Token::Word(word) => {
                    let upper = word.to_ascii_uppercase();
                    let next = next_significant(&tokens, i + 1);
                    let call = tokens.get(next).is_some_and(|t| t.is_symbol("("));
                    if upper == HOLDS {
                        return Err(self.invalid("HOLDS must follow a list field"));
                    } else if !call && self.names_field(&tokens, i) {
                        i = self.field_reference(&tokens, i, &mut out, &mut tables)?;
                        continue;
                    } else if KEYWORDS.contains(&upper.as_str()) {
                        out.push_str(&upper);
                    } else if call {
                        if !FUNCTIONS.contains(&upper.as_str()) {
                            return Err(self.invalid(format!("function \"{word}\" is not allowed")));
                        }
                        out.push_str(&upper);
                    } else if upper == "DISTINCT" && self.clause == "fields" {
                        out.push_str(&upper);
                    } else {
                        i = self.field_reference(&tokens, i, &mut out, &mut tables)?;
                        continue;
                    }
                }
            }
            i += 1;
        }

        Ok(Rewritten {
            sql: out.trim().to_string(),
            tables,
        })
    }

    /// Whether `tokens[i]` starts a reference to a field or output alias.
    /// Fields may be named like keywords, so this is asked first.
    fn names_field(&self, tokens: &[Token], i: usize) -> bool {
        reference_at(tokens, i).is_some_and(|(qualifier, name, _)| {
            self.scope.resolve(qualifier, name).is_ok()
                || (qualifier.is_none() && self.aliases.iter().any(|a| a == name))
        })
    }

    /// Rewrites the reference starting at `tokens[i]`, plus a trailing
    /// `HOLDS` comparison. Returns the index after what was consumed.
    fn field_reference(
        &self,
        tokens: &[Token],
        i: usize,
        out: &mut String,
        tables: &mut BTreeSet<usize>,
    ) -> Result<usize, CompileError> {
        let (qualifier, name, after) = reference_at(tokens, i)
            .ok_or_else(|| self.invalid("expected a field name"))?;

        let field = match self.scope.resolve(qualifier, name) {
            Ok(field) => field,
            Err(Unresolved::Unknown) if qualifier.is_none() && self.aliases.iter().any(|a| a == name) => {
                out.push_str(&quote_ident(name));
                return Ok(after);
            }
            Err(reason) => {
                let written = qualifier.map_or_else(|| name.to_string(), |q| format!("{q}.{name}"));
                return Err(self.unresolved(reason, &written));
            }
        };
        tables.insert(field.table);

        let holds = next_significant(tokens, after);
        if tokens.get(holds).is_some_and(|t| t.is_word(HOLDS)) {
            if !self.allow_holds {
                return Err(self.invalid("HOLDS is not allowed here"));
            }
            return self.holds(tokens, &field, holds + 1, out, tables);
        }

        out.push_str(&self.column_sql(&field));
        Ok(after)
    }

    /// `F HOLDS [NOT] [LIKE] value` becomes a semi-join on F's field table.
    fn holds(
        &self,
        tokens: &[Token],
        field: &FieldRef,
        mut i: usize,
        out: &mut String,
        tables: &mut BTreeSet<usize>,
    ) -> Result<usize, CompileError> {
        if !matches!(field.kind, RefKind::List { .. }) {
            return Err(self.invalid(format!("\"{}\" is not a list field; HOLDS needs one", field.field)));
        }

        let mut negated = false;
        let mut like = false;
        i = next_significant(tokens, i);
        if tokens.get(i).is_some_and(|t| t.is_word("NOT")) {
            negated = true;
            i = next_significant(tokens, i + 1);
        }
        if tokens.get(i).is_some_and(|t| t.is_word("LIKE")) {
            like = true;
            i = next_significant(tokens, i + 1);
        }

        let (value, after) = match tokens.get(i) {
            Some(Token::Str(value)) => (quote_literal(value), i + 1),
            Some(Token::Number(value)) => (value.clone(), i + 1),
            Some(Token::Word(_)) => {
                let (qualifier, name, after) = reference_at(tokens, i)
                    .ok_or_else(|| self.invalid("HOLDS needs a value"))?;
                let other = self
                    .scope
                    .resolve(qualifier, name)
                    .map_err(|reason| self.unresolved(reason, name))?;
                tables.insert(other.table);
                (self.column_sql(&other), after)
            }
            _ => return Err(self.invalid("HOLDS needs a value")),
        };

        let field_table = field_table_name(self.scope.table_name(field.table), &field.field);
        out.push_str(&format!(
            "{} {}IN (SELECT {} FROM {} WHERE {} {} {})",
            qualified(self.scope.effective_name(field.table), ROW_ID_COLUMN),
            if negated { "NOT " } else { "" },
            quote_ident(FIELD_TABLE_ROW_ID),
            quote_ident(&field_table),
            quote_ident(FIELD_TABLE_VALUE),
            if like { "LIKE" } else { "=" },
            value,
        ));
        Ok(after)
    }

    /// Column a reference stands for inside a clause. List and coordinates
    /// fields compare against their full stored value.
    fn column_sql(&self, field: &FieldRef) -> String {
        let table = self.scope.effective_name(field.table);
        match &field.kind {
            RefKind::Column { column, .. } => qualified(table, column),
            RefKind::List { .. } | RefKind::Coordinates { .. } => {
                qualified(table, &format!("{}{FULL_SUFFIX}", field.field))
            }
        }
    }
}

/// Reads `name` or `qualifier.name` at `tokens[i]`.
pub(crate) fn reference_at(tokens: &[Token], i: usize) -> Option<(Option<&str>, &str, usize)> {
    let Some(Token::Word(first)) = tokens.get(i) else {
        return None;
    };
    let dot = next_significant(tokens, i + 1);
    if tokens.get(dot).is_some_and(|t| t.is_symbol(".")) {
        let second = next_significant(tokens, dot + 1);
        if let Some(Token::Word(name)) = tokens.get(second) {
            return Some((Some(first.as_str()), name.as_str(), second + 1));
        }
        return None;
    }
    Some((None, first.as_str(), i + 1))
}
