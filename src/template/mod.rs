//! `{name}` placeholder handling for SQL templates.
//!
//! A placeholder is a well-formed `{identifier}` anywhere in the text,
//! including string literals, bracketed identifiers and comments. `{{` and
//! `}}` produce literal braces. A brace that does not open a well-formed
//! `{identifier}` (such as the ODBC escape `{fn NOW()}`) is copied through
//! unchanged.
//!
//! Every placeholder needs a value. How it is replaced depends on where it
//! sits and on the [`SubstitutionMode`]:
//!
//! | site | `Bind` | `Literal` |
//! |---|---|---|
//! | plain SQL | `@Pn` | value text |
//! | `'{name}'`, `N'{name}'` | whole literal becomes `@Pn` | value text inside the quotes |
//! | part of a longer literal or identifier | `TemplateError` | value text |
//! | comment | left as written | value text |

mod parsers;
mod scanner;

use parsers::{
    is_block_comment_end, is_block_comment_start, is_escaped_brace, is_line_comment_start,
};
use scanner::{Site, State, literal_start, scan_placeholder, scan_quoted_placeholder};

use crate::error::SqlFileError;
use crate::types::{RowValues, SqlParams};

/// How template parameters reach the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubstitutionMode {
    /// Each placeholder becomes a driver parameter (`@P1`, `@P2`, ...).
    #[default]
    Bind,
    /// Values are pasted into the SQL text without quoting or escaping.
    ///
    /// Anyone who controls a parameter value controls the statement.
    Literal,
}

/// SQL text plus its driver parameters, ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    pub sql: String,
    pub params: Vec<RowValues>,
}

/// Raw text of a SQL file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlTemplate {
    text: String,
}

impl SqlTemplate {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Distinct placeholder names in order of first appearance.
    #[must_use]
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        let _ = walk(&self.text, |name, _| {
            if !names.contains(&name) {
                names.push(name);
            }
            Ok(None)
        });
        names
    }

    /// Replace placeholders with `@P<n>` and collect the values to bind.
    ///
    /// Numbering follows first appearance; a repeated name reuses its number.
    /// A literal that is exactly `'{name}'` is bound as a whole. Placeholders
    /// in comments must have a value but are left in place.
    ///
    /// # Errors
    /// - `SqlFileError::MissingParameter` for the first placeholder with no
    ///   entry in `params`
    /// - `SqlFileError::TemplateError` for a placeholder embedded in a longer
    ///   string literal or in a quoted identifier, which cannot be bound
    pub fn bind(&self, params: &SqlParams) -> Result<BoundQuery, SqlFileError> {
        let mut names: Vec<&str> = Vec::new();
        let mut values = Vec::new();
        let sql = walk(&self.text, |name, site| {
            let value = lookup(params, name)?;
            match site {
                Site::Code | Site::QuotedValue => {}
                Site::Comment => return Ok(None),
                Site::Quoted => {
                    return Err(SqlFileError::TemplateError(format!(
                        "{{{name}}} is inside a string literal and cannot be bound; \
                         write '...' + {{{name}}} + '...' or use literal substitution"
                    )));
                }
                Site::Identifier => {
                    return Err(SqlFileError::TemplateError(format!(
                        "{{{name}}} is inside a quoted identifier and cannot be bound; \
                         use literal substitution"
                    )));
                }
            }
            let position = match names.iter().position(|n| *n == name) {
                Some(pos) => pos,
                None => {
                    names.push(name);
                    values.push(value.clone());
                    names.len() - 1
                }
            };
            Ok(Some(format!("@P{}", position + 1)))
        })?;
        Ok(BoundQuery {
            sql,
            params: values,
        })
    }

    /// Paste each value's plain text form over its placeholder, wherever it
    /// appears.
    ///
    /// # Errors
    /// Returns `SqlFileError::MissingParameter` for the first placeholder with
    /// no entry in `params`.
    pub fn render(&self, params: &SqlParams) -> Result<String, SqlFileError> {
        walk(&self.text, |name, site| {
            let value = lookup(params, name)?;
            if site == Site::QuotedValue {
                // substituted inside the quotes on the next visit
                return Ok(None);
            }
            Ok(Some(value.to_string()))
        })
    }

    /// # Errors
    /// Same as [`SqlTemplate::bind`] or [`SqlTemplate::render`] for `mode`.
    pub fn prepare(
        &self,
        params: &SqlParams,
        mode: SubstitutionMode,
    ) -> Result<BoundQuery, SqlFileError> {
        match mode {
            SubstitutionMode::Bind => self.bind(params),
            SubstitutionMode::Literal => Ok(BoundQuery {
                sql: self.render(params)?,
                params: Vec::new(),
            }),
        }
    }
}

fn lookup<'p>(params: &'p SqlParams, name: &str) -> Result<&'p RowValues, SqlFileError> {
    params
        .get(name)
        .ok_or_else(|| SqlFileError::MissingParameter(name.to_string()))
}

/// Copy `sql`, asking `on_placeholder` about each placeholder. `Some` replaces
/// it, `None` leaves the text alone. A `'{name}'` literal is first offered as
/// [`Site::QuotedValue`]; on `None` its inside is visited again as
/// [`Site::Quoted`].
fn walk<'a, F>(sql: &'a str, mut on_placeholder: F) -> Result<String, SqlFileError>
where
    F: FnMut(&'a str, Site) -> Result<Option<String>, SqlFileError>,
{
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut state = State::Normal;
    let mut copied = 0;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];

        if is_escaped_brace(bytes, idx) {
            out.push_str(&sql[copied..=idx]);
            idx += 2;
            copied = idx;
            continue;
        }
        if b == b'{' {
            if let Some((end, name)) = scan_placeholder(bytes, idx) {
                if let Some(replacement) = on_placeholder(name, state.site())? {
                    out.push_str(&sql[copied..idx]);
                    out.push_str(&replacement);
                    copied = end + 1;
                }
                idx = end + 1;
                continue;
            }
        }

        match state {
            State::Normal => match b {
                b'\'' => {
                    if let Some((close, name)) = scan_quoted_placeholder(bytes, idx) {
                        if let Some(replacement) = on_placeholder(name, Site::QuotedValue)? {
                            out.push_str(&sql[copied..literal_start(bytes, idx, copied)]);
                            out.push_str(&replacement);
                            idx = close + 1;
                            copied = idx;
                            continue;
                        }
                    }
                    state = State::SingleQuoted;
                }
                b'"' => state = State::DoubleQuoted,
                b'[' => state = State::Bracketed,
                _ if is_line_comment_start(bytes, idx) => {
                    state = State::LineComment;
                    idx += 1;
                }
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::Bracketed => {
                if b == b']' {
                    if bytes.get(idx + 1) == Some(&b']') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
        }
        idx += 1;
    }

    out.push_str(&sql[copied..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SqlParams {
        SqlParams::new().with("id", 5).with("name", "alice")
    }

    #[test]
    fn renders_integer_literally() {
        let t = SqlTemplate::new("SELECT * FROM t WHERE id = {id}");
        assert_eq!(
            t.render(&SqlParams::new().with("id", 5)).unwrap(),
            "SELECT * FROM t WHERE id = 5"
        );
    }

    #[test]
    fn binds_in_order_of_first_use() {
        let t = SqlTemplate::new("SELECT * FROM t WHERE name = {name} AND id = {id} OR id > {id}");
        let bound = t.bind(&params()).unwrap();
        assert_eq!(
            bound.sql,
            "SELECT * FROM t WHERE name = @P1 AND id = @P2 OR id > @P2"
        );
        assert_eq!(
            bound.params,
            vec![RowValues::Text("alice".into()), RowValues::Int(5)]
        );
    }

    #[test]
    fn missing_placeholder_is_reported_by_name() {
        let t = SqlTemplate::new("SELECT {missing}");
        let err = t.bind(&params()).unwrap_err();
        assert!(matches!(err, SqlFileError::MissingParameter(ref n) if n == "missing"));
        assert!(matches!(
            t.render(&params()),
            Err(SqlFileError::MissingParameter(_))
        ));
    }

    #[test]
    fn unused_params_are_ignored() {
        let t = SqlTemplate::new("SELECT 1");
        let bound = t.bind(&params()).unwrap();
        assert_eq!(bound.sql, "SELECT 1");
        assert!(bound.params.is_empty());
    }

    #[test]
    fn quoted_value_is_bound_as_a_whole() {
        let t = SqlTemplate::new("SELECT * FROM t WHERE name = '{name}' OR alias = N'{name}'");
        let bound = t.bind(&params()).unwrap();
        assert_eq!(bound.sql, "SELECT * FROM t WHERE name = @P1 OR alias = @P1");
        assert_eq!(bound.params, vec![RowValues::Text("alice".into())]);
    }

    #[test]
    fn quoted_value_is_rendered_inside_its_quotes() {
        let t = SqlTemplate::new("SELECT * FROM t WHERE name = '{name}'");
        assert_eq!(
            t.render(&params()).unwrap(),
            "SELECT * FROM t WHERE name = 'alice'"
        );
    }

    #[test]
    fn quoted_placeholder_without_value_is_missing() {
        let t = SqlTemplate::new("SELECT * FROM t WHERE name = '{name}'");
        for mode in [SubstitutionMode::Bind, SubstitutionMode::Literal] {
            let err = t.prepare(&SqlParams::new(), mode).unwrap_err();
            assert!(matches!(err, SqlFileError::MissingParameter(ref n) if n == "name"));
        }
    }

    #[test]
    fn embedded_placeholders_need_literal_mode() {
        let t = SqlTemplate::new("SELECT * FROM t WHERE name LIKE '%{name}%'");
        assert!(matches!(t.bind(&params()), Err(SqlFileError::TemplateError(_))));
        assert_eq!(
            t.render(&params()).unwrap(),
            "SELECT * FROM t WHERE name LIKE '%alice%'"
        );

        let t = SqlTemplate::new("SELECT * FROM [{name}]");
        assert!(matches!(t.bind(&params()), Err(SqlFileError::TemplateError(_))));
        assert_eq!(t.render(&params()).unwrap(), "SELECT * FROM [alice]");
    }

    #[test]
    fn comments_are_checked_but_not_bound() {
        let sql = "-- by {id}\n/* {name} /* {id} */ */ SELECT a FROM t WHERE a = {id}";
        let t = SqlTemplate::new(sql);
        assert_eq!(t.placeholders(), vec!["id", "name"]);
        let bound = t.bind(&params()).unwrap();
        assert_eq!(
            bound.sql,
            "-- by {id}\n/* {name} /* {id} */ */ SELECT a FROM t WHERE a = @P1"
        );
        assert_eq!(bound.params, vec![RowValues::Int(5)]);
        assert_eq!(
            t.render(&params()).unwrap(),
            "-- by 5\n/* alice /* 5 */ */ SELECT a FROM t WHERE a = 5"
        );

        let err = SqlTemplate::new("SELECT 1 -- {missing}")
            .bind(&params())
            .unwrap_err();
        assert!(matches!(err, SqlFileError::MissingParameter(ref n) if n == "missing"));
    }

    #[test]
    fn quote_tracking_survives_escaped_quotes() {
        let t = SqlTemplate::new("SELECT 'it''s', '{id}''' AS x, {id}");
        assert!(matches!(t.bind(&params()), Err(SqlFileError::TemplateError(_))));
        assert_eq!(t.render(&params()).unwrap(), "SELECT 'it''s', '5''' AS x, 5");
    }

    #[test]
    fn escaped_braces_and_odbc_escapes() {
        let t = SqlTemplate::new(r#"SELECT {fn NOW()}, '{{x}}', '{"a": 1}', {{id}} , {id}"#);
        assert_eq!(
            t.render(&params()).unwrap(),
            r#"SELECT {fn NOW()}, '{x}', '{"a": 1}', {id} , 5"#
        );
        assert_eq!(
            t.bind(&params()).unwrap().sql,
            r#"SELECT {fn NOW()}, '{x}', '{"a": 1}', {id} , @P1"#
        );
    }

    #[test]
    fn keeps_non_ascii_text() {
        let t = SqlTemplate::new("SELECT N'café' AS ñ, {name}");
        assert_eq!(t.render(&params()).unwrap(), "SELECT N'café' AS ñ, alice");
    }

    #[test]
    fn literal_mode_has_no_driver_params() {
        let t = SqlTemplate::new("SELECT {id}");
        let bound = t.prepare(&params(), SubstitutionMode::Literal).unwrap();
        assert_eq!(bound.sql, "SELECT 5");
        assert!(bound.params.is_empty());
    }
}
