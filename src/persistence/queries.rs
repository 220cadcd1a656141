//! Externalized SQL statements.
//!
//! [`QueryCatalog`] is built once at startup from a `.properties` source,
//! either an override file or the bundled PostgreSQL default, and is
//! read-only afterwards. Query text is opaque to the service; positional
//! placeholders are bound by the caller.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::error::StartupError;

/// Bundled PostgreSQL catalog used when no override is configured.
const DEFAULT_QUERIES: &str = include_str!("../../resources/db-queries.properties");

/// Logical name of an externalized statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryName {
    /// Idempotent "create table if not exists" run at startup.
    CreateTable,
    /// Titles of all pages, one text column per row.
    ListPages,
    /// `(id, content)` of the page with the given title.
    GetPage,
    /// Insert `(title, content)`.
    CreatePage,
    /// Update content `$1` of the page with id `$2`.
    SavePage,
    /// Delete the page with id `$1`.
    DeletePage,
}

impl QueryName {
    /// Every query the service requires.
    pub const ALL: [Self; 6] = [
        Self::CreateTable,
        Self::ListPages,
        Self::GetPage,
        Self::CreatePage,
        Self::SavePage,
        Self::DeletePage,
    ];

    /// Key of this query in the `.properties` source.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::CreateTable => "create-pages-table",
            Self::ListPages => "all-pages",
            Self::GetPage => "get-page",
            Self::CreatePage => "create-page",
            Self::SavePage => "save-page",
            Self::DeletePage => "delete-page",
        }
    }
}

impl fmt::Display for QueryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Immutable mapping from [`QueryName`] to statement text.
///
/// Every name has non-empty text once constructed, so [`QueryCatalog::lookup`]
/// cannot fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCatalog {
    create_table: String,
    list_pages: String,
    get_page: String,
    create_page: String,
    save_page: String,
    delete_page: String,
}

impl QueryCatalog {
    /// Loads the catalog from `source_override`, or from the bundled default
    /// when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError::CatalogRead`] if the override cannot be read
    /// and [`StartupError::MissingQuery`] if any required key is absent or
    /// empty.
    pub fn load(source_override: Option<&Path>) -> Result<Self, StartupError> {
        match source_override {
            Some(path) => {
                let text =
                    std::fs::read_to_string(path).map_err(|source| StartupError::CatalogRead {
                        path: path.to_path_buf(),
                        source,
                    })?;
                tracing::info!(path = %path.display(), "loading sql queries from override");
                Self::parse(&text)
            }
            None => Self::parse(DEFAULT_QUERIES),
        }
    }

    /// Builds a catalog from `.properties` text.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError::MissingQuery`] for the first required key
    /// that is absent or empty.
    pub fn parse(text: &str) -> Result<Self, StartupError> {
        let mut properties = parse_properties(text);
        let mut take = |name: QueryName| {
            properties
                .remove(name.key())
                .filter(|q| !q.trim().is_empty())
                .ok_or(StartupError::MissingQuery(name.key()))
        };
        Ok(Self {
            create_table: take(QueryName::CreateTable)?,
            list_pages: take(QueryName::ListPages)?,
            get_page: take(QueryName::GetPage)?,
            create_page: take(QueryName::CreatePage)?,
            save_page: take(QueryName::SavePage)?,
            delete_page: take(QueryName::DeletePage)?,
        })
    }

    /// Returns the statement text for `name`.
    #[must_use]
    pub fn lookup(&self, name: QueryName) -> &str {
        match name {
            QueryName::CreateTable => &self.create_table,
            QueryName::ListPages => &self.list_pages,
            QueryName::GetPage => &self.get_page,
            QueryName::CreatePage => &self.create_page,
            QueryName::SavePage => &self.save_page,
            QueryName::DeletePage => &self.delete_page,
        }
    }
}

/// Parses the subset of the `.properties` format the catalog uses.
///
/// Supports `=`, `:`, or whitespace separators, `#`/`!` comments,
/// trailing-backslash line continuations, and backslash escapes in keys and
/// values (`\t`, `\n`, `\r`, `\f`, `\uXXXX`; any other escaped character
/// stands for itself). Later keys win.
fn parse_properties(text: &str) -> HashMap<String, String> {
    let mut properties = HashMap::new();
    let mut pending = String::new();

    for raw in text.lines() {
        let line = raw.trim_start();
        if pending.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!'))
        {
            continue;
        }

        let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
        if trailing % 2 == 1 {
            pending.push_str(line.strip_suffix('\\').unwrap_or(line));
            continue;
        }
        pending.push_str(line);

        if let Some((key, value)) = split_property(&pending) {
            properties.insert(key, value);
        }
        pending.clear();
    }

    if !pending.is_empty()
        && let Some((key, value)) = split_property(&pending)
    {
        properties.insert(key, value);
    }

    properties
}

/// Splits a logical line at its first unescaped separator and unescapes
/// both halves.
fn split_property(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let mut escaped = false;
    let mut split = line.len();
    for (at, c) in line.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '=' || c == ':' || c.is_whitespace() {
            split = at;
            break;
        }
    }

    let (key, rest) = line.split_at(split);
    let rest = rest.trim_start();
    let value = rest
        .strip_prefix('=')
        .or_else(|| rest.strip_prefix(':'))
        .unwrap_or(rest);
    Some((unescape(key), unescape(value.trim())))
}

/// Resolves backslash escapes.
///
/// A malformed `\u` sequence is kept verbatim.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .and_then(char::from_u32);
                match decoded {
                    Some(ch) => out.push(ch),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::io::Write;

    use super::*;

    const SAMPLE: &str = "\
# comment
! another comment

create-pages-table = create table Pages (Id integer, \\
    Name text)
all-pages: select Name from Pages
get-page select Id, Content from Pages where Name = $1
create-page=insert into Pages (Name, Content) values ($1, $2)
save-page=update Pages set Content = $1 where Id = $2
delete-page=delete from Pages where Id = $1
unused=ignored
";

    #[test]
    fn bundled_default_is_complete() {
        let Ok(catalog) = QueryCatalog::load(None) else {
            panic!("bundled catalog must load");
        };
        for name in QueryName::ALL {
            assert!(!catalog.lookup(name).is_empty(), "{name} is empty");
        }
        assert!(catalog.lookup(QueryName::CreateTable).contains("if not exists"));
    }

    #[test]
    fn parses_separators_and_continuations() {
        let Ok(catalog) = QueryCatalog::parse(SAMPLE) else {
            panic!("sample must parse");
        };
        assert_eq!(
            catalog.lookup(QueryName::CreateTable),
            "create table Pages (Id integer, Name text)"
        );
        assert_eq!(catalog.lookup(QueryName::ListPages), "select Name from Pages");
        assert_eq!(
            catalog.lookup(QueryName::GetPage),
            "select Id, Content from Pages where Name = $1"
        );
        assert_eq!(
            catalog.lookup(QueryName::DeletePage),
            "delete from Pages where Id = $1"
        );
    }

    #[test]
    fn escapes_are_resolved() {
        let text = SAMPLE
            .replace(
                "all-pages: select Name from Pages",
                "all-pages: select Name from Pages where Name like 'a\\\\%' escape '\\\\'",
            )
            .replace(
                "get-page select",
                "get\\-page select \\u0049d, Content\\: from",
            );
        let Ok(catalog) = QueryCatalog::parse(&text) else {
            panic!("escaped sample must parse");
        };
        assert_eq!(
            catalog.lookup(QueryName::ListPages),
            "select Name from Pages where Name like 'a\\%' escape '\\'"
        );
        assert!(
            catalog
                .lookup(QueryName::GetPage)
                .starts_with("select Id, Content: from")
        );
    }

    #[test]
    fn escaped_separator_stays_in_key() {
        let properties = parse_properties("a\\=b\\ c = d\\te\nbad\\u12 = x");
        assert_eq!(properties.get("a=b c").map(String::as_str), Some("d\te"));
        assert_eq!(properties.get("bad\\u12").map(String::as_str), Some("x"));
    }

    #[test]
    fn missing_key_is_fatal() {
        let text = SAMPLE.replace("delete-page=", "remove-page=");
        let result = QueryCatalog::parse(&text);
        assert!(matches!(
            result,
            Err(StartupError::MissingQuery("delete-page"))
        ));
    }

    #[test]
    fn empty_value_is_fatal() {
        let text = SAMPLE.replace(
            "all-pages: select Name from Pages",
            "all-pages:   ",
        );
        let result = QueryCatalog::parse(&text);
        assert!(matches!(result, Err(StartupError::MissingQuery("all-pages"))));
    }

    #[test]
    fn override_file_is_used() {
        let Ok(mut file) = tempfile::NamedTempFile::new() else {
            panic!("temp file");
        };
        let Ok(()) = file.write_all(SAMPLE.as_bytes()) else {
            panic!("write temp file");
        };
        let Ok(catalog) = QueryCatalog::load(Some(file.path())) else {
            panic!("override must load");
        };
        assert_eq!(catalog.lookup(QueryName::ListPages), "select Name from Pages");
    }

    #[test]
    fn unreadable_override_is_fatal() {
        let result = QueryCatalog::load(Some(Path::new("/definitely/not/here.properties")));
        assert!(matches!(result, Err(StartupError::CatalogRead { .. })));
    }
}
