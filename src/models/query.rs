//! Query-related data models.
//!
//! This module defines types for SQL parameters and statement results.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Default row limit for query results.
pub const DEFAULT_ROW_LIMIT: u32 = 100;

/// Maximum allowed row limit.
pub const MAX_ROW_LIMIT: u32 = 10000;

/// A parameter value for parameterized queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryParam {
    /// NULL value
    Null,
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    Float(f64),
    String(String),
    /// Binary data, written in JSON as `{"base64": "..."}`
    #[serde(with = "base64_bytes")]
    Bytes(Vec<u8>),
    /// Structured value, bound as JSON (text on SQLite)
    Json(JsonValue),
}

impl QueryParam {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this parameter for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Json(_) => "json",
        }
    }
}

impl From<bool> for QueryParam {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for QueryParam {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for QueryParam {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for QueryParam {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for QueryParam {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for QueryParam {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<u8>> for QueryParam {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl<T: Into<QueryParam>> From<Option<T>> for QueryParam {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Binary data as a single-key `{"base64": "..."}` object.
///
/// A bare base64 string would be read back as [`QueryParam::String`]. Objects
/// with other keys, or invalid base64, deserialize as [`QueryParam::Json`].
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Tagged {
        base64: String,
    }

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Tagged {
            base64: STANDARD.encode(bytes),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let tagged = Tagged::deserialize(deserializer)?;
        STANDARD.decode(&tagged.base64).map_err(serde::de::Error::custom)
    }
}

/// Rows returned by a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    pub execution_time_ms: u64,
    /// True when more rows matched than the row limit allowed
    pub truncated: bool,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// First column of the first row, if any.
    pub fn scalar(&self) -> Option<&JsonValue> {
        let first_column = self.columns.first()?;
        self.rows.first()?.get(first_column)
    }
}

/// Outcome of a write statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteResult {
    pub rows_affected: u64,
    pub execution_time_ms: u64,
}

/// A statement with bound parameters, used for batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub sql: String,
    #[serde(default)]
    pub params: Vec<QueryParam>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Add a parameter to this statement.
    pub fn bind(mut self, param: impl Into<QueryParam>) -> Self {
        self.params.push(param.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param_untagged_deserialize() {
        let params: Vec<QueryParam> =
            serde_json::from_str(r#"[null, true, 42, 1.5, "text"]"#).unwrap();
        assert!(params[0].is_null());
        assert_eq!(params[1], QueryParam::Bool(true));
        assert_eq!(params[2], QueryParam::Int(42));
        assert_eq!(params[3], QueryParam::Float(1.5));
        assert_eq!(params[4], QueryParam::String("text".to_string()));
    }

    #[test]
    fn test_query_param_conversions() {
        assert_eq!(QueryParam::from(7i32), QueryParam::Int(7));
        assert_eq!(QueryParam::from("guild"), QueryParam::String("guild".into()));
        assert_eq!(QueryParam::from(None::<i64>), QueryParam::Null);
        assert_eq!(QueryParam::from(Some(false)), QueryParam::Bool(false));
        assert_eq!(QueryParam::from(vec![1u8, 2]).type_name(), "bytes");
    }

    #[test]
    fn test_bytes_keep_their_type_through_json() {
        let json = serde_json::to_string(&QueryParam::Bytes(b"hi".to_vec())).unwrap();
        assert_eq!(json, r#"{"base64":"aGk="}"#);

        let param: QueryParam = serde_json::from_str(&json).unwrap();
        assert_eq!(param, QueryParam::Bytes(b"hi".to_vec()));

        let text: QueryParam = serde_json::from_str(r#""aGk=""#).unwrap();
        assert_eq!(text, QueryParam::String("aGk=".to_string()));
    }

    #[test]
    fn test_other_objects_stay_json() {
        let param: QueryParam =
            serde_json::from_str(r#"{"base64":"aGk=","mime":"text/plain"}"#).unwrap();
        assert_eq!(param.type_name(), "json");
    }

    #[test]
    fn test_statement_with_bytes_from_json() {
        let stmt: Statement = serde_json::from_str(
            r#"{"sql":"INSERT INTO avatars (data) VALUES (?)","params":[{"base64":"AQI="}]}"#,
        )
        .unwrap();
        assert_eq!(stmt.params, vec![QueryParam::Bytes(vec![1, 2])]);
    }

    #[test]
    fn test_statement_builder() {
        let stmt = Statement::new("INSERT INTO guilds (id, prefix) VALUES (?, ?)")
            .bind(1i64)
            .bind("!");
        assert_eq!(stmt.params.len(), 2);
        assert_eq!(stmt.params[1], QueryParam::String("!".to_string()));
    }

    #[test]
    fn test_query_result_scalar() {
        let mut row = serde_json::Map::new();
        row.insert("n".to_string(), JsonValue::from(3));
        let result = QueryResult {
            columns: vec!["n".to_string()],
            rows: vec![row],
            execution_time_ms: 0,
            truncated: false,
        };
        assert_eq!(result.scalar(), Some(&JsonValue::from(3)));
        assert_eq!(result.row_count(), 1);
    }
}
