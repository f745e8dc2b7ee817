use std::{collections::HashMap, str::FromStr};

use serde_json::Value;

use crate::{error::ApiError, schema::RecipeFilter};

pub type FormData = HashMap<String, Value>;

/// Query or form parameters as handed over by the web layer.
pub struct Form {
    inner: HashMap<String, Value>,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn from_query(query: HashMap<String, String>) -> Self {
        Self {
            inner: query
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect(),
        }
    }

    pub fn get_value<T>(&self, key: &str) -> Result<T, ApiError>
    where
        T: TryFrom<Value>,
    {
        match self.inner.get(key) {
            Some(value) => value
                .to_owned()
                .try_into()
                .map_err(|_e| ApiError::validation(key, "Invalid type conversion")),
            None => Err(ApiError::validation(key, "Invalid key")),
        }
    }

    pub fn get_number<T>(&self, key: &str) -> Result<T, ApiError>
    where
        T: FromStr,
    {
        match self.inner.get(key) {
            Some(Value::Number(n)) => n
                .to_string()
                .parse()
                .map_err(|_e| ApiError::validation(key, "Invalid type conversion")),
            Some(value) => match value.as_str() {
                Some(v) => v
                    .trim()
                    .parse()
                    .map_err(|_e| ApiError::validation(key, "Invalid type conversion")),
                None => Err(ApiError::validation(key, "Failed to parse value as str")),
            },
            None => Err(ApiError::validation(key, "Invalid key")),
        }
    }

    pub fn get_optional_number<T>(&self, key: &str) -> Result<Option<T>, ApiError>
    where
        T: FromStr,
    {
        match self.inner.contains_key(key) {
            true => self.get_number(key).map(Some),
            false => Ok(None),
        }
    }

    pub fn get_str(&self, key: &str) -> Result<String, ApiError> {
        match self.inner.get(key) {
            Some(value) => match value.as_str() {
                Some(v) => Ok(v.to_string()),
                None => Err(ApiError::validation(key, "Failed to parse value as str")),
            },
            None => Err(ApiError::validation(key, "Invalid key")),
        }
    }

    /// `1`/`true` and `0`/`false`; a missing key reads as false.
    pub fn get_flag(&self, key: &str) -> Result<bool, ApiError> {
        match self.inner.get(key) {
            None => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::Number(n)) => Ok(n.as_i64().unwrap_or(0) != 0),
            Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "1" | "true" => Ok(true),
                "0" | "false" | "" => Ok(false),
                _ => Err(ApiError::validation(key, "Expected 0 or 1")),
            },
            Some(_) => Err(ApiError::validation(key, "Expected 0 or 1")),
        }
    }

    /// Accepts a JSON array of strings or a comma separated string.
    pub fn get_list(&self, key: &str) -> Result<Vec<String>, ApiError> {
        match self.inner.get(key) {
            None => Ok(vec![]),
            Some(Value::Array(values)) => values
                .iter()
                .map(|v| {
                    v.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| ApiError::validation(key, "Expected a list of strings"))
                })
                .collect(),
            Some(Value::String(s)) => Ok(s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()),
            Some(_) => Err(ApiError::validation(key, "Expected a list of strings")),
        }
    }
}

impl TryFrom<&Form> for RecipeFilter {
    type Error = ApiError;

    fn try_from(form: &Form) -> Result<Self, Self::Error> {
        Ok(Self {
            author: form.get_optional_number("author")?,
            tags: form.get_list("tags")?,
            is_favorited: form.get_flag("is_favorited")?,
            is_in_shopping_cart: form.get_flag("is_in_shopping_cart")?,
        })
    }
}
