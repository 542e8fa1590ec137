//! Lazy cursors over the read API.
//!
//! [`QueryMultiple`] walks a paged collection one item at a time, fetching
//! pages only as iteration demands them. [`QuerySingle`] fetches one object
//! and caches the answer. Both support [`reload`](QueryMultiple::reload) to
//! discard fetched state and observe fresh data.

use crate::client::Connection;
use crate::errors::DirectoryResult;
use serde_json::Value;

/// A lazy cursor over a paged collection of objects.
///
/// Items already yielded stay cached, so [`QueryMultiple::all_results`]
/// after partial iteration returns the complete collection without
/// refetching earlier pages. Call [`QueryMultiple::reload`] to start a
/// fresh scan.
pub struct QueryMultiple<'a> {
    connection: &'a Connection,
    object_type: String,
    url_params: Vec<String>,
    query_params: Vec<(String, String)>,
    items: Vec<Value>,
    position: usize,
    next_page: usize,
    last_page_seen: bool,
}

impl<'a> QueryMultiple<'a> {
    /// Creates a cursor over objects of the named type.
    pub fn new(connection: &'a Connection, object_type: impl Into<String>) -> Self {
        Self {
            connection,
            object_type: object_type.into(),
            url_params: Vec::new(),
            query_params: Vec::new(),
            items: Vec::new(),
            position: 0,
            next_page: 0,
            last_page_seen: false,
        }
    }

    /// Appends a path component to the query.
    pub fn url_param(mut self, component: impl Into<String>) -> Self {
        self.url_params.push(component.into());
        self
    }

    /// Adds a query-string parameter.
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    async fn fetch_page(&mut self) -> DirectoryResult<()> {
        let url_params: Vec<&str> = self.url_params.iter().map(String::as_str).collect();
        let query_params: Vec<(&str, &str)> = self
            .query_params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let (values, last_page) = self
            .connection
            .query_multiple(&self.object_type, self.next_page, &url_params, &query_params)
            .await?;
        self.next_page += 1;
        // An empty page ends the scan even if the server forgot the flag.
        self.last_page_seen = last_page || values.is_empty();
        self.items.extend(values);
        Ok(())
    }

    /// Yields the next object, fetching pages as needed. `None` once the
    /// collection is exhausted.
    pub async fn next_item(&mut self) -> DirectoryResult<Option<Value>> {
        while self.position >= self.items.len() && !self.last_page_seen {
            self.fetch_page().await?;
        }
        match self.items.get(self.position) {
            Some(item) => {
                self.position += 1;
                Ok(Some(item.clone()))
            }
            None => Ok(None),
        }
    }

    /// Exhausts the cursor and returns the complete collection, including
    /// items already yielded.
    pub async fn all_results(&mut self) -> DirectoryResult<Vec<Value>> {
        while !self.last_page_seen {
            self.fetch_page().await?;
        }
        self.position = self.items.len();
        Ok(self.items.clone())
    }

    /// Discards all fetched state so the next read starts a fresh scan
    /// from the first page.
    pub fn reload(&mut self) {
        self.items.clear();
        self.position = 0;
        self.next_page = 0;
        self.last_page_seen = false;
    }
}

/// A lazy, cached fetch of one object.
pub struct QuerySingle<'a> {
    connection: &'a Connection,
    object_type: String,
    url_params: Vec<String>,
    query_params: Vec<(String, String)>,
    cached: Option<Option<Value>>,
}

impl<'a> QuerySingle<'a> {
    /// Creates a query for one object of the named type.
    pub fn new(connection: &'a Connection, object_type: impl Into<String>) -> Self {
        Self {
            connection,
            object_type: object_type.into(),
            url_params: Vec::new(),
            query_params: Vec::new(),
            cached: None,
        }
    }

    /// Appends a path component identifying the object.
    pub fn url_param(mut self, component: impl Into<String>) -> Self {
        self.url_params.push(component.into());
        self
    }

    /// Adds a query-string parameter.
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    /// Fetches the object on first call and caches the answer, including a
    /// "not found" answer. `None` when the server reports 404.
    pub async fn result(&mut self) -> DirectoryResult<Option<Value>> {
        if let Some(cached) = &self.cached {
            return Ok(cached.clone());
        }
        let url_params: Vec<&str> = self.url_params.iter().map(String::as_str).collect();
        let query_params: Vec<(&str, &str)> = self
            .query_params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let value = self
            .connection
            .query_single(&self.object_type, &url_params, &query_params)
            .await?;
        self.cached = Some(value.clone());
        Ok(value)
    }

    /// Drops the cached answer so the next [`QuerySingle::result`] hits
    /// the server again.
    pub fn reload(&mut self) {
        self.cached = None;
    }
}
