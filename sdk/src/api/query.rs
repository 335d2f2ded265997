//! Query parameter builder for list and query endpoints

use indexmap::IndexMap;

const PARAM_FILTER: &str = "filter";
const PARAM_FILTER_ENCODED: &str = "filterEncoded";
const PARAM_FORMAT: &str = "format";
const PARAM_PAGE: &str = "page";
const PARAM_PAGE_SIZE: &str = "pageSize";
const PARAM_SORT_ASC: &str = "sortAsc";
const PARAM_SORT_DESC: &str = "sortDesc";
const PARAM_TYPE: &str = "type";

/// Builds the query string parameters of a paged, filtered query
///
/// The built parameters always include `filterEncoded=true`, so filters are sent
/// percent-encoded by the URL layer rather than pre-encoded by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct QueryParamsBuilder {
    filter:     Option<String>,
    format:     Option<String>,
    page:       Option<u32>,
    page_size:  Option<u32>,
    sort_asc:   Option<String>,
    sort_desc:  Option<String>,
    query_type: Option<String>,
}

impl QueryParamsBuilder {
    /// An empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// FIQL filter, e.g. `name==acme;isEnabled==true`
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Result format, e.g. `records` or `references`
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// One-based page number
    pub const fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Page size
    pub const fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Sort ascending by a field
    pub fn sort_asc(mut self, field: impl Into<String>) -> Self {
        self.sort_asc = Some(field.into());
        self
    }

    /// Sort descending by a field
    pub fn sort_desc(mut self, field: impl Into<String>) -> Self {
        self.sort_desc = Some(field.into());
        self
    }

    /// Query type for the typed query service, e.g. `adminOrgVdc`
    pub fn query_type(mut self, query_type: impl Into<String>) -> Self {
        self.query_type = Some(query_type.into());
        self
    }

    /// The parameters in a stable order
    #[must_use]
    pub fn build(self) -> IndexMap<String, String> {
        let mut params = IndexMap::new();
        let mut put = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                params.insert(key.to_string(), value);
            }
        };

        put(PARAM_TYPE, self.query_type);
        put(PARAM_FILTER, self.filter);
        put(PARAM_FORMAT, self.format);
        put(PARAM_PAGE, self.page.map(|page| page.to_string()));
        put(PARAM_PAGE_SIZE, self.page_size.map(|size| size.to_string()));
        put(PARAM_SORT_ASC, self.sort_asc);
        put(PARAM_SORT_DESC, self.sort_desc);
        put(PARAM_FILTER_ENCODED, Some(true.to_string()));

        params
    }
}
