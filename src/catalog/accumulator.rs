use super::model::{CatalogItem, SearchScope};
use super::tmdb::TmdbClient;
use super::CatalogError;

/// Collects the results of one search, page by page, for a "load more" view.
#[derive(Debug, Clone)]
pub struct SearchAccumulator {
    scope: SearchScope,
    query: String,
    page: u32,
    total_pages: u32,
    results: Vec<CatalogItem>,
}

impl SearchAccumulator {
    pub fn new(scope: SearchScope, query: &str) -> Self {
        Self {
            scope,
            query: query.to_string(),
            page: 0,
            total_pages: 0,
            results: Vec::new(),
        }
    }

    /// Starts over when the scope or query changed; a no-op otherwise.
    pub fn reset(&mut self, scope: SearchScope, query: &str) {
        if self.scope != scope || self.query != query {
            *self = Self::new(scope, query);
        }
    }

    pub fn results(&self) -> &[CatalogItem] {
        &self.results
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// True until a page has been fetched, then while pages remain.
    pub fn has_more(&self) -> bool {
        self.page == 0 || self.page < self.total_pages
    }

    /// Fetches the next page and appends it. Returns how many items were
    /// added; zero once everything is loaded.
    pub async fn next_page(&mut self, client: &TmdbClient) -> Result<usize, CatalogError> {
        if !self.has_more() {
            return Ok(0);
        }

        let page = client.search(self.scope, &self.query, self.page + 1).await?;
        let added = page.results.len();

        self.page += 1;
        self.total_pages = page.total_pages;
        self.results.extend(page.results);

        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MediaKind, TmdbAuth};
    use mockito::Matcher;
    use serde_json::json;

    fn page_body(page: u32, id: u64) -> String {
        json!({
            "page": page,
            "results": [{"id": id, "name": format!("Show {}", id)}],
            "total_pages": 2,
            "total_results": 2
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_accumulates_until_last_page() {
        let mut server = mockito::Server::new_async().await;
        let scope = SearchScope::Only(MediaKind::Series);

        let first = server
            .mock("GET", "/search/tv")
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .with_status(200)
            .with_body(page_body(1, 10))
            .create_async()
            .await;
        let second = server
            .mock("GET", "/search/tv")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(200)
            .with_body(page_body(2, 11))
            .create_async()
            .await;

        let client =
            TmdbClient::new(&server.url(), TmdbAuth::Bearer("t".to_string()), "en-US").unwrap();
        let mut acc = SearchAccumulator::new(scope, "dark");

        assert_eq!(acc.next_page(&client).await.unwrap(), 1);
        assert!(acc.has_more());
        assert_eq!(acc.next_page(&client).await.unwrap(), 1);
        assert!(!acc.has_more());
        assert_eq!(acc.next_page(&client).await.unwrap(), 0);

        first.assert_async().await;
        second.assert_async().await;

        let ids: Vec<&str> = acc.results().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["10", "11"]);
        assert!(acc.results().iter().all(|i| i.kind == MediaKind::Series));
    }

    #[test]
    fn test_reset_only_on_change() {
        let mut acc = SearchAccumulator::new(SearchScope::Multi, "dune");
        acc.page = 3;
        acc.total_pages = 9;

        acc.reset(SearchScope::Multi, "dune");
        assert_eq!(acc.page(), 3);

        acc.reset(SearchScope::Multi, "heat");
        assert_eq!(acc.page(), 0);
        assert!(acc.results().is_empty());
        assert!(acc.has_more());
    }
}
