use actix_web::{HttpRequest, HttpResponse, Responder, body::BoxBody};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Query-string pagination parameters shared by the list endpoints.
#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct PageQuery {
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: Option<u32>,
    #[validate(range(min = 1, message = "Page size must be at least 1"))]
    pub page_size: Option<u32>,
}

impl PageQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1)
    }

    /// Effective page size, clamped to [`MAX_PAGE_SIZE`].
    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size())
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * i64::from(self.page_size())
    }
}

/// Page envelope serialized as `{count, next, previous, results}`, where
/// `next`/`previous` are relative links preserving the caller's query string.
#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T: Serialize> Page<T> {
    pub fn new(req: &HttpRequest, query: &PageQuery, count: i64, results: Vec<T>) -> Self {
        let page = query.page();
        let page_size = query.page_size();

        let has_next = i64::from(page) * i64::from(page_size) < count;
        let next = has_next.then(|| page_link(req, page + 1));
        let previous = (page > 1).then(|| page_link(req, page - 1));

        Page { count, next, previous, results }
    }
}

fn page_link(req: &HttpRequest, page: u32) -> String {
    let mut params: Vec<String> = req
        .query_string()
        .split('&')
        .filter(|p| !p.is_empty() && !p.starts_with("page="))
        .map(str::to_owned)
        .collect();
    params.push(format!("page={page}"));

    format!("{}?{}", req.path(), params.join("&"))
}

impl<T: Serialize> Responder for Page<T> {
    type Body = BoxBody;

    fn respond_to(self, _req: &HttpRequest) -> HttpResponse<Self::Body> {
        HttpResponse::Ok().json(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn query(page: Option<u32>, page_size: Option<u32>) -> PageQuery {
        PageQuery { page, page_size }
    }

    #[test]
    fn page_size_defaults_and_clamps() {
        assert_eq!(query(None, None).page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(query(None, Some(25)).page_size(), 25);
        assert_eq!(query(None, Some(500)).page_size(), MAX_PAGE_SIZE);
    }

    #[test]
    fn offset_follows_page_number() {
        assert_eq!(query(None, None).offset(), 0);
        assert_eq!(query(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn links_preserve_query_and_replace_page() {
        let req = TestRequest::with_uri("/api/users/search?q=use&page=2&page_size=10")
            .to_http_request();
        let page = Page::new(&req, &query(Some(2), Some(10)), 25, vec![()]);

        assert_eq!(page.count, 25);
        assert_eq!(page.next.as_deref(), Some("/api/users/search?q=use&page_size=10&page=3"));
        assert_eq!(page.previous.as_deref(), Some("/api/users/search?q=use&page_size=10&page=1"));
    }

    #[test]
    fn first_and_last_pages_have_no_dangling_links() {
        let req = TestRequest::with_uri("/api/friends").to_http_request();

        let first = Page::new(&req, &query(None, None), 10, vec![(); 10]);
        assert!(first.next.is_none());
        assert!(first.previous.is_none());

        let last = Page::new(&req, &query(Some(2), None), 15, vec![(); 5]);
        assert!(last.next.is_none());
        assert_eq!(last.previous.as_deref(), Some("/api/friends?page=1"));
    }
}
