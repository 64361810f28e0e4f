use std::fmt;
use std::sync::Arc;

use crate::request::Request;
use crate::response::Response;

/// Request/response interceptor.
///
/// Called twice per dispatch. In the pre phase `response` is `None`; returning
/// `Some` short-circuits the request and the handler is never bound. In the
/// post phase `response` is the handler's encoded response, which the filter
/// may edit in place (append headers, say) or replace by returning `Some`.
///
/// Any `Fn(&mut Request, Option<&mut Response>) -> Option<Response>` closure
/// is a filter.
pub trait Filter: Send + Sync {
    fn filter(&self, request: &mut Request, response: Option<&mut Response>) -> Option<Response>;
}

impl<F> Filter for F
where
    F: Fn(&mut Request, Option<&mut Response>) -> Option<Response> + Send + Sync,
{
    fn filter(&self, request: &mut Request, response: Option<&mut Response>) -> Option<Response> {
        (self)(request, response)
    }
}

/// Ordered list of filters run in registration order.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Vec<Arc<dyn Filter>>,
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("len", &self.filters.len())
            .finish()
    }
}

impl FilterChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, filter: impl Filter + 'static) -> &mut Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Add a filter that is shared with other chains.
    pub fn add_shared(&mut self, filter: Arc<dyn Filter>) -> &mut Self {
        self.filters.push(filter);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Filter>> {
        self.filters.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run the pre phase; the first filter to answer wins.
    pub fn run_pre(&self, request: &mut Request) -> Option<Response> {
        self.filters.iter().find_map(|f| f.filter(request, None))
    }

    /// Run the post phase; the first replacement wins and later filters are skipped.
    pub fn run_post(&self, request: &mut Request, response: &mut Response) -> Option<Response> {
        self.filters
            .iter()
            .find_map(|f| f.filter(request, Some(&mut *response)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_pre_phase_short_circuits_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);

        let mut chain = FilterChain::new();
        chain
            .add(|_: &mut Request, _: Option<&mut Response>| Some(Response::new(418)))
            .add(move |_: &mut Request, _: Option<&mut Response>| {
                seen.fetch_add(1, Ordering::SeqCst);
                None
            });

        let mut req = Request::new(Method::GET, "/");
        assert_eq!(chain.run_pre(&mut req).map(|r| r.status), Some(418));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_post_phase_edits_in_place() {
        let mut chain = FilterChain::new();
        chain.add(|_: &mut Request, res: Option<&mut Response>| {
            if let Some(res) = res {
                res.add_header("x-seen", "1");
            }
            None
        });

        let mut req = Request::new(Method::GET, "/");
        let mut res = Response::new(200);
        assert!(chain.run_post(&mut req, &mut res).is_none());
        assert_eq!(res.get_header("x-seen"), Some("1"));
    }

    #[test]
    fn test_shared_filter() {
        let shared: Arc<dyn Filter> =
            Arc::new(|req: &mut Request, _: Option<&mut Response>| {
                req.user_data = "shared".into();
                None
            });
        let mut a = FilterChain::new();
        a.add_shared(Arc::clone(&shared));
        let mut b = FilterChain::new();
        b.add_shared(shared);

        let mut req = Request::new(Method::GET, "/");
        assert!(b.run_pre(&mut req).is_none());
        assert_eq!(req.user_data, "shared");
        assert!(!a.is_empty());
    }
}
