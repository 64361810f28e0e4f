use tracing::info;

use super::Filter;
use crate::request::Request;
use crate::response::Response;

/// Access log filter: one `info` event per completed request.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFilter;

impl Filter for LogFilter {
    fn filter(&self, request: &mut Request, response: Option<&mut Response>) -> Option<Response> {
        if let Some(response) = response {
            let remote = request
                .remote_addr
                .map(|addr| addr.to_string())
                .unwrap_or_else(|| "-".to_string());
            info!(
                request_id = %request.request_id,
                remote_addr = %remote,
                method = %request.method,
                path = %request.path,
                status = response.status,
                body_len = response.body.len(),
                user = %request.user_data,
                "Request completed"
            );
        }
        None
    }
}
