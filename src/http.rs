//! Small helpers shared by the REST clients.

use reqwest::{Client, Response, StatusCode};

/// Build a `reqwest` client tagged with the given user agent.
pub(crate) fn build_client(user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder().user_agent(user_agent).build()
}

/// Parse a base URL and drop any trailing slash from its path.
pub(crate) fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

/// Join a base URL and a relative path with exactly one slash.
pub(crate) fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

/// Split a failed response into its status and body text.
pub(crate) async fn failure_parts(response: Response) -> (StatusCode, String) {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    (status, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_trailing_path_slash() {
        let url = normalize_base_url("https://search.example.net/base/").expect("url");
        assert_eq!(url, "https://search.example.net/base");
    }

    #[test]
    fn normalize_rejects_garbage() {
        assert!(normalize_base_url("not a url").is_err());
    }

    #[test]
    fn format_endpoint_joins_with_single_slash() {
        assert_eq!(
            format_endpoint("http://127.0.0.1:9000/", "/indexes"),
            "http://127.0.0.1:9000/indexes"
        );
    }
}
