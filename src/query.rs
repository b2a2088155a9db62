//! Query-string construction for request URLs.

use std::fmt::Display;

use url::Url;

/// Returns a copy of `url` whose query string encodes `params`.
///
/// Any query string already present on `url` is replaced entirely, not
/// merged. Values are stringified with their `Display` representation and
/// percent-encoded. Pair order follows the iterator but carries no meaning;
/// servers must not depend on parameter ordering.
///
/// An empty `params` returns the URL unchanged, without appending a `?`.
///
/// # Examples
///
/// ```
/// use url::Url;
///
/// let base = Url::parse("https://api.example.com/search").unwrap();
/// let url = courier::query::with_query(&base, [("q", "rust"), ("page", "2")]);
/// assert_eq!(url.as_str(), "https://api.example.com/search?q=rust&page=2");
/// ```
pub fn with_query<I, K, V>(url: &Url, params: I) -> Url
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Display,
{
    let mut params = params.into_iter().peekable();
    if params.peek().is_none() {
        return url.clone();
    }

    let mut out = url.clone();
    out.set_query(None);
    {
        let mut pairs = out.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key.as_ref(), &value.to_string());
        }
    }
    out
}
