//! URL assembly against the service root.

use gs_common::{GsError, GsResult};
use reqwest::Url;

/// Parse and normalize the REST root, dropping any trailing slash.
pub fn parse_service_url(service_url: &str) -> GsResult<Url> {
    let trimmed = service_url.trim().trim_end_matches('/');
    let url = Url::parse(trimmed)
        .map_err(|e| GsError::Config(format!("Invalid service URL {}: {}", service_url, e)))?;
    if url.cannot_be_a_base() {
        return Err(GsError::Config(format!(
            "Service URL {} cannot be used as a base",
            service_url
        )));
    }
    Ok(url)
}

/// Append path segments and query pairs to the service root.
///
/// Segments are percent-encoded individually, so a name can never introduce
/// an extra path level.
pub fn build_url<S, K, V>(base: &Url, segments: &[S], query: &[(K, V)]) -> GsResult<String>
where
    S: AsRef<str>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut url = base.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| GsError::Config(format!("{} cannot be used as a base", base)))?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment.as_ref());
        }
    }
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key.as_ref(), value.as_ref());
        }
    }
    Ok(url.to_string())
}

/// Workspace named in a catalog href: the segment following `workspaces`.
pub fn workspace_from_href(href: &str) -> Option<String> {
    let url = Url::parse(href).ok()?;
    let segments: Vec<&str> = url.path_segments()?.collect();
    let idx = segments.iter().position(|s| *s == "workspaces")?;
    segments.get(idx + 1).map(|s| s.to_string())
}

/// Store kind collection and store name in a catalog href, e.g.
/// `(datastores, states_shapefile)` for
/// `.../workspaces/topp/datastores/states_shapefile/featuretypes/states.xml`.
pub fn store_from_href(href: &str) -> Option<(String, String)> {
    let url = Url::parse(href).ok()?;
    let segments: Vec<&str> = url.path_segments()?.collect();
    let idx = segments.iter().position(|s| *s == "workspaces")?;
    let kind = segments.get(idx + 2)?;
    let store = segments.get(idx + 3)?;
    Some((kind.to_string(), store.to_string()))
}
