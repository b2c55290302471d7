//! Query parsing for optimize requests.

use url::Url;

use crate::domain::errors::{OptimizeError, OptimizeResult};

const LOCAL_BASE: &str = "http://localhost";

/// Parameters extracted from one optimize request URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    /// Source identifier, local path or absolute URL.
    pub src: String,
    /// Requested pixel width.
    pub size: u32,
    /// Quality override, 1 to 100.
    pub quality: Option<u8>,
    /// Path of the endpoint itself, used to build redirect locations.
    pub path: String,
    /// Explicit port on the request URL, if any.
    pub port: Option<u16>,
}

/// Parses `target` into its optimize parameters.
///
/// Accepts absolute URLs and server-relative paths. A missing or
/// non-numeric `src`/`size` is a [`OptimizeError::BadRequest`], as is a
/// `quality` outside 1 to 100.
pub fn parse_request(target: &str) -> OptimizeResult<ParsedRequest> {
    let url = match Url::parse(target) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(LOCAL_BASE)
            .and_then(|base| base.join(target))
            .map_err(|e| OptimizeError::bad_request(format!("Invalid request URL: {e}")))?,
        Err(e) => {
            return Err(OptimizeError::bad_request(format!(
                "Invalid request URL: {e}"
            )));
        }
    };

    let mut src = None;
    let mut size = None;
    let mut quality = None;
    for (name, value) in url.query_pairs() {
        match name.as_ref() {
            "src" => src = Some(value.into_owned()),
            "size" => size = Some(value.into_owned()),
            "quality" => quality = Some(value.into_owned()),
            _ => {}
        }
    }

    let src = src
        .filter(|s| !s.is_empty())
        .ok_or_else(|| OptimizeError::bad_request("Missing src parameter"))?;
    let size = size
        .ok_or_else(|| OptimizeError::bad_request("Missing size parameter"))?
        .parse::<u32>()
        .map_err(|_| OptimizeError::bad_request("Invalid size parameter"))?;
    let quality = match quality {
        None => None,
        Some(raw) => Some(
            raw.parse::<u8>()
                .ok()
                .filter(|q| (1..=100).contains(q))
                .ok_or_else(|| OptimizeError::bad_request("Invalid quality parameter"))?,
        ),
    };

    Ok(ParsedRequest {
        src,
        size,
        quality,
        path: url.path().to_string(),
        port: url.port(),
    })
}
