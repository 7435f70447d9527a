use tabletop_catalog::CatalogId;

/// Errors that can occur while fetching from the catalog service.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport failure or a non-success HTTP status.
    #[error("Catalog service unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The response body could not be decoded.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// The id resolved to something other than a catalog entry of the
    /// requested kind.
    #[error("{kind} {id} is not a catalog entry")]
    NotACatalogEntry { kind: &'static str, id: CatalogId },

    /// The shutdown signal fired while waiting to send the request.
    #[error("Fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// True if the caller should stop crawling rather than skip this id.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::UpstreamUnavailable(e.to_string())
    }
}

impl From<quick_xml::Error> for FetchError {
    fn from(e: quick_xml::Error) -> Self {
        FetchError::MalformedPayload(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for FetchError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        FetchError::MalformedPayload(e.to_string())
    }
}
