//! Authentication methods for the Elasticsearch client

/// Credentials attached to every request, chosen once at client construction.
///
/// The CLI picks the variant from the environment: an API key when
/// `ELASTICSEARCH_APIKEY` is set, basic credentials when both
/// `ELASTICSEARCH_USERNAME` and `ELASTICSEARCH_PASSWORD` are, and no
/// authentication otherwise.
#[derive(Clone)]
pub enum Auth {
    /// An `ApiKey` authorization header
    Apikey(String),
    /// A `Basic` authorization header from username and password
    Basic(String, String),
    /// No authorization header at all; the cluster must allow anonymous access
    None,
}

/// Never prints credential material, only the method name
impl std::fmt::Display for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Apikey(_) => write!(f, "Apikey"),
            Self::Basic(_, _) => write!(f, "Basic"),
            Self::None => write!(f, "None"),
        }
    }
}
