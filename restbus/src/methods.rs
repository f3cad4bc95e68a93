//! HTTP method allow-lists.

use http::Method;
use restbus_core::DomainError;

bitflags::bitflags! {
    /// The set of HTTP methods a route answers.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct MethodSet: u16 {
        /// GET
        const GET     = 1 << 0;
        /// POST
        const POST    = 1 << 1;
        /// PUT
        const PUT     = 1 << 2;
        /// PATCH
        const PATCH   = 1 << 3;
        /// DELETE
        const DELETE  = 1 << 4;
        /// HEAD
        const HEAD    = 1 << 5;
        /// OPTIONS
        const OPTIONS = 1 << 6;
        /// TRACE
        const TRACE   = 1 << 7;
        /// CONNECT
        const CONNECT = 1 << 8;
    }
}

// Rendering order for the Allow header.
const CANONICAL: [(MethodSet, &str); 9] = [
    (MethodSet::GET, "GET"),
    (MethodSet::POST, "POST"),
    (MethodSet::PUT, "PUT"),
    (MethodSet::PATCH, "PATCH"),
    (MethodSet::DELETE, "DELETE"),
    (MethodSet::HEAD, "HEAD"),
    (MethodSet::OPTIONS, "OPTIONS"),
    (MethodSet::TRACE, "TRACE"),
    (MethodSet::CONNECT, "CONNECT"),
];

impl MethodSet {
    /// The default allow-list for collection routes.
    pub fn collection_default() -> Self {
        MethodSet::GET | MethodSet::POST
    }

    /// The default allow-list for entity routes.
    pub fn entity_default() -> Self {
        MethodSet::DELETE | MethodSet::GET | MethodSet::PATCH | MethodSet::PUT
    }

    /// Parse a single verb name, case-insensitively.
    pub fn parse_verb(verb: &str) -> Option<Self> {
        let upper = verb.to_ascii_uppercase();
        CANONICAL
            .iter()
            .find(|(_, name)| *name == upper)
            .map(|(flag, _)| *flag)
    }

    /// Build a set from configured verb names.
    ///
    /// Verbs outside the nine standard HTTP methods are a configuration
    /// error, not a silent skip.
    pub fn from_verbs<I, S>(verbs: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = MethodSet::empty();
        for verb in verbs {
            let verb = verb.as_ref();
            match Self::parse_verb(verb) {
                Some(flag) => set |= flag,
                None => {
                    return Err(DomainError::InvalidConfig(format!(
                        "unrecognized HTTP method \"{verb}\""
                    )));
                }
            }
        }
        Ok(set)
    }

    /// Whether the set allows a request method.
    pub fn allows(&self, method: &Method) -> bool {
        match Self::parse_verb(method.as_str()) {
            Some(flag) => self.contains(flag),
            None => false,
        }
    }

    /// Render the `Allow` header value: every known method cleared, then the
    /// configured subset listed in canonical order.
    pub fn allow_header(&self) -> String {
        let allowed: Vec<&str> = CANONICAL
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        allowed.join(", ")
    }
}
