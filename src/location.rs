use crate::{Error, Result};

/// Serialization of an origin that cannot own storage.
pub const OPAQUE_ORIGIN: &str = "null";

/// The parts of a document URL that storage partitioning cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationParts {
    pub scheme: String,
    pub has_authority: bool,
    pub hostname: String,
    pub port: String,
    pub pathname: String,
    pub opaque_path: String,
    pub search: String,
    pub hash: String,
}

impl LocationParts {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let Some(scheme_end) = trimmed.find(':') else {
            return Err(Error::InvalidUrl(format!("missing scheme: {trimmed}")));
        };
        let scheme = trimmed[..scheme_end].to_ascii_lowercase();
        if !is_valid_url_scheme(&scheme) {
            return Err(Error::InvalidUrl(format!("invalid scheme: {trimmed}")));
        }
        let rest = &trimmed[scheme_end + 1..];
        let Some(without_slashes) = rest.strip_prefix("//") else {
            let (opaque_path, search, hash) = split_path_search_hash(rest);
            return Ok(Self {
                scheme,
                has_authority: false,
                hostname: String::new(),
                port: String::new(),
                pathname: String::new(),
                opaque_path,
                search,
                hash,
            });
        };

        let authority_end = without_slashes
            .find(|ch| ['/', '?', '#'].contains(&ch))
            .unwrap_or(without_slashes.len());
        let authority = &without_slashes[..authority_end];
        let tail = &without_slashes[authority_end..];
        let hostport = match authority.rfind('@') {
            Some(at) => &authority[at + 1..],
            None => authority,
        };
        let (hostname, port) = split_hostname_and_port(hostport);
        let Some(port) = canonical_port(&scheme, &port) else {
            return Err(Error::InvalidUrl(format!("invalid port: {trimmed}")));
        };
        let (pathname, search, hash) = split_path_search_hash(tail);
        let pathname = if pathname.is_empty() {
            "/".to_string()
        } else {
            pathname
        };
        Ok(Self {
            scheme,
            has_authority: true,
            hostname: hostname.to_ascii_lowercase(),
            port,
            pathname,
            opaque_path: String::new(),
            search,
            hash,
        })
    }

    pub fn protocol(&self) -> String {
        format!("{}:", self.scheme)
    }

    pub fn host(&self) -> String {
        if self.port.is_empty() {
            self.hostname.clone()
        } else {
            format!("{}:{}", self.hostname, self.port)
        }
    }

    pub fn origin(&self) -> String {
        if self.has_authority && !self.hostname.is_empty() {
            format!("{}//{}", self.protocol(), self.host())
        } else {
            OPAQUE_ORIGIN.to_string()
        }
    }

    pub fn is_opaque(&self) -> bool {
        self.origin() == OPAQUE_ORIGIN
    }

    /// Serialized URL without credentials.
    pub fn href(&self) -> String {
        if self.has_authority {
            format!(
                "{}//{}{}{}{}",
                self.protocol(),
                self.host(),
                self.pathname,
                self.search,
                self.hash
            )
        } else {
            format!(
                "{}{}{}{}",
                self.protocol(),
                self.opaque_path,
                self.search,
                self.hash
            )
        }
    }
}

fn is_valid_url_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() {
        return false;
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '-' | '.'))
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" | "ws" => Some(80),
        "https" | "wss" => Some(443),
        _ => None,
    }
}

/// Decimal port without leading zeros, empty for the scheme's default port.
/// `None` when `port` is not a number in `0..=65535`.
fn canonical_port(scheme: &str, port: &str) -> Option<String> {
    if port.is_empty() {
        return Some(String::new());
    }
    if !port.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let number = port.parse::<u16>().ok()?;
    if default_port(scheme) == Some(number) {
        Some(String::new())
    } else {
        Some(number.to_string())
    }
}

fn split_hostname_and_port(authority: &str) -> (String, String) {
    if authority.is_empty() {
        return (String::new(), String::new());
    }

    if let Some(rest) = authority.strip_prefix('[') {
        if let Some(end_idx) = rest.find(']') {
            let hostname = authority[..end_idx + 2].to_string();
            let suffix = &authority[end_idx + 2..];
            if let Some(port) = suffix.strip_prefix(':') {
                return (hostname, port.to_string());
            }
            return (hostname, String::new());
        }
    }

    if let Some(idx) = authority.rfind(':') {
        let hostname = &authority[..idx];
        let port = &authority[idx + 1..];
        if !hostname.contains(':') {
            return (hostname.to_string(), port.to_string());
        }
    }
    (authority.to_string(), String::new())
}

fn split_path_search_hash(tail: &str) -> (String, String, String) {
    let mut pathname = tail;
    let mut search = "";
    let mut hash = "";

    if let Some(hash_pos) = tail.find('#') {
        pathname = &tail[..hash_pos];
        hash = &tail[hash_pos..];
    }

    if let Some(search_pos) = pathname.find('?') {
        search = &pathname[search_pos..];
        pathname = &pathname[..search_pos];
    }

    (pathname.to_string(), search.to_string(), hash.to_string())
}
