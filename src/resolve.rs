// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Resolver for published records.
//!
//! A lookup tries TXT, then CNAME, then A, stopping at the first type with
//! answers. TXT answers only count when they carry the indirection marker
//! `zonesync // <target>.`. In recursive mode every marked TXT answer is
//! replaced by a lookup of its target until no marked answers remain.
//!
//! Queries use TCP because marker TXT sets can be large. Every query is
//! bounded by the transport's timeout, and a recursive chase by a hop
//! ceiling, so resolution always terminates.

use hickory_client::client::{Client, SyncClient};
use hickory_client::error::{ClientError, ClientErrorKind};
use hickory_client::rr::{DNSClass, Name, RData, Record};
use hickory_client::tcp::TcpClientConnection;
use hickory_proto::error::ProtoErrorKind;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::constants::{DNS_PORT, FALLBACK_NAMESERVER, RESOLV_CONF_PATH, TXT_MARKER_PREFIX};
use crate::errors::ResolveError;
use crate::metrics;
use crate::records::RecordType;
use crate::tree::srv_target;

/// Lookup order of a single resolution step.
const LOOKUP_ORDER: [RecordType; 3] = [RecordType::TXT, RecordType::CNAME, RecordType::A];

// ============================================================================
// Answers
// ============================================================================

/// One answer record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    /// Owner name
    pub name: String,
    /// Record type
    pub record_type: RecordType,
    /// Time to live in seconds
    pub ttl: u32,
    /// Record data in presentation form (TXT strings concatenated)
    pub data: String,
}

impl Answer {
    /// Build an answer.
    pub fn new(
        name: impl Into<String>,
        record_type: RecordType,
        ttl: u32,
        data: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            record_type,
            ttl,
            data: data.into(),
        }
    }

    /// Indirection target of a marked TXT answer.
    #[must_use]
    pub fn marker_target(&self) -> Option<&str> {
        match self.record_type {
            RecordType::TXT => marker_target(&self.data),
            _ => None,
        }
    }

    /// The useful value of the answer: marker target, alias target, address
    /// or service target.
    #[must_use]
    pub fn payload(&self) -> Option<String> {
        match self.record_type {
            RecordType::TXT => self.marker_target().map(str::to_string),
            RecordType::SRV => srv_target(&self.data).map(str::to_string),
            RecordType::A | RecordType::AAAA | RecordType::CNAME => Some(self.data.clone()),
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.name, self.ttl, self.record_type, self.data)
    }
}

/// A resolution result: either the whole answer or just its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Full answer record
    Record(Answer),
    /// Payload value only
    Payload(String),
}

impl fmt::Display for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::Record(answer) => answer.fmt(f),
            Resolved::Payload(value) => f.write_str(value),
        }
    }
}

/// Target of an indirection marker (`zonesync // <target>.`).
///
/// ```
/// use zonesync::resolve::marker_target;
///
/// assert_eq!(
///     marker_target("zonesync // web.sg.zs.example.com."),
///     Some("web.sg.zs.example.com.")
/// );
/// assert_eq!(marker_target("v=spf1 -all"), None);
/// ```
#[must_use]
pub fn marker_target(txt: &str) -> Option<&str> {
    let target = txt.strip_prefix(TXT_MARKER_PREFIX)?.trim_end_matches(' ');
    let valid = target.ends_with('.')
        && target
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.');
    valid.then_some(target)
}

/// TXT data marking `target` as the indirection target.
#[must_use]
pub fn marker(target: &str) -> String {
    format!("{TXT_MARKER_PREFIX}{target}")
}

// ============================================================================
// Transport
// ============================================================================

/// A blocking DNS query capability.
pub trait DnsTransport: Send + Sync {
    /// Query one name and type, returning every answer record.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::ResolutionTimeout`] when the query exceeds its
    /// deadline and [`ResolveError::Transport`] for any other failure.
    fn query(&self, name: &str, record_type: RecordType) -> Result<Vec<Answer>, ResolveError>;
}

/// DNS over TCP with a per-query timeout.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    server: SocketAddr,
    timeout: Duration,
}

impl TcpTransport {
    /// Create a transport for one nameserver.
    #[must_use]
    pub fn new(server: SocketAddr, timeout: Duration) -> Self {
        Self { server, timeout }
    }

    /// Create a transport from resolver settings, falling back to the system
    /// nameserver.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured nameserver is not an address.
    pub fn from_config(config: &ResolverConfig) -> anyhow::Result<Self> {
        let server = match &config.nameserver {
            Some(nameserver) => parse_nameserver(nameserver)?,
            None => system_nameserver(),
        };
        Ok(Self::new(server, Duration::from_secs(config.timeout_secs)))
    }

    fn classify(&self, name: &str, record_type: RecordType, error: &ClientError) -> ResolveError {
        let timed_out = match error.kind() {
            ClientErrorKind::Timeout => true,
            ClientErrorKind::Proto(proto) => matches!(proto.kind(), ProtoErrorKind::Timeout),
            _ => false,
        };
        if timed_out {
            ResolveError::ResolutionTimeout {
                name: name.to_string(),
                record_type: record_type.to_string(),
                timeout: self.timeout,
            }
        } else {
            ResolveError::Transport {
                name: name.to_string(),
                server: self.server.to_string(),
                reason: error.to_string(),
            }
        }
    }
}

impl DnsTransport for TcpTransport {
    fn query(&self, name: &str, record_type: RecordType) -> Result<Vec<Answer>, ResolveError> {
        let fqdn = Name::from_str(name).map_err(|e| ResolveError::Transport {
            name: name.to_string(),
            server: self.server.to_string(),
            reason: format!("invalid name: {e}"),
        })?;

        let conn = TcpClientConnection::with_timeout(self.server, self.timeout)
            .map_err(|e| self.classify(name, record_type, &e))?;
        let client = SyncClient::new(conn);

        let response = client
            .query(&fqdn, DNSClass::IN, record_type.hickory_record_type())
            .map_err(|e| self.classify(name, record_type, &e))?;

        let answers: Vec<Answer> = response.answers().iter().filter_map(answer_from).collect();
        debug!(
            name,
            %record_type,
            server = %self.server,
            answers = answers.len(),
            "query answered"
        );
        Ok(answers)
    }
}

fn answer_from(record: &Record) -> Option<Answer> {
    let (record_type, data) = match record.data()? {
        RData::A(address) => (RecordType::A, address.to_string()),
        RData::AAAA(address) => (RecordType::AAAA, address.to_string()),
        RData::CNAME(alias) => (RecordType::CNAME, alias.0.to_string()),
        RData::SRV(srv) => (
            RecordType::SRV,
            format!("{} {} {} {}", srv.priority(), srv.weight(), srv.port(), srv.target()),
        ),
        RData::TXT(txt) => (
            RecordType::TXT,
            txt.txt_data()
                .iter()
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                .collect(),
        ),
        _ => return None,
    };
    Some(Answer::new(record.name().to_string(), record_type, record.ttl(), data))
}

/// Parse `host`, `host:port` or `[v6]:port` into a socket address.
///
/// # Errors
///
/// Returns an error if the text is not an IP address with an optional port.
pub fn parse_nameserver(text: &str) -> anyhow::Result<SocketAddr> {
    if let Ok(addr) = text.parse::<SocketAddr>() {
        return Ok(addr);
    }
    let ip: IpAddr = text
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid nameserver address '{text}': {e}"))?;
    Ok(SocketAddr::new(ip, DNS_PORT))
}

/// First `nameserver` entry of a resolv.conf document.
#[must_use]
pub fn nameserver_from_resolv_conf(text: &str) -> Option<SocketAddr> {
    text.lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix("nameserver"))
        .filter_map(|rest| rest.split_whitespace().next())
        .find_map(|addr| parse_nameserver(addr).ok())
}

/// The system nameserver, or the local fallback if none is configured.
#[must_use]
pub fn system_nameserver() -> SocketAddr {
    let configured = std::fs::read_to_string(RESOLV_CONF_PATH)
        .ok()
        .and_then(|text| nameserver_from_resolv_conf(&text));
    match configured {
        Some(addr) => addr,
        None => {
            warn!(
                path = RESOLV_CONF_PATH,
                fallback = FALLBACK_NAMESERVER,
                "no system nameserver found"
            );
            SocketAddr::from(([127, 0, 0, 1], DNS_PORT))
        }
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Resolves names published by zonesync.
pub struct Resolver<T: DnsTransport> {
    transport: T,
    max_hops: usize,
    best_effort: bool,
}

impl<T: DnsTransport> Resolver<T> {
    /// Create a resolver. `max_hops` bounds how many rounds of marker
    /// chasing one recursive resolution may take, however wide each round
    /// is; `best_effort` returns partial answers instead of failing on a
    /// timeout or the hop ceiling.
    pub fn new(transport: T, max_hops: usize, best_effort: bool) -> Self {
        Self {
            transport,
            max_hops,
            best_effort,
        }
    }

    /// Look a name up once: the first of TXT, CNAME, A with any answers.
    fn lookup(&self, name: &str) -> Result<Vec<Answer>, ResolveError> {
        for record_type in LOOKUP_ORDER {
            let answers: Vec<Answer> = self
                .transport
                .query(name, record_type)?
                .into_iter()
                .filter(|answer| {
                    answer.record_type != RecordType::TXT || answer.marker_target().is_some()
                })
                .collect();
            if !answers.is_empty() {
                return Ok(answers);
            }
        }
        Ok(Vec::new())
    }

    /// Resolve `name`.
    ///
    /// In recursive mode marked TXT answers are chased until none remain.
    /// With `full_answer` whole records are returned, otherwise payloads.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::ResolutionTimeout`],
    /// [`ResolveError::HopLimitExceeded`] or [`ResolveError::Transport`],
    /// unless best-effort mode turns the first two into a partial result.
    pub fn resolve(
        &self,
        name: &str,
        recursive: bool,
        full_answer: bool,
    ) -> Result<Vec<Resolved>, ResolveError> {
        let answers = self.chase(name, recursive)?;
        Ok(if full_answer {
            answers.into_iter().map(Resolved::Record).collect()
        } else {
            answers
                .iter()
                .filter_map(Answer::payload)
                .map(Resolved::Payload)
                .collect()
        })
    }

    fn chase(&self, name: &str, recursive: bool) -> Result<Vec<Answer>, ResolveError> {
        let mut answers = match self.lookup(name) {
            Ok(answers) => answers,
            Err(e) => return self.partial(e, Vec::new()),
        };
        if !recursive {
            return Ok(answers);
        }

        let mut depth = 0;
        loop {
            let (markers, mut pending): (Vec<Answer>, Vec<Answer>) = answers
                .into_iter()
                .partition(|answer| answer.marker_target().is_some());
            let Some(first) = markers.first() else {
                return Ok(pending);
            };

            if depth >= self.max_hops {
                let error = ResolveError::HopLimitExceeded {
                    name: first.marker_target().unwrap_or_default().to_string(),
                    max_hops: self.max_hops,
                };
                pending.extend(markers);
                return self.partial(error, pending);
            }
            depth += 1;
            metrics::record_resolver_hop();

            let mut queue = markers.into_iter();
            while let Some(marker) = queue.next() {
                let target = marker.marker_target().unwrap_or_default().to_string();
                match self.lookup(&target) {
                    Ok(found) => pending.extend(found),
                    Err(e) => {
                        pending.push(marker);
                        pending.extend(queue);
                        return self.partial(e, pending);
                    }
                }
            }
            answers = pending;
        }
    }

    fn partial(
        &self,
        error: ResolveError,
        gathered: Vec<Answer>,
    ) -> Result<Vec<Answer>, ResolveError> {
        let recoverable = matches!(
            error,
            ResolveError::ResolutionTimeout { .. } | ResolveError::HopLimitExceeded { .. }
        );
        if self.best_effort && recoverable {
            warn!(error = %error, answers = gathered.len(), "returning partial resolution");
            Ok(gathered)
        } else {
            Err(error)
        }
    }
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod resolve_tests;
