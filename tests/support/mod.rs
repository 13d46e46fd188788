//! Shared utilities for integration tests: socket guard and a mock SOCH search API.

#![allow(dead_code)]

use std::collections::HashSet;
use std::net::TcpListener;
use std::panic::Location;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Path the mock search API is mounted on.
pub const API_PATH: &str = "/ksamsok/api";

#[must_use]
pub fn socket_tests_required() -> bool {
    std::env::var("SOCH_REQUIRE_SOCKET_TESTS")
        .ok()
        .is_some_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

#[track_caller]
#[must_use]
pub fn should_skip_socket_bound_test() -> bool {
    if TcpListener::bind("127.0.0.1:0").is_ok() {
        return false;
    }

    let location = Location::caller();
    let message = format!(
        "[socket-bound-test] cannot bind localhost socket at {}:{}; wiremock-based test cannot run in this environment",
        location.file(),
        location.line()
    );
    if socket_tests_required() {
        panic!("{message}. Set SOCH_REQUIRE_SOCKET_TESTS=0 to allow local skip behavior.");
    }

    eprintln!("{message}. Skipping test. Set SOCH_REQUIRE_SOCKET_TESTS=1 to fail-fast instead.");
    true
}

pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    if should_skip_socket_bound_test() {
        None
    } else {
        Some(MockServer::start().await)
    }
}

/// Endpoint URL of the mock search API.
pub fn endpoint(server: &MockServer) -> String {
    format!("{}{API_PATH}", server.uri())
}

/// One record as the service returns it: RDF followed by a score annotation.
pub fn record_xml(id: u64) -> String {
    format!(
        "<record>\n<rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">\n\
         <rdf:Description rdf:about=\"http://kulturarvsdata.se/raa/item/{id}\"/>\n\
         </rdf:RDF>\n<rel:score xmlns:rel=\"info:srw/extension/2/relevancy-1.0\">1.0</rel:score>\n\
         </record>"
    )
}

/// A full search response document.
pub fn search_response(total_hits: u64, records: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<result>\n<version>1.1</version>\n\
         <totalHits>{total_hits}</totalHits>\n<records>\n{}\n</records>\n</result>",
        records.join("\n")
    )
}

/// Mounts the one-hit probe response reporting `total_hits`.
pub async fn mount_probe(server: &MockServer, total_hits: u64) {
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("hitsPerPage", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(search_response(
                total_hits,
                &[record_xml(0)],
            )),
        )
        .mount(server)
        .await;
}

/// Answers page requests with `records_per_page` records whose ids start at
/// the requested offset; offsets in `failing` get HTTP 500.
pub struct PageResponder {
    pub total_hits: u64,
    pub records_per_page: u64,
    pub failing: HashSet<u64>,
}

impl PageResponder {
    pub fn new(total_hits: u64, records_per_page: u64) -> Self {
        Self {
            total_hits,
            records_per_page,
            failing: HashSet::new(),
        }
    }

    pub fn failing(mut self, offsets: &[u64]) -> Self {
        self.failing.extend(offsets);
        self
    }
}

impl Respond for PageResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let offset = start_record(request).unwrap_or(0);
        if self.failing.contains(&offset) {
            return ResponseTemplate::new(500).set_body_string("internal server error");
        }
        let records: Vec<String> = (offset..offset + self.records_per_page)
            .map(record_xml)
            .collect();
        ResponseTemplate::new(200).set_body_string(search_response(self.total_hits, &records))
    }
}

/// Mounts the page responder for `hitsPerPage=500` requests.
pub async fn mount_pages(server: &MockServer, responder: PageResponder) {
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("hitsPerPage", "500"))
        .respond_with(responder)
        .mount(server)
        .await;
}

/// The `startRecord` parameter of a recorded request.
pub fn start_record(request: &Request) -> Option<u64> {
    request
        .url
        .query_pairs()
        .find(|(key, _)| key == "startRecord")
        .and_then(|(_, value)| value.parse().ok())
}

/// Page requests (not probes) the server has received so far.
pub async fn page_requests(server: &MockServer) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| {
            request
                .url
                .query_pairs()
                .any(|(key, value)| key == "hitsPerPage" && value == "500")
        })
        .collect()
}
