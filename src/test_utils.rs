#![cfg(test)]

use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::LinkRecord;

/// Start a mock server answering every GET with `response_code`
pub(crate) async fn get_mock_server(response_code: u16) -> MockServer {
    let mock_server = MockServer::start().await;
    let template = ResponseTemplate::new(response_code);

    Mock::given(method("GET"))
        .respond_with(template)
        .mount(&mock_server)
        .await;

    mock_server
}

/// A link as if it had been found in a page component
pub(crate) fn website(url: &str) -> LinkRecord {
    LinkRecord::new("src/pages/Home.tsx", url)
}
