use std::time::Duration;

use crate::{HttpTransport, RpcError};

pub struct TransportBuilder {
    url: String,
    timeout: Duration,
}

impl TransportBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build_http(self) -> Result<HttpTransport, RpcError> {
        HttpTransport::with_timeout(self.url, self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_custom_timeout() {
        let transport = TransportBuilder::new("http://127.0.0.1:8545")
            .timeout(Duration::from_secs(3))
            .build_http()
            .unwrap();

        assert_eq!(transport.url(), "http://127.0.0.1:8545");
        assert_eq!(transport.timeout(), Duration::from_secs(3));
    }
}
