//! HTTP client for the external detection service.

use anyhow::{anyhow, Context, Result};
use std::time::Duration;

use super::result::{DetectRequest, DetectResponse, Detection};
use crate::frame::Frame;

pub struct DetectClient {
    agent: ureq::Agent,
    url: String,
}

impl DetectClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Submit one frame's pixel buffer and return the parsed detections.
    ///
    /// Every failure mode (transport error, non-2xx status, malformed
    /// response) surfaces as an error; nothing is retried here. Non-2xx
    /// statuses are treated uniformly, with status and body text carried
    /// in the error.
    pub fn detect(&self, frame: &Frame) -> Result<Vec<Detection>> {
        let body = serde_json::to_string(&DetectRequest {
            image_data: frame.rgba(),
        })
        .context("encode frame payload")?;

        let response = self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json")
            .send_string(&body);

        let response = match response {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let text = response.into_string().unwrap_or_default();
                return Err(anyhow!(
                    "detection service returned {}: {}",
                    code,
                    text.trim()
                ));
            }
            Err(err) => {
                return Err(anyhow::Error::new(err).context("send frame to detection service"))
            }
        };

        let text = response
            .into_string()
            .context("read detection response")?;
        let parsed: DetectResponse =
            serde_json::from_str(&text).context("parse detection response")?;
        Ok(parsed.data.into_iter().map(Detection::from).collect())
    }
}
