use std::collections::HashMap;
use std::sync::Mutex;

use crate::download::{Download, DownloadError};

/// Serves canned bodies by URL and remembers every request.
#[derive(Default)]
pub(crate) struct MemoryDownloader {
    bodies: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<(String, bool)>>,
}

impl MemoryDownloader {
    pub(crate) fn with(mut self, url: &str, body: &[u8]) -> Self {
        self.bodies.insert(url.to_string(), body.to_vec());
        self
    }

    pub(crate) fn requests(&self) -> Vec<(String, bool)> {
        self.requests.lock().unwrap().clone()
    }
}

impl Download for MemoryDownloader {
    async fn download(&self, url: &str, device_specific: bool) -> Result<Vec<u8>, DownloadError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), device_specific));
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| DownloadError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}
