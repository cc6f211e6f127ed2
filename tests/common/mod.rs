//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use bls_mirror::config::MirrorConfig;
use bls_mirror::error::{MirrorError, Result};
use bls_mirror::fetch::Fetcher;
use bls_mirror::store::MemoryStore;

pub const BASE_URL: &str = "https://download.bls.gov/pub/time.series/pr/";
pub const BUCKET: &str = "test-bucket";
pub const PREFIX: &str = "bls/pr/";
pub const POP_URL: &str = "https://api.example.test/population";

/// Fetcher answering from a URL → body table, recording every request
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: Mutex<HashMap<String, std::result::Result<Vec<u8>, String>>>,
    requests: Mutex<Vec<(String, Duration)>>,
}

impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.responses
            .lock()
            .insert(url.to_string(), Ok(body.into()));
    }

    pub fn fail(&self, url: &str, reason: &str) {
        self.responses
            .lock()
            .insert(url.to_string(), Err(reason.to_string()));
    }

    /// Serve a directory listing plus one body per file
    pub fn serve_directory(&self, files: &[(&str, &str)]) {
        let names: Vec<&str> = files.iter().map(|(name, _)| *name).collect();
        self.respond(BASE_URL, listing_html(&names));
        for (name, body) in files {
            self.respond(&file_url(name), body.as_bytes().to_vec());
        }
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests.lock().iter().map(|(url, _)| url.clone()).collect()
    }

    pub fn requests(&self) -> Vec<(String, Duration)> {
        self.requests.lock().clone()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        self.requests.lock().push((url.to_string(), timeout));
        match self.responses.lock().get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(reason)) => Err(MirrorError::Transport(reason.clone())),
            None => Err(MirrorError::Transport(format!("GET {} returned 404 Not Found", url))),
        }
    }
}

pub fn file_url(name: &str) -> String {
    format!("{}{}", BASE_URL, name)
}

/// Apache-style listing with absolute links plus the usual navigation noise
pub fn listing_html(names: &[&str]) -> String {
    let mut html = String::from(
        "<html><head><title>download.bls.gov - /pub/time.series/pr/</title></head><body>\
         <H1>download.bls.gov - /pub/time.series/pr/</H1><hr>\n<pre>\
         <A HREF=\"/pub/time.series/\">[To Parent Directory]</A><br><br>\n",
    );
    for name in names {
        html.push_str(&format!(
            " 1/8/2026  8:30 AM        12345 <A HREF=\"/pub/time.series/pr/{}\">{}</A><br>\n",
            name, name
        ));
    }
    html.push_str("</pre><hr></body></html>\n");
    html
}

pub fn config() -> MirrorConfig {
    MirrorConfig {
        base_url: BASE_URL.to_string(),
        bucket: BUCKET.to_string(),
        prefix: PREFIX.to_string(),
        pop_api_url: Some(POP_URL.to_string()),
        ..Default::default()
    }
}

pub fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

pub fn key(name: &str) -> String {
    format!("{}{}", PREFIX, name)
}
