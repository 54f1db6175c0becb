//! Downloads remotely-hosted images referenced by note bodies and rewrites
//! the references to local attachment paths.
//!
//! Local filenames are derived from the URL hash, so re-running the fetch
//! overwrites the same file instead of accumulating copies. A failed URL is
//! left verbatim in the body and retried on the next run.

use std::fs;
use std::path::Path;
use std::thread;

use regex::Regex;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use walkdir::WalkDir;

use crate::config::{ConvertConfig, RESOURCES_DIR_NAME};
use crate::error::{ConvertError, Result};
use crate::issues::{IssueCategory, IssueTracker};

/// Blocking HTTP fetcher with a shared session across all downloads.
pub struct RemoteFetcher {
    client: Client,
    config: ConvertConfig,
}

impl RemoteFetcher {
    pub fn new(config: &ConvertConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,image/webp,*/*;q=0.8"),
        );

        let client = Client::builder()
            .timeout(config.download_timeout)
            .user_agent("Mozilla/5.0")
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Localize remote images in every markdown note under the input tree.
    pub fn fetch_all(
        &self,
        input_dir: &Path,
        resources_dir: &Path,
        issues: &mut IssueTracker,
    ) -> Result<()> {
        for entry in WalkDir::new(input_dir).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_file()
                && path.extension().map(|e| e.to_string_lossy().to_lowercase())
                    == Some("md".into())
            {
                self.localize_note(path, resources_dir, issues)?;
            }
        }
        Ok(())
    }

    /// Download the remote images of one note. The note file is rewritten
    /// only when at least one URL was fetched.
    fn localize_note(
        &self,
        path: &Path,
        resources_dir: &Path,
        issues: &mut IssueTracker,
    ) -> Result<()> {
        let content = fs::read_to_string(path)?;
        let (updated, changed) = self.rewrite_remote_images(&content, resources_dir, issues);
        if changed {
            fs::write(path, updated)?;
            log::info!("Updated {} with local image references", path.display());
        }
        Ok(())
    }

    /// Replace each fetchable remote image URL with its local relative path.
    fn rewrite_remote_images(
        &self,
        content: &str,
        resources_dir: &Path,
        issues: &mut IssueTracker,
    ) -> (String, bool) {
        let remote_image_re =
            Regex::new(r#"!\[[^\]]*\]\((https?://[^\s)]+)(?:\s+"[^"]*")?\)"#).unwrap();

        let urls: Vec<String> = remote_image_re
            .captures_iter(content)
            .map(|caps| caps[1].to_string())
            .collect();

        let mut content = content.to_string();
        let mut changed = false;

        for url in urls {
            match self.download_and_store(&url, resources_dir) {
                Ok(local_name) => {
                    let local_ref = format!("../{}/{}", RESOURCES_DIR_NAME, local_name);
                    content = content.replace(&url, &local_ref);
                    changed = true;
                }
                Err(e) => {
                    log::warn!("Download failed for {}: {}", url, e);
                    issues.record(
                        IssueCategory::Download,
                        format!("Failed to download {}", url),
                    );
                }
            }
        }

        (content, changed)
    }

    /// Fetch one URL and persist it under its hash-derived filename.
    fn download_and_store(&self, url: &str, resources_dir: &Path) -> Result<String> {
        let response = self.get_with_retries(url)?;

        let declared_size = response.content_length().unwrap_or(0);
        if declared_size > self.config.max_download_size {
            return Err(ConvertError::DownloadTooLarge {
                url: url.to_string(),
                size: declared_size,
            });
        }

        let ext = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(extension_for_content_type)
            .map(str::to_string)
            .or_else(|| extension_from_url(url))
            .unwrap_or_else(|| ".jpg".to_string());

        let image_name = cached_filename(url, &ext);

        fs::create_dir_all(resources_dir)?;
        let local_path = resources_dir.join(&image_name);
        fs::write(&local_path, response.bytes()?)?;
        log::info!("Downloaded {} to {}", url, local_path.display());

        Ok(image_name)
    }

    /// GET with bounded retries and a fixed delay between attempts.
    fn get_with_retries(&self, url: &str) -> Result<Response> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .client
                .get(url)
                .send()
                .and_then(|r| r.error_for_status())
            {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.config.retry_attempts => {
                    log::warn!("Attempt {} for {} failed: {}", attempt, url, e);
                    thread::sleep(self.config.retry_delay);
                }
                Err(_) => {
                    return Err(ConvertError::DownloadFailed {
                        url: url.to_string(),
                        attempts: attempt,
                    });
                }
            }
        }
    }
}

/// Local cache filename for a URL: md5 of the URL plus a guessed extension.
/// Pure function of its inputs — same URL always maps to the same name.
fn cached_filename(url: &str, ext: &str) -> String {
    format!("{:x}{}", md5::compute(url.as_bytes()), ext)
}

fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    // Parameters like "; charset=..." are irrelevant for the lookup
    let essence = content_type.split(';').next().unwrap_or("").trim();
    match essence {
        "image/png" => Some(".png"),
        "image/jpeg" => Some(".jpg"),
        "image/gif" => Some(".gif"),
        "image/webp" => Some(".webp"),
        "image/bmp" => Some(".bmp"),
        "image/tiff" => Some(".tiff"),
        "image/svg+xml" => Some(".svg"),
        _ => None,
    }
}

/// Extension taken from the URL path itself, query and fragment stripped.
fn extension_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let name = path.rsplit('/').next().unwrap_or("");
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() || ext.contains('/') {
        None
    } else {
        Some(format!(".{}", ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_filename_is_deterministic() {
        let a = cached_filename("https://example.com/pic.png", ".png");
        let b = cached_filename("https://example.com/pic.png", ".png");
        assert_eq!(a, b);
        assert!(a.ends_with(".png"));
        assert_eq!(a.len(), 32 + 4);

        let other = cached_filename("https://example.com/other.png", ".png");
        assert_ne!(a, other);
    }

    #[test]
    fn test_extension_for_content_type() {
        assert_eq!(extension_for_content_type("image/png"), Some(".png"));
        assert_eq!(
            extension_for_content_type("image/jpeg; charset=binary"),
            Some(".jpg")
        );
        assert_eq!(extension_for_content_type("text/html"), None);
    }

    #[test]
    fn test_extension_from_url() {
        assert_eq!(
            extension_from_url("https://x.com/a/pic.png"),
            Some(".png".to_string())
        );
        assert_eq!(
            extension_from_url("https://x.com/pic.jpeg?width=300"),
            Some(".jpeg".to_string())
        );
        assert_eq!(extension_from_url("https://x.com/noext"), None);
        assert_eq!(extension_from_url("https://x.com/"), None);
    }

    #[test]
    fn test_remote_image_pattern() {
        let re = Regex::new(r#"!\[[^\]]*\]\((https?://[^\s)]+)(?:\s+"[^"]*")?\)"#).unwrap();

        let caps = re.captures("![alt](https://x.com/p.png)").unwrap();
        assert_eq!(&caps[1], "https://x.com/p.png");

        let caps = re
            .captures(r#"![alt](http://x.com/p.png "a title")"#)
            .unwrap();
        assert_eq!(&caps[1], "http://x.com/p.png");

        // Local references are not remote images
        assert!(re.captures("![alt](../_resources/p.png)").is_none());
        // Plain links are not image spans
        assert!(re.captures("[alt](https://x.com/p.png)").is_none());
    }
}
