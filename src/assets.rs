use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Outcome of probing a candidate location before committing to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub content_type: Option<String>,
}

impl ProbeResponse {
    pub fn ok(content_type: impl Into<String>) -> Self {
        Self { status: 200, content_type: Some(content_type.into()) }
    }

    pub fn not_found() -> Self {
        Self { status: 404, content_type: None }
    }

    /// Dev servers answer unknown paths with their index page, so an HTML body counts as
    /// a miss even when the status says otherwise.
    pub fn is_usable(&self) -> bool {
        let html = self.content_type.as_deref().map(|ct| ct.to_ascii_lowercase().contains("text/html")).unwrap_or(false);
        (200..300).contains(&self.status) && !html
    }
}

pub trait AssetSource {
    fn probe(&self, location: &str) -> Result<ProbeResponse>;
    fn fetch(&self, location: &str) -> Result<Vec<u8>>;
}

/// Serves assets out of a directory on disk. Remote locations cannot be fetched.
pub struct FsAssetSource {
    root: PathBuf,
}

impl FsAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, location: &str) -> PathBuf {
        let trimmed = location.trim_start_matches("./").trim_start_matches('/');
        self.root.join(trimmed)
    }
}

impl AssetSource for FsAssetSource {
    fn probe(&self, location: &str) -> Result<ProbeResponse> {
        if is_remote(location) {
            bail!("Cannot probe remote location {location}");
        }
        let path = self.path_for(location);
        if !path.is_file() {
            return Ok(ProbeResponse::not_found());
        }
        let mut head = [0u8; 32];
        let read = fs::File::open(&path)
            .and_then(|mut file| file.read(&mut head))
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let content_type = if looks_like_html(&head[..read]) { "text/html" } else { content_type_for(&path) };
        Ok(ProbeResponse::ok(content_type))
    }

    fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        if is_remote(location) {
            bail!("Remote asset {location} is not available from a local source");
        }
        let path = self.path_for(location);
        fs::read(&path).with_context(|| format!("Failed to read asset {}", path.display()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedAsset {
    Local(String),
    Cdn(String),
}

impl ResolvedAsset {
    pub fn location(&self) -> &str {
        match self {
            ResolvedAsset::Local(path) | ResolvedAsset::Cdn(path) => path,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ResolvedAsset::Local(_))
    }
}

/// Maps logical asset names to a usable location: the local copy when one is served,
/// otherwise the CDN.
pub struct AssetResolver<S: AssetSource> {
    source: S,
    local_root: String,
    cdn_base: String,
    cache: HashMap<String, ResolvedAsset>,
}

impl<S: AssetSource> AssetResolver<S> {
    pub fn new(source: S, local_root: impl Into<String>, cdn_base: impl Into<String>) -> Self {
        Self { source, local_root: local_root.into(), cdn_base: cdn_base.into(), cache: HashMap::new() }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn local_path(&self, filename: &str) -> String {
        join_location(&self.local_root, filename)
    }

    pub fn cdn_url(&self, filename: &str) -> String {
        format!("{}{}", self.cdn_base, filename)
    }

    pub fn resolve(&mut self, filename: &str) -> ResolvedAsset {
        if let Some(hit) = self.cache.get(filename) {
            return hit.clone();
        }
        let local = self.local_path(filename);
        let resolved = match self.source.probe(&local) {
            Ok(response) if response.is_usable() => ResolvedAsset::Local(local),
            Ok(response) => {
                log::debug!("{filename}: local probe returned {} {:?}, using CDN", response.status, response.content_type);
                ResolvedAsset::Cdn(self.cdn_url(filename))
            }
            Err(err) => {
                log::debug!("{filename}: local probe failed ({err}), using CDN");
                ResolvedAsset::Cdn(self.cdn_url(filename))
            }
        };
        self.cache.insert(filename.to_string(), resolved.clone());
        resolved
    }

    pub fn load_bytes(&mut self, filename: &str) -> Result<Vec<u8>> {
        let resolved = self.resolve(filename);
        self.source.fetch(resolved.location()).with_context(|| format!("Failed to load asset '{filename}'"))
    }
}

fn join_location(root: &str, filename: &str) -> String {
    if root.is_empty() {
        return filename.to_string();
    }
    format!("{}/{}", root.trim_end_matches('/'), filename.trim_start_matches('/'))
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

fn looks_like_html(head: &[u8]) -> bool {
    let text = String::from_utf8_lossy(head);
    let trimmed = text.trim_start().to_ascii_lowercase();
    trimmed.starts_with("<!doctype html") || trimmed.starts_with("<html")
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path.extension().and_then(|ext| ext.to_str()).map(|ext| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("json") => "application/json",
        Some("glb") => "model/gltf-binary",
        Some("gltf") => "model/gltf+json",
        Some("mp3") => "audio/mpeg",
        Some("ogg") => "audio/ogg",
        Some("wav") => "audio/wav",
        Some("html") | Some("htm") => "text/html",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingSource {
        probes: Cell<usize>,
    }

    impl AssetSource for CountingSource {
        fn probe(&self, _location: &str) -> Result<ProbeResponse> {
            self.probes.set(self.probes.get() + 1);
            Ok(ProbeResponse::ok("application/json"))
        }

        fn fetch(&self, _location: &str) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn resolutions_are_cached() {
        let mut resolver = AssetResolver::new(CountingSource { probes: Cell::new(0) }, "assets", "https://cdn/");
        assert_eq!(resolver.resolve("a.json"), ResolvedAsset::Local("assets/a.json".into()));
        assert_eq!(resolver.resolve("a.json"), ResolvedAsset::Local("assets/a.json".into()));
        assert_eq!(resolver.source().probes.get(), 1);
    }

    #[test]
    fn html_content_type_is_not_usable() {
        assert!(!ProbeResponse::ok("text/html; charset=utf-8").is_usable());
        assert!(ProbeResponse::ok("application/json").is_usable());
        assert!(!ProbeResponse::not_found().is_usable());
    }

    #[test]
    fn joins_roots_without_doubling_separators() {
        assert_eq!(join_location("assets/", "/x.json"), "assets/x.json");
        assert_eq!(join_location("", "x.json"), "x.json");
    }
}
