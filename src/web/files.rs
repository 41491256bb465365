use super::api::{ApiError, AppState, PATH_HEADER, TRUNCATED_HEADER};
use super::auth::RequireBearer;
use axum::{
    body::Body,
    extract::{Path as UrlPath, Query, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
    Json,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;

/// Inline file responses are cut after this many bytes.
pub const MAX_INLINE_BYTES: u64 = 2_000_000;

const JS_CONTENT_TYPE: &str = "application/javascript; charset=utf-8";

/// Zigbee2MQTT files that may be read, with the content type they are served as.
/// `database.db` holds JSON despite its extension.
pub const Z2M_ALLOWED_FILES: &[(&str, &str)] = &[
    ("configuration.yaml", "text/yaml; charset=utf-8"),
    ("configuration.yml", "text/yaml; charset=utf-8"),
    ("devices.yaml", "text/yaml; charset=utf-8"),
    ("devices.yml", "text/yaml; charset=utf-8"),
    ("groups.yaml", "text/yaml; charset=utf-8"),
    ("groups.yml", "text/yaml; charset=utf-8"),
    ("coordinator_backup.json", "application/json; charset=utf-8"),
    ("database.db", "application/json; charset=utf-8"),
];

#[derive(Debug, Serialize)]
pub struct FileListing {
    pub locations: Vec<FileLocation>,
}

#[derive(Debug, Serialize)]
pub struct FileLocation {
    pub base: String,
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<&'static str>,
    pub mtime: i64,
}

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    #[serde(default)]
    pub download: bool,
}

fn allowed_content_type(name: &str) -> Option<&'static str> {
    Z2M_ALLOWED_FILES
        .iter()
        .find(|(allowed, _)| *allowed == name)
        .map(|(_, content_type)| *content_type)
}

/// External converter file names; no path separators.
static CONVERTER_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]+\.js$").expect("converter name pattern is valid"));

pub fn is_converter_name(name: &str) -> bool {
    CONVERTER_NAME_REGEX.is_match(name)
}

/// Metadata for `path` if it is a regular file.
async fn file_entry(path: &Path, name: &str, content_type: Option<&'static str>) -> Option<FileEntry> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    if !metadata.is_file() {
        return None;
    }

    let mtime = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_secs() as i64);

    Some(FileEntry {
        name: name.to_string(),
        size: metadata.len(),
        content_type,
        mtime,
    })
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Reads at most `max_bytes` of `path` as lossy UTF-8; the flag is set when
/// the file was longer.
pub async fn read_text_capped(path: &Path, max_bytes: u64) -> std::io::Result<(String, bool)> {
    let file = tokio::fs::File::open(path).await?;
    let mut data = Vec::new();
    file.take(max_bytes + 1).read_to_end(&mut data).await?;

    let truncated = data.len() as u64 > max_bytes;
    data.truncate(max_bytes as usize);
    Ok((String::from_utf8_lossy(&data).into_owned(), truncated))
}

async fn text_response(path: &Path, content_type: &'static str) -> Result<Response, ApiError> {
    let (content, truncated) = read_text_capped(path, MAX_INLINE_BYTES)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    let path_value = path.display().to_string();
    let response = if truncated {
        tracing::debug!(path = %path_value, "Serving truncated file");
        (
            [
                (CONTENT_TYPE.as_str(), content_type),
                (PATH_HEADER, path_value.as_str()),
                (TRUNCATED_HEADER, "true"),
            ],
            content,
        )
            .into_response()
    } else {
        (
            [
                (CONTENT_TYPE.as_str(), content_type),
                (PATH_HEADER, path_value.as_str()),
            ],
            content,
        )
            .into_response()
    };
    Ok(response)
}

/// Streams the whole file as an attachment.
async fn download_response(path: &Path, name: &str, content_type: &'static str) -> Result<Response, ApiError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    let body = Body::from_stream(ReaderStream::new(file));

    let disposition = format!("attachment; filename=\"{name}\"");
    let path_value = path.display().to_string();
    Ok((
        [
            (CONTENT_TYPE.as_str(), content_type),
            (CONTENT_DISPOSITION.as_str(), disposition.as_str()),
            (PATH_HEADER, path_value.as_str()),
        ],
        body,
    )
        .into_response())
}

/// GET /files/z2m
pub async fn list_z2m_files(
    State(state): State<AppState>,
    _auth: RequireBearer,
) -> Json<FileListing> {
    let mut locations = Vec::new();

    for base in state.config.z2m_config_dirs() {
        let mut files = Vec::new();
        for &(name, content_type) in Z2M_ALLOWED_FILES {
            if let Some(entry) = file_entry(&base.join(name), name, Some(content_type)).await {
                files.push(entry);
            }
        }
        if !files.is_empty() {
            locations.push(FileLocation {
                base: base.display().to_string(),
                files,
            });
        }
    }

    Json(FileListing { locations })
}

/// GET /files/z2m/:name?download=bool
pub async fn get_z2m_file(
    State(state): State<AppState>,
    _auth: RequireBearer,
    UrlPath(name): UrlPath<String>,
    Query(query): Query<FileQuery>,
) -> Result<Response, ApiError> {
    let content_type = allowed_content_type(&name)
        .ok_or_else(|| ApiError::NotFound("File not allowed.".to_string()))?;

    let mut found = None;
    for base in state.config.z2m_config_dirs() {
        let candidate = base.join(&name);
        if is_file(&candidate).await {
            found = Some(candidate);
            break;
        }
    }
    let path = found.ok_or_else(|| ApiError::NotFound("File not found.".to_string()))?;

    if query.download {
        download_response(&path, &name, content_type).await
    } else {
        text_response(&path, content_type).await
    }
}

fn converter_dirs(state: &AppState) -> Vec<PathBuf> {
    state
        .config
        .z2m_config_dirs()
        .into_iter()
        .map(|base| base.join("external_converters"))
        .collect()
}

/// GET /files/z2m/external_converters
pub async fn list_z2m_external_converters(
    State(state): State<AppState>,
    _auth: RequireBearer,
) -> Json<FileListing> {
    let mut locations = Vec::new();

    for base in converter_dirs(&state) {
        let Ok(mut entries) = tokio::fs::read_dir(&base).await else {
            continue;
        };

        let mut names = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(".js") {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();

        let mut files = Vec::new();
        for name in names {
            if let Some(entry) = file_entry(&base.join(&name), &name, None).await {
                files.push(entry);
            }
        }

        locations.push(FileLocation {
            base: base.display().to_string(),
            files,
        });
    }

    Json(FileListing { locations })
}

/// GET /files/z2m/external_converters/:name
pub async fn get_z2m_external_converter(
    State(state): State<AppState>,
    _auth: RequireBearer,
    UrlPath(name): UrlPath<String>,
) -> Result<Response, ApiError> {
    if !is_converter_name(&name) {
        return Err(ApiError::NotFound("File not allowed.".to_string()));
    }

    for base in converter_dirs(&state) {
        let path = base.join(&name);
        if !is_file(&path).await {
            continue;
        }
        match text_response(&path, JS_CONTENT_TYPE).await {
            Ok(response) => return Ok(response),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = ?e, "Skipping unreadable converter");
                continue;
            }
        }
    }

    Err(ApiError::NotFound("File not found.".to_string()))
}
