//! API Router
//!
//! Maps a method and path to a [`Route`].

use thiserror::Error;
use uuid::Uuid;

/// Router errors
#[derive(Error, Debug, PartialEq)]
pub enum RouterError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid video id: {0}")]
    InvalidId(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// GET /health
    Health,
    /// POST /api/videos
    CreateVideo,
    /// GET /api/videos/{id}
    GetVideo { video_id: Uuid },
    /// POST|PUT /api/video_upload/{id}
    UploadVideo { video_id: Uuid },
    /// POST|PUT /api/thumbnail_upload/{id}
    UploadThumbnail { video_id: Uuid },
}

impl Route {
    pub fn parse(method: &str, path: &str) -> Result<Route, RouterError> {
        let trimmed = path.trim_matches('/');
        let segments: Vec<&str> = trimmed.split('/').collect();

        match segments.as_slice() {
            ["health"] => match method {
                "GET" | "HEAD" => Ok(Route::Health),
                _ => Err(not_allowed(method, path)),
            },
            ["api", "videos"] => match method {
                "POST" => Ok(Route::CreateVideo),
                _ => Err(not_allowed(method, path)),
            },
            ["api", "videos", id] => match method {
                "GET" => Ok(Route::GetVideo {
                    video_id: parse_id(id)?,
                }),
                _ => Err(not_allowed(method, path)),
            },
            ["api", "video_upload", id] => match method {
                "POST" | "PUT" => Ok(Route::UploadVideo {
                    video_id: parse_id(id)?,
                }),
                _ => Err(not_allowed(method, path)),
            },
            ["api", "thumbnail_upload", id] => match method {
                "POST" | "PUT" => Ok(Route::UploadThumbnail {
                    video_id: parse_id(id)?,
                }),
                _ => Err(not_allowed(method, path)),
            },
            _ => Err(RouterError::InvalidPath(path.to_string())),
        }
    }

    /// Whether the route needs a bearer token
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Route::Health)
    }
}

fn parse_id(raw: &str) -> Result<Uuid, RouterError> {
    Uuid::parse_str(raw).map_err(|_| RouterError::InvalidId(raw.to_string()))
}

fn not_allowed(method: &str, path: &str) -> RouterError {
    RouterError::MethodNotAllowed(format!("{} {}", method, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_health() {
        assert_eq!(Route::parse("GET", "/health").unwrap(), Route::Health);
        assert!(!Route::Health.requires_auth());
    }

    #[test]
    fn test_parse_upload_routes() {
        let id = Uuid::new_v4();
        let path = format!("/api/video_upload/{}", id);
        assert_eq!(
            Route::parse("POST", &path).unwrap(),
            Route::UploadVideo { video_id: id }
        );
        assert_eq!(
            Route::parse("PUT", &path).unwrap(),
            Route::UploadVideo { video_id: id }
        );

        let path = format!("/api/thumbnail_upload/{}", id);
        assert_eq!(
            Route::parse("POST", &path).unwrap(),
            Route::UploadThumbnail { video_id: id }
        );
    }

    #[test]
    fn test_parse_video_routes() {
        let id = Uuid::new_v4();
        assert_eq!(Route::parse("POST", "/api/videos").unwrap(), Route::CreateVideo);
        assert_eq!(
            Route::parse("GET", &format!("/api/videos/{}/", id)).unwrap(),
            Route::GetVideo { video_id: id }
        );
    }

    #[test]
    fn test_only_health_is_public() {
        let id = Uuid::new_v4();
        let guarded = [
            Route::parse("POST", "/api/videos").unwrap(),
            Route::parse("GET", &format!("/api/videos/{}", id)).unwrap(),
            Route::parse("PUT", &format!("/api/video_upload/{}", id)).unwrap(),
            Route::parse("POST", &format!("/api/thumbnail_upload/{}", id)).unwrap(),
        ];
        for route in guarded {
            assert!(route.requires_auth(), "{:?} should require auth", route);
        }
        assert!(!Route::parse("HEAD", "/health").unwrap().requires_auth());
    }

    #[test]
    fn test_bad_id() {
        assert!(matches!(
            Route::parse("POST", "/api/video_upload/not-a-uuid"),
            Err(RouterError::InvalidId(_))
        ));
    }

    #[test]
    fn test_wrong_method() {
        let path = format!("/api/video_upload/{}", Uuid::new_v4());
        assert!(matches!(
            Route::parse("DELETE", &path),
            Err(RouterError::MethodNotAllowed(_))
        ));
    }

    #[test]
    fn test_unknown_path() {
        assert!(matches!(
            Route::parse("GET", "/bucket/key"),
            Err(RouterError::InvalidPath(_))
        ));
    }
}
