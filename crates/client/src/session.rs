use std::sync::Arc;

use reqwest::Url;
use reqwest::cookie::{CookieStore, Jar};
use scheduler_core::errors::{SchedulerError, SchedulerResult};
use scheduler_core::models::course::Course;
use scheduler_core::models::user::UserProfile;
use tokio::sync::RwLock;
use tracing::debug;

/// Cookie holding the token echoed back in `X-CSRF-TOKEN`.
pub const CSRF_COOKIE: &str = "csrf_access_token";
pub const CSRF_HEADER: &str = "X-CSRF-TOKEN";

const AUTH_COOKIES: [&str; 2] = ["access_token_cookie", CSRF_COOKIE];

/// Signed-in state shared by every client talking to the backend.
///
/// The cookie jar is handed to the HTTP client, so the backend's login
/// cookies land here and are replayed automatically.
#[derive(Debug)]
pub struct Session {
    base_url: Url,
    jar: Arc<Jar>,
    profile: RwLock<Option<UserProfile>>,
    courses: RwLock<Option<Vec<Course>>>,
}

impl Session {
    pub fn new(api_url: &str) -> SchedulerResult<Self> {
        let base_url = Url::parse(api_url)
            .map_err(|err| SchedulerError::Config(format!("invalid backend URL `{api_url}`: {err}")))?;
        Ok(Self {
            base_url,
            jar: Arc::new(Jar::default()),
            profile: RwLock::new(None),
            courses: RwLock::new(None),
        })
    }

    pub fn jar(&self) -> Arc<Jar> {
        Arc::clone(&self.jar)
    }

    /// Reads a cookie the backend set, URL-decoded.
    pub fn cookie(&self, name: &str) -> Option<String> {
        let header = self.jar.cookies(&self.base_url)?;
        let header = header.to_str().ok()?;
        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| {
                urlencoding::decode(value)
                    .map(|decoded| decoded.into_owned())
                    .unwrap_or_else(|_| value.to_string())
            })
    }

    pub fn csrf_token(&self) -> Option<String> {
        self.cookie(CSRF_COOKIE)
    }

    pub async fn profile(&self) -> Option<UserProfile> {
        self.profile.read().await.clone()
    }

    pub async fn set_profile(&self, profile: UserProfile) {
        *self.profile.write().await = Some(profile);
    }

    pub async fn courses(&self) -> Option<Vec<Course>> {
        self.courses.read().await.clone()
    }

    pub async fn cache_courses(&self, courses: Vec<Course>) {
        *self.courses.write().await = Some(courses);
    }

    /// Forgets the user, the cached courses and the auth cookies.
    pub async fn clear(&self) {
        *self.profile.write().await = None;
        *self.courses.write().await = None;
        for name in AUTH_COOKIES {
            self.jar
                .add_cookie_str(&format!("{name}=; Max-Age=0; Path=/"), &self.base_url);
        }
        debug!("Session cleared");
    }
}
