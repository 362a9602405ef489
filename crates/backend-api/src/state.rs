use std::sync::Arc;

use dreamink_auth::Authenticator;
use dreamink_stylize::Stylizer;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    authenticator: Authenticator,
    stylizer: Arc<Stylizer>,
    max_upload_bytes: usize,
}

impl AppState {
    pub fn new(authenticator: Authenticator, stylizer: Arc<Stylizer>) -> Self {
        Self {
            authenticator,
            stylizer,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn stylizer(&self) -> &Stylizer {
        &self.stylizer
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }
}
