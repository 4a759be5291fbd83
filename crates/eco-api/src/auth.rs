use std::sync::Arc;

use jsonwebtoken::{EncodingKey, Header, encode};

use eco_db::Database;
use eco_gateway::{Dispatcher, DurableNotifier, GatewayConfig, Notifier};
use eco_types::api::Claims;
use eco_types::models::ActorProfile;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    pub dispatcher: Dispatcher,
    pub notifier: Arc<dyn Notifier>,
    pub gateway: GatewayConfig,
}

impl AppStateInner {
    /// Wire the default collaborators: notifications are stored in `db`
    /// and pushed through `dispatcher`.
    pub fn new(db: Arc<Database>, jwt_secret: String, dispatcher: Dispatcher, gateway: GatewayConfig) -> AppState {
        let notifier = Arc::new(DurableNotifier::new(db.clone(), dispatcher.clone()));
        Arc::new(Self {
            db,
            jwt_secret,
            dispatcher,
            notifier,
            gateway,
        })
    }
}

/// Issue a session token for `profile`, valid for 30 days.
pub fn create_token(secret: &str, profile: &ActorProfile, is_admin: bool) -> anyhow::Result<String> {
    let claims = Claims {
        sub: profile.id.clone(),
        name: profile.name.clone(),
        profile_image: profile.profile_image.clone(),
        is_admin,
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
