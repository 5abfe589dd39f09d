use chrono::{serde::ts_milliseconds, DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;

use crate::config::DatabaseConfig;
use crate::models::{
    checkout::{Checkout, CheckoutStatus},
    common::{ClaimFilter, GeoPoint},
    notification::Notification,
    surplus::{ClaimRecord, SurplusItem},
    user::{Session, User, UserType},
};
use crate::utils::{AppError, AppResult};

/// Outcome of the compare-and-swap on `claimed_by`.
#[derive(Debug, Clone)]
pub enum ClaimOutcome {
    Claimed(SurplusItem),
    AlreadyClaimed(SurplusItem),
}

#[derive(Clone)]
pub struct DatabaseService {
    db: Surreal<Any>,
}

#[derive(Debug, Deserialize)]
struct CredentialRow {
    password_hash: String,
}

#[derive(Debug, Deserialize)]
struct ReadMarkerRow {
    #[serde(with = "ts_milliseconds")]
    last_opened_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ChangedRow {
    #[allow(dead_code)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClaimedRow {
    #[allow(dead_code)]
    claimed_by: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: u64,
}

#[derive(Debug, Serialize)]
pub struct DatabaseStats {
    pub total_users: u64,
    pub total_listings: u64,
    pub claimed_listings: u64,
}

/// Serializes a model for `CONTENT`, leaving the record key to `type::thing`.
fn document<T: Serialize>(value: &T) -> AppResult<serde_json::Value> {
    let mut doc = serde_json::to_value(value).map_err(|e| AppError::Internal(e.into()))?;
    if let Some(fields) = doc.as_object_mut() {
        fields.remove("id");
    }
    Ok(doc)
}

impl DatabaseService {
    pub async fn new(config: &DatabaseConfig) -> AppResult<Self> {
        let db = any::connect(config.url.as_str()).await?;

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            db.signin(Root {
                username: username.as_str(),
                password: password.as_str(),
            })
            .await?;
        }

        db.use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await?;

        let service = Self { db };
        service.initialize_schema().await?;

        log::info!("Connected to database at {}", config.url);
        Ok(service)
    }

    pub async fn in_memory() -> AppResult<Self> {
        Self::new(&DatabaseConfig {
            url: "mem://".to_string(),
            namespace: "swaplink".to_string(),
            database: "test".to_string(),
            username: None,
            password: None,
        })
        .await
    }

    async fn initialize_schema(&self) -> AppResult<()> {
        self.db
            .query(
                "
            DEFINE TABLE IF NOT EXISTS users SCHEMALESS;
            DEFINE INDEX IF NOT EXISTS users_email ON users FIELDS email UNIQUE;
            DEFINE INDEX IF NOT EXISTS users_type ON users FIELDS user_type;
            DEFINE TABLE IF NOT EXISTS credentials SCHEMALESS;
            DEFINE TABLE IF NOT EXISTS sessions SCHEMALESS;
        ",
            )
            .await?
            .check()?;

        self.db
            .query(
                "
            DEFINE TABLE IF NOT EXISTS surplus SCHEMALESS;
            DEFINE INDEX IF NOT EXISTS surplus_created_by ON surplus FIELDS created_by;
            DEFINE INDEX IF NOT EXISTS surplus_claimed_by ON surplus FIELDS claimed_by;
            DEFINE TABLE IF NOT EXISTS checkouts SCHEMALESS;
            DEFINE INDEX IF NOT EXISTS checkouts_order ON checkouts FIELDS order_id UNIQUE;
        ",
            )
            .await?
            .check()?;

        self.db
            .query(
                "
            DEFINE TABLE IF NOT EXISTS notifications SCHEMALESS;
            DEFINE INDEX IF NOT EXISTS notifications_created_at ON notifications FIELDS created_at;
            DEFINE TABLE IF NOT EXISTS notification_reads SCHEMALESS;
        ",
            )
            .await?
            .check()?;

        log::info!("Database schema initialized successfully");
        Ok(())
    }

    // User operations
    pub async fn create_user(&self, user: &User, password_hash: &str) -> AppResult<User> {
        if self.get_user_by_email(&user.email).await?.is_some() {
            return Err(duplicate_email(&user.email));
        }

        self.insert_user(user, password_hash).await
    }

    /// The `users_email` index still decides when two signups race past the
    /// lookup above.
    async fn insert_user(&self, user: &User, password_hash: &str) -> AppResult<User> {
        let mut response = self
            .db
            .query(
                "
            BEGIN TRANSACTION;
            CREATE type::thing('users', $id) CONTENT $user RETURN NONE;
            CREATE type::thing('credentials', $id) CONTENT $credential RETURN NONE;
            COMMIT TRANSACTION;
        ",
            )
            .bind(("id", user.id.clone()))
            .bind(("user", document(user)?))
            .bind(("credential", json!({ "password_hash": password_hash })))
            .await?;

        let errors = response.take_errors();
        if errors.values().any(is_unique_violation) {
            return Err(duplicate_email(&user.email));
        }
        if let Some((_, error)) = errors.into_iter().min_by_key(|(index, _)| *index) {
            return Err(error.into());
        }

        Ok(user.clone())
    }

    pub async fn get_user(&self, user_id: &str) -> AppResult<Option<User>> {
        let user: Option<User> = self
            .db
            .query("SELECT *, record::id(id) AS id FROM type::thing('users', $id)")
            .bind(("id", user_id.to_string()))
            .await?
            .take(0)?;
        Ok(user)
    }

    pub async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user: Option<User> = self
            .db
            .query("SELECT *, record::id(id) AS id FROM users WHERE email = $email LIMIT 1")
            .bind(("email", email.trim().to_lowercase()))
            .await?
            .take(0)?;
        Ok(user)
    }

    pub async fn get_password_hash(&self, user_id: &str) -> AppResult<Option<String>> {
        let row: Option<CredentialRow> = self
            .db
            .query("SELECT password_hash FROM type::thing('credentials', $id)")
            .bind(("id", user_id.to_string()))
            .await?
            .take(0)?;
        Ok(row.map(|r| r.password_hash))
    }

    pub async fn get_users_by_type(&self, user_type: UserType) -> AppResult<Vec<User>> {
        let users: Vec<User> = self
            .db
            .query(
                "SELECT *, record::id(id) AS id FROM users WHERE user_type = $user_type ORDER BY display_name ASC",
            )
            .bind(("user_type", user_type.to_string()))
            .await?
            .take(0)?;
        Ok(users)
    }

    pub async fn update_user_location(
        &self,
        user_id: &str,
        address: Option<String>,
        geolocation: GeoPoint,
    ) -> AppResult<Option<User>> {
        let query = match address {
            Some(_) => {
                "UPDATE type::thing('users', $id) SET geolocation = $geolocation, address = $address RETURN NONE"
            }
            None => "UPDATE type::thing('users', $id) SET geolocation = $geolocation RETURN NONE",
        };

        self.db
            .query(query)
            .bind(("id", user_id.to_string()))
            .bind(("geolocation", geolocation))
            .bind(("address", address))
            .await?
            .check()?;

        self.get_user(user_id).await
    }

    // Session operations
    pub async fn create_session(&self, session: &Session) -> AppResult<()> {
        self.db
            .query("CREATE type::thing('sessions', $id) CONTENT $row RETURN NONE")
            .bind(("id", session.id.clone()))
            .bind(("row", document(session)?))
            .await?
            .check()?;
        Ok(())
    }

    pub async fn get_session(&self, session_id: &str) -> AppResult<Option<Session>> {
        let session: Option<Session> = self
            .db
            .query("SELECT *, record::id(id) AS id FROM type::thing('sessions', $id)")
            .bind(("id", session_id.to_string()))
            .await?
            .take(0)?;
        Ok(session)
    }

    pub async fn delete_session(&self, session_id: &str) -> AppResult<()> {
        self.db
            .query("DELETE type::thing('sessions', $id)")
            .bind(("id", session_id.to_string()))
            .await?
            .check()?;
        Ok(())
    }

    // Surplus operations
    pub async fn create_surplus(&self, item: &SurplusItem) -> AppResult<SurplusItem> {
        self.db
            .query("CREATE type::thing('surplus', $id) CONTENT $item RETURN NONE")
            .bind(("id", item.id.clone()))
            .bind(("item", document(item)?))
            .await?
            .check()?;
        Ok(item.clone())
    }

    pub async fn get_surplus(&self, item_id: &str) -> AppResult<Option<SurplusItem>> {
        let item: Option<SurplusItem> = self
            .db
            .query("SELECT *, record::id(id) AS id FROM type::thing('surplus', $id)")
            .bind(("id", item_id.to_string()))
            .await?
            .take(0)?;
        Ok(item)
    }

    pub async fn list_surplus(&self, filter: ClaimFilter) -> AppResult<Vec<SurplusItem>> {
        let query = match filter {
            ClaimFilter::All => "SELECT *, record::id(id) AS id FROM surplus ORDER BY created_at DESC",
            ClaimFilter::Available => {
                "SELECT *, record::id(id) AS id FROM surplus WHERE claimed_by = NONE OR claimed_by = NULL ORDER BY created_at DESC"
            }
            ClaimFilter::Claimed => {
                "SELECT *, record::id(id) AS id FROM surplus WHERE claimed_by != NONE AND claimed_by != NULL ORDER BY created_at DESC"
            }
        };

        let items: Vec<SurplusItem> = self.db.query(query).await?.take(0)?;
        Ok(items)
    }

    pub async fn list_surplus_by_creator(&self, user_id: &str) -> AppResult<Vec<SurplusItem>> {
        let items: Vec<SurplusItem> = self
            .db
            .query("SELECT *, record::id(id) AS id FROM surplus WHERE created_by = $user_id ORDER BY created_at DESC")
            .bind(("user_id", user_id.to_string()))
            .await?
            .take(0)?;
        Ok(items)
    }

    pub async fn list_surplus_claimed_by(&self, user_id: &str) -> AppResult<Vec<SurplusItem>> {
        let items: Vec<SurplusItem> = self
            .db
            .query("SELECT *, record::id(id) AS id FROM surplus WHERE claimed_by = $user_id ORDER BY claimed_at DESC")
            .bind(("user_id", user_id.to_string()))
            .await?
            .take(0)?;
        Ok(items)
    }

    pub async fn list_geolocated_surplus(&self) -> AppResult<Vec<SurplusItem>> {
        let items: Vec<SurplusItem> = self
            .db
            .query(
                "SELECT *, record::id(id) AS id FROM surplus WHERE geolocation != NONE AND geolocation != NULL ORDER BY created_at ASC",
            )
            .await?
            .take(0)?;
        Ok(items)
    }

    /// Sets the claim fields only while `claimed_by` is still empty. The check
    /// and the write are one statement, so concurrent claims cannot both win.
    pub async fn claim_surplus(&self, item_id: &str, claim: &ClaimRecord) -> AppResult<ClaimOutcome> {
        let changed: Vec<ClaimedRow> = self
            .db
            .query(
                "
            UPDATE type::thing('surplus', $id)
            SET claimed_by = $claimed_by,
                claimed_by_name = $claimed_by_name,
                claimed_at = $claimed_at,
                payment_id = $payment_id
            WHERE claimed_by = NONE OR claimed_by = NULL
            RETURN claimed_by
        ",
            )
            .bind(("id", item_id.to_string()))
            .bind(("claimed_by", claim.claimed_by.clone()))
            .bind(("claimed_by_name", claim.claimed_by_name.clone()))
            .bind(("claimed_at", claim.claimed_at.timestamp_millis()))
            .bind(("payment_id", claim.payment_id.clone()))
            .await?
            .take(0)?;

        let item = self
            .get_surplus(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Surplus item {}", item_id)))?;

        if changed.is_empty() {
            Ok(ClaimOutcome::AlreadyClaimed(item))
        } else {
            Ok(ClaimOutcome::Claimed(item))
        }
    }

    // Checkout operations
    pub async fn create_checkout(&self, checkout: &Checkout) -> AppResult<Checkout> {
        self.db
            .query("CREATE type::thing('checkouts', $id) CONTENT $checkout RETURN NONE")
            .bind(("id", checkout.id.clone()))
            .bind(("checkout", document(checkout)?))
            .await?
            .check()?;
        Ok(checkout.clone())
    }

    pub async fn get_checkout(&self, checkout_id: &str) -> AppResult<Option<Checkout>> {
        let checkout: Option<Checkout> = self
            .db
            .query("SELECT *, record::id(id) AS id FROM type::thing('checkouts', $id)")
            .bind(("id", checkout_id.to_string()))
            .await?
            .take(0)?;
        Ok(checkout)
    }

    /// `Created -> Paid`. Returns false when the checkout had already left `Created`.
    pub async fn mark_checkout_paid(&self, checkout_id: &str, payment_id: &str) -> AppResult<bool> {
        let changed: Vec<ChangedRow> = self
            .db
            .query(
                "UPDATE type::thing('checkouts', $id) SET status = 'Paid', payment_id = $payment_id, updated_at = $now WHERE status = 'Created' RETURN status",
            )
            .bind(("id", checkout_id.to_string()))
            .bind(("payment_id", payment_id.to_string()))
            .bind(("now", Utc::now().timestamp_millis()))
            .await?
            .take(0)?;
        Ok(!changed.is_empty())
    }

    /// `Created -> Failed`. Returns false when the checkout had already left `Created`.
    pub async fn mark_checkout_failed(
        &self,
        checkout_id: &str,
        reason: &str,
        payment_id: Option<String>,
    ) -> AppResult<bool> {
        let changed: Vec<ChangedRow> = self
            .db
            .query(
                "UPDATE type::thing('checkouts', $id) SET status = 'Failed', failure_reason = $reason, payment_id = $payment_id, updated_at = $now WHERE status = 'Created' RETURN status",
            )
            .bind(("id", checkout_id.to_string()))
            .bind(("reason", reason.to_string()))
            .bind(("payment_id", payment_id))
            .bind(("now", Utc::now().timestamp_millis()))
            .await?
            .take(0)?;
        Ok(!changed.is_empty())
    }

    pub async fn set_checkout_status(
        &self,
        checkout_id: &str,
        status: CheckoutStatus,
        reason: Option<String>,
    ) -> AppResult<()> {
        self.db
            .query(
                "UPDATE type::thing('checkouts', $id) SET status = $status, failure_reason = $reason, updated_at = $now RETURN NONE",
            )
            .bind(("id", checkout_id.to_string()))
            .bind(("status", status.as_str()))
            .bind(("reason", reason))
            .bind(("now", Utc::now().timestamp_millis()))
            .await?
            .check()?;
        Ok(())
    }

    // Notification operations
    pub async fn create_notification(&self, notification: &Notification) -> AppResult<()> {
        self.db
            .query("CREATE type::thing('notifications', $id) CONTENT $notification RETURN NONE")
            .bind(("id", notification.id.clone()))
            .bind(("notification", document(notification)?))
            .await?
            .check()?;
        Ok(())
    }

    /// Newest notifications not sent by `user_id`.
    pub async fn get_notifications_for(&self, user_id: &str, limit: u32) -> AppResult<Vec<Notification>> {
        let notifications: Vec<Notification> = self
            .db
            .query(
                "SELECT *, record::id(id) AS id FROM notifications WHERE sent_by != $user_id ORDER BY created_at DESC LIMIT $limit",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("limit", limit))
            .await?
            .take(0)?;
        Ok(notifications)
    }

    pub async fn get_last_opened(&self, user_id: &str) -> AppResult<Option<DateTime<Utc>>> {
        let row: Option<ReadMarkerRow> = self
            .db
            .query("SELECT last_opened_at FROM type::thing('notification_reads', $id)")
            .bind(("id", user_id.to_string()))
            .await?
            .take(0)?;
        Ok(row.map(|r| r.last_opened_at))
    }

    pub async fn set_last_opened(&self, user_id: &str, at: DateTime<Utc>) -> AppResult<()> {
        self.db
            .query("UPSERT type::thing('notification_reads', $id) SET last_opened_at = $at RETURN NONE")
            .bind(("id", user_id.to_string()))
            .bind(("at", at.timestamp_millis()))
            .await?
            .check()?;
        Ok(())
    }

    // Utility methods
    pub async fn health_check(&self) -> AppResult<()> {
        self.db.health().await?;
        Ok(())
    }

    pub async fn get_statistics(&self) -> AppResult<DatabaseStats> {
        let mut response = self
            .db
            .query("SELECT count() AS count FROM users GROUP ALL")
            .query("SELECT count() AS count FROM surplus GROUP ALL")
            .query(
                "SELECT count() AS count FROM surplus WHERE claimed_by != NONE AND claimed_by != NULL GROUP ALL",
            )
            .await?;

        let users: Vec<CountRow> = response.take(0)?;
        let listings: Vec<CountRow> = response.take(1)?;
        let claimed: Vec<CountRow> = response.take(2)?;

        Ok(DatabaseStats {
            total_users: extract_count(&users),
            total_listings: extract_count(&listings),
            claimed_listings: extract_count(&claimed),
        })
    }
}

fn duplicate_email(email: &str) -> AppError {
    AppError::Conflict(format!("An account with email {} already exists", email))
}

/// SurrealDB reports a UNIQUE index hit as "Database index `…` already contains …".
fn is_unique_violation(error: &surrealdb::Error) -> bool {
    error.to_string().contains("already contains")
}

fn extract_count(rows: &[CountRow]) -> u64 {
    rows.first().map(|r| r.count).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::surplus::ListingFields;
    use rust_decimal::Decimal;

    fn store() -> User {
        User::new(
            "bakery@example.com".to_string(),
            Some("Corner Bakery".to_string()),
            UserType::Store,
            Some("Linking Road".to_string()),
            Some(GeoPoint::new(19.0596, 72.8295)),
        )
    }

    fn ngo(email: &str) -> User {
        User::new(email.to_string(), None, UserType::Ngo, None, None)
    }

    fn item(creator: &User, title: &str) -> SurplusItem {
        SurplusItem::new(
            ListingFields {
                title: title.to_string(),
                description: "Still good today".to_string(),
                quantity: "10".to_string(),
                location: "Bandra".to_string(),
                geolocation: Some(GeoPoint::new(19.0596, 72.8295)),
                price: Decimal::new(2500, 2),
            },
            creator,
            "https://cdn.example.com/bread.png".to_string(),
            "INR".to_string(),
        )
    }

    #[tokio::test]
    async fn test_user_operations() {
        let db = DatabaseService::in_memory().await.unwrap();
        let user = store();

        db.create_user(&user, "hash").await.unwrap();

        let by_id = db.get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "bakery@example.com");
        assert_eq!(by_id.geolocation, Some(GeoPoint::new(19.0596, 72.8295)));

        let by_email = db.get_user_by_email("BAKERY@example.com").await.unwrap();
        assert_eq!(by_email.unwrap().id, user.id);

        assert_eq!(db.get_password_hash(&user.id).await.unwrap().as_deref(), Some("hash"));

        let duplicate = User::new("bakery@example.com".to_string(), None, UserType::Ngo, None, None);
        assert!(matches!(
            db.create_user(&duplicate, "hash").await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_email_index_conflict_is_reported_as_conflict() {
        let db = DatabaseService::in_memory().await.unwrap();
        db.insert_user(&store(), "hash").await.unwrap();

        // Same email, new id: only the unique index can catch this one.
        let racer = store();
        let result = db.insert_user(&racer, "hash").await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert!(db.get_user(&racer.id).await.unwrap().is_none());
        assert!(db.get_password_hash(&racer.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_members_by_type() {
        let db = DatabaseService::in_memory().await.unwrap();
        db.create_user(&store(), "h").await.unwrap();
        db.create_user(&ngo("a@ngo.org"), "h").await.unwrap();
        db.create_user(&ngo("b@ngo.org"), "h").await.unwrap();

        let ngos = db.get_users_by_type(UserType::Ngo).await.unwrap();
        assert_eq!(ngos.len(), 2);
        assert!(ngos.iter().all(|u| u.user_type == UserType::Ngo));
        assert!(db.get_users_by_type(UserType::Restaurant).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_location() {
        let db = DatabaseService::in_memory().await.unwrap();
        let user = ngo("food@ngo.org");
        db.create_user(&user, "h").await.unwrap();

        let updated = db
            .update_user_location(&user.id, Some("Andheri".to_string()), GeoPoint::new(19.1136, 72.8697))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.address.as_deref(), Some("Andheri"));
        assert_eq!(updated.geolocation, Some(GeoPoint::new(19.1136, 72.8697)));

        let moved = db
            .update_user_location(&user.id, None, GeoPoint::new(19.2, 72.9))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(moved.address.as_deref(), Some("Andheri"));
    }

    #[tokio::test]
    async fn test_surplus_listing_filters() {
        let db = DatabaseService::in_memory().await.unwrap();
        let creator = store();
        let claimer = ngo("meals@ngo.org");

        let bread = db.create_surplus(&item(&creator, "Bread")).await.unwrap();
        db.create_surplus(&item(&creator, "Milk")).await.unwrap();

        let outcome = db
            .claim_surplus(&bread.id, &ClaimRecord::new(&claimer, None))
            .await
            .unwrap();
        assert!(matches!(outcome, ClaimOutcome::Claimed(_)));

        assert_eq!(db.list_surplus(ClaimFilter::All).await.unwrap().len(), 2);

        let available = db.list_surplus(ClaimFilter::Available).await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].title, "Milk");

        let claimed = db.list_surplus(ClaimFilter::Claimed).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].claimed_by.as_deref(), Some(claimer.id.as_str()));

        assert_eq!(db.list_surplus_by_creator(&creator.id).await.unwrap().len(), 2);
        assert_eq!(db.list_surplus_claimed_by(&claimer.id).await.unwrap().len(), 1);
        assert_eq!(db.list_geolocated_surplus().await.unwrap().len(), 2);

        let stats = db.get_statistics().await.unwrap();
        assert_eq!(stats.total_listings, 2);
        assert_eq!(stats.claimed_listings, 1);
    }

    #[tokio::test]
    async fn test_claim_is_first_wins() {
        let db = DatabaseService::in_memory().await.unwrap();
        let bread = db.create_surplus(&item(&store(), "Bread")).await.unwrap();
        let first = ngo("first@ngo.org");
        let second = ngo("second@ngo.org");

        let won = db
            .claim_surplus(&bread.id, &ClaimRecord::new(&first, Some("pay_first".to_string())))
            .await
            .unwrap();
        let lost = db
            .claim_surplus(&bread.id, &ClaimRecord::new(&second, Some("pay_second".to_string())))
            .await
            .unwrap();

        match (won, lost) {
            (ClaimOutcome::Claimed(a), ClaimOutcome::AlreadyClaimed(b)) => {
                assert_eq!(a.claimed_by.as_deref(), Some(first.id.as_str()));
                assert_eq!(b.claimed_by.as_deref(), Some(first.id.as_str()));
                assert_eq!(b.payment_id.as_deref(), Some("pay_first"));
                assert!(b.claimed_at.is_some());
            }
            other => panic!("unexpected outcomes: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_claim_missing_item() {
        let db = DatabaseService::in_memory().await.unwrap();
        let result = db
            .claim_surplus("does-not-exist", &ClaimRecord::new(&ngo("x@ngo.org"), None))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(db.get_surplus("does-not-exist").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_checkout_transitions() {
        let db = DatabaseService::in_memory().await.unwrap();
        let bread = item(&store(), "Bread");
        let checkout = db
            .create_checkout(&Checkout::new(&bread, "buyer", "order_ABC123xyz".to_string(), 2500))
            .await
            .unwrap();

        assert!(db.mark_checkout_paid(&checkout.id, "pay_1").await.unwrap());
        assert!(!db.mark_checkout_paid(&checkout.id, "pay_2").await.unwrap());
        assert!(!db.mark_checkout_failed(&checkout.id, "late failure", None).await.unwrap());

        let stored = db.get_checkout(&checkout.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CheckoutStatus::Paid);
        assert_eq!(stored.payment_id.as_deref(), Some("pay_1"));

        db.set_checkout_status(&checkout.id, CheckoutStatus::Claimed, None)
            .await
            .unwrap();
        let stored = db.get_checkout(&checkout.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CheckoutStatus::Claimed);
    }

    #[tokio::test]
    async fn test_sessions() {
        let db = DatabaseService::in_memory().await.unwrap();
        let now = Utc::now();
        let session = Session {
            id: "jti-1".to_string(),
            user_id: "user-1".to_string(),
            created_at: now,
            expires_at: now + chrono::Duration::hours(1),
        };

        db.create_session(&session).await.unwrap();
        let stored = db.get_session("jti-1").await.unwrap().unwrap();
        assert_eq!(stored.user_id, "user-1");

        db.delete_session("jti-1").await.unwrap();
        assert!(db.get_session("jti-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_notifications_exclude_sender_and_respect_limit() {
        let db = DatabaseService::in_memory().await.unwrap();
        let base = Utc::now();

        for i in 0..5 {
            let mut n = Notification::new(format!("from other {}", i), "other");
            n.created_at = base + chrono::Duration::seconds(i);
            db.create_notification(&n).await.unwrap();
        }
        db.create_notification(&Notification::new("mine".to_string(), "me"))
            .await
            .unwrap();

        let feed = db.get_notifications_for("me", 3).await.unwrap();
        assert_eq!(feed.len(), 3);
        assert!(feed.iter().all(|n| n.sent_by == "other"));
        assert_eq!(feed[0].message, "from other 4");
        assert_eq!(feed[2].message, "from other 2");
    }

    #[tokio::test]
    async fn test_read_marker_upsert() {
        let db = DatabaseService::in_memory().await.unwrap();
        assert!(db.get_last_opened("me").await.unwrap().is_none());

        let first = Utc::now();
        db.set_last_opened("me", first).await.unwrap();
        let second = first + chrono::Duration::minutes(5);
        db.set_last_opened("me", second).await.unwrap();

        let stored = db.get_last_opened("me").await.unwrap().unwrap();
        assert_eq!(stored.timestamp_millis(), second.timestamp_millis());
    }
}
