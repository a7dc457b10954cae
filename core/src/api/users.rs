use tracing::warn;

use crate::envelope::Unwrap;
use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::http::HttpMethod;
use crate::infinite::InfiniteQuery;
use crate::keys::{QueryKey, USERS};
use crate::mutation::Mutation;
use crate::optimistic::Optimistic;
use crate::query::Query;
use crate::resource::{Collection, ItemUpdate};
use crate::session::Session;
use crate::types::{Credentials, LoginResponse, NewUser, ReferralCode, User, UserFilters, UserUpdate};

use super::ReferralApi;

#[derive(Debug, Clone)]
pub struct UsersApi {
    gateway: Gateway,
}

impl UsersApi {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub fn collection(&self) -> Collection<User> {
        Collection::new(self.gateway.clone(), USERS)
    }

    /// The paginated user list, accumulated page by page.
    pub fn list(&self, filters: UserFilters) -> Result<InfiniteQuery<User>, ApiError> {
        let key = USERS.lists().push("infinite").with_params(&filters)?;
        Ok(InfiniteQuery::new(&self.gateway, key, USERS.path, filters))
    }

    pub fn detail(&self, id: &str) -> Query<User> {
        self.collection().detail(id)
    }

    pub fn create(&self) -> Mutation<NewUser, Option<User>> {
        self.collection().create()
    }

    pub fn update(&self) -> Mutation<ItemUpdate<UserUpdate>, Option<User>> {
        self.collection().update()
    }

    pub fn delete(&self) -> Mutation<String, ()> {
        self.collection().delete()
    }

    pub fn profile_key() -> QueryKey {
        USERS.all().push("profile")
    }

    /// The signed-in user, `GET /users/profile`.
    pub fn profile(&self) -> Query<User> {
        self.gateway
            .query(Self::profile_key(), Unwrap::Field("user"), |api| {
                api.build_get("/users/profile", &())
            })
            .enabled(self.gateway.session().is_authenticated())
    }

    /// `POST /users/login`. A successful login stores the session and
    /// primes the profile.
    pub fn login(&self) -> Mutation<Credentials, LoginResponse> {
        let gateway = self.gateway.clone();
        Mutation::new(self.gateway.cache().clone(), move |credentials: Credentials| {
            let gateway = gateway.clone();
            let request = gateway.api().build_json(HttpMethod::Post, "/users/login", &credentials);
            Box::pin(async move {
                let response: LoginResponse = gateway.execute(request?, Unwrap::Data).await?;
                gateway
                    .session()
                    .set(Session {
                        token: response.token.clone(),
                        user: Some(response.user.clone()),
                    })
                    .map_err(|e| ApiError::Session(e.to_string()))?;
                Ok::<_, ApiError>(response)
            })
        })
        .on_success(|cache, _, response| cache.set_query_data(Self::profile_key(), response.user.clone()))
    }

    /// `POST /users/logout`, then drop the session and every cached value.
    /// The local teardown happens even when the server call fails; the
    /// server's error is still returned.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let request = self.gateway.api().build_empty(HttpMethod::Post, "/users/logout");
        let result = self.gateway.execute::<()>(request, Unwrap::Empty).await;
        if let Err(error) = &result {
            warn!(error = %error, "logout request failed, clearing local session anyway");
        }
        if let Err(error) = self.gateway.session().clear() {
            warn!(error = %error, "could not remove session file");
        }
        self.gateway.cache().clear();
        result
    }

    /// Edit a user with the change shown immediately in the detail cache.
    /// On failure the previous record is restored and the error returned.
    pub async fn edit(&self, id: &str, changes: UserUpdate) -> Result<Option<User>, ApiError> {
        let key = USERS.detail(id);
        let request = self
            .gateway
            .api()
            .build_json(HttpMethod::Put, &USERS.item_path(id), &changes)?;
        let optimistic = Optimistic::<User>::new(self.gateway.cache().clone(), key);
        let updated = optimistic
            .run(
                |current| current.map(|user| changes.applied_to(&user)),
                self.gateway.execute_plucked::<User>(request, USERS.item_field),
                |updated| updated.clone(),
            )
            .await?;
        self.gateway.cache().invalidate(&USERS.lists());
        Ok(updated)
    }

    /// Every referral code with its owner, for the client-side filtered
    /// users-with-referrals table.
    pub fn referral_codes(&self) -> Query<Vec<ReferralCode>> {
        ReferralApi::new(self.gateway.clone()).all_codes_with_users()
    }
}
